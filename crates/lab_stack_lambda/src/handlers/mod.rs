pub mod list_objects;
