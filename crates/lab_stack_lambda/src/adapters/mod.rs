pub mod object_store;
