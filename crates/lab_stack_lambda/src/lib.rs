//! Runtime side of the lab stack: the handler that runs inside the listing
//! function and the storage adapter it talks to.
//!
//! Handler logic is written against the [`adapters::object_store::ObjectLister`]
//! trait so it can be exercised without AWS; the S3 implementation lives in
//! the `list_objects_lambda` binary.

pub mod adapters;
pub mod handlers;
