//! Fetches the fraud-detection datasets used alongside the lab stack and
//! scores how well each one suits transaction-graph analysis.
//!
//! The flow for every [`catalog::DatasetEntry`] is download
//! ([`kaggle::DatasetSource`]), unpack ([`archive`]), profile ([`profile`]),
//! score ([`score`]) and render ([`report`]). [`pipeline::run`] drives it and
//! keeps going when a single dataset fails.

pub mod archive;
pub mod catalog;
pub mod error;
pub mod kaggle;
pub mod pipeline;
pub mod profile;
pub mod report;
pub mod score;

pub use error::DatasetError;
