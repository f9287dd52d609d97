//! Sync layer: applies statute-feed facts to the store, and pulls them over
//! HTTP when the `http` feature is enabled.

mod error;
mod ingest;

#[cfg(feature = "http")]
pub mod http;

pub use error::SyncError;
pub use ingest::{IngestFailure, IngestReport, Tally, ingest_batch};

#[cfg(feature = "http")]
pub use http::FeedClient;
