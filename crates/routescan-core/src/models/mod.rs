//! Data models for extracted manifest records, queries, and configuration.

pub mod config;
pub mod query;
pub mod record;

pub use config::ScanConfig;
pub use query::{load_queries, Query};
pub use record::{ExtractionRecord, LocationNumber, ResultSet, RouteId};
