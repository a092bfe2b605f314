pub mod config;
pub mod error;
pub mod ingestion;

// Database module for PostgreSQL
pub mod db;

pub use config::IngestConfig;
pub use error::{IngestError, Result};
