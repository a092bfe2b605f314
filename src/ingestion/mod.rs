//! Ingestion Module - one CSV object from S3 into RDS, with a Glue fallback
//!
//! - Source Reader: object storage → Tabular Dataset
//! - Primary Writer: append into PostgreSQL, failures become an outcome
//! - Fallback Registrar: external table definition in the Glue catalog
//! - Orchestrator: the single try/fallback decision

pub mod catalog;
pub mod classify;
pub mod dataset;
pub mod orchestrator;
pub mod source;
pub mod status;
pub mod writer;

pub use catalog::{ExternalTableDefinition, FallbackRegistrar, GlueRegistrar, Registration};
pub use classify::{FailureClass, FallbackPolicy, WriteFailure, WriteOutcome};
pub use dataset::{Column, Dataset};
pub use orchestrator::{IngestionOptions, IngestionOrchestrator, RunPath, RunReport};
pub use source::{DatasetSource, ObjectStoreSource};
pub use status::{ConsoleSink, RecordingSink, StatusLine, StatusSink};
pub use writer::{PostgresWriter, PrimaryWriter};
