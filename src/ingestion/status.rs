//! Status lines printed for the operator
//!
//! The exact wording is relied on by scripts that watch the output.

use serde::Serialize;
use std::fmt;
use std::sync::Mutex;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StatusLine {
    ReadingSource,
    SourceRead,
    TryingPrimary,
    PrimarySucceeded,
    PrimaryFailed(String),
    FallingBack,
    CatalogCreated,
    CatalogAlreadyExists,
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusLine::ReadingSource => write!(f, "Reading file from S3..."),
            StatusLine::SourceRead => write!(f, "S3 file read successfully"),
            StatusLine::TryingPrimary => write!(f, "Trying to push data to RDS..."),
            StatusLine::PrimarySucceeded => write!(f, "Data successfully inserted into RDS!"),
            StatusLine::PrimaryFailed(detail) => write!(f, "RDS upload failed: {}", detail),
            StatusLine::FallingBack => write!(f, "Falling back to AWS Glue..."),
            StatusLine::CatalogCreated => write!(f, "Glue table created successfully!"),
            StatusLine::CatalogAlreadyExists => write!(f, "Glue table already exists!"),
        }
    }
}

pub trait StatusSink: Send + Sync {
    fn emit(&self, line: &StatusLine);
}

/// Prints each line to stdout and mirrors it into the log.
pub struct ConsoleSink;

impl StatusSink for ConsoleSink {
    fn emit(&self, line: &StatusLine) {
        println!("{}", line);
        info!(status = %line, "status");
    }
}

/// Keeps every emitted line in order.
#[derive(Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }
}

impl StatusSink for RecordingSink {
    fn emit(&self, line: &StatusLine) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}
