//! Ingestion Orchestrator - read, try the primary write, fall back once
//!
//! Start → Reading → Writing → Done, or Writing → Falling-back → Done.
//! A read failure or a registration failure other than "already exists"
//! ends the run with an error.

use crate::error::{IngestError, Result};
use crate::ingestion::catalog::{FallbackRegistrar, Registration};
use crate::ingestion::classify::{FallbackPolicy, WriteFailure, WriteOutcome};
use crate::ingestion::dataset::Dataset;
use crate::ingestion::source::DatasetSource;
use crate::ingestion::status::{StatusLine, StatusSink};
use crate::ingestion::writer::PrimaryWriter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Options controlling the fallback decision and post-registration checks
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngestionOptions {
    pub fallback_policy: FallbackPolicy,
    /// Read the registered table back and compare its columns.
    pub verify_catalog: bool,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            fallback_policy: FallbackPolicy::AnyFailure,
            verify_catalog: true,
        }
    }
}

/// Which destination ended up holding the data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum RunPath {
    Primary {
        rows_inserted: u64,
    },
    Fallback {
        failure: WriteFailure,
        registration: Registration,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub source: String,
    pub path: RunPath,
    pub rows: usize,
    pub columns: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status_lines: Vec<String>,
}

impl RunReport {
    pub fn used_fallback(&self) -> bool {
        matches!(self.path, RunPath::Fallback { .. })
    }
}

pub struct IngestionOrchestrator {
    source: Arc<dyn DatasetSource>,
    writer: Arc<dyn PrimaryWriter>,
    registrar: Arc<dyn FallbackRegistrar>,
    sink: Arc<dyn StatusSink>,
    options: IngestionOptions,
}

impl IngestionOrchestrator {
    pub fn new(
        source: Arc<dyn DatasetSource>,
        writer: Arc<dyn PrimaryWriter>,
        registrar: Arc<dyn FallbackRegistrar>,
        sink: Arc<dyn StatusSink>,
    ) -> Self {
        Self::with_options(source, writer, registrar, sink, IngestionOptions::default())
    }

    pub fn with_options(
        source: Arc<dyn DatasetSource>,
        writer: Arc<dyn PrimaryWriter>,
        registrar: Arc<dyn FallbackRegistrar>,
        sink: Arc<dyn StatusSink>,
        options: IngestionOptions,
    ) -> Self {
        Self {
            source,
            writer,
            registrar,
            sink,
            options,
        }
    }

    /// Execute one run.
    pub async fn run(&self) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("ingest_run", run_id = %run_id);
        self.run_inner(run_id).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid) -> Result<RunReport> {
        let started_at = Utc::now();
        let mut lines = Vec::new();

        self.emit(&mut lines, StatusLine::ReadingSource);
        let dataset = match self.source.read().await {
            Ok(dataset) => dataset,
            Err(e) => {
                error!(source = %self.source.location(), error = %e, "source read failed");
                return Err(e);
            }
        };
        self.emit(&mut lines, StatusLine::SourceRead);

        self.emit(&mut lines, StatusLine::TryingPrimary);
        let path = match self.writer.append(&dataset).await {
            WriteOutcome::Succeeded { rows } => {
                self.emit(&mut lines, StatusLine::PrimarySucceeded);
                RunPath::Primary {
                    rows_inserted: rows,
                }
            }
            WriteOutcome::Failed(failure) => {
                self.emit(&mut lines, StatusLine::PrimaryFailed(failure.detail.clone()));
                if !self.options.fallback_policy.should_fall_back(&failure) {
                    error!(class = %failure.class, "primary write failed and policy does not allow fallback");
                    return Err(IngestError::Write(failure.detail));
                }
                let registration = self.fall_back(&mut lines, &dataset).await?;
                RunPath::Fallback {
                    failure,
                    registration,
                }
            }
        };

        let report = RunReport {
            run_id,
            source: self.source.location(),
            path,
            rows: dataset.row_count(),
            columns: dataset.column_names(),
            started_at,
            finished_at: Utc::now(),
            status_lines: lines,
        };
        info!(
            fallback = report.used_fallback(),
            rows = report.rows,
            "run finished"
        );
        Ok(report)
    }

    async fn fall_back(&self, lines: &mut Vec<String>, dataset: &Dataset) -> Result<Registration> {
        self.emit(lines, StatusLine::FallingBack);

        let registration = match self.registrar.register(dataset).await {
            Ok(registration) => registration,
            Err(e) => {
                error!(target_table = %self.registrar.target(), error = %e, "fallback registration failed");
                return Err(e);
            }
        };
        match registration {
            Registration::Created => self.emit(lines, StatusLine::CatalogCreated),
            Registration::AlreadyExists => self.emit(lines, StatusLine::CatalogAlreadyExists),
        }

        if self.options.verify_catalog {
            self.verify_registration(dataset).await;
        }
        Ok(registration)
    }

    async fn verify_registration(&self, dataset: &Dataset) {
        let expected = dataset.column_names();
        match self.registrar.table_columns().await {
            Ok(Some(columns)) if columns == expected => {
                debug!(target_table = %self.registrar.target(), "catalog columns verified");
            }
            Ok(Some(columns)) => {
                warn!(
                    target_table = %self.registrar.target(),
                    expected = ?expected,
                    actual = ?columns,
                    "catalog table columns differ from source"
                );
            }
            Ok(None) => {
                warn!(target_table = %self.registrar.target(), "catalog table not found after registration");
            }
            Err(e) => {
                warn!(target_table = %self.registrar.target(), error = %e, "could not verify catalog table");
            }
        }
    }

    fn emit(&self, lines: &mut Vec<String>, line: StatusLine) {
        self.sink.emit(&line);
        lines.push(line.to_string());
    }
}
