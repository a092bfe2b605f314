//! Tabular Dataset - column-oriented text table parsed from CSV

use crate::error::{IngestError, Result};
use csv::ReaderBuilder;
use std::collections::HashSet;

/// A named column of text cells. Empty CSV cells are `None`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<String>>,
}

/// In-memory table with unique column names and a uniform row count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dataset {
    columns: Vec<Column>,
    row_count: usize,
    origin: Option<String>,
}

impl Dataset {
    /// Build a dataset from columns, enforcing the uniqueness and row-count invariants.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(IngestError::Parse(format!(
                    "duplicate column name '{}'",
                    column.name
                )));
            }
        }

        let row_count = columns.first().map(|c| c.values.len()).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.values.len() != row_count) {
            return Err(IngestError::Parse(format!(
                "column '{}' has {} rows, expected {}",
                bad.name,
                bad.values.len(),
                row_count
            )));
        }

        Ok(Self {
            columns,
            row_count,
            origin: None,
        })
    }

    /// Parse CSV bytes with a header row. Every record must have exactly as
    /// many fields as the header.
    pub fn from_csv(bytes: &[u8]) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(bytes);

        let headers = rdr
            .headers()
            .map_err(|e| IngestError::Parse(format!("failed to read CSV header: {}", e)))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect::<Vec<_>>();

        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(IngestError::Parse("CSV has no header row".to_string()));
        }
        if let Some(idx) = headers.iter().position(|h| h.is_empty()) {
            return Err(IngestError::Parse(format!(
                "CSV header has an empty column name at position {}",
                idx + 1
            )));
        }

        let mut columns: Vec<Column> = headers
            .into_iter()
            .map(|name| Column {
                name,
                values: Vec::new(),
            })
            .collect();

        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| {
                IngestError::Parse(format!("failed to read CSV record {}: {}", line + 1, e))
            })?;
            for (column, cell) in columns.iter_mut().zip(record.iter()) {
                column.values.push(if cell.is_empty() {
                    None
                } else {
                    Some(cell.to_string())
                });
            }
        }

        Self::new(columns)
    }

    /// Record where the bytes came from, for logging.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Cells of row `idx`, in column order.
    pub fn row(&self, idx: usize) -> Option<Vec<Option<&str>>> {
        if idx >= self.row_count {
            return None;
        }
        Some(
            self.columns
                .iter()
                .map(|c| c.values[idx].as_deref())
                .collect(),
        )
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<Option<&str>>> + '_ {
        (0..self.row_count).filter_map(move |idx| self.row(idx))
    }
}
