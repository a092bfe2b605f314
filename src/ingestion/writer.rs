//! Primary Writer - appends a dataset to a PostgreSQL table
//!
//! Every error inside the writer is converted into [`WriteOutcome::Failed`];
//! nothing propagates past [`PrimaryWriter::append`].

use crate::config::DatabaseConfig;
use crate::db::{close_quietly, connect_options, connect_with, qualified_table, quote_ident};
use crate::ingestion::classify::{WriteFailure, WriteOutcome};
use crate::ingestion::dataset::Dataset;
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection, Postgres};
use sqlx::{Connection, QueryBuilder};
use tracing::{debug, info, warn};

/// PostgreSQL caps a single statement at this many bind parameters.
pub const MAX_BIND_PARAMS: usize = 65_535;

#[async_trait]
pub trait PrimaryWriter: Send + Sync {
    /// Append every row of `dataset`. Never fails; failures are an outcome.
    async fn append(&self, dataset: &Dataset) -> WriteOutcome;

    /// Target description for logs.
    fn target(&self) -> String;
}

pub struct PostgresWriter {
    options: PgConnectOptions,
    table: String,
    max_rows_per_statement: usize,
}

impl PostgresWriter {
    pub fn new(config: DatabaseConfig) -> Self {
        Self::from_options(connect_options(&config), config.table)
    }

    /// Writer over explicit connection options, e.g. parsed from a URL.
    pub fn from_options(options: PgConnectOptions, table: impl Into<String>) -> Self {
        Self {
            options,
            table: table.into(),
            max_rows_per_statement: 1000,
        }
    }

    pub fn with_max_rows_per_statement(mut self, rows: usize) -> Self {
        self.max_rows_per_statement = rows.max(1);
        self
    }

    async fn append_rows(&self, conn: &mut PgConnection, dataset: &Dataset) -> Result<u64, sqlx::Error> {
        let names = dataset.column_names();
        let mut tx = conn.begin().await?;

        sqlx::query(&create_table_sql(&self.table, &names))
            .execute(&mut *tx)
            .await?;

        let rows: Vec<Vec<Option<&str>>> = dataset.rows().collect();
        let per_statement = rows_per_statement(names.len(), self.max_rows_per_statement);
        let prefix = insert_prefix(&self.table, &names);
        let mut inserted = 0u64;

        for chunk in rows.chunks(per_statement) {
            let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(prefix.as_str());
            qb.push_values(chunk, |mut b, row| {
                for cell in row.iter().copied() {
                    b.push_bind(cell.map(str::to_string));
                }
            });
            let result = qb.build().execute(&mut *tx).await?;
            inserted += result.rows_affected();
            debug!(batch_rows = chunk.len(), inserted, "inserted batch");
        }

        tx.commit().await?;
        Ok(inserted)
    }
}

#[async_trait]
impl PrimaryWriter for PostgresWriter {
    async fn append(&self, dataset: &Dataset) -> WriteOutcome {
        let mut conn = match connect_with(&self.options).await {
            Ok(conn) => conn,
            Err(e) => {
                let failure = WriteFailure::from_sqlx(&e);
                warn!(class = %failure.class, error = %failure.detail, "could not connect to database");
                return WriteOutcome::Failed(failure);
            }
        };

        let result = self.append_rows(&mut conn, dataset).await;
        close_quietly(conn).await;

        match result {
            Ok(rows) => {
                info!(rows, table = %self.table, "appended rows");
                WriteOutcome::Succeeded { rows }
            }
            Err(e) => {
                let failure = WriteFailure::from_sqlx(&e);
                warn!(class = %failure.class, error = %failure.detail, "append failed, transaction rolled back");
                WriteOutcome::Failed(failure)
            }
        }
    }

    fn target(&self) -> String {
        format!(
            "postgres://{}:{}/{}?table={}",
            self.options.get_host(),
            self.options.get_port(),
            self.options.get_database().unwrap_or_default(),
            self.table
        )
    }
}

/// Create the target with one TEXT column per dataset column, if missing.
pub fn create_table_sql(table: &str, columns: &[String]) -> String {
    let cols = columns
        .iter()
        .map(|c| format!("{} TEXT", quote_ident(c)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE IF NOT EXISTS {} ({})", qualified_table(table), cols)
}

pub fn insert_prefix(table: &str, columns: &[String]) -> String {
    let cols = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT INTO {} ({}) ", qualified_table(table), cols)
}

/// Rows that fit in one statement without exceeding the bind limit.
pub fn rows_per_statement(column_count: usize, max_rows: usize) -> usize {
    let by_params = MAX_BIND_PARAMS / column_count.max(1);
    by_params.min(max_rows).max(1)
}
