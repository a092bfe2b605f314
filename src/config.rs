//! Run configuration sourced from the process environment
//!
//! Every value is read once at startup into [`IngestConfig`]. Missing or blank
//! required variables are all reported together before any network call.

use crate::error::{IngestError, Result};
use serde::Serialize;
use std::fmt;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_PORT: u16 = 5432;

/// Where the source CSV lives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SourceConfig {
    pub bucket: String,
    pub key: String,
    pub region: String,
}

impl SourceConfig {
    pub fn uri(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}

/// Target for the primary write.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(skip)]
    pub password: String,
    pub database: String,
    pub table: String,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("table", &self.table)
            .finish()
    }
}

/// Target for the fallback registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CatalogConfig {
    pub database: String,
    pub table: String,
    pub location: String,
    pub region: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IngestConfig {
    pub source: SourceConfig,
    pub database: DatabaseConfig,
    pub catalog: CatalogConfig,
}

impl IngestConfig {
    /// Build from the process environment (after any `.env` file is loaded).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        // Blank means missing. `verbatim` values keep surrounding whitespace.
        let mut required = |name: &'static str, verbatim: bool| -> String {
            match lookup(name) {
                Some(v) if !v.trim().is_empty() => {
                    if verbatim {
                        v
                    } else {
                        v.trim().to_string()
                    }
                }
                _ => {
                    missing.push(name);
                    String::new()
                }
            }
        };

        let bucket = required("S3_BUCKET", false);
        let key = required("S3_KEY", true);
        let host = required("RDS_HOST", false);
        let user = required("RDS_USER", false);
        let password = required("RDS_PASSWORD", true);
        let database = required("RDS_DB_NAME", false);
        let table = required("RDS_TABLE", false);
        let glue_database = required("GLUE_DATABASE", false);
        let glue_table = required("GLUE_TABLE", false);
        let location = required("GLUE_S3_LOCATION", false);

        if !missing.is_empty() {
            return Err(IngestError::Config(format!(
                "missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        let region = optional(&lookup, "AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string());
        let port = match optional(&lookup, "RDS_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| {
                IngestError::Config(format!("RDS_PORT must be a port number, got '{}'", raw))
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            source: SourceConfig {
                bucket,
                key,
                region: region.clone(),
            },
            database: DatabaseConfig {
                host,
                port,
                user,
                password,
                database,
                table,
            },
            catalog: CatalogConfig {
                database: glue_database,
                table: glue_table,
                location,
                region,
            },
        })
    }
}

fn optional<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
