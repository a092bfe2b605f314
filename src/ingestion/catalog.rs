//! Fallback Registrar - registers the source location as an external table
//! in the AWS Glue Data Catalog
//!
//! Only the dataset's column names are used. A table that already exists is
//! reported as [`Registration::AlreadyExists`], not as an error.

use crate::config::CatalogConfig;
use crate::error::{IngestError, Result};
use crate::ingestion::dataset::Dataset;
use async_trait::async_trait;
use aws_sdk_glue::error::DisplayErrorContext;
use aws_sdk_glue::types::{Column, SerDeInfo, StorageDescriptor, TableInput};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

pub const TABLE_TYPE: &str = "EXTERNAL_TABLE";
pub const COLUMN_TYPE: &str = "string";
pub const INPUT_FORMAT: &str = "org.apache.hadoop.mapred.TextInputFormat";
pub const OUTPUT_FORMAT: &str = "org.apache.hadoop.hive.ql.io.HiveIgnoreKeyTextOutputFormat";
pub const SERIALIZATION_LIBRARY: &str = "org.openx.data.jsonserde.JsonSerDe";

/// How a registration attempt ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Registration {
    Created,
    AlreadyExists,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogColumn {
    pub name: String,
    pub data_type: String,
}

/// Catalog-independent shape of the external table we register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalTableDefinition {
    pub name: String,
    pub table_type: String,
    pub columns: Vec<CatalogColumn>,
    pub location: String,
    pub input_format: String,
    pub output_format: String,
    pub serialization_library: String,
    pub serde_parameters: BTreeMap<String, String>,
}

impl ExternalTableDefinition {
    pub fn new(name: &str, columns: &[String], location: &str) -> Self {
        Self {
            name: name.to_string(),
            table_type: TABLE_TYPE.to_string(),
            columns: columns
                .iter()
                .map(|c| CatalogColumn {
                    name: c.clone(),
                    data_type: COLUMN_TYPE.to_string(),
                })
                .collect(),
            location: location.to_string(),
            input_format: INPUT_FORMAT.to_string(),
            output_format: OUTPUT_FORMAT.to_string(),
            serialization_library: SERIALIZATION_LIBRARY.to_string(),
            serde_parameters: BTreeMap::from([(
                "serialization.format".to_string(),
                "1".to_string(),
            )]),
        }
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Glue `TableInput` for `CreateTable`.
    pub fn to_table_input(&self) -> Result<TableInput> {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                Column::builder()
                    .name(&c.name)
                    .r#type(&c.data_type)
                    .build()
                    .map_err(|e| IngestError::Registration(format!("invalid column '{}': {}", c.name, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut serde_info = SerDeInfo::builder().serialization_library(&self.serialization_library);
        for (key, value) in &self.serde_parameters {
            serde_info = serde_info.parameters(key, value);
        }

        let storage = StorageDescriptor::builder()
            .set_columns(Some(columns))
            .location(&self.location)
            .input_format(&self.input_format)
            .output_format(&self.output_format)
            .serde_info(serde_info.build())
            .build();

        TableInput::builder()
            .name(&self.name)
            .table_type(&self.table_type)
            .storage_descriptor(storage)
            .build()
            .map_err(|e| IngestError::Registration(format!("invalid table input: {}", e)))
    }
}

#[async_trait]
pub trait FallbackRegistrar: Send + Sync {
    /// Register an external table with the dataset's columns.
    async fn register(&self, dataset: &Dataset) -> Result<Registration>;

    /// Column names of the registered table, `None` if it does not exist.
    async fn table_columns(&self) -> Result<Option<Vec<String>>>;

    fn target(&self) -> String;
}

pub struct GlueRegistrar {
    client: aws_sdk_glue::Client,
    config: CatalogConfig,
}

impl GlueRegistrar {
    pub fn new(client: aws_sdk_glue::Client, config: CatalogConfig) -> Self {
        Self { client, config }
    }

    /// Client from the default AWS credential chain in the configured region.
    pub async fn from_config(config: CatalogConfig) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .load()
            .await;
        Self::new(aws_sdk_glue::Client::new(&sdk_config), config)
    }

    pub fn definition_for(&self, dataset: &Dataset) -> ExternalTableDefinition {
        ExternalTableDefinition::new(&self.config.table, &dataset.column_names(), &self.config.location)
    }
}

#[async_trait]
impl FallbackRegistrar for GlueRegistrar {
    async fn register(&self, dataset: &Dataset) -> Result<Registration> {
        let definition = self.definition_for(dataset);
        debug!(definition = ?definition, "registering external table");

        let result = self
            .client
            .create_table()
            .database_name(&self.config.database)
            .table_input(definition.to_table_input()?)
            .send()
            .await;

        match result {
            Ok(_) => {
                info!(database = %self.config.database, table = %self.config.table, "created external table");
                Ok(Registration::Created)
            }
            Err(err) => {
                if err
                    .as_service_error()
                    .map(|e| e.is_already_exists_exception())
                    .unwrap_or(false)
                {
                    info!(database = %self.config.database, table = %self.config.table, "external table already registered");
                    Ok(Registration::AlreadyExists)
                } else {
                    Err(IngestError::Registration(format!(
                        "CreateTable {}.{} failed: {}",
                        self.config.database,
                        self.config.table,
                        DisplayErrorContext(&err)
                    )))
                }
            }
        }
    }

    async fn table_columns(&self) -> Result<Option<Vec<String>>> {
        let result = self
            .client
            .get_table()
            .database_name(&self.config.database)
            .name(&self.config.table)
            .send()
            .await;

        match result {
            Ok(output) => Ok(output.table().map(|table| {
                table
                    .storage_descriptor()
                    .map(|sd| sd.columns().iter().map(|c| c.name().to_string()).collect())
                    .unwrap_or_default()
            })),
            Err(err) => {
                if err
                    .as_service_error()
                    .map(|e| e.is_entity_not_found_exception())
                    .unwrap_or(false)
                {
                    Ok(None)
                } else {
                    Err(IngestError::Registration(format!(
                        "GetTable {}.{} failed: {}",
                        self.config.database,
                        self.config.table,
                        DisplayErrorContext(&err)
                    )))
                }
            }
        }
    }

    fn target(&self) -> String {
        format!("glue://{}/{}", self.config.database, self.config.table)
    }
}
