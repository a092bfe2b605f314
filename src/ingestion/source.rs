//! Source Reader - fetches one CSV object from object storage
//!
//! [`ObjectStoreSource`] reads through any `object_store::ObjectStore`; the
//! binary wires it to S3 with [`ObjectStoreSource::s3`], tests use the
//! in-memory store.

use crate::config::SourceConfig;
use crate::error::{IngestError, Result, RetrievalKind};
use crate::ingestion::dataset::Dataset;
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path;
use object_store::ObjectStore;
use std::sync::Arc;
use tracing::{debug, info};

/// Anything that can produce the run's dataset.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    async fn read(&self) -> Result<Dataset>;

    /// Human-readable location, e.g. `s3://bucket/key`.
    fn location(&self) -> String;
}

pub struct ObjectStoreSource {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    key: String,
}

impl ObjectStoreSource {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// S3-backed source. Credentials come from the standard AWS environment.
    pub fn s3(config: &SourceConfig) -> Result<Self> {
        let store = AmazonS3Builder::from_env()
            .with_bucket_name(&config.bucket)
            .with_region(&config.region)
            .build()
            .map_err(|e| IngestError::Retrieval {
                location: config.uri(),
                kind: RetrievalKind::Other,
                detail: e.to_string(),
            })?;
        Ok(Self::new(Arc::new(store), &config.bucket, &config.key))
    }

    async fn fetch(&self) -> Result<Bytes> {
        // S3 keys are taken verbatim, never percent-encoded.
        let path = Path::parse(&self.key).map_err(|e| IngestError::Retrieval {
            location: self.location(),
            kind: RetrievalKind::Other,
            detail: format!("invalid object key: {}", e),
        })?;
        let result = self
            .store
            .get(&path)
            .await
            .map_err(|e| self.retrieval_error(e))?;
        result.bytes().await.map_err(|e| self.retrieval_error(e))
    }

    fn retrieval_error(&self, err: object_store::Error) -> IngestError {
        let kind = match &err {
            object_store::Error::NotFound { .. } => RetrievalKind::NotFound,
            object_store::Error::PermissionDenied { .. }
            | object_store::Error::Unauthenticated { .. } => RetrievalKind::AccessDenied,
            _ => RetrievalKind::Other,
        };
        IngestError::Retrieval {
            location: self.location(),
            kind,
            detail: err.to_string(),
        }
    }
}

#[async_trait]
impl DatasetSource for ObjectStoreSource {
    async fn read(&self) -> Result<Dataset> {
        let bytes = self.fetch().await?;
        debug!(location = %self.location(), bytes = bytes.len(), "fetched object");

        let dataset = Dataset::from_csv(&bytes)?.with_origin(self.location());
        info!(
            rows = dataset.row_count(),
            columns = dataset.column_count(),
            "parsed CSV object"
        );
        Ok(dataset)
    }

    fn location(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;
    use object_store::PutPayload;

    async fn store_with(key: &str, body: &'static [u8]) -> Arc<InMemory> {
        let store = Arc::new(InMemory::new());
        store
            .put(&Path::parse(key).unwrap(), PutPayload::from_static(body))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_read_parses_object() {
        let store = store_with("in/users.csv", b"id,name\n1,Suraj\n2,Rahul").await;
        let source = ObjectStoreSource::new(store, "landing", "in/users.csv");

        let ds = source.read().await.unwrap();
        assert_eq!(ds.column_names(), vec!["id", "name"]);
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.origin(), Some("s3://landing/in/users.csv"));
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let store = Arc::new(InMemory::new());
        let source = ObjectStoreSource::new(store, "landing", "nope.csv");

        match source.read().await {
            Err(IngestError::Retrieval { kind, location, .. }) => {
                assert_eq!(kind, RetrievalKind::NotFound);
                assert_eq!(location, "s3://landing/nope.csv");
            }
            other => panic!("expected retrieval error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_keys_with_reserved_characters_are_read_verbatim() {
        let keys = [
            "in/users~v2.csv",
            "in/users[2024].csv",
            "in/a%20b.csv",
            "in/{x}^y|z#w*q?.csv",
        ];
        for key in keys {
            let store = Arc::new(InMemory::new());
            store
                .put(&Path::parse(key).unwrap(), PutPayload::from_static(b"id\n7\n"))
                .await
                .unwrap();
            let source = ObjectStoreSource::new(store, "landing", key);

            let ds = source.read().await.unwrap_or_else(|e| panic!("{}: {}", key, e));
            assert_eq!(ds.row(0).unwrap(), vec![Some("7")], "{}", key);
            assert_eq!(ds.origin(), Some(format!("s3://landing/{}", key).as_str()));
        }
    }

    #[tokio::test]
    async fn test_key_with_empty_segment_is_retrieval_error() {
        let store = Arc::new(InMemory::new());
        let source = ObjectStoreSource::new(store, "landing", "in//users.csv");
        assert!(matches!(
            source.read().await,
            Err(IngestError::Retrieval {
                kind: RetrievalKind::Other,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_malformed_object_is_parse_error() {
        let store = store_with("bad.csv", b"a,b\n1,2,3\n").await;
        let source = ObjectStoreSource::new(store, "landing", "bad.csv");
        assert!(matches!(source.read().await, Err(IngestError::Parse(_))));
    }
}
