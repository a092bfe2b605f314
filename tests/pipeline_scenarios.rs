use async_trait::async_trait;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use s3_rds_glue_ingest::ingestion::{
    Dataset, FallbackPolicy, FallbackRegistrar, IngestionOptions, IngestionOrchestrator,
    ObjectStoreSource, PrimaryWriter, RecordingSink, Registration, RunPath, WriteFailure,
    WriteOutcome,
};
use s3_rds_glue_ingest::{IngestError, Result};
use std::sync::{Arc, Mutex};

const USERS_CSV: &[u8] = b"id,name\n1,Suraj\n2,Rahul";

/// Writer that returns a canned outcome and records the shape it was given.
struct FakeWriter {
    outcome: WriteOutcome,
    calls: Mutex<Vec<(usize, Vec<String>)>>,
}

impl FakeWriter {
    fn succeeding() -> Arc<Self> {
        Arc::new(Self {
            outcome: WriteOutcome::Succeeded { rows: 0 },
            calls: Mutex::new(Vec::new()),
        })
    }

    fn failing(failure: WriteFailure) -> Arc<Self> {
        Arc::new(Self {
            outcome: WriteOutcome::Failed(failure),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(usize, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PrimaryWriter for FakeWriter {
    async fn append(&self, dataset: &Dataset) -> WriteOutcome {
        self.calls
            .lock()
            .unwrap()
            .push((dataset.row_count(), dataset.column_names()));
        match &self.outcome {
            WriteOutcome::Succeeded { .. } => WriteOutcome::Succeeded {
                rows: dataset.row_count() as u64,
            },
            failed => failed.clone(),
        }
    }

    fn target(&self) -> String {
        "fake://rds/users".to_string()
    }
}

/// In-process catalog: one table slot, optional forced error.
struct FakeCatalog {
    table: Mutex<Option<Vec<String>>>,
    error: Option<String>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeCatalog {
    fn empty() -> Arc<Self> {
        Arc::new(Self {
            table: Mutex::new(None),
            error: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn with_existing(columns: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            table: Mutex::new(Some(columns.iter().map(|c| c.to_string()).collect())),
            error: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn broken(message: &str) -> Arc<Self> {
        Arc::new(Self {
            table: Mutex::new(None),
            error: Some(message.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    fn table(&self) -> Option<Vec<String>> {
        self.table.lock().unwrap().clone()
    }
}

#[async_trait]
impl FallbackRegistrar for FakeCatalog {
    async fn register(&self, dataset: &Dataset) -> Result<Registration> {
        let columns = dataset.column_names();
        self.calls.lock().unwrap().push(columns.clone());

        if let Some(message) = &self.error {
            return Err(IngestError::Registration(message.clone()));
        }
        let mut table = self.table.lock().unwrap();
        if table.is_some() {
            return Ok(Registration::AlreadyExists);
        }
        *table = Some(columns);
        Ok(Registration::Created)
    }

    async fn table_columns(&self) -> Result<Option<Vec<String>>> {
        Ok(self.table())
    }

    fn target(&self) -> String {
        "fake://glue/raw/users_ext".to_string()
    }
}

async fn source_with(body: &'static [u8]) -> Arc<ObjectStoreSource> {
    let store = Arc::new(InMemory::new());
    store
        .put(&Path::from("incoming/users.csv"), PutPayload::from_static(body))
        .await
        .unwrap();
    Arc::new(ObjectStoreSource::new(store, "landing", "incoming/users.csv"))
}

fn orchestrator(
    source: Arc<ObjectStoreSource>,
    writer: Arc<FakeWriter>,
    catalog: Arc<FakeCatalog>,
    sink: Arc<RecordingSink>,
) -> IngestionOrchestrator {
    IngestionOrchestrator::new(source, writer, catalog, sink)
}

#[tokio::test]
async fn test_primary_success_skips_fallback() {
    let writer = FakeWriter::succeeding();
    let catalog = FakeCatalog::empty();
    let sink = Arc::new(RecordingSink::new());

    let report = orchestrator(source_with(USERS_CSV).await, writer.clone(), catalog.clone(), sink.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(
        sink.lines(),
        vec![
            "Reading file from S3...",
            "S3 file read successfully",
            "Trying to push data to RDS...",
            "Data successfully inserted into RDS!",
        ]
    );
    assert_eq!(report.status_lines, sink.lines());
    assert_eq!(report.path, RunPath::Primary { rows_inserted: 2 });
    assert!(!report.used_fallback());
    assert_eq!(writer.calls(), vec![(2, vec!["id".to_string(), "name".to_string()])]);
    assert!(catalog.calls().is_empty());
}

#[tokio::test]
async fn test_primary_failure_registers_catalog_table() {
    let writer = FakeWriter::failing(WriteFailure::transient("connection refused"));
    let catalog = FakeCatalog::empty();
    let sink = Arc::new(RecordingSink::new());

    let report = orchestrator(source_with(USERS_CSV).await, writer, catalog.clone(), sink.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(
        sink.lines(),
        vec![
            "Reading file from S3...",
            "S3 file read successfully",
            "Trying to push data to RDS...",
            "RDS upload failed: connection refused",
            "Falling back to AWS Glue...",
            "Glue table created successfully!",
        ]
    );
    assert_eq!(catalog.calls(), vec![vec!["id".to_string(), "name".to_string()]]);
    assert_eq!(catalog.table(), Some(vec!["id".to_string(), "name".to_string()]));
    match report.path {
        RunPath::Fallback { failure, registration } => {
            assert_eq!(registration, Registration::Created);
            assert_eq!(failure.detail, "connection refused");
        }
        other => panic!("expected fallback path, got {:?}", other),
    }
}

#[tokio::test]
async fn test_existing_catalog_table_is_success() {
    let writer = FakeWriter::failing(WriteFailure::permanent("relation does not exist"));
    let catalog = FakeCatalog::with_existing(&["id", "name"]);
    let sink = Arc::new(RecordingSink::new());

    let report = orchestrator(source_with(USERS_CSV).await, writer, catalog.clone(), sink.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(sink.lines().last().map(String::as_str), Some("Glue table already exists!"));
    assert_eq!(catalog.calls().len(), 1);
    assert!(matches!(
        report.path,
        RunPath::Fallback {
            registration: Registration::AlreadyExists,
            ..
        }
    ));
}

#[tokio::test]
async fn test_header_only_csv_appends_nothing_and_succeeds() {
    let writer = FakeWriter::succeeding();
    let catalog = FakeCatalog::empty();
    let sink = Arc::new(RecordingSink::new());

    let report = orchestrator(source_with(b"id,name\n").await, writer.clone(), catalog.clone(), sink)
        .run()
        .await
        .unwrap();

    assert_eq!(report.rows, 0);
    assert_eq!(report.path, RunPath::Primary { rows_inserted: 0 });
    assert_eq!(writer.calls(), vec![(0, vec!["id".to_string(), "name".to_string()])]);
    assert!(catalog.calls().is_empty());
}

#[tokio::test]
async fn test_registration_error_is_fatal() {
    let writer = FakeWriter::failing(WriteFailure::transient("timed out"));
    let catalog = FakeCatalog::broken("AccessDeniedException: not authorized");
    let sink = Arc::new(RecordingSink::new());

    let err = orchestrator(source_with(USERS_CSV).await, writer, catalog.clone(), sink.clone())
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Registration(_)));
    assert_ne!(err.exit_code(), 0);
    assert_eq!(catalog.calls().len(), 1);
    assert_eq!(sink.lines().last().map(String::as_str), Some("Falling back to AWS Glue..."));
}

#[tokio::test]
async fn test_missing_object_aborts_before_write() {
    let store = Arc::new(InMemory::new());
    let source = Arc::new(ObjectStoreSource::new(store, "landing", "missing.csv"));
    let writer = FakeWriter::succeeding();
    let catalog = FakeCatalog::empty();
    let sink = Arc::new(RecordingSink::new());

    let err = orchestrator(source, writer.clone(), catalog.clone(), sink.clone())
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Retrieval { .. }));
    assert!(writer.calls().is_empty());
    assert!(catalog.calls().is_empty());
    assert_eq!(sink.lines(), vec!["Reading file from S3..."]);
}

#[tokio::test]
async fn test_malformed_csv_aborts_without_fallback() {
    let writer = FakeWriter::failing(WriteFailure::permanent("unused"));
    let catalog = FakeCatalog::empty();
    let sink = Arc::new(RecordingSink::new());

    let err = orchestrator(source_with(b"id,name\n1,Suraj,extra\n").await, writer.clone(), catalog.clone(), sink)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Parse(_)));
    assert!(writer.calls().is_empty());
    assert!(catalog.calls().is_empty());
}

#[tokio::test]
async fn test_permanent_only_policy_aborts_on_transient_failure() {
    let writer = FakeWriter::failing(WriteFailure::transient("connection reset"));
    let catalog = FakeCatalog::empty();
    let sink = Arc::new(RecordingSink::new());
    let options = IngestionOptions {
        fallback_policy: FallbackPolicy::PermanentOnly,
        verify_catalog: false,
    };

    let err = IngestionOrchestrator::with_options(
        source_with(USERS_CSV).await,
        writer,
        catalog.clone(),
        sink,
        options,
    )
    .run()
    .await
    .unwrap_err();

    assert!(matches!(err, IngestError::Write(_)));
    assert!(catalog.calls().is_empty());
}

#[tokio::test]
async fn test_dataset_shape_reaches_writer() {
    let cases: [(&'static [u8], usize, &[&str]); 3] = [
        (b"a\n1\n2\n3\n", 3, &["a"]),
        (b"c,b,a\nx,y,z\n", 1, &["c", "b", "a"]),
        (b"k,v,w,u\n1,2,3,4\n5,6,7,8\n", 2, &["k", "v", "w", "u"]),
    ];

    for (body, rows, columns) in cases {
        let writer = FakeWriter::succeeding();
        let report = orchestrator(
            source_with(body).await,
            writer.clone(),
            FakeCatalog::empty(),
            Arc::new(RecordingSink::new()),
        )
        .run()
        .await
        .unwrap();

        let expected: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        assert_eq!(report.rows, rows);
        assert_eq!(report.columns, expected);
        assert_eq!(writer.calls(), vec![(rows, expected)]);
    }
}
