use thiserror::Error;

/// Why an object could not be fetched from storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalKind {
    NotFound,
    AccessDenied,
    Other,
}

impl std::fmt::Display for RetrievalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetrievalKind::NotFound => write!(f, "object not found"),
            RetrievalKind::AccessDenied => write!(f, "access denied"),
            RetrievalKind::Other => write!(f, "retrieval failed"),
        }
    }
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Retrieval error for {location}: {kind}: {detail}")]
    Retrieval {
        location: String,
        kind: RetrievalKind,
        detail: String,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Write error: {0}")]
    Write(String),

    #[error("Registration error: {0}")]
    Registration(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IngestError {
    /// Process exit status for a run that ended with this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            IngestError::Config(_) => 2,
            IngestError::Retrieval { .. } => 3,
            IngestError::Parse(_) => 4,
            IngestError::Registration(_) => 5,
            IngestError::Write(_) => 6,
            IngestError::Json(_) => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
