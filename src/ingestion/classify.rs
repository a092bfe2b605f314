//! Write outcome classification and the fallback decision
//!
//! A failed primary write is never an error to the caller. It is a
//! [`WriteOutcome::Failed`] carrying a [`FailureClass`], and the
//! [`FallbackPolicy`] decides what that means for the run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse failure taxonomy for primary-write errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureClass {
    /// Network, TLS, timeouts, dropped connections.
    Transient,
    /// Authentication, SQL errors, bad configuration, encoding.
    Permanent,
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureClass::Transient => write!(f, "transient"),
            FailureClass::Permanent => write!(f, "permanent"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteFailure {
    pub class: FailureClass,
    pub detail: String,
}

impl WriteFailure {
    pub fn transient(detail: impl Into<String>) -> Self {
        Self {
            class: FailureClass::Transient,
            detail: detail.into(),
        }
    }

    pub fn permanent(detail: impl Into<String>) -> Self {
        Self {
            class: FailureClass::Permanent,
            detail: detail.into(),
        }
    }

    /// Classify a driver error.
    pub fn from_sqlx(err: &sqlx::Error) -> Self {
        Self {
            class: classify_sqlx(err),
            detail: err.to_string(),
        }
    }
}

/// Result of a primary write attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteOutcome {
    Succeeded { rows: u64 },
    Failed(WriteFailure),
}

impl WriteOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, WriteOutcome::Succeeded { .. })
    }
}

/// What a failed primary write leads to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FallbackPolicy {
    /// Every failure goes to the catalog fallback, whatever its class.
    #[default]
    AnyFailure,
    /// Only permanent failures fall back; transient ones abort the run.
    PermanentOnly,
}

impl FallbackPolicy {
    pub fn should_fall_back(&self, failure: &WriteFailure) -> bool {
        match self {
            FallbackPolicy::AnyFailure => true,
            FallbackPolicy::PermanentOnly => failure.class == FailureClass::Permanent,
        }
    }
}

pub fn classify_sqlx(err: &sqlx::Error) -> FailureClass {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => FailureClass::Transient,
        sqlx::Error::Database(db) => match db.code().as_deref() {
            // 08xxx connection exception, 53xxx insufficient resources,
            // 57P0x operator intervention (shutdown, cannot connect now)
            Some(code)
                if code.starts_with("08")
                    || code.starts_with("53")
                    || code.starts_with("57P0") =>
            {
                FailureClass::Transient
            }
            _ => FailureClass::Permanent,
        },
        _ => FailureClass::Permanent,
    }
}
