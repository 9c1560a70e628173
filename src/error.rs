use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Raised before any store query is issued.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("select an academic year before comparing programs")]
    MissingAcademicYear,
    #[error("select at least two programs to compare (got {selected})")]
    TooFewPrograms { selected: usize },
    #[error("unknown program: {0}")]
    UnknownProgram(Uuid),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store query failed: {0}")]
    Query(#[from] sqlx::Error),
    #[error("store call `{operation}` timed out after {}s", .after.as_secs())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
    #[error("could not decode {field}: {message}")]
    Decode { field: &'static str, message: String },
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Query(err) => matches!(
                err,
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
            ),
            Self::Decode { .. } => false,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
