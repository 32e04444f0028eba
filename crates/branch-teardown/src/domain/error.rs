//! Error taxonomy for tear-down resolution and dispatch.

use thiserror::Error;

/// Errors produced while handling a deletion or managing configuration.
///
/// A missing tear-down job is not an error; see `DispatchOutcome::NotFound`.
#[derive(Debug, Error)]
pub enum TearDownError {
    #[error("source-control metadata unavailable for {job}: {detail}")]
    MetadataUnavailable { job: String, detail: String },

    #[error("failed to enqueue build of {job}: {reason}")]
    EnqueueFailure { job: String, reason: String },

    #[error("registry lookup failed for {job}: {reason}")]
    Registry { job: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("git error: {0}")]
    Git(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for TearDownError {
    fn from(err: reqwest::Error) -> Self {
        TearDownError::Http(err.to_string())
    }
}

/// Result type for tear-down operations.
pub type Result<T> = std::result::Result<T, TearDownError>;
