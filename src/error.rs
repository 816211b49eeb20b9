use std::io;

use thiserror::Error;

/// Failures raised by the persisted stores.
///
/// Read-side problems never show up here: a missing or corrupt entry resolves to
/// the caller's fallback. Write-side problems are reported but never roll back
/// the in-memory state.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid storage key '{0}'")]
    InvalidKey(String),
    #[error("failed to serialize '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to persist '{key}': {source}")]
    Write {
        key: String,
        #[source]
        source: io::Error,
    },
    #[error("storage quota exceeded writing '{key}': {needed} bytes needed, {available} available")]
    QuotaExceeded {
        key: String,
        needed: usize,
        available: usize,
    },
    #[error("invalid settings value: {0}")]
    InvalidSettings(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl StoreError {
    /// True for failures where the value was accepted in memory but not made durable.
    pub fn is_write_failure(&self) -> bool {
        matches!(self, Self::Write { .. } | Self::QuotaExceeded { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
