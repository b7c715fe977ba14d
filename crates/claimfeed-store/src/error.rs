//! Error types for the store module.

use std::path::PathBuf;

use claimfeed_core::CoreError;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Claim validation, signing, or key material error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// I/O error on a specific path.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON file could not be parsed or written.
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The feed's creation lock could not be taken.
    #[error("could not lock {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| StoreError::Io { path, source }
    }

    pub(crate) fn json(path: impl Into<PathBuf>) -> impl FnOnce(serde_json::Error) -> Self {
        let path = path.into();
        move |source| StoreError::Json { path, source }
    }

    /// True when the error is a claim validation failure.
    pub fn is_invalid_claims(&self) -> bool {
        matches!(self, StoreError::Core(CoreError::InvalidClaims(_)))
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
