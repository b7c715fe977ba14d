//! Error types for feed generation.

use thiserror::Error;

/// Errors that can occur while generating or publishing a feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Claim, token, or key handling failed.
    #[error("core error: {0}")]
    Core(#[from] claimfeed_core::CoreError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] claimfeed_store::StoreError),

    /// Ledger error.
    #[error("ledger error: {0}")]
    Ledger(#[from] claimfeed_ledger::LedgerError),

    /// The package registry could not be queried.
    #[error("registry fetch of {url} failed: {reason}")]
    RegistryFetch { url: String, reason: String },

    /// Configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl FeedError {
    pub(crate) fn registry(url: impl ToString, reason: impl ToString) -> Self {
        FeedError::RegistryFetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for feed operations.
pub type Result<T> = std::result::Result<T, FeedError>;
