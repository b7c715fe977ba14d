//! Error types for the ledger module.

use std::time::Duration;

use thiserror::Error;

use crate::client::TransactionId;

/// Errors that can occur while talking to the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Feed directory could not be read or a receipt could not be written.
    #[error("store error: {0}")]
    Store(#[from] claimfeed_store::StoreError),

    /// Token, key set, or record handling failed.
    #[error("core error: {0}")]
    Core(#[from] claimfeed_core::CoreError),

    /// Ledger endpoint configuration is unusable.
    #[error("invalid ledger endpoint: {0}")]
    InvalidEndpoint(String),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(String),

    /// A governance proposal was not accepted.
    #[error("governance proposal {proposal} rejected: {reason}")]
    GovernanceRejected { proposal: String, reason: String },

    /// Issuer registration returned an unexpected status.
    #[error("issuer registration rejected with status {status}")]
    RegistrationRejected { status: u16 },

    /// The ledger refused a submitted token.
    #[error("submission rejected with status {status}: {body}")]
    SubmissionRejected { status: u16, body: String },

    /// The transaction did not commit within the configured timeout.
    #[error("transaction {tx} not committed after {waited:?}")]
    CommitTimeout { tx: TransactionId, waited: Duration },

    /// Waiting for commit was cancelled.
    #[error("commit wait for transaction {tx} cancelled")]
    CommitWaitCancelled { tx: TransactionId },

    /// The ledger reported the transaction as invalid.
    #[error("transaction {tx} is invalid")]
    TransactionInvalid { tx: TransactionId },

    /// No receipt could be obtained for a committed sequence number.
    #[error("receipt for seqno {seqno} unavailable: {reason}")]
    ReceiptUnavailable { seqno: u64, reason: String },

    /// The ledger answered with something we could not interpret.
    #[error("malformed ledger response: {0}")]
    MalformedResponse(String),
}

impl LedgerError {
    /// Whether waiting again may succeed.
    ///
    /// Only a commit timeout qualifies: the submission itself is already on
    /// the ledger and must not be repeated.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::CommitTimeout { .. })
    }
}

impl From<reqwest::Error> for LedgerError {
    fn from(err: reqwest::Error) -> Self {
        LedgerError::Transport(err.to_string())
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_commit_timeout_is_retryable() {
        let tx = TransactionId::new(2, 7);
        assert!(LedgerError::CommitTimeout {
            tx,
            waited: Duration::from_secs(60)
        }
        .is_retryable());
        assert!(!LedgerError::CommitWaitCancelled { tx }.is_retryable());
        assert!(!LedgerError::TransactionInvalid { tx }.is_retryable());
        assert!(!LedgerError::SubmissionRejected {
            status: 400,
            body: String::new()
        }
        .is_retryable());
    }

    #[test]
    fn test_messages_name_the_transaction() {
        let err = LedgerError::TransactionInvalid {
            tx: TransactionId::new(2, 7),
        };
        assert_eq!(err.to_string(), "transaction 2.7 is invalid");
    }
}
