//! Ledger client abstraction.
//!
//! The ledger is reached through the [`Ledger`] trait. [`crate::http`] talks
//! to a real service, [`crate::memory`] simulates one for tests and dry runs.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use claimfeed_core::{Issuer, SubmissionData};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LedgerError, Result};

/// Response header carrying the transaction id of a write.
pub const TRANSACTION_ID_HEADER: &str = "x-ms-ccf-transaction-id";

/// Position of a transaction in the ledger: `<view>.<seqno>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId {
    pub view: u64,
    pub seqno: u64,
}

impl TransactionId {
    pub fn new(view: u64, seqno: u64) -> Self {
        Self { view, seqno }
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.view, self.seqno)
    }
}

impl FromStr for TransactionId {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        let malformed = || LedgerError::MalformedResponse(format!("bad transaction id {s:?}"));
        let (view, seqno) = s.trim().split_once('.').ok_or_else(malformed)?;
        Ok(Self {
            view: view.parse().map_err(|_| malformed())?,
            seqno: seqno.parse().map_err(|_| malformed())?,
        })
    }
}

/// Commit status of a transaction as reported by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    /// Not yet known to the node answering.
    Unknown,
    /// Executed but not yet committed.
    Pending,
    Committed,
    /// Rolled back; it will never commit.
    Invalid,
}

/// Outcome of a successful token submission.
#[derive(Debug, Clone)]
pub struct Submission {
    pub transaction_id: TransactionId,
    /// Response body as returned by the ledger application.
    pub body: Value,
}

impl Submission {
    /// The submission data to correlate with the eventual receipt.
    ///
    /// Uses the body's `data` object when present, the body itself
    /// otherwise. A missing `seqno` is taken from the transaction id.
    pub fn data(&self) -> Result<SubmissionData> {
        let mut data = match &self.body {
            Value::Object(map) => match map.get("data") {
                Some(Value::Object(inner)) => inner.clone(),
                _ => map.clone(),
            },
            other => {
                return Err(LedgerError::MalformedResponse(format!(
                    "submission body is not an object: {other}"
                )))
            }
        };
        data.entry("seqno")
            .or_insert_with(|| Value::from(self.transaction_id.seqno));

        serde_json::from_value(Value::Object(data))
            .map_err(|e| LedgerError::MalformedResponse(format!("submission data: {e}")))
    }
}

/// Answer to a receipt request.
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiptResponse {
    Ready(Value),
    /// Committed, but the receipt has not been produced yet.
    Pending,
}

/// Application and node endpoints of the ledger.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Ledger: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────
    // Application
    // ─────────────────────────────────────────────────────────────────────

    /// Register an issuer so the ledger accepts its tokens.
    ///
    /// Registering an already-known issuer succeeds.
    async fn register_issuer(&self, issuer: &Issuer) -> Result<()>;

    /// Submit a signed token.
    async fn submit(&self, token: &str) -> Result<Submission>;

    /// Fetch the receipt for a committed sequence number.
    async fn receipt(&self, seqno: u64) -> Result<ReceiptResponse>;

    // ─────────────────────────────────────────────────────────────────────
    // Node
    // ─────────────────────────────────────────────────────────────────────

    /// Current commit status of a transaction.
    async fn transaction_status(&self, tx: TransactionId) -> Result<TxStatus>;
}

#[async_trait]
impl<L: Ledger + ?Sized> Ledger for std::sync::Arc<L> {
    async fn register_issuer(&self, issuer: &Issuer) -> Result<()> {
        (**self).register_issuer(issuer).await
    }

    async fn submit(&self, token: &str) -> Result<Submission> {
        (**self).submit(token).await
    }

    async fn receipt(&self, seqno: u64) -> Result<ReceiptResponse> {
        (**self).receipt(seqno).await
    }

    async fn transaction_status(&self, tx: TransactionId) -> Result<TxStatus> {
        (**self).transaction_status(tx).await
    }
}
