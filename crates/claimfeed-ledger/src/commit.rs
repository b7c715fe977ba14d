//! Waiting for commit and for the receipt that proves it.
//!
//! Polling uses exponential backoff with jitter:
//! - the delay starts at `poll_initial` and doubles after every poll
//! - it is capped at `poll_max`
//! - each sleep is scaled by a random factor in `[0.75, 1.25]`
//!
//! One [`CommitWait`] covers a single transaction. Its deadline spans both
//! the commit wait and the receipt fetch.

use std::time::Duration;

use rand::Rng;
use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::{Ledger, ReceiptResponse, TransactionId, TxStatus};
use crate::config::PipelineConfig;
use crate::error::{LedgerError, Result};

/// Exponential backoff schedule.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max: Duration,
}

impl Backoff {
    pub const MIN_DELAY: Duration = Duration::from_millis(1);

    /// Delays are never shorter than [`Backoff::MIN_DELAY`].
    pub fn new(initial: Duration, max: Duration) -> Self {
        let next = initial.max(Self::MIN_DELAY);
        Self {
            next,
            max: max.max(next),
        }
    }

    /// The next delay, before jitter.
    pub fn next_base(&mut self) -> Duration {
        let current = self.next.min(self.max);
        self.next = current.saturating_mul(2).min(self.max);
        current
    }

    /// The next delay with jitter applied.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.next_base();
        let factor = rand::thread_rng().gen_range(0.75..=1.25);
        base.mul_f64(factor)
    }
}

/// Commit and receipt wait for one transaction.
pub struct CommitWait<'a> {
    tx: TransactionId,
    cancel: &'a CancellationToken,
    started: Instant,
    deadline: Instant,
    backoff: Backoff,
}

impl<'a> CommitWait<'a> {
    pub fn new(tx: TransactionId, config: &PipelineConfig, cancel: &'a CancellationToken) -> Self {
        let started = Instant::now();
        Self {
            tx,
            cancel,
            started,
            deadline: started + config.commit_timeout,
            backoff: Backoff::new(config.poll_initial, config.poll_max),
        }
    }

    /// Poll until the transaction is committed.
    pub async fn committed<L: Ledger + ?Sized>(&mut self, ledger: &L) -> Result<()> {
        loop {
            let status = ledger.transaction_status(self.tx).await?;
            debug!(tx = %self.tx, ?status, "transaction status");
            match status {
                TxStatus::Committed => return Ok(()),
                TxStatus::Invalid => return Err(LedgerError::TransactionInvalid { tx: self.tx }),
                TxStatus::Pending | TxStatus::Unknown => {}
            }
            if Instant::now() >= self.deadline {
                return Err(LedgerError::CommitTimeout {
                    tx: self.tx,
                    waited: self.started.elapsed(),
                });
            }
            self.pause().await?;
        }
    }

    /// Fetch the receipt, retrying while the ledger has not produced it yet.
    pub async fn receipt<L: Ledger + ?Sized>(&mut self, ledger: &L) -> Result<Value> {
        let seqno = self.tx.seqno;
        loop {
            match ledger.receipt(seqno).await? {
                ReceiptResponse::Ready(receipt) => return Ok(receipt),
                ReceiptResponse::Pending => debug!(seqno, "receipt not ready"),
            }
            if Instant::now() >= self.deadline {
                return Err(LedgerError::ReceiptUnavailable {
                    seqno,
                    reason: format!("not produced within {:?}", self.started.elapsed()),
                });
            }
            self.pause().await?;
        }
    }

    async fn pause(&mut self) -> Result<()> {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        let delay = self.backoff.next_delay().min(remaining);
        tokio::select! {
            _ = self.cancel.cancelled() => Err(LedgerError::CommitWaitCancelled { tx: self.tx }),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}
