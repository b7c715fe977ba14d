//! The submission pipeline.
//!
//! Turns a feed directory of signed tokens into committed ledger entries
//! with a combined record next to each token.
//!
//! ```text
//! Bootstrapping -> CaProposed -> Registered -> { Submitting -> Committing -> Received }*
//! ```
//!
//! The first error aborts the run. Records already written stay on disk.

use std::fmt;
use std::path::PathBuf;

use claimfeed_core::{CombinedRecord, Issuer};
use claimfeed_store::files::{read_to_string, write_file};
use claimfeed_store::layout::token_stem;
use claimfeed_store::{read_jwks, FeedDir};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::bootstrap::TrustBootstrap;
use crate::client::{Ledger, TransactionId};
use crate::commit::CommitWait;
use crate::config::PipelineConfig;
use crate::error::{LedgerError, Result};

/// Where a pipeline run, or one artifact within it, currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Bootstrapping,
    CaProposed,
    Registered,
    Submitting,
    Committing,
    Received,
}

impl PipelineStage {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::Bootstrapping => "bootstrapping",
            PipelineStage::CaProposed => "ca-proposed",
            PipelineStage::Registered => "registered",
            PipelineStage::Submitting => "submitting",
            PipelineStage::Committing => "committing",
            PipelineStage::Received => "received",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One submitted artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulateEntry {
    pub token_path: PathBuf,
    pub receipt_path: PathBuf,
    pub seqno: u64,
}

/// Result of a pipeline run, in token file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulateSummary {
    pub issuer: Issuer,
    pub entries: Vec<PopulateEntry>,
}

impl PopulateSummary {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for PopulateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Summary:")?;
        for entry in &self.entries {
            writeln!(f, "Submitted {}", entry.token_path.display())?;
            writeln!(f, "Received {} @ {}", entry.receipt_path.display(), entry.seqno)?;
        }
        Ok(())
    }
}

/// Submits a feed to the ledger and records a receipt for every token.
pub struct SubmissionPipeline<L, B> {
    ledger: L,
    bootstrap: B,
    config: PipelineConfig,
    cancel: CancellationToken,
}

impl<L: Ledger, B: TrustBootstrap> SubmissionPipeline<L, B> {
    pub fn new(ledger: L, bootstrap: B, config: PipelineConfig) -> Self {
        Self {
            ledger,
            bootstrap,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Use `cancel` to abort commit waits from outside.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// A handle that cancels this pipeline's commit waits.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Run the pipeline over every token in `feed`.
    #[instrument(skip_all, fields(issuer = %feed.issuer()))]
    pub async fn populate(&self, feed: &FeedDir) -> Result<PopulateSummary> {
        let issuer = feed.issuer();

        info!(stage = %PipelineStage::Bootstrapping, "establishing issuer trust");
        let cert_pem = read_to_string(&feed.cert_path())?;
        let jwks = read_jwks(feed)?;
        self.bootstrap.trust_ca(issuer, &cert_pem).await?;
        info!(stage = %PipelineStage::CaProposed, "CA bundle trusted");
        self.bootstrap.trust_issuer(issuer, &jwks).await?;

        self.ledger.register_issuer(issuer).await?;
        info!(stage = %PipelineStage::Registered, "issuer registered");

        let tokens = feed.token_files()?;
        if tokens.is_empty() {
            warn!(path = %feed.path().display(), "no signed tokens to submit");
        }

        let entries = stream::iter(tokens)
            .map(|path| self.submit_one(feed, path))
            .buffered(self.config.max_in_flight.max(1))
            .try_collect()
            .await?;

        Ok(PopulateSummary {
            issuer: issuer.clone(),
            entries,
        })
    }

    async fn submit_one(&self, feed: &FeedDir, token_path: PathBuf) -> Result<PopulateEntry> {
        let stem = token_stem(&token_path).ok_or_else(|| {
            LedgerError::MalformedResponse(format!("no file stem in {}", token_path.display()))
        })?;
        let token = read_to_string(&token_path)?;

        info!(stage = %PipelineStage::Submitting, path = %token_path.display(), "submitting token");
        let submission = self.ledger.submit(&token).await?;
        let tx = submission.transaction_id;
        let data = submission.data()?;
        if data.seqno != tx.seqno {
            warn!(%tx, data_seqno = data.seqno, "submission data names a different seqno");
        }

        info!(stage = %PipelineStage::Committing, %tx, "waiting for commit");
        let receipt = self.await_receipt(tx).await?;

        let record = CombinedRecord::merge(receipt, data)?;
        let receipt_path = feed.receipt_path(&stem);
        write_file(&receipt_path, record.to_json_pretty()?)?;
        info!(
            stage = %PipelineStage::Received,
            seqno = record.seqno(),
            path = %receipt_path.display(),
            "receipt written"
        );

        Ok(PopulateEntry {
            token_path,
            receipt_path,
            seqno: record.seqno(),
        })
    }

    /// Wait for `tx` to commit and fetch its receipt. A timed out wait is
    /// started over up to `commit_retries` times.
    async fn await_receipt(&self, tx: TransactionId) -> Result<Value> {
        let mut attempt = 0;
        loop {
            let mut wait = CommitWait::new(tx, &self.config, &self.cancel);
            let result = match wait.committed(&self.ledger).await {
                Ok(()) => wait.receipt(&self.ledger).await,
                Err(err) => Err(err),
            };
            match result {
                Err(err) if err.is_retryable() && attempt < self.config.commit_retries => {
                    attempt += 1;
                    warn!(%tx, attempt, error = %err, "commit wait timed out, waiting again");
                }
                other => return other,
            }
        }
    }
}
