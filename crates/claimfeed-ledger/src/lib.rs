//! # Claimfeed Ledger
//!
//! Submitting a feed's signed tokens to an append-only ledger and
//! correlating each with the receipt that proves its commit.
//!
//! ## Overview
//!
//! The ledger is reached through the [`Ledger`] trait: [`HttpLedgerClient`]
//! for a real service, [`MemoryLedger`] for tests. Before anything is
//! submitted, a [`TrustBootstrap`] makes the ledger trust the issuer.
//! [`SubmissionPipeline`] drives the whole exchange for one feed.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use claimfeed_core::Issuer;
//! use claimfeed_ledger::{
//!     GovernanceBootstrap, HttpLedgerClient, LedgerEndpoint, PipelineConfig, SubmissionPipeline,
//! };
//! use claimfeed_store::DataDir;
//!
//! async fn example() -> claimfeed_ledger::Result<()> {
//!     let client = HttpLedgerClient::new(&LedgerEndpoint::default())?;
//!     let bootstrap = GovernanceBootstrap::new(client.clone());
//!     let pipeline = SubmissionPipeline::new(client, bootstrap, PipelineConfig::default());
//!
//!     let feed = DataDir::new("data").feed(&Issuer::from_name("acme")?);
//!     let summary = pipeline.populate(&feed).await?;
//!     print!("{summary}");
//!     Ok(())
//! }
//! ```
//!
//! ## Message Flow
//!
//! ```text
//! Pipeline                               Ledger
//!   |-------- POST /gov/proposals ------->|  set_ca_cert_bundle
//!   |-------- POST /gov/proposals ------->|  set_jwt_issuer
//!   |-------- POST /app/register -------->|
//!   |-------- POST /app/submit ---------->|  per token
//!   |<------- 201 + transaction id -------|
//!   |-------- GET /node/tx -------------->|  until Committed
//!   |-------- GET /app/receipt ---------->|  until 200
//! ```

pub mod bootstrap;
pub mod client;
pub mod commit;
pub mod config;
pub mod error;
pub mod http;
pub mod memory;
pub mod pipeline;

pub use bootstrap::{
    Governance, GovernanceBootstrap, NoTrustBootstrap, Proposal, ProposalAction, ProposalOutcome,
    ProposalState, TrustBootstrap,
};
pub use client::{
    Ledger, ReceiptResponse, Submission, TransactionId, TxStatus, TRANSACTION_ID_HEADER,
};
pub use commit::{Backoff, CommitWait};
pub use config::{LedgerEndpoint, MemberIdentity, PipelineConfig, DEFAULT_HOST, DEFAULT_PORT};
pub use error::{LedgerError, Result};
pub use http::HttpLedgerClient;
pub use memory::{MemoryLedger, MemoryLedgerConfig};
pub use pipeline::{PipelineStage, PopulateEntry, PopulateSummary, SubmissionPipeline};
