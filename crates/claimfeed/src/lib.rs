//! # Claimfeed
//!
//! Verifiable feed publishing: signed claim feeds, submission to an
//! append-only ledger, and receipts that prove each entry's position.
//!
//! ## Overview
//!
//! - **Generate**: a [`ClaimSource`] produces claims, the [`FeedGenerator`]
//!   signs them into a per-issuer feed directory
//! - **Submit**: the [`SubmissionPipeline`] sends every token to the ledger
//!   and writes a combined record once its receipt is available
//! - **Audit**: an [`AuditSource`] turns one feed's combined records into
//!   claims of another feed
//!
//! ## Usage
//!
//! ```rust,no_run
//! use claimfeed::{AuditConfig, AuditSource, FeedGenerator};
//! use claimfeed::store::DataDir;
//!
//! async fn example() -> claimfeed::Result<()> {
//!     let data_dir = DataDir::create("data")?;
//!     let generator = FeedGenerator::new(data_dir.clone());
//!
//!     let source = AuditSource::new(&data_dir, &AuditConfig::default())?;
//!     let report = generator.generate(&source).await?;
//!     for artifact in &report.artifacts {
//!         println!("{}", artifact.token.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `claimfeed::core` - Issuers, claims, tokens, key sets, records
//! - `claimfeed::store` - Feed directories, key material, artifact writing
//! - `claimfeed::ledger` - Ledger clients and the submission pipeline

pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod source;

pub use claimfeed_core as core;
pub use claimfeed_ledger as ledger;
pub use claimfeed_store as store;

pub use config::{AuditConfig, LedgerEndpoint, MemberIdentity, PipelineConfig, RegistryConfig};
pub use error::{FeedError, Result};
pub use generator::{FeedGenerator, FeedReport};
pub use source::{AuditSource, ClaimSource, NpmRegistrySource, StaticSource};

pub use claimfeed_core::{AuditClaim, AuditStatus, Claims, CombinedRecord, Issuer};
pub use claimfeed_ledger::{PopulateSummary, SubmissionPipeline};
pub use claimfeed_store::{ArtifactPaths, ArtifactWriter, DataDir, FeedDir};
