//! Audit claims derived from another feed's committed records.

use async_trait::async_trait;
use claimfeed_core::{AuditClaim, AuditStatus, Claims, CombinedRecord, Issuer};
use claimfeed_store::files::read_json;
use claimfeed_store::{DataDir, FeedDir};
use tracing::{info, warn};

use super::ClaimSource;
use crate::config::AuditConfig;
use crate::error::Result;

/// Reads `*.receipt.json` from a source feed and renders a verdict on each.
#[derive(Debug, Clone)]
pub struct AuditSource {
    source: FeedDir,
    auditor: Issuer,
    fixed_status: Option<AuditStatus>,
}

impl AuditSource {
    pub fn new(data_dir: &DataDir, config: &AuditConfig) -> Result<Self> {
        let source = data_dir.feed(&Issuer::from_name(&config.source_feed)?);
        Ok(Self {
            source,
            auditor: Issuer::from_name(&config.issuer_name)?,
            fixed_status: None,
        })
    }

    /// Give every audit the same verdict instead of a random one.
    pub fn with_status(mut self, status: AuditStatus) -> Self {
        self.fixed_status = Some(status);
        self
    }

    fn status(&self) -> AuditStatus {
        self.fixed_status
            .unwrap_or_else(|| AuditStatus::random(&mut rand::thread_rng()))
    }
}

#[async_trait]
impl ClaimSource for AuditSource {
    fn name(&self) -> &str {
        self.auditor.name()
    }

    async fn claims(&self) -> Result<Vec<Claims>> {
        let records = self.source.receipt_files()?;
        if records.is_empty() {
            warn!(
                path = %self.source.path().display(),
                "no receipts in {} feed folder found, run `claimfeed submit {}` first",
                self.source.issuer().name(),
                self.source.issuer().name(),
            );
            return Ok(Vec::new());
        }

        let mut batch = Vec::with_capacity(records.len());
        for path in records {
            info!(path = %path.display(), "reading record");
            let record: CombinedRecord = read_json(&path)?;
            let audit = AuditClaim::for_record(&self.auditor, &record, self.status());
            batch.push(audit.into_claims()?);
        }
        Ok(batch)
    }
}
