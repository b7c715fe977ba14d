//! Feed generation: claims from a source, written as signed artifacts.

use claimfeed_core::Claims;
use claimfeed_store::{ArtifactPaths, ArtifactWriter, DataDir};
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::source::ClaimSource;

/// What one generation run wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedReport {
    /// Written artifacts, in source order.
    pub artifacts: Vec<ArtifactPaths>,
}

impl FeedReport {
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

/// Drives a [`ClaimSource`] into an [`ArtifactWriter`].
#[derive(Debug, Clone)]
pub struct FeedGenerator {
    writer: ArtifactWriter,
}

impl FeedGenerator {
    pub fn new(data_dir: DataDir) -> Self {
        Self {
            writer: ArtifactWriter::new(data_dir),
        }
    }

    /// Write a single claim set.
    pub fn write(&self, claims: &Claims) -> Result<ArtifactPaths> {
        Ok(self.writer.write(claims)?)
    }

    /// Pull one batch from `source` and write every claim set in it.
    ///
    /// Stops at the first failure; artifacts written before it remain.
    #[instrument(skip_all, fields(source = source.name()))]
    pub async fn generate(&self, source: &dyn ClaimSource) -> Result<FeedReport> {
        let batch = source.claims().await?;
        if batch.is_empty() {
            debug!("source produced no claims");
            return Ok(FeedReport::default());
        }

        let mut report = FeedReport::default();
        for claims in &batch {
            report.artifacts.push(self.write(claims)?);
        }
        info!(count = report.len(), "feed generated");
        Ok(report)
    }
}
