//! Where feed claims come from.

use async_trait::async_trait;
use claimfeed_core::Claims;

use crate::error::Result;

pub mod audit;
pub mod npm;

pub use audit::AuditSource;
pub use npm::NpmRegistrySource;

/// A producer of claim batches.
#[async_trait]
pub trait ClaimSource: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Produce the next batch. An empty batch is not an error.
    async fn claims(&self) -> Result<Vec<Claims>>;
}

/// A fixed batch of claims.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    claims: Vec<Claims>,
}

impl StaticSource {
    pub fn new(claims: Vec<Claims>) -> Self {
        Self { claims }
    }
}

#[async_trait]
impl ClaimSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn claims(&self) -> Result<Vec<Claims>> {
        Ok(self.claims.clone())
    }
}
