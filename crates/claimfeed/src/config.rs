//! Configuration for the built-in claim sources.
//!
//! Ledger and pipeline settings live in `claimfeed-ledger` and are
//! re-exported here.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use claimfeed_ledger::{LedgerEndpoint, MemberIdentity, PipelineConfig};

/// Largest page the npm search API serves.
pub const MAX_PAGE_SIZE: u32 = 250;

/// Where and what to search in the package registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_url")]
    pub base_url: String,

    /// Search text, sent verbatim.
    #[serde(default = "default_search_text")]
    pub search_text: String,

    /// Packages per search, at most [`MAX_PAGE_SIZE`].
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,
}

fn default_registry_url() -> String {
    "https://registry.npmjs.org/".to_string()
}

fn default_search_text() -> String {
    "\"js\"".to_string()
}

fn default_page_size() -> u32 {
    5
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: default_registry_url(),
            search_text: default_search_text(),
            page_size: default_page_size(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Which feed is audited and who signs the audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Feed whose combined records are audited.
    #[serde(default = "default_source_feed")]
    pub source_feed: String,

    /// Short name of the auditing issuer.
    #[serde(default = "default_auditor")]
    pub issuer_name: String,
}

fn default_source_feed() -> String {
    "npm".to_string()
}

fn default_auditor() -> String {
    "contoso".to_string()
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            source_feed: default_source_feed(),
            issuer_name: default_auditor(),
        }
    }
}
