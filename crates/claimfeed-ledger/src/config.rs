//! Ledger endpoint and pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{LedgerError, Result};

/// Default ledger host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default ledger port.
pub const DEFAULT_PORT: u16 = 8000;

/// Where the ledger lives and how to authenticate to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerEndpoint {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Use `https`. Plain `http` is only useful against local test servers.
    #[serde(default = "default_tls")]
    pub tls: bool,

    /// PEM certificate the ledger's TLS chain is verified against.
    #[serde(default)]
    pub network_cert: Option<PathBuf>,

    /// Client identity for governance requests.
    #[serde(default)]
    pub member_identity: Option<MemberIdentity>,

    /// Timeout for each HTTP request.
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,
}

/// A governance member's certificate and private key, both PEM files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberIdentity {
    pub cert: PathBuf,
    pub key: PathBuf,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_tls() -> bool {
    true
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for LedgerEndpoint {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            tls: default_tls(),
            network_cert: None,
            member_identity: None,
            request_timeout: default_request_timeout(),
        }
    }
}

impl LedgerEndpoint {
    /// Endpoint for `host:port` with the remaining settings defaulted.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// The base URL requests are resolved against.
    pub fn base_url(&self) -> Result<Url> {
        let scheme = if self.tls { "https" } else { "http" };
        let raw = format!("{scheme}://{}:{}/", self.host, self.port);
        Url::parse(&raw).map_err(|e| LedgerError::InvalidEndpoint(format!("{raw}: {e}")))
    }
}

/// Configuration for the submission pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// How long to wait for one transaction to commit and its receipt to
    /// become available.
    #[serde(with = "humantime_serde", default = "default_commit_timeout")]
    pub commit_timeout: Duration,

    /// First delay between status polls.
    #[serde(with = "humantime_serde", default = "default_poll_initial")]
    pub poll_initial: Duration,

    /// Upper bound on the delay between status polls.
    #[serde(with = "humantime_serde", default = "default_poll_max")]
    pub poll_max: Duration,

    /// Artifacts submitted and awaited concurrently.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Further commit waits after a timeout. The token is never resubmitted.
    #[serde(default = "default_commit_retries")]
    pub commit_retries: u32,
}

fn default_commit_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_poll_initial() -> Duration {
    Duration::from_millis(50)
}

fn default_poll_max() -> Duration {
    Duration::from_secs(2)
}

fn default_max_in_flight() -> usize {
    1
}

fn default_commit_retries() -> u32 {
    2
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            commit_timeout: default_commit_timeout(),
            poll_initial: default_poll_initial(),
            poll_max: default_poll_max(),
            max_in_flight: default_max_in_flight(),
            commit_retries: default_commit_retries(),
        }
    }
}
