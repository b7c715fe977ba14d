//! Command-line interface definition.
//!
//! Parsing lives here so the argument surface can be tested without
//! running commands. The binary in `src/bin/claimfeed.rs` executes them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::{
    AuditConfig, LedgerEndpoint, MemberIdentity, PipelineConfig, RegistryConfig,
};

/// Certificate bundle proposed for issuer trust when present in the data dir.
pub const TLS_CERT_FILE: &str = "tls_cert.pem";

/// Network certificate inside a sandbox workspace.
pub const NETWORK_CERT_FILE: &str = "networkcert.pem";

/// Governance member certificate inside a sandbox workspace.
pub const MEMBER_CERT_FILE: &str = "member0_cert.pem";

/// Governance member key inside a sandbox workspace.
pub const MEMBER_KEY_FILE: &str = "member0_privk.pem";

/// claimfeed - signed claim feeds with ledger receipts
#[derive(Parser, Debug)]
#[command(name = "claimfeed")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Root directory holding one folder per feed
    #[arg(long, global = true, env = "CLAIMFEED_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign a claims file into its issuer's feed
    CreateToken {
        /// JSON file with the claims, including `iss` and `sub`
        claims: PathBuf,
    },

    /// Generate a feed from one of the built-in sources
    Generate(GenerateArgs),

    /// Submit a feed to the ledger and collect receipts
    Submit(SubmitArgs),

    /// Verify a signed token against its issuer's published key set
    Verify {
        /// Path to a `.jwt` file
        token: PathBuf,
    },
}

/// Built-in feeds.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    /// Latest manifests of packages found in the npm registry
    Npm,
    /// Audits of the npm feed's committed records
    Contoso,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[arg(value_enum)]
    pub feed: FeedKind,

    /// Registry base URL
    #[arg(long, default_value = "https://registry.npmjs.org/")]
    pub registry: String,

    /// Registry search text
    #[arg(long, default_value = "\"js\"")]
    pub search: String,

    /// Packages to fetch (at most 250)
    #[arg(long, default_value_t = 5)]
    pub size: u32,

    /// Feed the audit reads records from
    #[arg(long, default_value = "npm")]
    pub audit_source: String,
}

impl GenerateArgs {
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            base_url: self.registry.clone(),
            search_text: self.search.clone(),
            page_size: self.size,
            ..RegistryConfig::default()
        }
    }

    pub fn audit_config(&self) -> AuditConfig {
        AuditConfig {
            source_feed: self.audit_source.clone(),
            ..AuditConfig::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Name of the feed folder under the data dir
    pub issuer_name: String,

    /// Ledger host
    #[arg(long, env = "CLAIMFEED_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Ledger port
    #[arg(long, env = "CLAIMFEED_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Talk plain HTTP instead of HTTPS
    #[arg(long)]
    pub insecure_http: bool,

    /// Sandbox workspace the certificate defaults are taken from
    #[arg(long, default_value = "workspace/sandbox_common")]
    pub workspace: PathBuf,

    /// CA bundle proposed for issuer trust [default: <data-dir>/tls_cert.pem
    /// if present, else the issuer's certificate]
    #[arg(long)]
    pub ca_cert: Option<PathBuf>,

    /// Ledger network certificate [default: <workspace>/networkcert.pem]
    #[arg(long)]
    pub network_cert: Option<PathBuf>,

    /// Governance member certificate [default: <workspace>/member0_cert.pem]
    #[arg(long, requires = "member_key")]
    pub member_cert: Option<PathBuf>,

    /// Governance member private key [default: <workspace>/member0_privk.pem]
    #[arg(long, requires = "member_cert")]
    pub member_key: Option<PathBuf>,

    /// How long to wait for each commit and receipt
    #[arg(long, value_parser = humantime_serde::re::humantime::parse_duration, default_value = "60s")]
    pub commit_timeout: Duration,

    /// Artifacts submitted concurrently
    #[arg(long, default_value_t = 1)]
    pub max_in_flight: usize,

    /// Times a timed out commit wait is started over
    #[arg(long, default_value_t = 2)]
    pub commit_retries: u32,
}

fn existing(path: PathBuf) -> Option<PathBuf> {
    path.is_file().then_some(path)
}

impl SubmitArgs {
    pub fn endpoint(&self) -> LedgerEndpoint {
        let network_cert = self
            .network_cert
            .clone()
            .or_else(|| existing(self.workspace.join(NETWORK_CERT_FILE)));

        let member_identity = match (&self.member_cert, &self.member_key) {
            (Some(cert), Some(key)) => Some(MemberIdentity {
                cert: cert.clone(),
                key: key.clone(),
            }),
            _ => match (
                existing(self.workspace.join(MEMBER_CERT_FILE)),
                existing(self.workspace.join(MEMBER_KEY_FILE)),
            ) {
                (Some(cert), Some(key)) => Some(MemberIdentity { cert, key }),
                _ => None,
            },
        };

        LedgerEndpoint {
            tls: !self.insecure_http,
            network_cert,
            member_identity,
            ..LedgerEndpoint::new(self.host.clone(), self.port)
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            commit_timeout: self.commit_timeout,
            max_in_flight: self.max_in_flight.max(1),
            commit_retries: self.commit_retries,
            ..PipelineConfig::default()
        }
    }

    /// CA bundle to propose instead of the issuer's own certificate.
    pub fn ca_bundle_path(&self, data_dir: &Path) -> Option<PathBuf> {
        self.ca_cert
            .clone()
            .or_else(|| existing(data_dir.join(TLS_CERT_FILE)))
    }
}
