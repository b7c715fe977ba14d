//! claimfeed - signed claim feeds with ledger receipts.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use claimfeed::cli::{Cli, Command, FeedKind, GenerateArgs, SubmitArgs};
use claimfeed::core::{token_key_id, verify, Claims, Issuer};
use claimfeed::ledger::{GovernanceBootstrap, HttpLedgerClient, SubmissionPipeline};
use claimfeed::store::{read_jwks, DataDir};
use claimfeed::{AuditSource, ClaimSource, FeedGenerator, NpmRegistrySource};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let data_dir = DataDir::create(&cli.data_dir)
        .with_context(|| format!("create data dir {}", cli.data_dir.display()))?;

    match cli.command {
        Command::CreateToken { claims } => create_token(&data_dir, &claims),
        Command::Generate(args) => generate(&data_dir, &args).await,
        Command::Submit(args) => submit(&data_dir, &args).await,
        Command::Verify { token } => verify_token(&data_dir, &token),
    }
}

fn create_token(data_dir: &DataDir, path: &Path) -> Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let claims = Claims::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))?;
    let paths = FeedGenerator::new(data_dir.clone()).write(&claims)?;
    println!("{}", paths.token.display());
    Ok(())
}

async fn generate(data_dir: &DataDir, args: &GenerateArgs) -> Result<()> {
    let source: Box<dyn ClaimSource> = match args.feed {
        FeedKind::Npm => Box::new(NpmRegistrySource::new(&args.registry_config())?),
        FeedKind::Contoso => Box::new(AuditSource::new(data_dir, &args.audit_config())?),
    };
    let report = FeedGenerator::new(data_dir.clone())
        .generate(source.as_ref())
        .await
        .with_context(|| format!("generate {} feed", source.name()))?;
    for artifact in &report.artifacts {
        println!("{}", artifact.token.display());
    }
    Ok(())
}

async fn submit(data_dir: &DataDir, args: &SubmitArgs) -> Result<()> {
    let issuer = Issuer::from_name(&args.issuer_name)?;
    let feed = data_dir.feed(&issuer);

    let client = HttpLedgerClient::new(&args.endpoint()).context("connect to ledger")?;
    let mut bootstrap = GovernanceBootstrap::new(client.clone());
    if let Some(path) = args.ca_bundle_path(data_dir.root()) {
        let pem = std::fs::read_to_string(&path)
            .with_context(|| format!("read CA bundle {}", path.display()))?;
        info!(path = %path.display(), "proposing CA bundle");
        bootstrap = bootstrap.with_ca_bundle(pem);
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, abandoning commit waits");
            on_interrupt.cancel();
        }
    });

    let pipeline = SubmissionPipeline::new(client, bootstrap, args.pipeline_config())
        .with_cancellation(cancel);
    let summary = pipeline
        .populate(&feed)
        .await
        .with_context(|| format!("submit feed {}", feed.path().display()))?;
    print!("{summary}");
    Ok(())
}

fn verify_token(data_dir: &DataDir, path: &Path) -> Result<()> {
    let token =
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let issuer = Issuer::from_name(&token_key_id(&token)?)?;
    let jwks = read_jwks(&data_dir.feed(&issuer))?;
    let claims = verify(&token, &jwks).with_context(|| format!("verify {}", path.display()))?;
    println!("{}", serde_json::to_string_pretty(&claims)?);
    Ok(())
}
