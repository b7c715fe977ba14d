//! Feed generation from the built-in sources, and the full publish flow.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use claimfeed::core::{verify, AuditStatus};
use claimfeed::ledger::{
    GovernanceBootstrap, MemoryLedger, MemoryLedgerConfig, PipelineConfig, SubmissionPipeline,
};
use claimfeed::store::read_jwks;
use claimfeed::{
    AuditConfig, AuditSource, FeedError, FeedGenerator, NpmRegistrySource, RegistryConfig,
};
use claimfeed_testkit::FeedFixture;
use serde_json::{json, Value};

#[derive(Default)]
struct Registry {
    fail_search: bool,
    searches: Vec<HashMap<String, String>>,
}

type Shared = Arc<Mutex<Registry>>;

async fn search(State(state): State<Shared>, Query(query): Query<HashMap<String, String>>) -> Response {
    let mut state = state.lock().unwrap();
    state.searches.push(query);
    if state.fail_search {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    Json(json!({
        "objects": [
            {"package": {"name": "left-pad", "version": "1.3.0"}},
            {"package": {"name": "@types/node", "version": "20.1.0"}},
        ],
        "total": 2,
    }))
    .into_response()
}

async fn latest(Path(path): Path<String>) -> Response {
    match path.strip_suffix("/latest") {
        Some(name @ ("left-pad" | "@types/node")) => Json(json!({
            "name": name,
            "version": "1.0.0",
            "license": "MIT",
        }))
        .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn spawn_registry(state: Shared) -> String {
    let app = Router::new()
        .route("/-/v1/search", get(search))
        .route("/*path", get(latest))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/")
}

fn registry_config(base_url: String) -> RegistryConfig {
    RegistryConfig {
        base_url,
        ..RegistryConfig::default()
    }
}

#[tokio::test]
async fn test_audit_feed_from_committed_record() {
    let fixture = FeedFixture::new();
    fixture.write_record("npm", "widget-1", "widget-1", 42);

    let source = AuditSource::new(fixture.data_dir(), &AuditConfig::default()).unwrap();
    let report = FeedGenerator::new(fixture.data_dir().clone())
        .generate(&source)
        .await
        .unwrap();

    assert_eq!(report.len(), 1);
    let contoso = fixture.feed("contoso");
    let artifact = &report.artifacts[0];
    assert_eq!(artifact.token, contoso.token_path("widget-1-audit"));

    let claims = FeedFixture::read_json(&artifact.claims);
    assert_eq!(claims["iss"], "localhost/contoso");
    assert_eq!(claims["sub"], "widget-1-audit");
    assert_eq!(
        claims["artifactReference"],
        json!({"iss": "localhost/npm", "sub": "widget-1", "seqno": 42, "hash": "tbd"})
    );
    let status = claims["status"].as_str().unwrap();
    assert!(status == "approved" || status == "rejected");

    let token = std::fs::read_to_string(&artifact.token).unwrap();
    let verified = verify(&token, &read_jwks(&contoso).unwrap()).unwrap();
    assert_eq!(verified.subject(), Some("widget-1-audit"));
}

#[tokio::test]
async fn test_audit_status_can_be_fixed() {
    let fixture = FeedFixture::new();
    fixture.write_record("npm", "a", "a", 1);
    fixture.write_record("npm", "b", "b", 2);

    let source = AuditSource::new(fixture.data_dir(), &AuditConfig::default())
        .unwrap()
        .with_status(AuditStatus::Rejected);
    let report = FeedGenerator::new(fixture.data_dir().clone())
        .generate(&source)
        .await
        .unwrap();

    let subjects: Vec<_> = report
        .artifacts
        .iter()
        .map(|a| FeedFixture::read_json(&a.claims))
        .inspect(|claims| assert_eq!(claims["status"], "rejected"))
        .map(|claims| claims["sub"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(subjects, vec!["a-audit", "b-audit"]);
}

#[tokio::test]
async fn test_empty_audit_source_writes_nothing() {
    let fixture = FeedFixture::new();

    let source = AuditSource::new(fixture.data_dir(), &AuditConfig::default()).unwrap();
    let report = FeedGenerator::new(fixture.data_dir().clone())
        .generate(&source)
        .await
        .unwrap();

    assert!(report.is_empty());
    assert!(!fixture.feed("contoso").path().exists());
}

#[tokio::test]
async fn test_npm_feed_from_registry() {
    let state = Shared::default();
    let base_url = spawn_registry(state.clone()).await;
    let fixture = FeedFixture::new();

    let source = NpmRegistrySource::new(&registry_config(base_url)).unwrap();
    let report = FeedGenerator::new(fixture.data_dir().clone())
        .generate(&source)
        .await
        .unwrap();

    let npm = fixture.feed("npm");
    let tokens: Vec<_> = report.artifacts.iter().map(|a| a.token.clone()).collect();
    assert_eq!(
        tokens,
        vec![npm.token_path("left-pad"), npm.token_path("@types_node")]
    );

    let scoped = FeedFixture::read_json(&npm.claims_path("@types_node"));
    assert_eq!(scoped["iss"], "localhost/npm");
    assert_eq!(scoped["sub"], "@types_node");
    assert_eq!(scoped["name"], "@types/node");
    assert_eq!(scoped["license"], "MIT");

    let searches = &state.lock().unwrap().searches;
    assert_eq!(searches.len(), 1);
    assert_eq!(searches[0]["text"], "\"js\"");
    assert_eq!(searches[0]["size"], "5");
}

#[tokio::test]
async fn test_registry_failure_aborts() {
    let state = Shared::default();
    state.lock().unwrap().fail_search = true;
    let base_url = spawn_registry(state).await;
    let fixture = FeedFixture::new();

    let source = NpmRegistrySource::new(&registry_config(base_url)).unwrap();
    let err = FeedGenerator::new(fixture.data_dir().clone())
        .generate(&source)
        .await
        .unwrap_err();

    match err {
        FeedError::RegistryFetch { url, reason } => {
            assert!(url.contains("/-/v1/search"));
            assert!(reason.contains("500"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!fixture.feed("npm").path().exists());
}

#[tokio::test]
async fn test_publish_then_audit() {
    let base_url = spawn_registry(Shared::default()).await;
    let fixture = FeedFixture::new();
    let generator = FeedGenerator::new(fixture.data_dir().clone());

    let npm = NpmRegistrySource::new(&registry_config(base_url)).unwrap();
    generator.generate(&npm).await.unwrap();

    let ledger = Arc::new(MemoryLedger::with_config(MemoryLedgerConfig {
        first_seqno: 42,
        ..MemoryLedgerConfig::default()
    }));
    let pipeline = SubmissionPipeline::new(
        ledger.clone(),
        GovernanceBootstrap::new(ledger.clone()),
        PipelineConfig::default(),
    );
    let summary = pipeline.populate(&fixture.feed("npm")).await.unwrap();
    assert_eq!(summary.len(), 2);

    let audit = AuditSource::new(fixture.data_dir(), &AuditConfig::default()).unwrap();
    let report = generator.generate(&audit).await.unwrap();
    assert_eq!(report.len(), 2);

    let references: HashMap<String, u64> = report
        .artifacts
        .iter()
        .map(|a| FeedFixture::read_json(&a.claims))
        .map(|claims: Value| {
            let reference = &claims["artifactReference"];
            (
                reference["sub"].as_str().unwrap().to_string(),
                reference["seqno"].as_u64().unwrap(),
            )
        })
        .collect();
    let submitted: HashMap<String, u64> = summary
        .entries
        .iter()
        .map(|e| {
            let stem = e.token_path.file_stem().unwrap().to_string_lossy().into_owned();
            (stem, e.seqno)
        })
        .collect();
    assert_eq!(references, submitted);

    let audits = pipeline.populate(&fixture.feed("contoso")).await.unwrap();
    assert_eq!(audits.len(), 2);
    assert_eq!(
        ledger.registered_issuers().await,
        vec!["localhost/contoso", "localhost/npm"]
    );
}
