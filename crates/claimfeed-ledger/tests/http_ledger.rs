//! HTTP ledger client and pipeline against a mock ledger service.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use claimfeed_core::{verify, CombinedRecord, Jwks};
use claimfeed_ledger::{
    GovernanceBootstrap, HttpLedgerClient, Ledger, LedgerEndpoint, LedgerError, PipelineConfig,
    SubmissionPipeline, TransactionId, TxStatus, TRANSACTION_ID_HEADER,
};
use claimfeed_testkit::FeedFixture;
use serde_json::{json, Value};

const VIEW: u64 = 4;

#[derive(Default)]
struct MockState {
    reject_submissions: bool,
    jwks: Option<Jwks>,
    proposals: Vec<Value>,
    registered: Vec<String>,
    next_seqno: u64,
    status_polls: HashMap<u64, u32>,
    receipt_polls: HashMap<u64, u32>,
}

type Shared = Arc<Mutex<MockState>>;

async fn proposals(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    for action in body["actions"].as_array().cloned().unwrap_or_default() {
        if action["name"] == "set_jwt_issuer" {
            state.jwks = serde_json::from_value(action["args"]["jwks"].clone()).ok();
        }
    }
    state.proposals.push(body);
    let id = format!("p{}", state.proposals.len());
    Json(json!({"proposal_id": id, "state": "Accepted"})).into_response()
}

async fn register(State(state): State<Shared>, Json(body): Json<Value>) -> StatusCode {
    let issuer = body["issuer"].as_str().unwrap_or_default().to_string();
    state.lock().unwrap().registered.push(issuer);
    StatusCode::CREATED
}

async fn submit(State(state): State<Shared>, token: String) -> Response {
    let mut state = state.lock().unwrap();
    if state.reject_submissions {
        return (StatusCode::BAD_REQUEST, "bad token").into_response();
    }
    let Some(claims) = state.jwks.as_ref().and_then(|jwks| verify(&token, jwks).ok()) else {
        return (StatusCode::UNAUTHORIZED, "unverified").into_response();
    };
    state.next_seqno += 1;
    let seqno = 100 + state.next_seqno;
    (
        StatusCode::CREATED,
        [(TRANSACTION_ID_HEADER, format!("{VIEW}.{seqno}"))],
        Json(json!({
            "issuer": claims.issuer(),
            "subject": claims.subject(),
            "seqno": seqno,
        })),
    )
        .into_response()
}

async fn tx_status(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let tx: TransactionId = query["transaction_id"].parse().unwrap();
    let mut state = state.lock().unwrap();
    let polls = state.status_polls.entry(tx.seqno).or_default();
    *polls += 1;
    let status = if *polls > 2 { "Committed" } else { "Pending" };
    Json(json!({"status": status, "transaction_id": tx.to_string()}))
}

async fn receipt(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let seqno: u64 = query["commit"].parse().unwrap();
    let mut state = state.lock().unwrap();
    let polls = state.receipt_polls.entry(seqno).or_default();
    *polls += 1;
    if *polls == 1 {
        return StatusCode::ACCEPTED.into_response();
    }
    Json(json!({
        "cert": "-----BEGIN CERTIFICATE-----",
        "leaf_components": {"write_set_digest": format!("{seqno:064x}")},
        "node_id": "n0",
        "proof": [{"left": "00"}],
        "signature": "c2ln",
    }))
    .into_response()
}

async fn spawn_mock(state: Shared) -> SocketAddr {
    let app = Router::new()
        .route("/gov/proposals", post(proposals))
        .route("/app/register", post(register))
        .route("/app/submit", post(submit))
        .route("/app/receipt", get(receipt))
        .route("/node/tx", get(tx_status))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client(addr: SocketAddr) -> HttpLedgerClient {
    let endpoint = LedgerEndpoint {
        tls: false,
        request_timeout: Duration::from_secs(5),
        ..LedgerEndpoint::new(addr.ip().to_string(), addr.port())
    };
    HttpLedgerClient::new(&endpoint).unwrap()
}

fn fast_config() -> PipelineConfig {
    PipelineConfig {
        commit_timeout: Duration::from_secs(10),
        poll_initial: Duration::from_millis(5),
        poll_max: Duration::from_millis(20),
        max_in_flight: 1,
        commit_retries: 0,
    }
}

#[tokio::test]
async fn test_end_to_end_over_http() {
    let state = Shared::default();
    let addr = spawn_mock(state.clone()).await;

    let fixture = FeedFixture::new();
    fixture.write_claims("acme", "widget-1");
    fixture.write_claims("acme", "widget-2");
    let feed = fixture.feed("acme");

    let client = client(addr);
    let pipeline =
        SubmissionPipeline::new(client.clone(), GovernanceBootstrap::new(client), fast_config());
    let summary = pipeline.populate(&feed).await.unwrap();

    assert_eq!(summary.len(), 2);
    assert_eq!(summary.entries[0].seqno, 101);
    assert_eq!(summary.entries[1].seqno, 102);

    let record =
        CombinedRecord::from_slice(&std::fs::read(feed.receipt_path("widget-1")).unwrap()).unwrap();
    assert_eq!(record.data.seqno, 101);
    assert_eq!(record.data.subject, "widget-1");
    assert_eq!(record.receipt["node_id"], "n0");
    assert!(record.receipt.get("data").is_none());

    let state = state.lock().unwrap();
    assert_eq!(state.registered, vec!["localhost/acme"]);
    assert_eq!(state.proposals.len(), 2);
    assert_eq!(state.proposals[0]["actions"][0]["name"], "set_ca_cert_bundle");
    assert_eq!(
        state.proposals[1]["actions"][0]["args"]["issuer"],
        "https://localhost/acme"
    );
}

#[tokio::test]
async fn test_client_reads_transaction_header() {
    let state = Shared::default();
    let addr = spawn_mock(state.clone()).await;

    let fixture = FeedFixture::new();
    let paths = fixture.write_claims("acme", "widget-1");
    let material = claimfeed_store::KeyMaterialStore::new(fixture.data_dir().clone())
        .load(&FeedFixture::issuer("acme"))
        .unwrap()
        .unwrap();
    state.lock().unwrap().jwks = Some(Jwks::from_key_material(
        &FeedFixture::issuer("acme"),
        &material,
    ));

    let client = client(addr);
    let token = std::fs::read_to_string(paths.token).unwrap();
    let submission = client.submit(&token).await.unwrap();
    assert_eq!(submission.transaction_id, TransactionId::new(VIEW, 101));

    assert_eq!(
        client.transaction_status(submission.transaction_id).await.unwrap(),
        TxStatus::Pending
    );
}

#[tokio::test]
async fn test_rejected_submission_surfaces_status() {
    let state = Shared::default();
    state.lock().unwrap().reject_submissions = true;
    let addr = spawn_mock(state).await;

    let err = client(addr).submit("header.payload.sig").await.unwrap_err();
    match err {
        LedgerError::SubmissionRejected { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "bad token");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_unreachable_ledger_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(addr)
        .register_issuer(&FeedFixture::issuer("acme"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Transport(_)));
}
