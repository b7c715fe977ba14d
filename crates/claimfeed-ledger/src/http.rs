//! HTTP client for a remote ledger service.

use async_trait::async_trait;
use claimfeed_core::Issuer;
use claimfeed_store::files::read_to_string;
use reqwest::{Certificate, Client, Identity, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::bootstrap::{Governance, Proposal, ProposalOutcome, ProposalState};
use crate::client::{
    Ledger, ReceiptResponse, Submission, TransactionId, TxStatus, TRANSACTION_ID_HEADER,
};
use crate::config::LedgerEndpoint;
use crate::error::{LedgerError, Result};

/// Talks to the ledger's application, node, and governance endpoints.
#[derive(Debug, Clone)]
pub struct HttpLedgerClient {
    base_url: Url,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct TxStatusBody {
    status: TxStatus,
}

#[derive(Debug, Deserialize)]
struct ProposalBody {
    #[serde(default)]
    proposal_id: Option<String>,
    #[serde(default, alias = "proposalState")]
    state: Option<ProposalState>,
}

impl HttpLedgerClient {
    /// Build a client for `endpoint`, loading its TLS material.
    pub fn new(endpoint: &LedgerEndpoint) -> Result<Self> {
        let mut builder = Client::builder().timeout(endpoint.request_timeout);

        if let Some(path) = &endpoint.network_cert {
            let pem = read_to_string(path)?;
            let cert = Certificate::from_pem(pem.as_bytes())
                .map_err(|e| LedgerError::InvalidEndpoint(format!("{}: {e}", path.display())))?;
            builder = builder.add_root_certificate(cert);
        }

        if let Some(member) = &endpoint.member_identity {
            let mut pem = read_to_string(&member.cert)?;
            if !pem.ends_with('\n') {
                pem.push('\n');
            }
            pem.push_str(&read_to_string(&member.key)?);
            let identity = Identity::from_pem(pem.as_bytes()).map_err(|e| {
                LedgerError::InvalidEndpoint(format!("member identity {}: {e}", member.cert.display()))
            })?;
            builder = builder.identity(identity);
        }

        let http = builder
            .build()
            .map_err(|e| LedgerError::InvalidEndpoint(e.to_string()))?;
        Ok(Self {
            base_url: endpoint.base_url()?,
            http,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| LedgerError::InvalidEndpoint(format!("{path}: {e}")))
    }

    async fn json_body(resp: Response) -> Result<Value> {
        let text = resp.text().await?;
        if text.trim().is_empty() {
            return Ok(json!({}));
        }
        serde_json::from_str(&text)
            .map_err(|e| LedgerError::MalformedResponse(format!("{e}: {text}")))
    }
}

#[async_trait]
impl Ledger for HttpLedgerClient {
    async fn register_issuer(&self, issuer: &Issuer) -> Result<()> {
        let resp = self
            .http
            .post(self.url("app/register")?)
            .json(&json!({"issuer": issuer.to_claim()}))
            .send()
            .await?;
        match resp.status() {
            StatusCode::OK | StatusCode::CREATED => Ok(()),
            status => Err(LedgerError::RegistrationRejected {
                status: status.as_u16(),
            }),
        }
    }

    async fn submit(&self, token: &str) -> Result<Submission> {
        let resp = self
            .http
            .post(self.url("app/submit")?)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(token.to_string())
            .send()
            .await?;

        let status = resp.status();
        if status != StatusCode::CREATED {
            return Err(LedgerError::SubmissionRejected {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        let transaction_id: TransactionId = resp
            .headers()
            .get(TRANSACTION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                LedgerError::MalformedResponse(format!("missing {TRANSACTION_ID_HEADER} header"))
            })?
            .parse()?;
        debug!(tx = %transaction_id, "submitted");

        Ok(Submission {
            transaction_id,
            body: Self::json_body(resp).await?,
        })
    }

    async fn receipt(&self, seqno: u64) -> Result<ReceiptResponse> {
        let mut url = self.url("app/receipt")?;
        url.query_pairs_mut()
            .append_pair("commit", &seqno.to_string());
        let resp = self.http.get(url).send().await?;

        match resp.status() {
            StatusCode::OK => Ok(ReceiptResponse::Ready(Self::json_body(resp).await?)),
            StatusCode::ACCEPTED => Ok(ReceiptResponse::Pending),
            status => Err(LedgerError::ReceiptUnavailable {
                seqno,
                reason: format!("status {status}: {}", resp.text().await.unwrap_or_default()),
            }),
        }
    }

    async fn transaction_status(&self, tx: TransactionId) -> Result<TxStatus> {
        let mut url = self.url("node/tx")?;
        url.query_pairs_mut()
            .append_pair("transaction_id", &tx.to_string());
        let resp = self.http.get(url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LedgerError::Transport(format!(
                "transaction status for {tx} returned {status}"
            )));
        }
        let body: TxStatusBody = resp
            .json()
            .await
            .map_err(|e| LedgerError::MalformedResponse(format!("transaction status: {e}")))?;
        Ok(body.status)
    }
}

#[async_trait]
impl Governance for HttpLedgerClient {
    async fn propose(&self, proposal: &Proposal) -> Result<ProposalOutcome> {
        let resp = self
            .http
            .post(self.url("gov/proposals")?)
            .json(proposal)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            debug!(status, proposal = proposal.name(), "proposal refused");
            return Ok(ProposalOutcome {
                status,
                state: None,
                proposal_id: None,
            });
        }
        let body: ProposalBody = serde_json::from_value(Self::json_body(resp).await?)
            .map_err(|e| LedgerError::MalformedResponse(format!("proposal response: {e}")))?;
        Ok(ProposalOutcome {
            status,
            state: body.state,
            proposal_id: body.proposal_id,
        })
    }
}
