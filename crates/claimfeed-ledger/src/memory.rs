//! An in-memory ledger for tests and dry runs.
//!
//! Behaves like the real service where the pipeline can observe it: tokens
//! are verified against the key sets installed through governance, every
//! accepted submission gets the next sequence number, commit and receipt
//! availability lag behind by a configurable number of polls.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use claimfeed_core::{token_key_id, verify, Issuer, Jwks};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::bootstrap::{
    Governance, Proposal, ProposalOutcome, ProposalState, SET_CA_CERT_BUNDLE, SET_JWT_ISSUER,
};
use crate::client::{Ledger, ReceiptResponse, Submission, TransactionId, TxStatus};
use crate::error::{LedgerError, Result};

/// Tunables for [`MemoryLedger`].
#[derive(Debug, Clone)]
pub struct MemoryLedgerConfig {
    /// View all transactions are assigned to.
    pub view: u64,
    /// Sequence number of the first submission.
    pub first_seqno: u64,
    /// Status polls answered `Pending` before a transaction commits.
    pub commit_after_polls: u32,
    /// Receipt requests answered "not ready" after commit.
    pub receipt_after_polls: u32,
    /// Answer every governance proposal with `Rejected`.
    pub reject_proposals: bool,
    /// Report every submission as `Invalid`.
    pub invalidate_submissions: bool,
}

impl Default for MemoryLedgerConfig {
    fn default() -> Self {
        Self {
            view: 2,
            first_seqno: 1,
            commit_after_polls: 1,
            receipt_after_polls: 1,
            reject_proposals: false,
            invalidate_submissions: false,
        }
    }
}

#[derive(Debug)]
struct Entry {
    token: String,
    invalid: bool,
    committed: bool,
    status_polls: u32,
    receipt_polls: u32,
}

#[derive(Debug, Default)]
struct State {
    next_seqno: u64,
    ca_bundles: HashMap<String, String>,
    jwt_issuers: HashMap<String, Jwks>,
    registered: BTreeSet<String>,
    entries: BTreeMap<u64, Entry>,
    proposals: Vec<Proposal>,
}

/// In-memory ledger implementation.
pub struct MemoryLedger {
    config: MemoryLedgerConfig,
    state: Mutex<State>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::with_config(MemoryLedgerConfig::default())
    }

    pub fn with_config(config: MemoryLedgerConfig) -> Self {
        let state = State {
            next_seqno: config.first_seqno,
            ..State::default()
        };
        Self {
            config,
            state: Mutex::new(state),
        }
    }

    /// Install an issuer's key set directly, bypassing governance.
    pub async fn trust_jwks(&self, issuer: &Issuer, jwks: Jwks) {
        let mut state = self.state.lock().await;
        state.jwt_issuers.insert(issuer.jwt_issuer_url(), jwks);
    }

    /// Append an already-committed entry without verifying it.
    pub async fn append_committed(&self, token: &str) -> TransactionId {
        let mut state = self.state.lock().await;
        let seqno = state.next_seqno;
        state.next_seqno += 1;
        state.entries.insert(
            seqno,
            Entry {
                token: token.to_string(),
                invalid: false,
                committed: true,
                status_polls: 0,
                receipt_polls: 0,
            },
        );
        TransactionId::new(self.config.view, seqno)
    }

    /// Issuers registered so far, as `localhost/<name>`.
    pub async fn registered_issuers(&self) -> Vec<String> {
        self.state.lock().await.registered.iter().cloned().collect()
    }

    /// Every proposal received, in order.
    pub async fn proposals(&self) -> Vec<Proposal> {
        self.state.lock().await.proposals.clone()
    }

    /// The CA bundle installed under `name`, if any.
    pub async fn ca_bundle(&self, name: &str) -> Option<String> {
        self.state.lock().await.ca_bundles.get(name).cloned()
    }

    /// Number of submissions accepted.
    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn receipt_for(&self, seqno: u64, token: &str) -> Value {
        let digest = Sha256::digest(token.as_bytes());
        json!({
            "node_id": "memory",
            "leaf_components": {
                "claims_digest": hex::encode(digest),
                "commit_evidence": format!("ce:{}.{}", self.config.view, seqno),
            },
            "proof": [],
        })
    }

    fn apply(state: &mut State, proposal: &Proposal) -> ProposalState {
        for action in &proposal.actions {
            match action.name.as_str() {
                SET_CA_CERT_BUNDLE => {
                    let (Some(name), Some(bundle)) = (
                        action.args["name"].as_str(),
                        action.args["cert_bundle"].as_str(),
                    ) else {
                        return ProposalState::Failed;
                    };
                    state.ca_bundles.insert(name.to_string(), bundle.to_string());
                }
                SET_JWT_ISSUER => {
                    let Some(issuer) = action.args["issuer"].as_str() else {
                        return ProposalState::Failed;
                    };
                    let bundle_known = action.args["ca_cert_bundle_name"]
                        .as_str()
                        .is_some_and(|name| state.ca_bundles.contains_key(name));
                    let jwks = serde_json::from_value::<Jwks>(action.args["jwks"].clone());
                    match (bundle_known, jwks) {
                        (true, Ok(jwks)) => {
                            state.jwt_issuers.insert(issuer.to_string(), jwks);
                        }
                        _ => return ProposalState::Failed,
                    }
                }
                _ => return ProposalState::Failed,
            }
        }
        ProposalState::Accepted
    }
}

fn rejected(status: u16, body: impl Into<String>) -> LedgerError {
    LedgerError::SubmissionRejected {
        status,
        body: body.into(),
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn register_issuer(&self, issuer: &Issuer) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.jwt_issuers.contains_key(&issuer.jwt_issuer_url()) {
            return Err(LedgerError::RegistrationRejected { status: 403 });
        }
        state.registered.insert(issuer.to_claim());
        Ok(())
    }

    async fn submit(&self, token: &str) -> Result<Submission> {
        let token = token.trim();
        let kid = token_key_id(token).map_err(|e| rejected(400, e.to_string()))?;
        let issuer = Issuer::from_name(&kid).map_err(|e| rejected(400, e.to_string()))?;

        let mut state = self.state.lock().await;
        if !state.registered.contains(&issuer.to_claim()) {
            return Err(rejected(403, format!("issuer {issuer} is not registered")));
        }
        let jwks = state
            .jwt_issuers
            .get(&issuer.jwt_issuer_url())
            .ok_or_else(|| rejected(403, format!("no key set for {issuer}")))?;
        let claims = verify(token, jwks).map_err(|e| rejected(400, e.to_string()))?;

        let seqno = state.next_seqno;
        state.next_seqno += 1;
        state.entries.insert(
            seqno,
            Entry {
                token: token.to_string(),
                invalid: self.config.invalidate_submissions,
                committed: false,
                status_polls: 0,
                receipt_polls: 0,
            },
        );

        Ok(Submission {
            transaction_id: TransactionId::new(self.config.view, seqno),
            body: json!({
                "issuer": claims.issuer(),
                "subject": claims.subject(),
            }),
        })
    }

    async fn receipt(&self, seqno: u64) -> Result<ReceiptResponse> {
        let mut state = self.state.lock().await;
        let unavailable = |reason: &str| LedgerError::ReceiptUnavailable {
            seqno,
            reason: reason.to_string(),
        };
        let entry = state
            .entries
            .get_mut(&seqno)
            .ok_or_else(|| unavailable("unknown seqno"))?;
        if !entry.committed {
            return Err(unavailable("not committed"));
        }
        entry.receipt_polls = entry.receipt_polls.saturating_add(1);
        if entry.receipt_polls <= self.config.receipt_after_polls {
            return Ok(ReceiptResponse::Pending);
        }
        let token = entry.token.clone();
        Ok(ReceiptResponse::Ready(self.receipt_for(seqno, &token)))
    }

    async fn transaction_status(&self, tx: TransactionId) -> Result<TxStatus> {
        if tx.view != self.config.view {
            return Ok(TxStatus::Unknown);
        }
        let mut state = self.state.lock().await;
        let Some(entry) = state.entries.get_mut(&tx.seqno) else {
            return Ok(TxStatus::Unknown);
        };
        if entry.invalid {
            return Ok(TxStatus::Invalid);
        }
        if !entry.committed {
            entry.status_polls = entry.status_polls.saturating_add(1);
            entry.committed = entry.status_polls > self.config.commit_after_polls;
        }
        Ok(if entry.committed {
            TxStatus::Committed
        } else {
            TxStatus::Pending
        })
    }
}

#[async_trait]
impl Governance for MemoryLedger {
    async fn propose(&self, proposal: &Proposal) -> Result<ProposalOutcome> {
        let mut state = self.state.lock().await;
        state.proposals.push(proposal.clone());
        let proposal_id = format!("p{}", state.proposals.len());

        let proposal_state = if self.config.reject_proposals {
            ProposalState::Rejected
        } else {
            Self::apply(&mut state, proposal)
        };
        Ok(ProposalOutcome {
            status: 200,
            state: Some(proposal_state),
            proposal_id: Some(proposal_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimfeed_core::{sign, Claims, KeyMaterial};
    use serde_json::json;

    struct Signer {
        issuer: Issuer,
        material: KeyMaterial,
    }

    impl Signer {
        fn new(name: &str) -> Self {
            let issuer = Issuer::from_name(name).unwrap();
            let material = KeyMaterial::generate(&issuer).unwrap();
            Self { issuer, material }
        }

        fn jwks(&self) -> Jwks {
            Jwks::from_key_material(&self.issuer, &self.material)
        }

        fn token(&self, subject: &str) -> String {
            let claims = Claims::from_value(json!({
                "iss": self.issuer.to_claim(),
                "sub": subject,
            }))
            .unwrap();
            sign(&claims, &self.material).unwrap()
        }
    }

    async fn trusted_ledger(signer: &Signer, config: MemoryLedgerConfig) -> MemoryLedger {
        let ledger = MemoryLedger::with_config(config);
        ledger.trust_jwks(&signer.issuer, signer.jwks()).await;
        ledger.register_issuer(&signer.issuer).await.unwrap();
        ledger
    }

    #[tokio::test]
    async fn test_register_requires_trusted_issuer() {
        let ledger = MemoryLedger::new();
        let issuer = Issuer::from_name("acme").unwrap();
        assert!(matches!(
            ledger.register_issuer(&issuer).await,
            Err(LedgerError::RegistrationRejected { status: 403 })
        ));
    }

    #[tokio::test]
    async fn test_submissions_get_consecutive_seqnos() {
        let signer = Signer::new("acme");
        let ledger = trusted_ledger(
            &signer,
            MemoryLedgerConfig {
                first_seqno: 42,
                ..MemoryLedgerConfig::default()
            },
        )
        .await;

        let a = ledger.submit(&signer.token("a")).await.unwrap();
        let b = ledger.submit(&signer.token("b")).await.unwrap();
        assert_eq!(a.transaction_id, TransactionId::new(2, 42));
        assert_eq!(b.transaction_id, TransactionId::new(2, 43));
        assert_eq!(a.body["subject"], "a");
        assert_eq!(a.data().unwrap().seqno, 42);
    }

    #[tokio::test]
    async fn test_token_from_untrusted_key_rejected() {
        let signer = Signer::new("acme");
        let impostor = Signer::new("acme");
        let ledger = trusted_ledger(&signer, MemoryLedgerConfig::default()).await;

        let err = ledger.submit(&impostor.token("a")).await.unwrap_err();
        assert!(matches!(err, LedgerError::SubmissionRejected { status: 400, .. }));
        assert!(ledger.is_empty().await);
    }

    #[tokio::test]
    async fn test_unregistered_issuer_rejected() {
        let signer = Signer::new("acme");
        let ledger = MemoryLedger::new();
        ledger.trust_jwks(&signer.issuer, signer.jwks()).await;

        let err = ledger.submit(&signer.token("a")).await.unwrap_err();
        assert!(matches!(err, LedgerError::SubmissionRejected { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_commit_and_receipt_lag() {
        let signer = Signer::new("acme");
        let ledger = trusted_ledger(&signer, MemoryLedgerConfig::default()).await;
        let tx = ledger.submit(&signer.token("a")).await.unwrap().transaction_id;

        assert!(ledger.receipt(tx.seqno).await.is_err());
        assert_eq!(ledger.transaction_status(tx).await.unwrap(), TxStatus::Pending);
        assert_eq!(ledger.transaction_status(tx).await.unwrap(), TxStatus::Committed);
        assert_eq!(ledger.receipt(tx.seqno).await.unwrap(), ReceiptResponse::Pending);
        match ledger.receipt(tx.seqno).await.unwrap() {
            ReceiptResponse::Ready(receipt) => assert_eq!(receipt["node_id"], "memory"),
            other => panic!("unexpected receipt response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_wrong_view_is_unknown() {
        let ledger = MemoryLedger::new();
        let tx = ledger.append_committed("token").await;
        let other_view = TransactionId::new(tx.view + 1, tx.seqno);
        assert_eq!(ledger.transaction_status(other_view).await.unwrap(), TxStatus::Unknown);
        assert_eq!(ledger.transaction_status(tx).await.unwrap(), TxStatus::Committed);
    }

    #[tokio::test]
    async fn test_governance_installs_issuer() {
        let signer = Signer::new("acme");
        let ledger = MemoryLedger::new();
        let url = signer.issuer.jwt_issuer_url();

        let ca = ledger
            .propose(&Proposal::set_ca_cert_bundle(&url, signer.material.cert_pem()))
            .await
            .unwrap();
        assert!(ca.is_accepted());
        let jwt = ledger
            .propose(&Proposal::set_jwt_issuer(&signer.issuer, &url, &signer.jwks()).unwrap())
            .await
            .unwrap();
        assert!(jwt.is_accepted());

        ledger.register_issuer(&signer.issuer).await.unwrap();
        ledger.submit(&signer.token("a")).await.unwrap();
        assert_eq!(ledger.ca_bundle(&url).await.as_deref(), Some(signer.material.cert_pem()));
    }

    #[tokio::test]
    async fn test_jwt_issuer_needs_ca_bundle_first() {
        let signer = Signer::new("acme");
        let ledger = MemoryLedger::new();
        let outcome = ledger
            .propose(
                &Proposal::set_jwt_issuer(&signer.issuer, "https://localhost/acme", &signer.jwks())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.state, Some(ProposalState::Failed));
        assert!(!outcome.is_accepted());
    }
}
