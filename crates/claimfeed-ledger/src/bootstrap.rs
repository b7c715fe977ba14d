//! Establishing ledger trust in an issuer.
//!
//! Before a ledger accepts an issuer's tokens it must trust the issuer's
//! certificate chain and know its key set. Ledgers without first-class
//! support for that are configured through governance proposals
//! ([`GovernanceBootstrap`]); ledgers that handle it themselves use
//! [`NoTrustBootstrap`].

use async_trait::async_trait;
use claimfeed_core::{CoreError, Issuer, Jwks};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::error::{LedgerError, Result};

/// Governance action installing a named CA certificate bundle.
pub const SET_CA_CERT_BUNDLE: &str = "set_ca_cert_bundle";

/// Governance action installing a JWT issuer and its key set.
pub const SET_JWT_ISSUER: &str = "set_jwt_issuer";

/// A governance proposal: one or more actions voted on together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub actions: Vec<ProposalAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalAction {
    pub name: String,
    pub args: Value,
}

impl Proposal {
    pub fn single(name: impl Into<String>, args: Value) -> Self {
        Self {
            actions: vec![ProposalAction {
                name: name.into(),
                args,
            }],
        }
    }

    /// Trust `bundle` (PEM) under `name`.
    pub fn set_ca_cert_bundle(name: &str, bundle: &str) -> Self {
        Self::single(SET_CA_CERT_BUNDLE, json!({"name": name, "cert_bundle": bundle}))
    }

    /// Accept tokens from `issuer`, verified against `jwks` and refreshed
    /// automatically through the CA bundle named `ca_bundle_name`.
    pub fn set_jwt_issuer(issuer: &Issuer, ca_bundle_name: &str, jwks: &Jwks) -> Result<Self> {
        let jwks = serde_json::to_value(jwks).map_err(|e| CoreError::Encoding(e.to_string()))?;
        Ok(Self::single(
            SET_JWT_ISSUER,
            json!({
                "issuer": issuer.jwt_issuer_url(),
                "auto_refresh": true,
                "ca_cert_bundle_name": ca_bundle_name,
                "key_filter": "all",
                "jwks": jwks,
            }),
        ))
    }

    /// Name of the first action, for diagnostics.
    pub fn name(&self) -> &str {
        self.actions.first().map(|a| a.name.as_str()).unwrap_or("empty")
    }
}

/// Lifecycle state of a proposal as reported by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalState {
    Open,
    Accepted,
    Withdrawn,
    Rejected,
    Failed,
    Dropped,
}

/// What the ledger answered to a proposal.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalOutcome {
    /// HTTP status code, or its equivalent.
    pub status: u16,
    pub state: Option<ProposalState>,
    pub proposal_id: Option<String>,
}

impl ProposalOutcome {
    /// A proposal counts as accepted when the request succeeded and the
    /// proposal is either already applied or open for votes.
    pub fn is_accepted(&self) -> bool {
        (200..300).contains(&self.status)
            && matches!(
                self.state,
                None | Some(ProposalState::Accepted) | Some(ProposalState::Open)
            )
    }
}

/// Governance endpoint of a ledger.
#[async_trait]
pub trait Governance: Send + Sync {
    /// Submit a proposal as the configured member.
    async fn propose(&self, proposal: &Proposal) -> Result<ProposalOutcome>;
}

#[async_trait]
impl<G: Governance + ?Sized> Governance for std::sync::Arc<G> {
    async fn propose(&self, proposal: &Proposal) -> Result<ProposalOutcome> {
        (**self).propose(proposal).await
    }
}

/// Makes the ledger trust an issuer before any of its tokens are submitted.
#[async_trait]
pub trait TrustBootstrap: Send + Sync {
    /// Trust the CA bundle tokens of `issuer` chain to.
    ///
    /// `issuer_cert_pem` is the issuer's own certificate, used when no other
    /// bundle was configured.
    async fn trust_ca(&self, issuer: &Issuer, issuer_cert_pem: &str) -> Result<()>;

    /// Install the issuer and its published key set.
    async fn trust_issuer(&self, issuer: &Issuer, jwks: &Jwks) -> Result<()>;
}

/// Trust established through governance proposals.
#[derive(Debug, Clone)]
pub struct GovernanceBootstrap<G> {
    governance: G,
    ca_bundle: Option<String>,
}

impl<G: Governance> GovernanceBootstrap<G> {
    pub fn new(governance: G) -> Self {
        Self {
            governance,
            ca_bundle: None,
        }
    }

    /// Propose this PEM bundle instead of the issuer's certificate.
    pub fn with_ca_bundle(mut self, pem: impl Into<String>) -> Self {
        self.ca_bundle = Some(pem.into());
        self
    }

    pub fn governance(&self) -> &G {
        &self.governance
    }

    async fn propose(&self, proposal: Proposal) -> Result<()> {
        let outcome = self.governance.propose(&proposal).await?;
        if !outcome.is_accepted() {
            return Err(LedgerError::GovernanceRejected {
                proposal: proposal.name().to_string(),
                reason: match outcome.state {
                    Some(state) => format!("status {}, state {state:?}", outcome.status),
                    None => format!("status {}", outcome.status),
                },
            });
        }
        info!(
            proposal = proposal.name(),
            proposal_id = outcome.proposal_id.as_deref().unwrap_or("-"),
            state = ?outcome.state,
            "governance proposal accepted"
        );
        Ok(())
    }
}

#[async_trait]
impl<G: Governance> TrustBootstrap for GovernanceBootstrap<G> {
    async fn trust_ca(&self, issuer: &Issuer, issuer_cert_pem: &str) -> Result<()> {
        let bundle = self.ca_bundle.as_deref().unwrap_or(issuer_cert_pem);
        self.propose(Proposal::set_ca_cert_bundle(&issuer.jwt_issuer_url(), bundle))
            .await
    }

    async fn trust_issuer(&self, issuer: &Issuer, jwks: &Jwks) -> Result<()> {
        self.propose(Proposal::set_jwt_issuer(issuer, &issuer.jwt_issuer_url(), jwks)?)
            .await
    }
}

/// For ledgers that establish issuer trust on their own.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTrustBootstrap;

#[async_trait]
impl TrustBootstrap for NoTrustBootstrap {
    async fn trust_ca(&self, _issuer: &Issuer, _issuer_cert_pem: &str) -> Result<()> {
        Ok(())
    }

    async fn trust_issuer(&self, _issuer: &Issuer, _jwks: &Jwks) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        outcome: ProposalOutcome,
        seen: Mutex<Vec<Proposal>>,
    }

    impl Recorder {
        fn answering(status: u16, state: Option<ProposalState>) -> Self {
            Self {
                outcome: ProposalOutcome {
                    status,
                    state,
                    proposal_id: Some("p1".into()),
                },
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Governance for Recorder {
        async fn propose(&self, proposal: &Proposal) -> Result<ProposalOutcome> {
            self.seen.lock().unwrap().push(proposal.clone());
            Ok(self.outcome.clone())
        }
    }

    fn issuer() -> Issuer {
        Issuer::from_name("acme").unwrap()
    }

    #[test]
    fn test_acceptance_rules() {
        let outcome = |status, state| ProposalOutcome {
            status,
            state,
            proposal_id: None,
        };
        assert!(outcome(200, None).is_accepted());
        assert!(outcome(200, Some(ProposalState::Accepted)).is_accepted());
        assert!(outcome(200, Some(ProposalState::Open)).is_accepted());
        assert!(!outcome(200, Some(ProposalState::Rejected)).is_accepted());
        assert!(!outcome(403, None).is_accepted());
    }

    #[tokio::test]
    async fn test_ca_proposal_defaults_to_issuer_cert() {
        let bootstrap = GovernanceBootstrap::new(Recorder::answering(200, None));
        bootstrap.trust_ca(&issuer(), "ISSUER PEM").await.unwrap();

        let seen = bootstrap.governance().seen.lock().unwrap();
        assert_eq!(seen[0].name(), SET_CA_CERT_BUNDLE);
        assert_eq!(seen[0].actions[0].args["name"], "https://localhost/acme");
        assert_eq!(seen[0].actions[0].args["cert_bundle"], "ISSUER PEM");
    }

    #[tokio::test]
    async fn test_ca_bundle_override() {
        let bootstrap =
            GovernanceBootstrap::new(Recorder::answering(200, None)).with_ca_bundle("TLS PEM");
        bootstrap.trust_ca(&issuer(), "ISSUER PEM").await.unwrap();

        let seen = bootstrap.governance().seen.lock().unwrap();
        assert_eq!(seen[0].actions[0].args["cert_bundle"], "TLS PEM");
    }

    #[tokio::test]
    async fn test_jwt_issuer_proposal_shape() {
        let bootstrap =
            GovernanceBootstrap::new(Recorder::answering(200, Some(ProposalState::Accepted)));
        let jwks = Jwks { keys: vec![] };
        bootstrap.trust_issuer(&issuer(), &jwks).await.unwrap();

        let seen = bootstrap.governance().seen.lock().unwrap();
        let args = &seen[0].actions[0].args;
        assert_eq!(seen[0].name(), SET_JWT_ISSUER);
        assert_eq!(args["issuer"], "https://localhost/acme");
        assert_eq!(args["auto_refresh"], true);
        assert_eq!(args["ca_cert_bundle_name"], "https://localhost/acme");
        assert_eq!(args["jwks"], json!({"keys": []}));
    }

    #[tokio::test]
    async fn test_rejected_proposal_is_an_error() {
        let bootstrap =
            GovernanceBootstrap::new(Recorder::answering(200, Some(ProposalState::Rejected)));
        let err = bootstrap.trust_ca(&issuer(), "PEM").await.unwrap_err();
        match err {
            LedgerError::GovernanceRejected { proposal, .. } => {
                assert_eq!(proposal, SET_CA_CERT_BUNDLE)
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_no_trust_bootstrap_is_a_no_op() {
        NoTrustBootstrap.trust_ca(&issuer(), "PEM").await.unwrap();
        NoTrustBootstrap
            .trust_issuer(&issuer(), &Jwks { keys: vec![] })
            .await
            .unwrap();
    }
}
