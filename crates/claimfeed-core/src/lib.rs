//! # Claimfeed Core
//!
//! Pure primitives for claimfeed: issuer identities, claim sets, signed
//! tokens, published key sets, and the records that tie a signed claim to
//! its position in the ledger.
//!
//! This crate contains no file I/O and no networking. Persisting key
//! material and artifacts lives in `claimfeed-store`; talking to the ledger
//! lives in `claimfeed-ledger`.
//!
//! ## Key Types
//!
//! - [`Issuer`] - A `localhost/<name>` signing identity
//! - [`Claims`] - An open JSON claim set carrying `iss` and `sub`
//! - [`KeyMaterial`] - An issuer's Ed25519 key and self-signed certificate
//! - [`Jwks`] - The published key set that verifies an issuer's tokens
//! - [`CombinedRecord`] - A ledger receipt merged with its submission data
//! - [`AuditClaim`] - A claim rendering a verdict on another feed's record
//!
//! ## Signing
//!
//! ```rust
//! use claimfeed_core::{sign, verify, Claims, Issuer, Jwks, KeyMaterial};
//! use serde_json::json;
//!
//! let issuer = Issuer::from_name("acme").unwrap();
//! let material = KeyMaterial::generate(&issuer).unwrap();
//!
//! let claims = Claims::from_value(json!({
//!     "iss": "localhost/acme",
//!     "sub": "widget-1",
//!     "price": 9.99,
//! }))
//! .unwrap();
//!
//! let token = sign(&claims, &material).unwrap();
//! let jwks = Jwks::from_key_material(&issuer, &material);
//! let verified = verify(&token, &jwks).unwrap();
//! assert_eq!(verified.subject(), Some("widget-1"));
//! ```

pub mod audit;
pub mod claims;
pub mod crypto;
pub mod error;
pub mod issuer;
pub mod jwks;
pub mod record;
pub mod token;

pub use audit::{AuditClaim, AuditStatus, ArtifactReference, ARTIFACT_HASH_PLACEHOLDER};
pub use claims::{escape_subject, Claims, ValidatedClaims};
pub use crypto::{pem_to_der, KeyMaterial};
pub use error::{CoreError, Result};
pub use issuer::{Issuer, ISSUER_PATTERN};
pub use jwks::{DiscoveryDocument, Jwk, Jwks};
pub use record::{CombinedRecord, SubmissionData};
pub use token::{sign, token_key_id, verify, TOKEN_ALGORITHM};
