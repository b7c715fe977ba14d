//! # Claimfeed Store
//!
//! Filesystem persistence for claimfeed feeds.
//!
//! ## Overview
//!
//! Every feed lives in its own directory under a data root, named after the
//! issuer's short name:
//!
//! ```text
//! data/
//!   acme/
//!     key.pem                        private key (sensitive)
//!     cert.pem                       self-signed certificate
//!     certs                          published JWKS
//!     .well-known/openid-configuration
//!     widget-1.json                  claims
//!     widget-1.jwt                   signed token
//!     widget-1.receipt.json          combined ledger record
//! ```
//!
//! ## Key Types
//!
//! - [`DataDir`] / [`FeedDir`] - Path layout of the data root and one feed
//! - [`KeyMaterialStore`] - Lazily creates, then always reloads, issuer keys
//! - [`ArtifactWriter`] - Writes claims and signed tokens side by side
//!
//! ## Usage
//!
//! ```rust,no_run
//! use claimfeed_core::Claims;
//! use claimfeed_store::{ArtifactWriter, DataDir};
//! use serde_json::json;
//!
//! let data_dir = DataDir::create("data").unwrap();
//! let writer = ArtifactWriter::new(data_dir);
//!
//! let claims = Claims::from_value(json!({"iss": "localhost/acme", "sub": "widget-1"})).unwrap();
//! let paths = writer.write(&claims).unwrap();
//! println!("wrote {}", paths.token.display());
//! ```
//!
//! ## Design Notes
//!
//! - **Create once**: key material is generated only when `key.pem` is absent.
//! - **Serialised creation**: first-time creation holds an exclusive advisory
//!   lock on the feed's `.key.lock`, so concurrent creators agree on one key.
//! - **Overwrite**: rewriting an `(issuer, subject)` replaces both files.

pub mod error;
pub mod files;
pub mod keys;
pub mod layout;
pub mod publish;
pub mod writer;

pub use error::{Result, StoreError};
pub use keys::KeyMaterialStore;
pub use layout::{DataDir, FeedDir};
pub use publish::{publish, read_discovery, read_jwks};
pub use writer::{ArtifactPaths, ArtifactWriter};
