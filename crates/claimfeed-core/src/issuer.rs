//! Issuer identities.
//!
//! An issuer is the signing identity behind a feed. It is written as
//! `localhost/<name>`, where `<name>` is a path-safe feed identifier made of
//! word characters and hyphens. The short name selects the issuer's key
//! material and directory, and doubles as the key id of its tokens.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{CoreError, Result};

/// Prefix every issuer identity carries.
pub const ISSUER_PREFIX: &str = "localhost/";

/// Pattern an `iss` claim must match. Anchored at the start only.
pub const ISSUER_PATTERN: &str = r"^localhost/([\w-]+)";

fn issuer_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(ISSUER_PATTERN).expect("issuer pattern is valid"))
}

fn name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\w-]+$").expect("name pattern is valid"))
}

/// A feed issuer, identified by its short name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Issuer {
    name: String,
}

impl Issuer {
    /// Parse an `iss` claim value.
    ///
    /// The short name is the leading `[\w-]+` run after `localhost/`.
    pub fn parse(iss: &str) -> Result<Self> {
        let captures = issuer_regex().captures(iss).ok_or_else(|| {
            CoreError::invalid_claims(format!(
                "\"iss\" claim must match {ISSUER_PATTERN}, got {iss:?}"
            ))
        })?;
        Ok(Self {
            name: captures[1].to_string(),
        })
    }

    /// Build an issuer from its short name (e.g. a feed directory name).
    pub fn from_name(name: &str) -> Result<Self> {
        if !name_regex().is_match(name) {
            return Err(CoreError::invalid_claims(format!(
                "issuer name must be word characters or hyphens, got {name:?}"
            )));
        }
        Ok(Self {
            name: name.to_string(),
        })
    }

    /// The short name, e.g. `acme` for `localhost/acme`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `iss` claim value, `localhost/<name>`.
    pub fn to_claim(&self) -> String {
        format!("{ISSUER_PREFIX}{}", self.name)
    }

    /// The URL the ledger knows this issuer by when trusting its tokens.
    pub fn jwt_issuer_url(&self) -> String {
        format!("https://{ISSUER_PREFIX}{}", self.name)
    }

    /// Where the issuer's key set is served from.
    pub fn jwks_uri(&self) -> String {
        format!("{}/certs", self.jwt_issuer_url())
    }
}

impl fmt::Debug for Issuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Issuer({})", self.to_claim())
    }
}

impl fmt::Display for Issuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{ISSUER_PREFIX}{}", self.name)
    }
}
