//! Published key sets and discovery documents.
//!
//! Each issuer publishes a single-key JWKS at `<issuer_dir>/certs` and an
//! OpenID-style discovery document pointing at it. The key id is the
//! issuer's short name; the certificate chain has exactly one entry.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use jsonwebtoken::DecodingKey;
use serde::{Deserialize, Serialize};

use crate::crypto::KeyMaterial;
use crate::error::{CoreError, Result};
use crate::issuer::Issuer;

/// JWK key type for Ed25519 keys.
pub const KEY_TYPE_OKP: &str = "OKP";

/// JWK curve name for Ed25519 keys.
pub const CURVE_ED25519: &str = "Ed25519";

/// A single published key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub crv: String,
    /// Base64url public key.
    pub x: String,
    pub kid: String,
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    /// Base64 (not base64url) DER certificates, leaf first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub x5c: Vec<String>,
    #[serde(rename = "x5t#S256", default, skip_serializing_if = "Option::is_none")]
    pub x5t_s256: Option<String>,
}

impl Jwk {
    /// Build the verification key for this entry.
    pub fn decoding_key(&self) -> Result<DecodingKey> {
        if self.kty != KEY_TYPE_OKP || self.crv != CURVE_ED25519 {
            return Err(CoreError::Verification(format!(
                "unsupported key {}/{} for kid {:?}",
                self.kty, self.crv, self.kid
            )));
        }
        DecodingKey::from_ed_components(&self.x)
            .map_err(|e| CoreError::Verification(format!("bad key for kid {:?}: {e}", self.kid)))
    }
}

/// A JSON Web Key Set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

impl Jwks {
    /// Derive the key set for an issuer from its key material.
    ///
    /// Deterministic: the same material always yields the same set.
    pub fn from_key_material(issuer: &Issuer, material: &KeyMaterial) -> Self {
        let key = Jwk {
            kty: KEY_TYPE_OKP.to_string(),
            crv: CURVE_ED25519.to_string(),
            x: URL_SAFE_NO_PAD.encode(material.public_key_bytes()),
            kid: issuer.name().to_string(),
            key_use: Some("sig".to_string()),
            alg: Some("EdDSA".to_string()),
            x5c: vec![STANDARD.encode(material.cert_der())],
            x5t_s256: Some(URL_SAFE_NO_PAD.encode(material.cert_thumbprint())),
        };
        Self { keys: vec![key] }
    }

    /// Find a key by id.
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid == kid)
    }

    /// Serialize as pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| CoreError::Encoding(e.to_string()))
    }
}

/// The `.well-known/openid-configuration` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryDocument {
    pub jwks_uri: String,
}

impl DiscoveryDocument {
    /// Discovery document for an issuer.
    pub fn for_issuer(issuer: &Issuer) -> Self {
        Self {
            jwks_uri: issuer.jwks_uri(),
        }
    }
}
