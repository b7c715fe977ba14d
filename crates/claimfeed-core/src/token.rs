//! Compact signed tokens (JWT).
//!
//! Tokens are signed with the issuer's Ed25519 key. The header carries the
//! issuer's short name as `kid` and the issuer certificate as a one-element
//! `x5c` chain, so a verifier holding only the token can see which key to
//! fetch. Claims are signed exactly as given; no `iat` or `exp` is added.

use base64::{engine::general_purpose::STANDARD, Engine};
use jsonwebtoken::{decode, decode_header, encode, Algorithm, EncodingKey, Header, Validation};
use serde_json::Value;

use crate::claims::Claims;
use crate::crypto::KeyMaterial;
use crate::error::{CoreError, Result};
use crate::jwks::Jwks;

/// Signature algorithm used for every token.
pub const TOKEN_ALGORITHM: Algorithm = Algorithm::EdDSA;

/// Validate `claims` and sign them with `material`.
///
/// Fails with [`CoreError::InvalidClaims`] before any signing work when
/// `iss` or `sub` is unusable.
pub fn sign(claims: &Claims, material: &KeyMaterial) -> Result<String> {
    let validated = claims.validate()?;

    let mut header = Header::new(TOKEN_ALGORITHM);
    header.kid = Some(validated.issuer.name().to_string());
    header.x5c = Some(vec![STANDARD.encode(material.cert_der())]);

    let key = EncodingKey::from_ed_der(&material.pkcs8_der()?);
    encode(&header, claims.as_map(), &key).map_err(|e| CoreError::Signing(e.to_string()))
}

/// The `kid` a token was signed under, without verifying it.
pub fn token_key_id(token: &str) -> Result<String> {
    let header = decode_header(token.trim())
        .map_err(|e| CoreError::Verification(format!("bad token header: {e}")))?;
    header
        .kid
        .ok_or_else(|| CoreError::Verification("token header has no kid".into()))
}

/// Verify a token against a published key set and return its claims.
///
/// The key is selected by the token's `kid`; the claims must name the same
/// issuer the key belongs to. Expiry and audience are not required.
pub fn verify(token: &str, jwks: &Jwks) -> Result<Claims> {
    let token = token.trim();
    let header = decode_header(token)
        .map_err(|e| CoreError::Verification(format!("bad token header: {e}")))?;
    if header.alg != TOKEN_ALGORITHM {
        return Err(CoreError::Verification(format!(
            "unexpected algorithm {:?}",
            header.alg
        )));
    }
    let kid = header
        .kid
        .ok_or_else(|| CoreError::Verification("token header has no kid".into()))?;
    let jwk = jwks
        .find(&kid)
        .ok_or_else(|| CoreError::UnknownKey(kid.clone()))?;

    let mut validation = Validation::new(TOKEN_ALGORITHM);
    validation.required_spec_claims.clear();
    validation.validate_exp = false;
    validation.validate_aud = false;

    let data = decode::<Value>(token, &jwk.decoding_key()?, &validation)
        .map_err(|e| CoreError::Verification(e.to_string()))?;
    let claims = Claims::from_value(data.claims)?;

    let validated = claims.validate()?;
    if validated.issuer.name() != kid {
        return Err(CoreError::Verification(format!(
            "token for issuer {} signed with key {kid:?}",
            validated.issuer
        )));
    }
    Ok(claims)
}
