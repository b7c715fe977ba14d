//! Error types for claimfeed core.

use thiserror::Error;

/// Errors that can occur while validating, signing, or verifying claims.
#[derive(Debug, Error)]
pub enum CoreError {
    /// `iss` or `sub` is missing, empty, or malformed.
    #[error("invalid claims: {0}")]
    InvalidClaims(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("token verification failed: {0}")]
    Verification(String),

    /// No key in the key set matches the token's key id.
    #[error("no published key with kid {0:?}")]
    UnknownKey(String),

    /// Key or certificate material could not be generated or parsed.
    #[error("key material error: {0}")]
    KeyMaterial(String),

    #[error("encoding error: {0}")]
    Encoding(String),
}

impl CoreError {
    /// Shorthand for an [`CoreError::InvalidClaims`] error.
    pub fn invalid_claims(msg: impl Into<String>) -> Self {
        Self::InvalidClaims(msg.into())
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
