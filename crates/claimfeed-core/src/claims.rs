//! Claim sets.
//!
//! Claims are an open JSON object. Only two members are required: `iss`, the
//! issuer identity, and `sub`, the subject the claim is about. Everything
//! else is carried through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};
use crate::issuer::Issuer;

/// Replace path separators in a subject so it can be used as a file stem.
pub fn escape_subject(subject: &str) -> String {
    subject.replace('/', "_")
}

/// An open claim set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    /// Create an empty claim set.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wrap a JSON value. Fails unless the value is an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(CoreError::invalid_claims(format!(
                "claims must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Parse a claim set from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| CoreError::invalid_claims(format!("claims are not valid JSON: {e}")))?;
        Self::from_value(value)
    }

    /// The raw `iss` value, if it is a string.
    pub fn issuer(&self) -> Option<&str> {
        self.0.get("iss").and_then(Value::as_str)
    }

    /// The raw `sub` value, if it is a string.
    pub fn subject(&self) -> Option<&str> {
        self.0.get("sub").and_then(Value::as_str)
    }

    /// Stamp the issuer.
    pub fn set_issuer(&mut self, issuer: &Issuer) {
        self.0.insert("iss".into(), Value::String(issuer.to_claim()));
    }

    /// Stamp the subject.
    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.0.insert("sub".into(), Value::String(subject.into()));
    }

    /// Insert an arbitrary member, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Look up a member.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Borrow the underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Convert into a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Check the `iss` and `sub` invariants.
    ///
    /// `iss` must be a non-empty string matching the issuer pattern and `sub`
    /// a non-empty string. Nothing else is inspected.
    pub fn validate(&self) -> Result<ValidatedClaims> {
        let iss = match self.0.get("iss") {
            None | Some(Value::Null) => {
                return Err(CoreError::invalid_claims("\"iss\" claim missing"))
            }
            Some(Value::String(s)) if s.is_empty() => {
                return Err(CoreError::invalid_claims("\"iss\" claim missing"))
            }
            Some(Value::String(s)) => s,
            Some(other) => {
                return Err(CoreError::invalid_claims(format!(
                    "\"iss\" claim must be a string, got {}",
                    json_kind(other)
                )))
            }
        };
        let issuer = Issuer::parse(iss)?;

        let subject = match self.0.get("sub") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::String(_)) | None | Some(Value::Null) => {
                return Err(CoreError::invalid_claims("\"sub\" claim missing"))
            }
            Some(other) => {
                return Err(CoreError::invalid_claims(format!(
                    "\"sub\" claim must be a string, got {}",
                    json_kind(other)
                )))
            }
        };

        Ok(ValidatedClaims { issuer, subject })
    }
}

impl TryFrom<Value> for Claims {
    type Error = CoreError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

/// The identity fields of a claim set that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedClaims {
    pub issuer: Issuer,
    pub subject: String,
}

impl ValidatedClaims {
    /// File stem the artifacts for this claim set are stored under.
    pub fn file_stem(&self) -> String {
        escape_subject(&self.subject)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
