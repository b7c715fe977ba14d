//! Audit claims: verdicts on another feed's committed records.
//!
//! An audit claim references a committed record by issuer, subject, and
//! sequence number and renders one of two verdicts. Its subject is the
//! referenced subject with an `-audit` suffix.

use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::claims::Claims;
use crate::error::{CoreError, Result};
use crate::issuer::Issuer;
use crate::record::CombinedRecord;

/// Value of `artifactReference.hash` until a content hash is defined.
pub const ARTIFACT_HASH_PLACEHOLDER: &str = "tbd";

/// Suffix appended to the referenced subject.
pub const AUDIT_SUBJECT_SUFFIX: &str = "-audit";

/// Audit outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Approved,
    Rejected,
}

impl AuditStatus {
    /// Every possible outcome.
    pub const ALL: [AuditStatus; 2] = [AuditStatus::Approved, AuditStatus::Rejected];

    /// Pick an outcome at random.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        *Self::ALL.choose(rng).unwrap_or(&AuditStatus::Approved)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AuditStatus::Approved => "approved",
            AuditStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pointer to a committed artifact in another feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactReference {
    pub iss: String,
    pub sub: String,
    pub seqno: u64,
    pub hash: String,
}

/// A claim auditing a committed record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditClaim {
    pub iss: String,
    pub sub: String,
    #[serde(rename = "artifactReference")]
    pub artifact_reference: ArtifactReference,
    pub status: AuditStatus,
}

impl AuditClaim {
    /// Build the audit claim `auditor` issues for `record`.
    pub fn for_record(auditor: &Issuer, record: &CombinedRecord, status: AuditStatus) -> Self {
        Self {
            iss: auditor.to_claim(),
            sub: format!("{}{AUDIT_SUBJECT_SUFFIX}", record.data.subject),
            artifact_reference: ArtifactReference {
                iss: record.data.issuer.clone(),
                sub: record.data.subject.clone(),
                seqno: record.data.seqno,
                hash: ARTIFACT_HASH_PLACEHOLDER.to_string(),
            },
            status,
        }
    }

    /// Convert into a generic claim set.
    pub fn into_claims(self) -> Result<Claims> {
        let value: Value =
            serde_json::to_value(self).map_err(|e| CoreError::Encoding(e.to_string()))?;
        Claims::from_value(value)
    }
}
