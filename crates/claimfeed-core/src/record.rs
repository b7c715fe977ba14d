//! Combined receipt records.
//!
//! A combined record is the ledger's receipt for a committed submission with
//! the submission response merged in under `data`. It is the durable proof a
//! downstream consumer reads back: `data` names the issuer, subject, and
//! sequence number, the remaining members are the receipt as issued.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};

/// Submission response data as returned by the ledger application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionData {
    pub issuer: String,
    pub subject: String,
    pub seqno: u64,
    /// Any further fields the ledger returned.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A receipt merged with its submission data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedRecord {
    /// Receipt members, verbatim.
    #[serde(flatten)]
    pub receipt: Map<String, Value>,
    pub data: SubmissionData,
}

impl CombinedRecord {
    /// Merge a receipt with submission data.
    ///
    /// The receipt must be a JSON object. A `data` member in the receipt is
    /// replaced by the submission data.
    pub fn merge(receipt: Value, data: SubmissionData) -> Result<Self> {
        let mut receipt = match receipt {
            Value::Object(map) => map,
            _ => return Err(CoreError::Encoding("receipt is not a JSON object".into())),
        };
        receipt.remove("data");
        Ok(Self { receipt, data })
    }

    /// The sequence number the submission committed at.
    pub fn seqno(&self) -> u64 {
        self.data.seqno
    }

    /// Parse a record from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| CoreError::Encoding(e.to_string()))
    }

    /// Serialize as pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| CoreError::Encoding(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(seqno: u64) -> SubmissionData {
        serde_json::from_value(json!({
            "issuer": "localhost/acme",
            "subject": "widget-1",
            "seqno": seqno,
        }))
        .unwrap()
    }

    #[test]
    fn test_merge_flattens_receipt() {
        let receipt = json!({"cert": "PEM", "signature": "abc", "leaf_components": {}});
        let record = CombinedRecord::merge(receipt, data(42)).unwrap();
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["signature"], "abc");
        assert_eq!(value["data"]["seqno"], 42);
        assert_eq!(value["data"]["subject"], "widget-1");
    }

    #[test]
    fn test_merge_replaces_receipt_data() {
        let receipt = json!({"data": "stale", "signature": "abc"});
        let record = CombinedRecord::merge(receipt, data(7)).unwrap();
        let json = record.to_json_pretty().unwrap();

        assert_eq!(json.matches("\"data\"").count(), 1);
        let back = CombinedRecord::from_slice(json.as_bytes()).unwrap();
        assert_eq!(back.seqno(), 7);
        assert_eq!(back, record);
    }

    #[test]
    fn test_extra_data_fields_survive() {
        let data: SubmissionData = serde_json::from_value(json!({
            "issuer": "localhost/acme",
            "subject": "widget-1",
            "seqno": 3,
            "view": 2,
        }))
        .unwrap();
        assert_eq!(data.extra["view"], 2);
    }

    #[test]
    fn test_non_object_receipt_rejected() {
        assert!(CombinedRecord::merge(json!("receipt"), data(1)).is_err());
    }
}
