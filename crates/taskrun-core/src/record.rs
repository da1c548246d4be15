use crate::RunId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One discrete unit destined for the downstream ingest sink.
///
/// `doc_id` and `doc_index` are content-derived and stamped at flush time,
/// not at enqueue time. Repeated flushes of the same logical record land at
/// the same destination slot, so re-delivery after a retry is idempotent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Caller-supplied identifier for this record.
    pub record_id: String,
    pub run_id: RunId,
    /// Record class, selects the destination index.
    pub record_type: String,
    pub body: serde_json::Value,
    pub created_at: DateTime<Utc>,

    /// Content-addressed destination identity, empty until flush.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub doc_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub doc_index: String,
}

impl ResultRecord {
    pub fn new(
        record_id: impl Into<String>,
        run_id: RunId,
        record_type: impl Into<String>,
        body: serde_json::Value,
    ) -> Self {
        ResultRecord {
            record_id: record_id.into(),
            run_id,
            record_type: record_type.into(),
            body,
            created_at: Utc::now(),
            doc_id: String::new(),
            doc_index: String::new(),
        }
    }

    /// Key fields and destination index for this record.
    pub fn keys_and_index(&self) -> (Vec<String>, String) {
        let keys = vec![
            self.record_id.clone(),
            self.run_id.to_string(),
            self.record_type.clone(),
        ];
        let index = format!(
            "task_results_{}",
            self.record_type.to_lowercase().replace([' ', '-', '.'], "_")
        );
        (keys, index)
    }

    /// Stamp the content-derived destination fields.
    pub fn address(&mut self) {
        let (keys, index) = self.keys_and_index();
        self.doc_id = hash_of(&keys);
        self.doc_index = index;
    }
}

/// Deterministic identity hash over record key fields.
pub fn hash_of(keys: &[String]) -> String {
    let mut hasher = Sha256::new();
    for key in keys {
        hasher.update(key.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hash_is_deterministic() {
        let keys = vec!["a".to_string(), "b".to_string()];
        assert_eq!(hash_of(&keys), hash_of(&keys));
        assert_ne!(hash_of(&keys), hash_of(&["a".to_string(), "c".to_string()]));
    }

    #[test]
    fn test_hash_separates_fields() {
        // "ab" + "c" must not collide with "a" + "bc".
        let left = vec!["ab".to_string(), "c".to_string()];
        let right = vec!["a".to_string(), "bc".to_string()];
        assert_ne!(hash_of(&left), hash_of(&right));
    }

    #[test]
    fn test_addressing_is_idempotent() {
        let mut record = ResultRecord::new("r-1", 7, "Inventory", json!({"count": 3}));
        record.address();

        let doc_id = record.doc_id.clone();
        let doc_index = record.doc_index.clone();
        assert!(!doc_id.is_empty());
        assert_eq!(doc_index, "task_results_inventory");

        record.address();
        assert_eq!(record.doc_id, doc_id);
        assert_eq!(record.doc_index, doc_index);
    }

    #[test]
    fn test_same_content_same_destination() {
        let mut first = ResultRecord::new("r-1", 7, "Inventory", json!({"count": 3}));
        let mut second = ResultRecord::new("r-1", 7, "Inventory", json!({"count": 9}));
        first.address();
        second.address();

        // Identity is derived from the key fields, not the body.
        assert_eq!(first.doc_id, second.doc_id);
        assert_eq!(first.doc_index, second.doc_index);
    }
}
