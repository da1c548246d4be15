use crate::Result;
use serde::{Deserialize, Serialize};

/// Unique identifier of one task run, assigned monotonically by the
/// external scheduler.
pub type RunId = u64;

/// Opaque task definition carried by a request.
///
/// The worker core never interprets the payload; it only transports it to
/// the handler. The schema version lets handlers evolve their own payload
/// format without the core knowing about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub schema_version: u32,
    pub payload: Vec<u8>,
}

impl TaskDefinition {
    pub fn new(schema_version: u32, payload: Vec<u8>) -> Self {
        TaskDefinition {
            schema_version,
            payload,
        }
    }
}

/// One unit of work pulled from the request stream. Immutable once decoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    pub run_id: RunId,
    pub definition: TaskDefinition,
}

impl TaskRequest {
    pub fn new(run_id: RunId, definition: TaskDefinition) -> Self {
        TaskRequest { run_id, definition }
    }

    /// Decode a request from a message body.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Serialize a request for publishing.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_decode() {
        let request = TaskRequest::new(42, TaskDefinition::new(1, b"payload".to_vec()));
        let bytes = request.to_bytes().unwrap();

        let decoded = TaskRequest::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.run_id, 42);
        assert_eq!(decoded.definition.schema_version, 1);
        assert_eq!(decoded.definition.payload, b"payload");
    }

    #[test]
    fn test_request_decode_poison() {
        let result = TaskRequest::from_bytes(b"not a task request");
        assert!(result.is_err());
    }
}
