use crate::{CoreError, Result, RunId, MAX_RESULT_SIZE};
use serde::{Deserialize, Serialize};

/// Lifecycle phase of a task run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskRunStatus {
    /// The handler is executing.
    InProgress,
    /// The handler returned a result payload.
    Finished,
    /// The handler returned an error or exceeded its deadline.
    Failed,
}

impl TaskRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskRunStatus::InProgress => "in_progress",
            TaskRunStatus::Finished => "finished",
            TaskRunStatus::Failed => "failed",
        }
    }

    /// Whether this phase ends the run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskRunStatus::Finished | TaskRunStatus::Failed)
    }
}

/// Lifecycle status event for one run.
///
/// Created as `InProgress`, mutated in place to exactly one terminal
/// `Finished` or `Failed`, then serialized and published. Never reused
/// across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResponse {
    pub run_id: RunId,
    pub status: TaskRunStatus,

    /// Result payload, present only on `Finished`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Vec<u8>>,

    /// Failure message, present only on `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
}

impl TaskResponse {
    pub fn in_progress(run_id: RunId) -> Self {
        TaskResponse {
            run_id,
            status: TaskRunStatus::InProgress,
            result: None,
            failure_message: None,
        }
    }

    /// Terminal write: the run finished with a result payload.
    pub fn finish(&mut self, result: Vec<u8>) -> Result<()> {
        if result.len() > MAX_RESULT_SIZE {
            return Err(CoreError::ResultTooLarge {
                max: MAX_RESULT_SIZE,
                actual: result.len(),
            });
        }

        self.status = TaskRunStatus::Finished;
        self.result = Some(result);
        self.failure_message = None;
        Ok(())
    }

    /// Terminal write: the run failed.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = TaskRunStatus::Failed;
        self.result = None;
        self.failure_message = Some(message.into());
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Serialize for publishing to the result topic.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_lifecycle() {
        let mut response = TaskResponse::in_progress(42);
        assert_eq!(response.status, TaskRunStatus::InProgress);
        assert!(!response.is_terminal());

        response.finish(b"ok".to_vec()).unwrap();
        assert_eq!(response.status, TaskRunStatus::Finished);
        assert_eq!(response.result.as_deref(), Some(b"ok".as_slice()));
        assert!(response.is_terminal());
    }

    #[test]
    fn test_response_failure() {
        let mut response = TaskResponse::in_progress(42);
        response.fail("disk full");

        assert_eq!(response.status, TaskRunStatus::Failed);
        assert_eq!(response.failure_message.as_deref(), Some("disk full"));
        assert!(response.result.is_none());
    }

    #[test]
    fn test_result_size_limit() {
        let mut response = TaskResponse::in_progress(1);
        let oversized = vec![0u8; MAX_RESULT_SIZE + 1];

        match response.finish(oversized) {
            Err(CoreError::ResultTooLarge { .. }) => {}
            other => panic!("Expected ResultTooLarge error, got {:?}", other),
        }
        assert_eq!(response.status, TaskRunStatus::InProgress);
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(TaskRunStatus::InProgress.as_str(), "in_progress");
        assert_eq!(TaskRunStatus::Finished.as_str(), "finished");
        assert_eq!(TaskRunStatus::Failed.as_str(), "failed");
    }
}
