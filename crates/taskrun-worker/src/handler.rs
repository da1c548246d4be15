use async_trait::async_trait;
use taskrun_core::{RunId, TaskRequest};
use taskrun_sink::SinkHandle;

/// Result type for task handlers
pub type TaskResult = Result<Vec<u8>, String>;

/// Everything a handler may touch during one run.
pub struct RunContext {
    pub run_id: RunId,
    /// Absolute deadline of this run; the executor enforces it, cooperative
    /// handlers can check it.
    pub deadline: tokio::time::Instant,
    /// Intake for discrete result records produced during the run.
    pub records: SinkHandle,
}

/// Executes a task definition and returns a byte result or an error.
///
/// The worker core makes no assumption about what happens inside: the
/// definition payload is opaque and the handler is pluggable.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn execute(&self, ctx: RunContext, request: TaskRequest) -> TaskResult;
}

/// Placeholder handler that echoes the definition payload back as the
/// run result.
pub struct EchoHandler;

#[async_trait]
impl TaskHandler for EchoHandler {
    async fn execute(&self, _ctx: RunContext, request: TaskRequest) -> TaskResult {
        Ok(request.definition.payload)
    }
}

/// Handler that simulates work by sleeping before echoing.
pub struct SleepHandler {
    duration_ms: u64,
}

impl SleepHandler {
    pub fn new(duration_ms: u64) -> Self {
        SleepHandler { duration_ms }
    }
}

#[async_trait]
impl TaskHandler for SleepHandler {
    async fn execute(&self, _ctx: RunContext, request: TaskRequest) -> TaskResult {
        tokio::time::sleep(tokio::time::Duration::from_millis(self.duration_ms)).await;
        Ok(request.definition.payload)
    }
}
