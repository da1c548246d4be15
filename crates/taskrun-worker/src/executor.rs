use crate::handler::{RunContext, TaskHandler, TaskResult};
use std::sync::Arc;
use std::time::Duration;
use taskrun_core::TaskRequest;
use tokio::time::timeout;
use tracing::{error, Instrument};

/// Runs the task handler under an absolute deadline and a panic boundary.
///
/// The handler runs in its own task so that a panic inside it cannot take
/// the worker loop down with it; panics and deadline expiry both surface as
/// ordinary failed outcomes.
pub struct TaskExecutor {
    handler: Arc<dyn TaskHandler>,
    deadline: Duration,
}

impl TaskExecutor {
    pub fn new(handler: Arc<dyn TaskHandler>, deadline: Duration) -> Self {
        TaskExecutor { handler, deadline }
    }

    pub async fn execute(&self, ctx: RunContext, request: TaskRequest) -> TaskResult {
        let run_id = request.run_id;
        let handler = self.handler.clone();
        let deadline = self.deadline;

        let join = tokio::spawn(
            async move {
                match timeout(deadline, handler.execute(ctx, request)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(format!("task run timed out after {:?}", deadline)),
                }
            }
            .in_current_span(),
        );

        match join.await {
            Ok(outcome) => outcome,
            Err(err) if err.is_panic() => {
                error!(run_id, "task handler panicked");
                Err("task handler panicked during execution".to_string())
            }
            Err(_) => Err("task run was cancelled".to_string()),
        }
    }
}
