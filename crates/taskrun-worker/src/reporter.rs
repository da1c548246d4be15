use std::sync::Arc;
use taskrun_core::TaskResponse;
use taskrun_queue::Queue;
use tracing::error;

/// Publishes lifecycle status events to the result topic.
///
/// Each event carries a dedup key derived from the run identifier and the
/// lifecycle phase, so republishing after a local retry stays unambiguous
/// for a deduplicating consumer.
pub struct ResultReporter {
    queue: Arc<dyn Queue>,
    topic: String,
}

impl ResultReporter {
    pub fn new(queue: Arc<dyn Queue>, topic: String) -> Self {
        ResultReporter { queue, topic }
    }

    pub async fn publish(&self, response: &TaskResponse) -> anyhow::Result<()> {
        let payload = response.to_bytes()?;
        let dedup_key = format!("task-{}-{}", response.run_id, response.status.as_str());

        self.queue.produce(&self.topic, payload, &dedup_key).await?;
        Ok(())
    }

    /// Publish errors are a delivery-layer concern, not a run-outcome
    /// concern: log and move on.
    pub async fn publish_best_effort(&self, response: &TaskResponse) {
        if let Err(err) = self.publish(response).await {
            error!(
                run_id = response.run_id,
                status = response.status.as_str(),
                error = %err,
                "failed to publish task response"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskrun_core::TaskRunStatus;
    use taskrun_queue::memory::MemoryQueue;

    #[tokio::test]
    async fn test_publishes_phase_qualified_key() {
        let queue = Arc::new(MemoryQueue::new());
        let reporter = ResultReporter::new(queue.clone(), "tasks.results".to_string());

        let mut response = TaskResponse::in_progress(42);
        reporter.publish(&response).await.unwrap();
        response.finish(b"ok".to_vec()).unwrap();
        reporter.publish(&response).await.unwrap();

        let published = queue.published();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].dedup_key, "task-42-in_progress");
        assert_eq!(published[1].dedup_key, "task-42-finished");

        let event = TaskResponse::from_bytes(&published[1].payload).unwrap();
        assert_eq!(event.run_id, 42);
        assert_eq!(event.status, TaskRunStatus::Finished);
    }
}
