use std::sync::Arc;
use std::time::Duration;
use taskrun_queue::Delivery;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Periodically extends the ack deadline of an in-flight delivery so the
/// broker does not consider it abandoned while execution is still running.
///
/// The first extension fires immediately, then one per period. A failed
/// extension is logged and the timer keeps running. The task is bound to
/// the cancellation token of its run and must be joined before the run
/// scope exits; a leaked timer is a defect.
pub(crate) fn spawn_extender(
    delivery: Arc<Delivery>,
    period: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = tokio::time::interval(period);

        loop {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = ticks.tick() => {
                    if let Err(err) = delivery.in_progress().await {
                        warn!(seq = delivery.seq(), error = %err, "failed to extend ack deadline");
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskrun_queue::memory::MemoryQueue;
    use taskrun_queue::{ConsumerConfig, Queue};

    async fn delivery(queue: &MemoryQueue) -> (u64, Arc<Delivery>) {
        let seq = queue.push("tasks.run", b"body".to_vec());
        let mut consumer = queue
            .consume(ConsumerConfig::new("worker", "tasks", vec![]))
            .await
            .unwrap();
        (seq, Arc::new(consumer.next().await.unwrap().unwrap()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_extensions_track_duration() {
        let queue = MemoryQueue::new();
        let (seq, delivery) = delivery(&queue).await;

        let token = CancellationToken::new();
        let extender = spawn_extender(delivery, Duration::from_secs(1), token.clone());

        tokio::time::sleep(Duration::from_millis(5500)).await;
        token.cancel();
        extender.await.unwrap();

        // One immediate extension plus one per elapsed period.
        let count = queue.progress_count(seq);
        assert!((5..=6).contains(&count), "got {} extensions", count);
    }

    #[tokio::test(start_paused = true)]
    async fn test_extender_stops_on_cancel() {
        let queue = MemoryQueue::new();
        let (seq, delivery) = delivery(&queue).await;

        let token = CancellationToken::new();
        let extender = spawn_extender(delivery, Duration::from_secs(1), token.clone());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        token.cancel();
        extender.await.unwrap();
        let count_at_cancel = queue.progress_count(seq);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(queue.progress_count(seq), count_at_cancel);
    }
}
