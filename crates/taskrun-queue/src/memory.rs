//! Channel-backed queue for embedding and tests.
//!
//! Deliveries are fed in with [`MemoryQueue::push`]; everything the client
//! side does — produced messages, acks, ack-deadline extensions — is
//! observable afterwards.

use crate::api::{AckHandle, Consumer, ConsumerConfig, Delivery, Queue};
use crate::{QueueError, Result};

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// A message published through the [`Queue`] interface.
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub dedup_key: String,
}

struct Pending {
    seq: u64,
    topic: String,
    payload: Vec<u8>,
}

#[derive(Default)]
struct MemoryState {
    published: Mutex<Vec<PublishedMessage>>,
    streams: Mutex<Vec<String>>,
    acks: Mutex<HashMap<u64, usize>>,
    progress: Mutex<HashMap<u64, usize>>,
}

/// In-memory [`Queue`] implementation.
pub struct MemoryQueue {
    seq: AtomicU64,
    deliveries_tx: Mutex<Option<mpsc::UnboundedSender<Pending>>>,
    deliveries_rx: Mutex<Option<mpsc::UnboundedReceiver<Pending>>>,
    state: Arc<MemoryState>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        MemoryQueue {
            seq: AtomicU64::new(0),
            deliveries_tx: Mutex::new(Some(tx)),
            deliveries_rx: Mutex::new(Some(rx)),
            state: Arc::new(MemoryState::default()),
        }
    }

    /// Enqueue a message for delivery to the consumer. Returns its sequence.
    pub fn push(&self, topic: &str, payload: Vec<u8>) -> u64 {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let tx = self.deliveries_tx.lock();
        if let Some(tx) = tx.as_ref() {
            let _ = tx.send(Pending {
                seq,
                topic: topic.to_string(),
                payload,
            });
        }
        seq
    }

    /// Close the delivery stream; the consumer sees end-of-stream after
    /// draining what was already pushed.
    pub fn close(&self) {
        self.deliveries_tx.lock().take();
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.state.published.lock().clone()
    }

    pub fn streams(&self) -> Vec<String> {
        self.state.streams.lock().clone()
    }

    /// How many times the given delivery was acknowledged.
    pub fn ack_count(&self, seq: u64) -> usize {
        self.state.acks.lock().get(&seq).copied().unwrap_or(0)
    }

    /// How many ack-deadline extensions the given delivery received.
    pub fn progress_count(&self, seq: u64) -> usize {
        self.state.progress.lock().get(&seq).copied().unwrap_or(0)
    }
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Queue for MemoryQueue {
    async fn ensure_stream(
        &self,
        name: &str,
        _description: &str,
        _topics: &[String],
        _max_msgs: u64,
    ) -> Result<()> {
        let mut streams = self.state.streams.lock();
        if !streams.iter().any(|s| s == name) {
            streams.push(name.to_string());
        }
        Ok(())
    }

    async fn produce(&self, topic: &str, payload: Vec<u8>, dedup_key: &str) -> Result<()> {
        self.state.published.lock().push(PublishedMessage {
            topic: topic.to_string(),
            payload,
            dedup_key: dedup_key.to_string(),
        });
        Ok(())
    }

    async fn consume(&self, _config: ConsumerConfig) -> Result<Box<dyn Consumer>> {
        let rx = self
            .deliveries_rx
            .lock()
            .take()
            .ok_or(QueueError::Broker("consumer already registered".to_string()))?;
        Ok(Box::new(MemoryConsumer {
            rx,
            state: self.state.clone(),
        }))
    }
}

struct MemoryConsumer {
    rx: mpsc::UnboundedReceiver<Pending>,
    state: Arc<MemoryState>,
}

#[async_trait]
impl Consumer for MemoryConsumer {
    async fn next(&mut self) -> Result<Option<Delivery>> {
        match self.rx.recv().await {
            Some(pending) => {
                let handle = Arc::new(MemoryAckHandle {
                    seq: pending.seq,
                    state: self.state.clone(),
                });
                Ok(Some(Delivery::new(
                    pending.seq,
                    pending.topic,
                    pending.payload,
                    handle,
                )))
            }
            None => Ok(None),
        }
    }

    async fn stop(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

struct MemoryAckHandle {
    seq: u64,
    state: Arc<MemoryState>,
}

#[async_trait]
impl AckHandle for MemoryAckHandle {
    async fn ack(&self) -> Result<()> {
        *self.state.acks.lock().entry(self.seq).or_insert(0) += 1;
        Ok(())
    }

    async fn in_progress(&self) -> Result<()> {
        *self.state.progress.lock().entry(self.seq).or_insert(0) += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_push_then_consume() {
        let queue = MemoryQueue::new();
        let seq = queue.push("tasks.run", b"body".to_vec());
        queue.close();

        let mut consumer = queue
            .consume(ConsumerConfig::new("worker", "tasks", vec!["tasks.run".to_string()]))
            .await
            .unwrap();

        let delivery = consumer.next().await.unwrap().unwrap();
        assert_eq!(delivery.seq(), seq);
        assert_eq!(delivery.topic(), "tasks.run");
        assert_eq!(delivery.payload(), b"body");

        delivery.ack().await.unwrap();
        delivery.in_progress().await.unwrap();
        assert_eq!(queue.ack_count(seq), 1);
        assert_eq!(queue.progress_count(seq), 1);

        // Stream closed, nothing else pushed.
        assert!(consumer.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_produce_is_recorded() {
        let queue = MemoryQueue::new();
        queue
            .produce("tasks.results", b"event".to_vec(), "task-1-finished")
            .await
            .unwrap();

        let published = queue.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].topic, "tasks.results");
        assert_eq!(published[0].dedup_key, "task-1-finished");
    }

    #[tokio::test]
    async fn test_single_consumer_registration() {
        let queue = MemoryQueue::new();
        let config = ConsumerConfig::new("worker", "tasks", vec![]);
        let _consumer = queue.consume(config.clone()).await.unwrap();
        assert!(queue.consume(config).await.is_err());
    }
}
