use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// How the broker expects deliveries to be acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AckPolicy {
    /// Every delivery must be acknowledged explicitly.
    Explicit,
    /// Deliveries are considered acknowledged on receipt.
    None,
}

/// Where consumption starts for a newly registered consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliverPolicy {
    /// Deliver from the first message retained in the stream.
    All,
    /// Deliver only messages published after registration.
    New,
}

/// Configuration of a durable pull consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerConfig {
    pub consumer: String,
    pub stream: String,
    pub topics: Vec<String>,
    pub ack_policy: AckPolicy,
    pub deliver_policy: DeliverPolicy,
    /// Maximum unacknowledged deliveries; negative means unbounded.
    pub max_ack_pending: i64,
    /// How long the broker waits for an ack before redelivering.
    pub ack_wait: Duration,
    /// How long an idle consumer is kept before it is reclaimed.
    pub inactivity_threshold: Duration,
    /// Number of messages requested per pull.
    pub batch: usize,
}

impl ConsumerConfig {
    pub fn new(
        consumer: impl Into<String>,
        stream: impl Into<String>,
        topics: Vec<String>,
    ) -> Self {
        ConsumerConfig {
            consumer: consumer.into(),
            stream: stream.into(),
            topics,
            ack_policy: AckPolicy::Explicit,
            deliver_policy: DeliverPolicy::All,
            max_ack_pending: -1,
            ack_wait: Duration::from_secs(30 * 60),
            inactivity_threshold: Duration::from_secs(3600),
            batch: 1,
        }
    }

    pub fn ack_wait(mut self, ack_wait: Duration) -> Self {
        self.ack_wait = ack_wait;
        self
    }

    pub fn inactivity_threshold(mut self, threshold: Duration) -> Self {
        self.inactivity_threshold = threshold;
        self
    }

    pub fn batch(mut self, batch: usize) -> Self {
        self.batch = batch;
        self
    }
}

/// Client surface of a durable, at-least-once message broker.
#[async_trait]
pub trait Queue: Send + Sync {
    /// Provision a stream; succeeds if an equivalent stream already exists.
    async fn ensure_stream(
        &self,
        name: &str,
        description: &str,
        topics: &[String],
        max_msgs: u64,
    ) -> Result<()>;

    /// Publish a payload to a topic with an application-level dedup key.
    async fn produce(&self, topic: &str, payload: Vec<u8>, dedup_key: &str) -> Result<()>;

    /// Register a pull consumer and start consuming.
    async fn consume(&self, config: ConsumerConfig) -> Result<Box<dyn Consumer>>;
}

/// A registered pull consumer.
#[async_trait]
pub trait Consumer: Send {
    /// Pull the next delivery; `None` once the broker side has closed.
    async fn next(&mut self) -> Result<Option<Delivery>>;

    /// Stop pulling and ask the broker to drain outstanding state.
    async fn stop(self: Box<Self>) -> Result<()>;
}

/// Per-delivery acknowledgment surface.
#[async_trait]
pub trait AckHandle: Send + Sync {
    async fn ack(&self) -> Result<()>;
    async fn in_progress(&self) -> Result<()>;
}

/// One message pulled from a stream.
///
/// `in_progress` resets the broker's redelivery timer while processing is
/// legitimately still running; `ack` removes the message for good.
pub struct Delivery {
    seq: u64,
    topic: String,
    payload: Vec<u8>,
    handle: Arc<dyn AckHandle>,
}

impl Delivery {
    pub fn new(seq: u64, topic: String, payload: Vec<u8>, handle: Arc<dyn AckHandle>) -> Self {
        Delivery {
            seq,
            topic,
            payload,
            handle,
        }
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub async fn ack(&self) -> Result<()> {
        self.handle.ack().await
    }

    pub async fn in_progress(&self) -> Result<()> {
        self.handle.in_progress().await
    }
}
