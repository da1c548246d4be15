use crate::api::ConsumerConfig;
use serde::{Deserialize, Serialize};

/// Frame types for the broker wire protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameType {
    EnsureStream = 1,
    Publish = 2,
    Register = 3,
    Fetch = 4,
    Ack = 5,
    InProgress = 6,
    Drain = 7,
    Deliver = 8,
    Ok = 9,
    Error = 10,
}

impl FrameType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(FrameType::EnsureStream),
            2 => Some(FrameType::Publish),
            3 => Some(FrameType::Register),
            4 => Some(FrameType::Fetch),
            5 => Some(FrameType::Ack),
            6 => Some(FrameType::InProgress),
            7 => Some(FrameType::Drain),
            8 => Some(FrameType::Deliver),
            9 => Some(FrameType::Ok),
            10 => Some(FrameType::Error),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

/// Wire frames exchanged between a worker process and the broker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Frame {
    /// Provision a stream (idempotent)
    EnsureStream(StreamSpec),

    /// Publish a message to a topic
    Publish(PublishRequest),

    /// Register a pull consumer on this connection
    Register(ConsumerConfig),

    /// Request the next batch of deliveries
    Fetch(FetchRequest),

    /// Acknowledge a delivery
    Ack(AckFrame),

    /// Extend the ack deadline of an in-flight delivery
    InProgress(AckFrame),

    /// Stop delivering; the broker finishes outstanding work
    Drain,

    /// A message delivered to a consumer
    Deliver(DeliveredMessage),

    /// Positive response to a control frame
    Ok(OkFrame),

    /// Negative response to a control frame
    Error(ErrorFrame),
}

impl Frame {
    pub fn frame_type(&self) -> FrameType {
        match self {
            Frame::EnsureStream(_) => FrameType::EnsureStream,
            Frame::Publish(_) => FrameType::Publish,
            Frame::Register(_) => FrameType::Register,
            Frame::Fetch(_) => FrameType::Fetch,
            Frame::Ack(_) => FrameType::Ack,
            Frame::InProgress(_) => FrameType::InProgress,
            Frame::Drain => FrameType::Drain,
            Frame::Deliver(_) => FrameType::Deliver,
            Frame::Ok(_) => FrameType::Ok,
            Frame::Error(_) => FrameType::Error,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSpec {
    pub name: String,
    pub description: String,
    pub topics: Vec<String>,
    /// Retention bound, in messages
    pub max_msgs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishRequest {
    pub topic: String,
    pub payload: Vec<u8>,
    /// Application-supplied key consumers use to discard duplicates
    pub dedup_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchRequest {
    pub batch: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckFrame {
    pub seq: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveredMessage {
    pub seq: u64,
    pub topic: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkFrame {
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorFrame {
    pub error: String,
}
