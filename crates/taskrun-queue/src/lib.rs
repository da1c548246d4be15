mod api;
mod client;
mod codec;
mod error;
pub mod memory;
mod message;

pub use api::{
    AckHandle, AckPolicy, Consumer, ConsumerConfig, DeliverPolicy, Delivery, Queue,
};
pub use client::TcpQueue;
pub use codec::QueueCodec;
pub use error::{QueueError, Result};
pub use message::{
    AckFrame, DeliveredMessage, ErrorFrame, FetchRequest, Frame, FrameType, OkFrame,
    PublishRequest, StreamSpec,
};

/// Maximum frame size: 11MB (to accommodate a 10MB result payload + overhead)
pub const MAX_FRAME_SIZE: usize = 11 * 1024 * 1024;
