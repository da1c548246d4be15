use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Invalid frame type: {0}")]
    InvalidFrameType(u8),

    #[error("Frame too large: {0} bytes")]
    FrameTooLarge(usize),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] bincode::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Connection closed by broker")]
    ConnectionClosed,

    #[error("Broker error: {0}")]
    Broker(String),

    #[error("Unexpected frame: expected {0}")]
    UnexpectedFrame(&'static str),
}

pub type Result<T> = std::result::Result<T, QueueError>;
