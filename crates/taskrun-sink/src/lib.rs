mod backend;
mod error;
pub mod proto;
mod sender;
mod transport;

pub use backend::{GrpcBackend, IngestBackend};
pub use error::{Result, SinkError};
pub use sender::{ResultSender, SinkConfig, SinkHandle};
pub use transport::{connect_with_retry, PayloadDelivery, CONNECT_ATTEMPTS, RETRY_DELAY};
