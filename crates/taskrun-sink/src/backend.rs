use crate::proto::result_sink_client::ResultSinkClient;
use crate::proto::{Doc, IngestRequest};
use crate::transport::{connect_with_retry, CONNECT_ATTEMPTS, RETRY_DELAY};
use crate::{Result, SinkError};

use async_trait::async_trait;
use tonic::transport::Channel;

/// Where flushed batches go. The gRPC implementation is the production
/// surface; tests substitute a recording implementation.
#[async_trait]
pub trait IngestBackend: Send {
    /// Submit one batch in a single call.
    async fn ingest(&mut self, docs: Vec<Doc>) -> Result<()>;

    /// Re-establish the underlying connection after a stream-closed failure.
    async fn reconnect(&mut self) -> Result<()>;
}

/// gRPC ingest backend over a connection-oriented channel.
pub struct GrpcBackend {
    endpoint: String,
    client: ResultSinkClient<Channel>,
}

impl GrpcBackend {
    /// Connect with the bounded fixed-delay retry budget.
    pub async fn connect(endpoint: &str) -> Result<Self> {
        let channel = connect_with_retry(endpoint, CONNECT_ATTEMPTS, RETRY_DELAY).await?;
        Ok(GrpcBackend {
            endpoint: endpoint.to_string(),
            client: ResultSinkClient::new(channel),
        })
    }
}

#[async_trait]
impl IngestBackend for GrpcBackend {
    async fn ingest(&mut self, docs: Vec<Doc>) -> Result<()> {
        self.client
            .ingest(IngestRequest { docs })
            .await
            .map(|_| ())
            .map_err(|status| {
                if is_stream_closed(&status) {
                    SinkError::StreamClosed(status)
                } else {
                    SinkError::Call(status)
                }
            })
    }

    async fn reconnect(&mut self) -> Result<()> {
        // Single attempt: the flush loop does not retry reconnects.
        let channel = connect_with_retry(&self.endpoint, 1, RETRY_DELAY).await?;
        self.client = ResultSinkClient::new(channel);
        Ok(())
    }
}

/// Transport-level stream termination, as opposed to a per-call failure.
fn is_stream_closed(status: &tonic::Status) -> bool {
    status.code() == tonic::Code::Unavailable
        || status.message().to_lowercase().contains("eof")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_closed_detection() {
        assert!(is_stream_closed(&tonic::Status::unavailable("h2 connection closed")));
        assert!(is_stream_closed(&tonic::Status::unknown("unexpected EOF")));
        assert!(!is_stream_closed(&tonic::Status::invalid_argument("bad doc")));
    }
}
