use crate::proto::result_sink_client::ResultSinkClient;
use crate::proto::ResultPayload;
use crate::{Result, SinkError};

use std::time::Duration;
use tokio::time::sleep;
use tonic::transport::{Channel, Endpoint};
use tracing::warn;

/// Bounded fixed-delay retry budget for connection establishment and for
/// the one-shot result delivery call. Deliberately not exponential: the
/// call rate is low and the whole budget is small next to the run deadline.
pub const CONNECT_ATTEMPTS: u32 = 5;
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Establish a channel to the ingest endpoint, retrying with a fixed delay.
///
/// Exhausting the budget surfaces the last observed error; the caller
/// decides whether that is fatal to the sink or only to one flush.
pub async fn connect_with_retry(
    endpoint: &str,
    attempts: u32,
    delay: Duration,
) -> Result<Channel> {
    let endpoint = Endpoint::from_shared(endpoint.to_string()).map_err(SinkError::Endpoint)?;
    let attempts = attempts.max(1);

    let mut attempt = 0;
    loop {
        attempt += 1;
        match endpoint.connect().await {
            Ok(channel) => return Ok(channel),
            Err(err) if attempt < attempts => {
                warn!(attempt, error = %err, "ingest connection failure");
                sleep(delay).await;
            }
            Err(err) => {
                return Err(SinkError::Connect {
                    attempts: attempt,
                    source: err,
                })
            }
        }
    }
}

/// One-shot delivery of a terminal run result payload.
///
/// Connects per call and retries the unary call itself with the same
/// bounded fixed-delay budget as connection establishment.
#[derive(Debug, Clone)]
pub struct PayloadDelivery {
    endpoint: String,
    attempts: u32,
    delay: Duration,
}

impl PayloadDelivery {
    pub fn new(endpoint: impl Into<String>) -> Self {
        PayloadDelivery {
            endpoint: endpoint.into(),
            attempts: CONNECT_ATTEMPTS,
            delay: RETRY_DELAY,
        }
    }

    pub async fn deliver(&self, run_id: u64, data: Vec<u8>) -> Result<()> {
        let channel = connect_with_retry(&self.endpoint, self.attempts, self.delay).await?;
        let mut client = ResultSinkClient::new(channel);
        let payload = ResultPayload { run_id, data };

        let mut attempt = 0;
        loop {
            attempt += 1;
            match client.deliver(payload.clone()).await {
                Ok(_) => return Ok(()),
                Err(status) if attempt < self.attempts => {
                    warn!(run_id, attempt, error = %status, "failed to deliver run result");
                    sleep(self.delay).await;
                }
                Err(status) => return Err(SinkError::Call(status)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn refused_endpoint() -> String {
        // Bind then drop a listener so the port is known-free.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_connect_exhausts_attempts() {
        let endpoint = refused_endpoint().await;

        let result =
            connect_with_retry(&endpoint, 5, Duration::from_millis(10)).await;
        match result {
            Err(SinkError::Connect { attempts, .. }) => assert_eq!(attempts, 5),
            other => panic!("Expected Connect error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_invalid_endpoint_rejected() {
        let result = connect_with_retry("not a uri", 1, Duration::from_millis(1)).await;
        assert!(matches!(result, Err(SinkError::Endpoint(_))));
    }

    #[tokio::test]
    async fn test_payload_delivery_surfaces_connect_error() {
        let endpoint = refused_endpoint().await;
        let delivery = PayloadDelivery {
            endpoint,
            attempts: 2,
            delay: Duration::from_millis(10),
        };

        let result = delivery.deliver(42, b"result".to_vec()).await;
        assert!(matches!(result, Err(SinkError::Connect { .. })));
    }
}
