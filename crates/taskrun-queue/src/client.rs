use crate::api::{AckHandle, Consumer, ConsumerConfig, Delivery, Queue};
use crate::message::{AckFrame, FetchRequest, Frame, PublishRequest, StreamSpec};
use crate::{QueueCodec, QueueError, Result};

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

type FramedStream = Framed<TcpStream, QueueCodec>;
type FrameSink = SplitSink<FramedStream, Frame>;

/// TCP client for the durable broker.
///
/// Control traffic (stream provisioning, publishing) shares one connection;
/// each registered consumer gets a dedicated connection so deliveries never
/// interleave with control responses.
pub struct TcpQueue {
    addr: String,
    control: Mutex<FramedStream>,
}

impl TcpQueue {
    pub async fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr).await.map_err(|e| {
            QueueError::ConnectionError(format!("failed to connect to broker at {}: {}", addr, e))
        })?;
        info!("connected to broker at {}", addr);

        Ok(TcpQueue {
            addr: addr.to_string(),
            control: Mutex::new(Framed::new(stream, QueueCodec)),
        })
    }

    /// Send one control frame and wait for the broker's response.
    async fn request(&self, frame: Frame) -> Result<Frame> {
        let mut control = self.control.lock().await;
        control.send(frame).await?;

        match control.next().await {
            Some(Ok(frame)) => Ok(frame),
            Some(Err(e)) => Err(e),
            None => Err(QueueError::ConnectionClosed),
        }
    }

    fn expect_ok(frame: Frame) -> Result<()> {
        match frame {
            Frame::Ok(_) => Ok(()),
            Frame::Error(resp) => Err(QueueError::Broker(resp.error)),
            _ => Err(QueueError::UnexpectedFrame("Ok")),
        }
    }
}

#[async_trait]
impl Queue for TcpQueue {
    async fn ensure_stream(
        &self,
        name: &str,
        description: &str,
        topics: &[String],
        max_msgs: u64,
    ) -> Result<()> {
        let spec = StreamSpec {
            name: name.to_string(),
            description: description.to_string(),
            topics: topics.to_vec(),
            max_msgs,
        };
        Self::expect_ok(self.request(Frame::EnsureStream(spec)).await?)
    }

    async fn produce(&self, topic: &str, payload: Vec<u8>, dedup_key: &str) -> Result<()> {
        let request = PublishRequest {
            topic: topic.to_string(),
            payload,
            dedup_key: dedup_key.to_string(),
        };
        Self::expect_ok(self.request(Frame::Publish(request)).await?)
    }

    async fn consume(&self, config: ConsumerConfig) -> Result<Box<dyn Consumer>> {
        let stream = TcpStream::connect(&self.addr).await.map_err(|e| {
            QueueError::ConnectionError(format!(
                "failed to open consumer connection to {}: {}",
                self.addr, e
            ))
        })?;
        let mut framed = Framed::new(stream, QueueCodec);

        framed.send(Frame::Register(config.clone())).await?;
        match framed.next().await {
            Some(Ok(Frame::Ok(_))) => {}
            Some(Ok(Frame::Error(resp))) => return Err(QueueError::Broker(resp.error)),
            Some(Ok(_)) => return Err(QueueError::UnexpectedFrame("Ok")),
            Some(Err(e)) => return Err(e),
            None => return Err(QueueError::ConnectionClosed),
        }
        debug!(consumer = %config.consumer, stream = %config.stream, "consumer registered");

        let (sink, stream) = framed.split();
        Ok(Box::new(PullConsumer {
            batch: config.batch,
            reader: stream,
            writer: Arc::new(Mutex::new(sink)),
        }))
    }
}

/// Pull consumer over a dedicated broker connection.
///
/// Acks and ack-deadline extensions are fire-and-forget control frames sent
/// through the shared write half, so the read half only ever carries
/// deliveries.
struct PullConsumer {
    batch: usize,
    reader: SplitStream<FramedStream>,
    writer: Arc<Mutex<FrameSink>>,
}

#[async_trait]
impl Consumer for PullConsumer {
    async fn next(&mut self) -> Result<Option<Delivery>> {
        {
            let mut writer = self.writer.lock().await;
            writer.send(Frame::Fetch(FetchRequest { batch: self.batch })).await?;
        }

        loop {
            match self.reader.next().await {
                Some(Ok(Frame::Deliver(msg))) => {
                    let handle = Arc::new(TcpAckHandle {
                        seq: msg.seq,
                        writer: self.writer.clone(),
                    });
                    return Ok(Some(Delivery::new(msg.seq, msg.topic, msg.payload, handle)));
                }
                Some(Ok(Frame::Error(resp))) => return Err(QueueError::Broker(resp.error)),
                Some(Ok(frame)) => {
                    warn!(frame = ?frame.frame_type(), "ignoring non-delivery frame on consumer connection");
                }
                Some(Err(e)) => return Err(e),
                None => return Ok(None),
            }
        }
    }

    async fn stop(self: Box<Self>) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer.send(Frame::Drain).await?;
        writer.close().await?;
        Ok(())
    }
}

struct TcpAckHandle {
    seq: u64,
    writer: Arc<Mutex<FrameSink>>,
}

#[async_trait]
impl AckHandle for TcpAckHandle {
    async fn ack(&self) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer.send(Frame::Ack(AckFrame { seq: self.seq })).await
    }

    async fn in_progress(&self) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer.send(Frame::InProgress(AckFrame { seq: self.seq })).await
    }
}
