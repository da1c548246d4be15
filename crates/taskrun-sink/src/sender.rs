use crate::backend::IngestBackend;
use crate::proto::Doc;
use crate::{Result, SinkError};

use std::time::Duration;
use taskrun_core::ResultRecord;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Batching bounds of the sink loop.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Timed flushes are skipped below this many buffered records.
    pub min_batch: usize,
    /// A forced flush fires as soon as the buffer exceeds this bound.
    pub max_batch: usize,
    /// Intake channel capacity; a full channel blocks producers.
    pub channel_capacity: usize,
    pub flush_interval: Duration,
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig {
            min_batch: 10,
            max_batch: 100,
            channel_capacity: 1000,
            flush_interval: Duration::from_secs(5),
        }
    }
}

enum Intake {
    Record(Box<ResultRecord>),
    Finish(oneshot::Sender<Vec<String>>),
}

/// Producer handle into the sink; cheap to clone.
#[derive(Clone)]
pub struct SinkHandle {
    tx: mpsc::Sender<Intake>,
}

impl SinkHandle {
    /// Enqueue one record for eventual delivery.
    ///
    /// Blocks once the intake channel is full, tying task-execution
    /// throughput to the sink's flush rate.
    pub async fn send(&self, record: ResultRecord) -> Result<()> {
        self.tx
            .send(Intake::Record(Box::new(record)))
            .await
            .map_err(|_| SinkError::SinkClosed)
    }
}

/// Size/time-triggered batching pipeline in front of the ingest endpoint.
///
/// Exactly one processing loop owns the send buffer; producers only ever
/// touch the intake channel.
pub struct ResultSender {
    handle: SinkHandle,
    task: JoinHandle<()>,
}

impl ResultSender {
    /// Spawn the processing loop over the given backend.
    pub fn start(config: SinkConfig, backend: Box<dyn IngestBackend>) -> Self {
        let (tx, rx) = mpsc::channel(config.channel_capacity);
        let task = tokio::spawn(run_loop(config, backend, rx));
        ResultSender {
            handle: SinkHandle { tx },
            task,
        }
    }

    pub fn handle(&self) -> SinkHandle {
        self.handle.clone()
    }

    /// Force a final flush, stop the loop and return the record ids
    /// observed over the sender's lifetime.
    pub async fn finish(self) -> Result<Vec<String>> {
        let (done_tx, done_rx) = oneshot::channel();
        self.handle
            .tx
            .send(Intake::Finish(done_tx))
            .await
            .map_err(|_| SinkError::SinkClosed)?;

        let ids = done_rx.await.map_err(|_| SinkError::SinkClosed)?;
        if let Err(err) = self.task.await {
            error!(error = %err, "sink processing loop aborted");
        }
        Ok(ids)
    }
}

async fn run_loop(
    config: SinkConfig,
    mut backend: Box<dyn IngestBackend>,
    mut rx: mpsc::Receiver<Intake>,
) {
    let mut ticker = tokio::time::interval(config.flush_interval);
    let mut buffer: Vec<ResultRecord> = Vec::new();
    let mut observed_ids: Vec<String> = Vec::new();

    loop {
        tokio::select! {
            intake = rx.recv() => match intake {
                Some(Intake::Record(record)) => {
                    observed_ids.push(record.record_id.clone());
                    buffer.push(*record);

                    if buffer.len() > config.max_batch {
                        flush(&mut *backend, &mut buffer, true, config.min_batch).await;
                    }
                }
                Some(Intake::Finish(done)) => {
                    flush(&mut *backend, &mut buffer, true, config.min_batch).await;
                    let _ = done.send(observed_ids);
                    return;
                }
                None => {
                    // Every handle dropped without an explicit finish.
                    flush(&mut *backend, &mut buffer, true, config.min_batch).await;
                    return;
                }
            },
            _ = ticker.tick() => {
                flush(&mut *backend, &mut buffer, false, config.min_batch).await;
            }
        }
    }
}

/// Submit the buffered records as one batch and clear the buffer.
///
/// The buffer is cleared regardless of outcome: a failed batch is dropped,
/// not re-queued. Content-addressed ids make a later re-delivery of the
/// same logical record idempotent downstream.
async fn flush(
    backend: &mut dyn IngestBackend,
    buffer: &mut Vec<ResultRecord>,
    force: bool,
    min_batch: usize,
) {
    if buffer.is_empty() {
        return;
    }
    if !force && buffer.len() < min_batch {
        return;
    }

    let mut docs = Vec::with_capacity(buffer.len());
    for record in buffer.iter_mut() {
        record.address();
        match serde_json::to_vec(record) {
            Ok(value) => docs.push(Doc { value }),
            Err(err) => {
                warn!(record_id = %record.record_id, error = %err, "failed to serialize record");
            }
        }
    }
    debug!(records = docs.len(), "flushing result batch");

    if let Err(err) = backend.ingest(docs).await {
        error!(error = %err, "failed to deliver result batch");
        if matches!(err, SinkError::StreamClosed(_)) {
            if let Err(err) = backend.reconnect().await {
                error!(error = %err, "failed to reconnect to ingest endpoint");
            }
        }
    }

    buffer.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct BackendState {
        batches: Vec<Vec<Doc>>,
        reconnects: usize,
        failures_left: usize,
        failure: Option<fn() -> SinkError>,
    }

    #[derive(Clone, Default)]
    struct RecordingBackend {
        state: Arc<Mutex<BackendState>>,
    }

    impl RecordingBackend {
        fn failing(times: usize, failure: fn() -> SinkError) -> Self {
            let backend = RecordingBackend::default();
            {
                let mut state = backend.state.lock().unwrap();
                state.failures_left = times;
                state.failure = Some(failure);
            }
            backend
        }

        fn batches(&self) -> Vec<Vec<Doc>> {
            self.state.lock().unwrap().batches.clone()
        }

        fn reconnects(&self) -> usize {
            self.state.lock().unwrap().reconnects
        }
    }

    #[async_trait]
    impl IngestBackend for RecordingBackend {
        async fn ingest(&mut self, docs: Vec<Doc>) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state.batches.push(docs);
            if state.failures_left > 0 {
                state.failures_left -= 1;
                let failure = state.failure.expect("failure constructor");
                return Err(failure());
            }
            Ok(())
        }

        async fn reconnect(&mut self) -> Result<()> {
            self.state.lock().unwrap().reconnects += 1;
            Ok(())
        }
    }

    fn record(id: &str) -> ResultRecord {
        ResultRecord::new(id, 1, "inventory", json!({"id": id}))
    }

    fn config(min: usize, max: usize, interval: Duration) -> SinkConfig {
        SinkConfig {
            min_batch: min,
            max_batch: max,
            channel_capacity: 100,
            flush_interval: interval,
        }
    }

    #[tokio::test]
    async fn test_size_trigger_forces_flush() {
        let backend = RecordingBackend::default();
        let sender = ResultSender::start(
            config(2, 5, Duration::from_secs(3600)),
            Box::new(backend.clone()),
        );

        let handle = sender.handle();
        for i in 0..7 {
            handle.send(record(&format!("r-{}", i))).await.unwrap();
        }
        // Give the loop a chance to drain the intake channel.
        tokio::time::sleep(Duration::from_millis(50)).await;

        // The 6th record pushed the buffer past the bound of 5.
        let batches = backend.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 6);

        let ids = sender.finish().await.unwrap();
        assert_eq!(ids.len(), 7);
        // The final forced flush shipped the remaining record.
        assert_eq!(backend.batches().len(), 2);
        assert_eq!(backend.batches()[1].len(), 1);
    }

    #[tokio::test]
    async fn test_timed_flush_respects_minimum() {
        let backend = RecordingBackend::default();
        let sender = ResultSender::start(
            config(3, 100, Duration::from_millis(50)),
            Box::new(backend.clone()),
        );

        let handle = sender.handle();
        handle.send(record("r-0")).await.unwrap();
        handle.send(record("r-1")).await.unwrap();

        // Several ticks pass; two records stay below the minimum of three.
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(backend.batches().is_empty());

        handle.send(record("r-2")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;

        // Exactly one timed flush once the minimum was reached.
        let batches = backend.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 3);

        sender.finish().await.unwrap();
    }

    #[tokio::test]
    async fn test_finish_forces_flush_below_minimum() {
        let backend = RecordingBackend::default();
        let sender = ResultSender::start(
            config(10, 100, Duration::from_secs(3600)),
            Box::new(backend.clone()),
        );

        sender.handle().send(record("only")).await.unwrap();
        let ids = sender.finish().await.unwrap();

        assert_eq!(ids, vec!["only".to_string()]);
        let batches = backend.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 1);
    }

    #[tokio::test]
    async fn test_finish_on_empty_buffer() {
        let backend = RecordingBackend::default();
        let sender = ResultSender::start(SinkConfig::default(), Box::new(backend.clone()));

        let ids = sender.finish().await.unwrap();
        assert!(ids.is_empty());
        assert!(backend.batches().is_empty());
    }

    #[tokio::test]
    async fn test_failed_batch_is_dropped() {
        let backend =
            RecordingBackend::failing(1, || SinkError::Call(tonic::Status::internal("boom")));
        let sender = ResultSender::start(
            config(1, 100, Duration::from_millis(50)),
            Box::new(backend.clone()),
        );

        sender.handle().send(record("lost")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;

        // One failed attempt; the buffer was cleared, not re-queued.
        assert_eq!(backend.batches().len(), 1);
        assert_eq!(backend.reconnects(), 0);

        sender.finish().await.unwrap();
        assert_eq!(backend.batches().len(), 1);
    }

    #[tokio::test]
    async fn test_stream_closed_triggers_reconnect() {
        let backend = RecordingBackend::failing(1, || {
            SinkError::StreamClosed(tonic::Status::unavailable("connection closed"))
        });
        let sender = ResultSender::start(
            config(1, 100, Duration::from_secs(3600)),
            Box::new(backend.clone()),
        );

        sender.handle().send(record("r-0")).await.unwrap();
        sender.finish().await.unwrap();

        assert_eq!(backend.batches().len(), 1);
        assert_eq!(backend.reconnects(), 1);
    }

    #[tokio::test]
    async fn test_flush_stamps_content_address() {
        let backend = RecordingBackend::default();
        let sender = ResultSender::start(SinkConfig::default(), Box::new(backend.clone()));

        sender.handle().send(record("r-0")).await.unwrap();
        sender.finish().await.unwrap();

        let batches = backend.batches();
        let doc: ResultRecord = serde_json::from_slice(&batches[0][0].value).unwrap();
        assert!(!doc.doc_id.is_empty());
        assert_eq!(doc.doc_index, "task_results_inventory");
    }
}
