use crate::config::WorkerConfig;
use crate::executor::TaskExecutor;
use crate::handler::{RunContext, TaskHandler};
use crate::heartbeat;
use crate::reporter::ResultReporter;

use std::sync::Arc;
use taskrun_core::{TaskRequest, TaskResponse, TaskRunStatus};
use taskrun_queue::{Delivery, Queue};
use taskrun_sink::{PayloadDelivery, SinkHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

/// Drives delivered messages through decode, heartbeat, execution,
/// reporting and acknowledgment.
pub struct Worker {
    config: WorkerConfig,
    queue: Arc<dyn Queue>,
    executor: TaskExecutor,
    reporter: ResultReporter,
    records: SinkHandle,
    payloads: Option<PayloadDelivery>,
}

impl Worker {
    /// Provision the request stream and build a worker around the given
    /// queue, handler and sink intake.
    pub async fn new(
        config: WorkerConfig,
        queue: Arc<dyn Queue>,
        handler: Arc<dyn TaskHandler>,
        records: SinkHandle,
    ) -> anyhow::Result<Self> {
        queue
            .ensure_stream(
                &config.stream_name,
                "task job queue",
                &[config.request_topic.clone()],
                config.stream_max_msgs,
            )
            .await?;

        let executor = TaskExecutor::new(handler, config.task_deadline());
        let reporter = ResultReporter::new(queue.clone(), config.result_topic.clone());

        Ok(Worker {
            config,
            queue,
            executor,
            reporter,
            records,
            payloads: None,
        })
    }

    /// Also ship the terminal result payload of finished runs to the
    /// ingest service.
    pub fn with_payload_delivery(mut self, payloads: PayloadDelivery) -> Self {
        self.payloads = Some(payloads);
        self
    }

    /// Consume until the shutdown token fires.
    ///
    /// Cancellation races only the pull: an in-flight message keeps running
    /// to its own completion or deadline before the consumer is drained.
    pub async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        info!("starting to consume");
        let mut consumer = self.queue.consume(self.config.consumer_config()).await?;

        loop {
            let delivery = tokio::select! {
                _ = shutdown.cancelled() => break,
                next = consumer.next() => match next {
                    Ok(Some(delivery)) => delivery,
                    Ok(None) => {
                        info!("consumer stream ended");
                        break;
                    }
                    Err(err) => return Err(err.into()),
                },
            };

            self.process_delivery(delivery).await;
        }

        info!("draining consumer");
        consumer.stop().await?;
        Ok(())
    }

    /// Handle one delivered message end to end.
    pub async fn process_delivery(&self, delivery: Delivery) {
        info!("received a new job");

        let request = match TaskRequest::from_bytes(delivery.payload()) {
            Ok(request) => request,
            Err(err) => {
                // Poison messages cannot become decodable by redelivery.
                warn!(error = %err, "failed to decode task request, dropping message");
                if let Err(err) = delivery.ack().await {
                    error!(error = %err, "failed to ack poison message");
                }
                return;
            }
        };

        let span = info_span!("run", run_id = request.run_id);
        self.run_task(request, Arc::new(delivery)).instrument(span).await;

        info!("processing a job completed");
    }

    async fn run_task(&self, request: TaskRequest, delivery: Arc<Delivery>) {
        let run_id = request.run_id;

        let extender_token = CancellationToken::new();
        let extender = heartbeat::spawn_extender(
            delivery.clone(),
            self.config.heartbeat_interval(),
            extender_token.clone(),
        );

        let mut response = TaskResponse::in_progress(run_id);
        self.reporter.publish_best_effort(&response).await;

        let ctx = RunContext {
            run_id,
            deadline: tokio::time::Instant::now() + self.config.task_deadline(),
            records: self.records.clone(),
        };
        let outcome = self.executor.execute(ctx, request).await;

        // The extender must not outlive the run.
        extender_token.cancel();
        if let Err(err) = extender.await {
            error!(run_id, error = %err, "heartbeat task aborted");
        }

        match outcome {
            Ok(result) => {
                if let Err(err) = response.finish(result) {
                    response.fail(err.to_string());
                }
            }
            Err(message) => response.fail(message),
        }
        self.reporter.publish_best_effort(&response).await;

        if response.status == TaskRunStatus::Finished {
            self.deliver_result_payload(&response).await;
        }

        // Ack unconditionally, but only after the terminal response is out:
        // failure is recorded in the response, and redelivery stays
        // available if the worker dies before this point.
        if let Err(err) = delivery.ack().await {
            error!(run_id, error = %err, "failed to ack message");
        }
    }

    async fn deliver_result_payload(&self, response: &TaskResponse) {
        let Some(payloads) = &self.payloads else {
            return;
        };
        let Some(result) = &response.result else {
            return;
        };
        if result.is_empty() {
            return;
        }

        if let Err(err) = payloads.deliver(response.run_id, result.clone()).await {
            error!(run_id = response.run_id, error = %err, "failed to deliver run result payload");
        }
    }
}
