use clap::Parser;
use std::sync::Arc;
use taskrun_queue::TcpQueue;
use taskrun_sink::{GrpcBackend, PayloadDelivery, ResultSender};
use taskrun_worker::{EchoHandler, Worker, WorkerConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = WorkerConfig::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let instance_id = config.instance_id();
    tracing::info!(instance_id = %instance_id, consumer = %config.consumer_name, "starting task worker");

    let shutdown = CancellationToken::new();
    spawn_signal_watcher(shutdown.clone());

    let queue = Arc::new(TcpQueue::connect(&config.broker_url).await?);

    let backend = GrpcBackend::connect(&config.ingest_endpoint).await?;
    let sender = ResultSender::start(config.sink_config(), Box::new(backend));
    let payloads = PayloadDelivery::new(config.ingest_endpoint.clone());

    // The task handler is the pluggable piece; the echo handler stands in
    // until a real one is wired up.
    let handler = Arc::new(EchoHandler);

    let worker = Worker::new(config, queue, handler, sender.handle())
        .await?
        .with_payload_delivery(payloads);

    worker.run(shutdown).await?;

    let record_ids = sender.finish().await?;
    tracing::info!(records = record_ids.len(), "result sink drained");

    Ok(())
}

/// Cancel the worker on SIGINT/SIGTERM; consumption stops pulling and
/// in-flight work drains before exit.
fn spawn_signal_watcher(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "failed to install SIGINT handler");
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(err) => tracing::error!(error = %err, "failed to install SIGTERM handler"),
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate => {}
        }

        tracing::info!("received shutdown signal");
        shutdown.cancel();
    });
}
