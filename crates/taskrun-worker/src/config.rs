use clap::Parser;
use std::time::Duration;
use taskrun_queue::ConsumerConfig;
use taskrun_sink::SinkConfig;

/// Worker configuration.
///
/// Every option is a flag with an environment-variable fallback. The struct
/// is built once at startup and handed into each component; nothing reads
/// the process environment afterwards. A missing required value fails the
/// process before anything connects.
#[derive(Parser, Debug, Clone)]
#[command(name = "taskrun-worker")]
#[command(about = "Durable-queue task worker", long_about = None)]
pub struct WorkerConfig {
    /// Broker address (host:port)
    #[arg(long, env = "BROKER_URL")]
    pub broker_url: String,

    /// Durable consumer name on the request stream
    #[arg(long, env = "CONSUMER_NAME")]
    pub consumer_name: String,

    /// Stream holding task-execution requests
    #[arg(long, env = "STREAM_NAME")]
    pub stream_name: String,

    /// Topic carrying task-execution requests
    #[arg(long, env = "REQUEST_TOPIC")]
    pub request_topic: String,

    /// Topic carrying task lifecycle results
    #[arg(long, env = "RESULT_TOPIC")]
    pub result_topic: String,

    /// Ingest service address for result records
    #[arg(long, env = "INGEST_ENDPOINT")]
    pub ingest_endpoint: String,

    /// Seconds between ack-deadline extensions while a run executes
    #[arg(long, env = "HEARTBEAT_INTERVAL_SECS", default_value_t = 15)]
    pub heartbeat_interval_secs: u64,

    /// Absolute deadline for one task run, in seconds
    #[arg(long, env = "TASK_DEADLINE_SECS", default_value_t = 25 * 60)]
    pub task_deadline_secs: u64,

    /// How long the broker waits for an ack before redelivering, in seconds
    #[arg(long, env = "ACK_WAIT_SECS", default_value_t = 30 * 60)]
    pub ack_wait_secs: u64,

    /// Idle-consumer reclaim threshold, in seconds
    #[arg(long, env = "INACTIVITY_THRESHOLD_SECS", default_value_t = 3600)]
    pub inactivity_threshold_secs: u64,

    /// Request stream retention, in messages
    #[arg(long, env = "STREAM_MAX_MSGS", default_value_t = 200_000)]
    pub stream_max_msgs: u64,

    /// Skip timed result flushes below this many records
    #[arg(long, env = "MIN_BUFFER_SIZE", default_value_t = 10)]
    pub min_buffer_size: usize,

    /// Force a result flush once the buffer exceeds this many records
    #[arg(long, env = "MAX_BUFFER_SIZE", default_value_t = 100)]
    pub max_buffer_size: usize,

    /// Result intake channel capacity
    #[arg(long, env = "SINK_CHANNEL_SIZE", default_value_t = 1000)]
    pub sink_channel_size: usize,

    /// Seconds between timed result flushes
    #[arg(long, env = "FLUSH_INTERVAL_SECS", default_value_t = 5)]
    pub flush_interval_secs: u64,
}

impl WorkerConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn task_deadline(&self) -> Duration {
        Duration::from_secs(self.task_deadline_secs)
    }

    pub fn consumer_config(&self) -> ConsumerConfig {
        ConsumerConfig::new(
            self.consumer_name.clone(),
            self.stream_name.clone(),
            vec![self.request_topic.clone()],
        )
        .ack_wait(Duration::from_secs(self.ack_wait_secs))
        .inactivity_threshold(Duration::from_secs(self.inactivity_threshold_secs))
        .batch(1)
    }

    pub fn sink_config(&self) -> SinkConfig {
        SinkConfig {
            min_batch: self.min_buffer_size,
            max_batch: self.max_buffer_size,
            channel_capacity: self.sink_channel_size,
            flush_interval: Duration::from_secs(self.flush_interval_secs),
        }
    }

    /// Process-unique identity for logs and diagnostics.
    pub fn instance_id(&self) -> String {
        let host = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown".to_string());
        let suffix = uuid::Uuid::new_v4().simple().to_string();

        format!("{}-{}-{}", host, std::process::id(), &suffix[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_required_option_is_fatal() {
        let result = WorkerConfig::try_parse_from(["taskrun-worker"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults_match_reference_behavior() {
        let config = WorkerConfig::try_parse_from([
            "taskrun-worker",
            "--broker-url",
            "127.0.0.1:4222",
            "--consumer-name",
            "worker",
            "--stream-name",
            "tasks",
            "--request-topic",
            "tasks.run",
            "--result-topic",
            "tasks.results",
            "--ingest-endpoint",
            "http://127.0.0.1:9090",
        ])
        .unwrap();

        assert_eq!(config.heartbeat_interval(), Duration::from_secs(15));
        assert_eq!(config.task_deadline(), Duration::from_secs(25 * 60));
        assert_eq!(config.min_buffer_size, 10);
        assert_eq!(config.max_buffer_size, 100);
        assert_eq!(config.sink_channel_size, 1000);
        assert_eq!(config.flush_interval_secs, 5);

        let consumer = config.consumer_config();
        assert_eq!(consumer.batch, 1);
        assert_eq!(consumer.ack_wait, Duration::from_secs(30 * 60));
        assert_eq!(consumer.topics, vec!["tasks.run".to_string()]);
    }

    #[test]
    fn test_instance_ids_are_unique() {
        let config = WorkerConfig::try_parse_from([
            "taskrun-worker",
            "--broker-url",
            "b",
            "--consumer-name",
            "c",
            "--stream-name",
            "s",
            "--request-topic",
            "r",
            "--result-topic",
            "t",
            "--ingest-endpoint",
            "i",
        ])
        .unwrap();

        assert_ne!(config.instance_id(), config.instance_id());
    }
}
