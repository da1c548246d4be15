pub mod config;
pub mod executor;
pub mod handler;
mod heartbeat;
pub mod reporter;
pub mod worker;

pub use config::WorkerConfig;
pub use executor::TaskExecutor;
pub use handler::{EchoHandler, RunContext, SleepHandler, TaskHandler, TaskResult};
pub use reporter::ResultReporter;
pub use worker::Worker;
