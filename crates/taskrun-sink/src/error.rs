use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Invalid ingest endpoint: {0}")]
    Endpoint(#[source] tonic::transport::Error),

    #[error("Failed to reach ingest endpoint after {attempts} attempts: {source}")]
    Connect {
        attempts: u32,
        #[source]
        source: tonic::transport::Error,
    },

    #[error("Ingest stream closed: {0}")]
    StreamClosed(#[source] tonic::Status),

    #[error("Ingest call failed: {0}")]
    Call(#[source] tonic::Status),

    #[error("Result sink is closed")]
    SinkClosed,
}

pub type Result<T> = std::result::Result<T, SinkError>;
