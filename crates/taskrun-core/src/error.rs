use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Malformed JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Result size exceeds maximum allowed size of {max} bytes (got {actual})")]
    ResultTooLarge { max: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, CoreError>;
