use thiserror::Error;

/// Error type task bodies return; any `std::error::Error` converts into it with `?`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("task '{task}' started without input {key}")]
    MissingInput { task: String, key: String },
    #[error("task '{task}' failed: {message}")]
    TaskFailed { task: String, message: String },
    #[error("execution failed: {0}")]
    Execution(String),
}

pub type Result<T> = std::result::Result<T, IngestError>;
