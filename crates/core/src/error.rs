use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid pattern: {0}")]
    Regex(#[from] regex::Error),
    #[error("malformed snapshot: {0}")]
    Snapshot(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid state: {0}")]
    State(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
