use cmtscope_core::CoreError;
use cmtscope_java::JavaError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    /// A query node was built with missing or empty arguments.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("query XML error: {0}")]
    Xml(String),
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Java(#[from] JavaError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SearchError>;
