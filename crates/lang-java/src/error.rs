use cmtscope_core::CoreError;
use cmtscope_ingest::IngestError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JavaError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("class file error: {0}")]
    ClassFile(String),
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, JavaError>;
