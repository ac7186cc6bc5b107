use thiserror::Error;

pub type Result<T> = std::result::Result<T, CodemarksError>;

#[derive(Error, Debug)]
pub enum CodemarksError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("failed to read {path}: {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },

    #[error("file enumeration failed: {0}")]
    Enumeration(String),

    #[error("{0}")]
    RemoteSink(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON encode error: {0}")]
    Encode(#[from] serde_json::Error),
}
