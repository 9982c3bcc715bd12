//! Error types for torrentd-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TorrentdError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Lock error: {0}")]
    Lock(String),

    #[error("Lock contended: {0}")]
    LockContended(String),

    #[error("Process error: {0}")]
    Process(String),

    #[error("Port error: {0}")]
    PortError(String),
}

pub type Result<T> = std::result::Result<T, TorrentdError>;
