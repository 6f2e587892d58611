//! Ingestion error types

use thiserror::Error;

/// Failures raised by a remote source adapter
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Source rejected the query: {0}")]
    Api(String),

    #[error("Gave up after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },
}

impl SourceError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            SourceError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Invalid arXiv id: {0}")]
    InvalidId(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<pulse_common::errors::AppError> for IngestionError {
    fn from(e: pulse_common::errors::AppError) -> Self {
        IngestionError::DatabaseError(e.to_string())
    }
}

pub type SourceResult<T> = std::result::Result<T, SourceError>;
