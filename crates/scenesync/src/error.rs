//! Error types for scene synchronization

use thiserror::Error;

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Error types for the sync pipeline and its collaborators.
///
/// `MalformedRow` is the only row-local error: the pipeline absorbs it,
/// counts the row, and keeps streaming. Everything else is fatal to the run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv_async::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Malformed row at line {line}: {detail}")]
    MalformedRow { line: u64, detail: String },

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Sink unavailable: {0}")]
    SinkUnavailable(String),

    #[error("Sink request timed out: {0}")]
    SinkTimeout(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl SyncError {
    /// Row-local errors are absorbed by the pipeline; all others abort the run.
    pub fn is_row_local(&self) -> bool {
        matches!(self, SyncError::MalformedRow { .. })
    }

    /// Map an HTTP client error from a sink call onto the sink taxonomy.
    pub(crate) fn from_sink_http(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::SinkTimeout(err.to_string())
        } else {
            SyncError::SinkUnavailable(err.to_string())
        }
    }
}
