use thiserror::Error;

/// Result type alias for relay operations
pub type Result<T, E = RelayError> = std::result::Result<T, E>;

/// Errors that can occur while serving or forwarding relay traffic
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] crate::config::ValidationError),

    #[error("Next hop timeout for {0}")]
    ForwardTimeout(String),

    #[error("Next hop request failed for {0}: {1}")]
    ForwardFailed(String, String),

    #[error("HTTP client error: {0}")]
    HttpClientError(#[from] reqwest::Error),

    #[error("Response serialization error: {0}")]
    ResponseSerializationError(#[from] serde_json::Error),

    #[error("Workload task failed: {0}")]
    WorkloadTask(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
