use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),

    #[error("{tool} timed out after {seconds}s")]
    AnalyzerTimeout { tool: String, seconds: u64 },

    #[error("{tool} exited with status {code:?}: {stderr}")]
    AnalyzerFailed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{tool} produced unreadable output: {reason}")]
    MalformedOutput { tool: String, reason: String },

    #[error("Other error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;
