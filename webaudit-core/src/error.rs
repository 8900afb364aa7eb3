use thiserror::Error;
use webaudit_scanner::ScanError;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] ScanError),

    /// `next()` was called on a frontier without a pending URL.
    #[error("Crawl frontier exhausted")]
    FrontierExhausted,

    #[error("Corrupt checkpoint: {0}")]
    CheckpointCorrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Invalid ignore pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Report error: {0}")]
    Report(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
