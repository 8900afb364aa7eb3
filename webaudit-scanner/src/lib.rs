pub mod analyzer;
pub mod error;
pub mod fetch;
pub mod html;
pub mod resolver;

pub use analyzer::{AnalyzerConfig, AnalyzerKind, AnalyzerSelection, InlineImage};
pub use error::{Result, ScanError};
pub use fetch::{FetchResult, Fetcher, HttpFetcher, UrlReport};
pub use resolver::{AuditUrl, sha256_hex};
