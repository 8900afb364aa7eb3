use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, LOCATION};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Mimetype prefixes treated as markup by the link extractor and the
/// accessibility analyzer.
pub const HTML_MIMETYPES: [&str; 4] = [
    "text/html",
    "text/xml",
    "application/xhtml+xml",
    "application/xml",
];

/// Statuses the crawl loop treats as redirects.
pub const REDIRECT_STATUSES: [u16; 5] = [301, 302, 303, 307, 308];

/// What came back for one request: a response (status, headers, fully
/// buffered body) and/or a transport error.
#[derive(Debug, Clone, Default)]
pub struct FetchResult {
    pub status_code: Option<u16>,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub error: Option<String>,
}

impl FetchResult {
    pub fn new(status_code: u16, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status_code: Some(status_code),
            headers,
            body: body.into(),
            error: None,
        }
    }

    pub fn with_error(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn has_response(&self) -> bool {
        self.status_code.is_some()
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn mimetype(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    pub fn is_html(&self) -> bool {
        self.mimetype().is_some_and(is_html_mimetype)
    }

    pub fn is_redirect(&self) -> bool {
        self.status_code
            .is_some_and(|code| REDIRECT_STATUSES.contains(&code))
    }
}

pub fn is_html_mimetype(mimetype: &str) -> bool {
    let mimetype = mimetype.trim().to_ascii_lowercase();
    HTML_MIMETYPES.iter().any(|m| mimetype.starts_with(m))
}

/// Health of a link checked without being crawled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlReport {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl UrlReport {
    pub fn is_valid(&self) -> bool {
        (200..400).contains(&self.status_code)
    }
}

/// The narrow slice of an HTTP client the auditor depends on.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &str) -> FetchResult;
    async fn head(&self, url: &str) -> FetchResult;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(30)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("webaudit/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            // Redirects are surfaced to the crawl loop, not followed
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: &str) -> FetchResult {
        let start = Instant::now();
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Request to {} failed: {}", url, e);
                return FetchResult::with_error(e.to_string());
            }
        };

        let status_code = response.status().as_u16();
        let headers = response.headers().clone();
        let error = if response.status().is_client_error() || response.status().is_server_error() {
            Some(format!("HTTP {}", response.status()))
        } else {
            None
        };

        match response.bytes().await {
            Ok(body) => {
                debug!(
                    "Fetched {} ({}, {} bytes in {:?})",
                    url,
                    status_code,
                    body.len(),
                    start.elapsed()
                );
                FetchResult {
                    status_code: Some(status_code),
                    headers,
                    body,
                    error,
                }
            }
            Err(e) => {
                warn!("Reading body of {} failed: {}", url, e);
                FetchResult {
                    status_code: Some(status_code),
                    headers,
                    body: Bytes::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str) -> FetchResult {
        self.send(self.client.get(url), url).await
    }

    async fn head(&self, url: &str) -> FetchResult {
        self.send(self.client.head(url), url).await
    }
}
