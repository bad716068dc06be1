use async_trait::async_trait;
use osmcache_core::error::{Error, NetworkError, Result};
use osmcache_core::ports::ElementSource;
use reqwest::header::{HeaderMap, CONTENT_TYPE, RETRY_AFTER};
use reqwest::StatusCode;
use std::time::Duration;

/// Overpass API client
pub struct OverpassClient {
    /// Interpreter endpoint (e.g., "https://overpass-api.de/api/interpreter")
    url: String,

    /// Client-side timeout per request
    timeout: Duration,

    /// HTTP client
    client: reqwest::Client,
}

impl OverpassClient {
    /// Create a new Overpass client
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("osmcache/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::ConfigInvalid {
                key: "overpass_url".to_string(),
                reason: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self { url: url.into(), timeout, client })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ElementSource for OverpassClient {
    async fn fetch(&self, query: &str) -> std::result::Result<String, NetworkError> {
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(query.to_string())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, response.headers()));
        }

        response.text().await.map_err(|e| self.transport_error(e))
    }

    fn describe(&self) -> String {
        format!("Overpass API at {}", self.url)
    }
}

impl OverpassClient {
    fn transport_error(&self, e: reqwest::Error) -> NetworkError {
        if e.is_timeout() {
            NetworkError::Timeout { seconds: self.timeout.as_secs() }
        } else {
            NetworkError::Transport(e.to_string())
        }
    }
}

/// Map a non-success status onto the retry taxonomy
fn classify_status(status: StatusCode, headers: &HeaderMap) -> NetworkError {
    match status.as_u16() {
        429 => NetworkError::RateLimited { retry_after: retry_after(headers) },
        503 | 504 => NetworkError::ServerError { status: status.as_u16() },
        code => NetworkError::Http { status: code },
    }
}

/// Numeric `Retry-After` in seconds; HTTP dates are ignored
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
