use async_trait::async_trait;

use crate::error::NetworkError;

/// Port for the remote bbox + tag-filter query service
///
/// Implementations perform exactly one request per call; retries, pacing and
/// timeouts around the request are the caller's concern.
#[async_trait]
pub trait ElementSource: Send + Sync {
    /// Execute a query and return the raw response body
    async fn fetch(&self, query: &str) -> Result<String, NetworkError>;

    /// Short description for logs
    fn describe(&self) -> String {
        "element source".to_string()
    }
}
