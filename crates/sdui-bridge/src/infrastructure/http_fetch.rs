//! HTTP module source fetcher.
//!
//! The fetch-then-import loading strategy needs the raw bytes of a
//! module before handing them to the importer.  This adapter implements
//! the `SourceFetcher` seam with a plain HTTP GET.

use async_trait::async_trait;
use tracing::debug;

use crate::application::loader::{FetchError, SourceFetcher};

/// Fetches module source bytes over HTTP(S).
pub struct HttpSourceFetcher {
    client: reqwest::Client,
}

impl HttpSourceFetcher {
    /// Creates a fetcher with a default client.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Creates a fetcher reusing an existing client (connection pools
    /// are per-client, so embedders sharing one client across concerns
    /// should pass it in).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpSourceFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceFetcher for HttpSourceFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError(format!("request to {url} failed: {e}")))?;

        // A reachable server answering 404 is as much a failed fetch as
        // an unreachable one.
        if !response.status().is_success() {
            return Err(FetchError(format!("{url} answered {}", response.status())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError(format!("reading body of {url} failed: {e}")))?;

        debug!("fetched {} bytes of module source from {url}", bytes.len());
        Ok(bytes.to_vec())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_host_reports_the_url() {
        let fetcher = HttpSourceFetcher::new();

        let err = fetcher
            .fetch("http://127.0.0.1:1/mod.js")
            .await
            .err()
            .expect("fetch must fail");

        assert!(err.to_string().contains("http://127.0.0.1:1/mod.js"));
    }

    #[test]
    fn test_default_constructs_a_fetcher() {
        let _ = HttpSourceFetcher::default();
    }
}
