//! Plain HTTP downloads and the shared reqwest client.

use super::Fetcher;
use crate::error::{AssetError, StoryError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Build the reqwest client shared by every service.
///
/// Without `timeout_secs` the client keeps reqwest's default (no deadline).
pub fn build_client(timeout_secs: Option<u64>) -> Result<reqwest::Client, StoryError> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder
        .build()
        .map_err(|e| StoryError::Internal(format!("HTTP client: {e}")))
}

/// Downloads generated images (and re-downloads uploaded ones) with GET.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AssetError> {
        let download_err = |detail: String| AssetError::Download {
            url: url.to_string(),
            detail,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| download_err(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(download_err(format!("HTTP {}", status.as_u16())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| download_err(e.to_string()))?;
        debug!("Fetched {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_builds_with_and_without_timeout() {
        assert!(build_client(None).is_ok());
        assert!(build_client(Some(30)).is_ok());
    }
}
