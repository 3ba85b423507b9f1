//! Input resolution: turn a user-supplied path or URL into note-image bytes.
//!
//! The pipeline itself works on bytes ([`crate::story::create_story`]); this
//! stage exists for callers that start from a path or link. The bytes are
//! checked to be a decodable image format before any service is called, so a
//! wrong file fails here rather than as a confusing vision-model reply.

use crate::error::StoryError;
use std::path::PathBuf;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to image bytes.
///
/// URLs are downloaded (bounded by `timeout_secs`); anything else is read as
/// a local file.
pub async fn load_image(input: &str, timeout_secs: u64) -> Result<Vec<u8>, StoryError> {
    let bytes = if is_url(input) {
        download_url(input, timeout_secs).await?
    } else {
        read_local(input).await?
    };
    ensure_image(input, &bytes)?;
    Ok(bytes)
}

/// Reject empty inputs and bytes no image decoder recognises.
pub fn ensure_image(input: &str, bytes: &[u8]) -> Result<(), StoryError> {
    if bytes.is_empty() {
        return Err(StoryError::InvalidInput {
            input: input.to_string(),
            reason: "image is empty".into(),
        });
    }
    if image::guess_format(bytes).is_err() {
        return Err(StoryError::NotAnImage {
            input: input.to_string(),
            magic: bytes.iter().take(4).copied().collect(),
        });
    }
    Ok(())
}

async fn read_local(path_str: &str) -> Result<Vec<u8>, StoryError> {
    let path = PathBuf::from(path_str);
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            debug!("Read {} bytes from {}", bytes.len(), path.display());
            Ok(bytes)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(StoryError::FileNotFound { path })
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(StoryError::PermissionDenied { path })
        }
        Err(e) => Err(StoryError::InvalidInput {
            input: path_str.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<Vec<u8>, StoryError> {
    info!("Downloading note image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| StoryError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            StoryError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            StoryError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(StoryError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| StoryError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    info!("Downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}
