//! External collaborators, each behind a narrow async trait.
//!
//! The pipeline never talks to a service directly; it holds trait objects:
//!
//! | Trait | Production implementation |
//! |---|---|
//! | [`ChatBackend`] | [`azure::AzureChatClient`], [`provider::ProviderChat`] |
//! | [`ImageGenerator`] | [`azure::AzureImageClient`] |
//! | [`Fetcher`] | [`http::HttpFetcher`] |
//! | [`ObjectStore`] | [`s3::S3Store`], [`fs::DirectoryStore`] |
//!
//! Tests swap in in-memory implementations.

pub mod azure;
pub mod fs;
pub mod http;
pub mod provider;
pub mod s3;

use crate::error::{AssetError, StoryError};
use async_trait::async_trait;

/// A base64 image embedded in a chat request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub base64: String,
}

impl InlineImage {
    pub fn new(mime_type: impl Into<String>, base64: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            base64: base64.into(),
        }
    }

    /// `data:{mime};base64,{payload}`
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// One chat-completion request: a system message and one user turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    /// User text; may be empty when the image carries the content.
    pub user_text: String,
    pub image: Option<InlineImage>,
    pub temperature: f32,
    pub max_tokens: usize,
}

/// A chat-completion service returning the assistant message text.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Human-readable name used in errors and logs.
    fn name(&self) -> &str;

    /// Send one request. Non-success statuses are [`StoryError::Upstream`],
    /// envelopes without `choices[0].message.content` are
    /// [`StoryError::Format`].
    async fn complete(&self, request: &ChatRequest) -> Result<String, StoryError>;
}

/// A text-to-image service.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Request one image for `prompt` and return its (temporary) URL.
    async fn generate(&self, prompt: &str) -> Result<String, AssetError>;
}

/// Downloads bytes from a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AssetError>;
}

/// Durable key-value upload.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), AssetError>;
}

/// Trim an upstream error body so it fits on one log line.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 300;
    let body = body.trim();
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}\u{2026}", &body[..cut]),
        None => body.to_string(),
    }
}
