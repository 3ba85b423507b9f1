//! Configuration types for note-to-story generation.
//!
//! All pipeline behaviour is controlled through [`StoryConfig`], built via
//! its [`StoryConfigBuilder`]. The config is constructed once, passed by
//! reference into every stage, and never read from process-wide state: the
//! extractor, illustrator and annotator can each be exercised with a
//! hand-made config and mock collaborators.

use crate::error::StoryError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Image substituted whenever a slide or the portrait cover cannot be produced.
pub const DEFAULT_ERROR_IMAGE: &str = "https://media.suvichaar.org/default-error.jpg";

/// Chat deployment used when the endpoint is a resource base URL.
pub const DEFAULT_CHAT_DEPLOYMENT: &str = "gpt-4";

/// Image deployment used when the endpoint is a resource base URL.
pub const DEFAULT_IMAGE_DEPLOYMENT: &str = "dall-e-3";

/// Configuration for one note-to-story run.
///
/// Built via [`StoryConfig::builder()`] or using [`StoryConfig::default()`]
/// and filling in the endpoint fields.
///
/// # Example
/// ```rust
/// use notes2story::{StoryConfig, StorageConfig};
///
/// let config = StoryConfig::builder()
///     .vision_endpoint("https://example.openai.azure.com/openai/deployments/gpt-4/chat/completions?api-version=2024-08-01-preview")
///     .chat_api_key("key")
///     .image_endpoint("https://example.openai.azure.com/openai/deployments/dall-e-3/images/generations?api-version=2024-02-01")
///     .image_api_key("key")
///     .storage(StorageConfig::directory("/tmp/stories"))
///     .cdn_base("https://cdn.example.com/")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct StoryConfig {
    /// Vision-capable chat completion endpoint. Either a full deployment
    /// URL or a resource base URL, which is expanded with `chat_deployment`.
    pub vision_endpoint: String,

    /// Chat completion endpoint used for SEO metadata, same forms as
    /// `vision_endpoint`. If None, the vision endpoint is reused.
    pub text_endpoint: Option<String>,

    /// Deployment name appended to a base chat endpoint.
    pub chat_deployment: String,

    /// `api-key` header value for the completion endpoints.
    pub chat_api_key: String,

    /// Text-to-image generation endpoint, full deployment URL or resource
    /// base URL (expanded with `image_deployment`).
    pub image_endpoint: String,

    /// Deployment name appended to a base image endpoint.
    pub image_deployment: String,

    /// `api-key` header value for the image endpoint.
    pub image_api_key: String,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`
    /// and the Azure-style endpoints for both completion calls.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// LLM provider name (e.g. "openai", "anthropic"). When set (and not
    /// "azure"), completions go through `edgequake-llm` instead of the
    /// Azure-style endpoint.
    pub provider_name: Option<String>,

    /// Model identifier used with `provider_name`.
    pub model: Option<String>,

    /// Where slide images are uploaded.
    pub storage: StorageConfig,

    /// Public base URL; a slide's URL is `cdn_base` followed by its storage key.
    pub cdn_base: String,

    /// Sentinel URL used for every asset that could not be produced.
    pub default_error_image: String,

    /// Attempt budget and backoff for each slide's image generation.
    pub retry: RetryPolicy,

    /// Sampling temperature for content extraction. Default: 0.7.
    pub content_temperature: f32,

    /// Maximum completion tokens for content extraction. Default: 1000.
    pub content_max_tokens: usize,

    /// Sampling temperature for SEO metadata. Default: 0.5.
    pub seo_temperature: f32,

    /// Maximum completion tokens for SEO metadata. Default: 300.
    pub seo_max_tokens: usize,

    /// Size string requested from the image generator. Default: "1024x1024".
    pub generation_size: String,

    /// Canvas every slide image is resized to. Default: 720×1200.
    pub slide_size: ImageSize,

    /// Canvas of the portrait cover. Default: 640×853.
    pub portrait_size: ImageSize,

    /// JPEG quality (1–100) for uploaded images. Default: 75.
    pub jpeg_quality: u8,

    /// Optional per-request timeout for service calls. Default: None
    /// (the HTTP client's own default).
    pub request_timeout_secs: Option<u64>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Receives stage and per-slide events. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            vision_endpoint: String::new(),
            text_endpoint: None,
            chat_deployment: DEFAULT_CHAT_DEPLOYMENT.to_string(),
            chat_api_key: String::new(),
            image_endpoint: String::new(),
            image_deployment: DEFAULT_IMAGE_DEPLOYMENT.to_string(),
            image_api_key: String::new(),
            provider: None,
            provider_name: None,
            model: None,
            storage: StorageConfig::default(),
            cdn_base: String::new(),
            default_error_image: DEFAULT_ERROR_IMAGE.to_string(),
            retry: RetryPolicy::default(),
            content_temperature: 0.7,
            content_max_tokens: 1000,
            seo_temperature: 0.5,
            seo_max_tokens: 300,
            generation_size: "1024x1024".to_string(),
            slide_size: ImageSize::new(720, 1200),
            portrait_size: ImageSize::new(640, 853),
            jpeg_quality: 75,
            request_timeout_secs: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for StoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoryConfig")
            .field("vision_endpoint", &self.vision_endpoint)
            .field("text_endpoint", &self.text_endpoint)
            .field("chat_deployment", &self.chat_deployment)
            .field("chat_api_key", &redact(&self.chat_api_key))
            .field("image_endpoint", &self.image_endpoint)
            .field("image_deployment", &self.image_deployment)
            .field("image_api_key", &redact(&self.image_api_key))
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("storage", &self.storage)
            .field("cdn_base", &self.cdn_base)
            .field("default_error_image", &self.default_error_image)
            .field("retry", &self.retry)
            .field("content_temperature", &self.content_temperature)
            .field("seo_temperature", &self.seo_temperature)
            .field("slide_size", &self.slide_size)
            .field("portrait_size", &self.portrait_size)
            .field("jpeg_quality", &self.jpeg_quality)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl StoryConfig {
    /// Create a new builder for `StoryConfig`.
    pub fn builder() -> StoryConfigBuilder {
        StoryConfigBuilder {
            config: Self::default(),
        }
    }

    /// Endpoint used by the SEO annotator.
    pub fn seo_endpoint(&self) -> &str {
        self.text_endpoint
            .as_deref()
            .unwrap_or(&self.vision_endpoint)
    }

    /// Public URL of an uploaded storage key.
    pub fn public_url(&self, key: &str) -> String {
        format!("{}{}", self.cdn_base, key)
    }

    /// `true` when completions go through `edgequake-llm` rather than the
    /// Azure-style endpoints.
    pub fn uses_llm_provider(&self) -> bool {
        self.provider.is_some()
            || self
                .provider_name
                .as_deref()
                .is_some_and(|name| !name.eq_ignore_ascii_case("azure"))
    }
}

/// Builder for [`StoryConfig`].
pub struct StoryConfigBuilder {
    config: StoryConfig,
}

impl fmt::Debug for StoryConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoryConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl StoryConfigBuilder {
    pub fn vision_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.vision_endpoint = url.into();
        self
    }

    pub fn text_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.text_endpoint = Some(url.into());
        self
    }

    pub fn chat_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.chat_api_key = key.into();
        self
    }

    pub fn image_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.image_endpoint = url.into();
        self
    }

    pub fn chat_deployment(mut self, name: impl Into<String>) -> Self {
        self.config.chat_deployment = name.into();
        self
    }

    pub fn image_deployment(mut self, name: impl Into<String>) -> Self {
        self.config.image_deployment = name.into();
        self
    }

    pub fn image_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.image_api_key = key.into();
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.config.storage = storage;
        self
    }

    pub fn cdn_base(mut self, base: impl Into<String>) -> Self {
        self.config.cdn_base = base.into();
        self
    }

    pub fn default_error_image(mut self, url: impl Into<String>) -> Self {
        self.config.default_error_image = url.into();
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    pub fn content_temperature(mut self, t: f32) -> Self {
        self.config.content_temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn content_max_tokens(mut self, n: usize) -> Self {
        self.config.content_max_tokens = n;
        self
    }

    pub fn seo_temperature(mut self, t: f32) -> Self {
        self.config.seo_temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn seo_max_tokens(mut self, n: usize) -> Self {
        self.config.seo_max_tokens = n;
        self
    }

    pub fn generation_size(mut self, size: impl Into<String>) -> Self {
        self.config.generation_size = size.into();
        self
    }

    pub fn slide_size(mut self, size: ImageSize) -> Self {
        self.config.slide_size = size;
        self
    }

    pub fn portrait_size(mut self, size: ImageSize) -> Self {
        self.config.portrait_size = size;
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<StoryConfig, StoryError> {
        let c = &self.config;
        if !c.uses_llm_provider() && c.vision_endpoint.trim().is_empty() {
            return Err(StoryError::InvalidConfig(
                "a vision endpoint (or an LLM provider) is required".into(),
            ));
        }
        if c.image_endpoint.trim().is_empty() {
            return Err(StoryError::InvalidConfig(
                "an image generation endpoint is required".into(),
            ));
        }
        if c.retry.max_attempts == 0 {
            return Err(StoryError::InvalidConfig(
                "retry budget must allow at least 1 attempt".into(),
            ));
        }
        if c.slide_size.is_empty() || c.portrait_size.is_empty() {
            return Err(StoryError::InvalidConfig(format!(
                "image canvases must be non-empty, got {} and {}",
                c.slide_size, c.portrait_size
            )));
        }
        if !(1..=100).contains(&c.jpeg_quality) {
            return Err(StoryError::InvalidConfig(format!(
                "JPEG quality must be 1-100, got {}",
                c.jpeg_quality
            )));
        }
        if c.default_error_image.trim().is_empty() {
            return Err(StoryError::InvalidConfig(
                "default error image URL must not be empty".into(),
            ));
        }
        c.storage.validate()?;
        Ok(self.config)
    }
}

// ── Value types ──────────────────────────────────────────────────────────

/// Attempt budget for one slide's image generation.
///
/// The budget is counted in attempts, not wall-clock time: a slide makes at
/// most `max_attempts` generation requests, sleeping `backoff` between two
/// consecutive attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Same budget, no waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }
}

/// A fixed output canvas in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Where slide images are persisted.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum StorageConfig {
    /// Not configured; `build()` rejects it.
    #[default]
    Unset,
    /// An S3 (or S3-compatible) bucket.
    S3(S3Config),
    /// A local directory; keys become relative paths under it.
    Directory(PathBuf),
}

impl StorageConfig {
    pub fn directory(root: impl Into<PathBuf>) -> Self {
        StorageConfig::Directory(root.into())
    }

    /// Key prefix prepended to every storage key (may be empty).
    pub fn prefix(&self) -> &str {
        match self {
            StorageConfig::S3(s3) => &s3.prefix,
            StorageConfig::Directory(_) | StorageConfig::Unset => "",
        }
    }

    fn validate(&self) -> Result<(), StoryError> {
        match self {
            StorageConfig::Unset => Err(StoryError::InvalidConfig(
                "no object storage configured".into(),
            )),
            StorageConfig::S3(s3) => {
                if s3.bucket.trim().is_empty() {
                    return Err(StoryError::InvalidConfig("S3 bucket must not be empty".into()));
                }
                if s3.region.trim().is_empty() {
                    return Err(StoryError::InvalidConfig("S3 region must not be empty".into()));
                }
                Ok(())
            }
            StorageConfig::Directory(root) => {
                if root.as_os_str().is_empty() {
                    return Err(StoryError::InvalidConfig(
                        "storage directory must not be empty".into(),
                    ));
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageConfig::Unset => f.write_str("Unset"),
            StorageConfig::S3(s3) => f.debug_tuple("S3").field(s3).finish(),
            StorageConfig::Directory(root) => f.debug_tuple("Directory").field(root).finish(),
        }
    }
}

/// Bucket, key prefix and static credentials for [`StorageConfig::S3`].
#[derive(Clone, Default, PartialEq, Eq)]
pub struct S3Config {
    pub bucket: String,
    /// Prefix such as `"webstories/"`; concatenated verbatim with the slug.
    pub prefix: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    /// Custom endpoint for S3-compatible stores (MinIO, R2, …).
    pub endpoint_url: Option<String>,
}

impl fmt::Debug for S3Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Config")
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .field("region", &self.region)
            .field("access_key", &redact(&self.access_key))
            .field("secret_key", &redact(&self.secret_key))
            .field("endpoint_url", &self.endpoint_url)
            .finish()
    }
}
