//! Slide illustration: one generated, normalised and uploaded image per slide.
//!
//! ## Degrade, don't fail
//!
//! Each slide gets `retry.max_attempts` tries. An attempt is the whole
//! generate → download → resize → upload chain; any [`AssetError`] in it
//! consumes the attempt. When the budget is spent the slide gets the
//! default-error image URL and the next slide starts. Nothing in this stage
//! returns an error to the orchestrator.
//!
//! The portrait cover is derived afterwards from slide 1's resolved URL and
//! falls back the same way, but only for [`AssetError`]s: the boundary is
//! typed, so a bug elsewhere is not silently turned into a fallback image.

use crate::backend::{Fetcher, ImageGenerator, ObjectStore};
use crate::config::{ImageSize, StoryConfig};
use crate::error::AssetError;
use crate::naming::{portrait_key, slide_key, slugify, SLIDE_COUNT};
use crate::output::{ContentDraft, Illustration, PortraitCover, SlideAsset};
use crate::pipeline::encode;
use tokio::time::sleep;
use tracing::{debug, info, warn};

const JPEG: &str = "image/jpeg";

/// Drives image generation, download and upload for one story.
pub struct Illustrator<'a> {
    generator: &'a dyn ImageGenerator,
    fetcher: &'a dyn Fetcher,
    store: &'a dyn ObjectStore,
    config: &'a StoryConfig,
}

impl<'a> Illustrator<'a> {
    pub fn new(
        generator: &'a dyn ImageGenerator,
        fetcher: &'a dyn Fetcher,
        store: &'a dyn ObjectStore,
        config: &'a StoryConfig,
    ) -> Self {
        Self {
            generator,
            fetcher,
            store,
            config,
        }
    }

    /// Illustrate all six slides in order, then derive the portrait cover.
    ///
    /// Always returns [`SLIDE_COUNT`] slides and one portrait, each with a
    /// non-empty URL.
    pub async fn illustrate(&self, draft: &ContentDraft) -> Illustration {
        let slug = slugify(&draft.title);
        let prefix = self.config.storage.prefix();
        info!("Illustrating {} slides under '{}{}/'", SLIDE_COUNT, prefix, slug);

        let mut slides = Vec::with_capacity(SLIDE_COUNT);
        for (i, prompt) in draft.image_prompts.iter().enumerate() {
            let index = i + 1;
            let slide = self
                .illustrate_slide(index, prompt, slide_key(prefix, &slug, index))
                .await;
            slides.push(slide);
        }

        let cover_source = slides
            .first()
            .map(|s| s.public_url.clone())
            .unwrap_or_else(|| self.config.default_error_image.clone());
        let portrait = self
            .portrait(&cover_source, portrait_key(prefix, &slug))
            .await;

        Illustration { slides, portrait }
    }

    async fn illustrate_slide(&self, index: usize, prompt: &str, storage_key: String) -> SlideAsset {
        let policy = self.config.retry;
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_slide_start(index, SLIDE_COUNT);
        }

        let mut last_err: Option<AssetError> = None;
        let mut attempts = 0;

        for attempt in 1..=policy.max_attempts {
            if attempt > 1 && !policy.backoff.is_zero() {
                debug!(
                    "Slide {}: waiting {:?} before attempt {}/{}",
                    index, policy.backoff, attempt, policy.max_attempts
                );
                sleep(policy.backoff).await;
            }
            attempts = attempt;

            match self.attempt_slide(prompt, &storage_key).await {
                Ok(remote_url) => {
                    let public_url = self.config.public_url(&storage_key);
                    info!("Slide {}: uploaded {} (attempt {})", index, public_url, attempt);
                    if let Some(ref cb) = self.config.progress_callback {
                        cb.on_slide_complete(index, SLIDE_COUNT, &public_url, attempt);
                    }
                    return SlideAsset {
                        index,
                        prompt: prompt.to_string(),
                        remote_image_url: Some(remote_url),
                        storage_key,
                        public_url,
                        attempts: attempt,
                        error: None,
                    };
                }
                Err(e) => {
                    warn!(
                        "Slide {}: attempt {}/{} failed — {}",
                        index, attempt, policy.max_attempts, e
                    );
                    last_err = Some(e);
                }
            }
        }

        let error = last_err.unwrap_or_else(|| AssetError::Generation {
            status: None,
            detail: "retry policy allows no attempts".into(),
        });
        warn!("Slide {}: using default error image", index);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_slide_fallback(index, SLIDE_COUNT, &error.to_string());
        }

        SlideAsset {
            index,
            prompt: prompt.to_string(),
            remote_image_url: None,
            storage_key,
            public_url: self.config.default_error_image.clone(),
            attempts,
            error: Some(error),
        }
    }

    /// One generate → download → normalise → upload chain.
    async fn attempt_slide(&self, prompt: &str, storage_key: &str) -> Result<String, AssetError> {
        let remote_url = self.generator.generate(prompt).await?;
        self.rehost(&remote_url, storage_key, self.config.slide_size)
            .await?;
        Ok(remote_url)
    }

    async fn portrait(&self, source_url: &str, storage_key: String) -> PortraitCover {
        let result = self
            .rehost(source_url, &storage_key, self.config.portrait_size)
            .await;

        let cover = match result {
            Ok(()) => PortraitCover {
                public_url: self.config.public_url(&storage_key),
                storage_key,
                error: None,
            },
            Err(e) => {
                warn!("Portrait cover: {} — using default error image", e);
                PortraitCover {
                    public_url: self.config.default_error_image.clone(),
                    storage_key,
                    error: Some(e),
                }
            }
        };
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_portrait_complete(&cover.public_url, cover.fell_back());
        }
        cover
    }

    /// Download `url`, re-encode to `size` and upload at `storage_key`.
    async fn rehost(&self, url: &str, storage_key: &str, size: ImageSize) -> Result<(), AssetError> {
        let bytes = self.fetcher.fetch(url).await?;
        let jpeg = encode::normalize_jpeg(&bytes, size, self.config.jpeg_quality)?;
        self.store.put(storage_key, jpeg, JPEG).await
    }
}
