//! Progress-callback trait for pipeline events.
//!
//! Inject an [`Arc<dyn StoryProgressCallback>`] via
//! [`crate::config::StoryConfigBuilder::progress_callback`] to receive events
//! as the pipeline moves through its stages and illustrates each slide.
//!
//! # Example
//!
//! ```rust
//! use notes2story::{StoryProgressCallback, Stage};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     fallbacks: AtomicUsize,
//! }
//!
//! impl StoryProgressCallback for CountingCallback {
//!     fn on_slide_fallback(&self, index: usize, total: usize, error: &str) {
//!         self.fallbacks.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("slide {index}/{total} fell back: {error}");
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { fallbacks: AtomicUsize::new(0) });
//! cb.on_slide_fallback(3, 6, "HTTP 500");
//! assert_eq!(cb.fallbacks.load(Ordering::SeqCst), 1);
//! ```

use std::fmt;
use std::sync::Arc;

/// The three pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Illustrate,
    Annotate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Extract => "extracting content",
            Stage::Illustrate => "illustrating slides",
            Stage::Annotate => "writing SEO metadata",
        })
    }
}

/// Called by the pipeline as it progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. The pipeline is sequential, but implementations are
/// still required to be `Send + Sync` so they can be shared with the task
/// that drives the run.
pub trait StoryProgressCallback: Send + Sync {
    /// Called when a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called just before the first generation attempt for a slide.
    ///
    /// # Arguments
    /// * `index` — 1-indexed slide number
    /// * `total` — number of slides
    fn on_slide_start(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// Called when a slide image was generated and uploaded.
    fn on_slide_complete(&self, index: usize, total: usize, url: &str, attempts: u32) {
        let _ = (index, total, url, attempts);
    }

    /// Called when a slide exhausted its attempts and fell back to the
    /// default-error image.
    fn on_slide_fallback(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called once the portrait cover has been resolved (real or fallback).
    fn on_portrait_complete(&self, url: &str, fell_back: bool) {
        let _ = (url, fell_back);
    }

    /// Called once after the document has been assembled.
    ///
    /// # Arguments
    /// * `generated` — slides with a real CDN image
    /// * `total`     — number of slides
    fn on_story_complete(&self, generated: usize, total: usize) {
        let _ = (generated, total);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl StoryProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::StoryConfig`].
pub type ProgressCallback = Arc<dyn StoryProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        stages: AtomicUsize,
        completes: AtomicUsize,
        fallbacks: AtomicUsize,
        generated: AtomicUsize,
    }

    impl StoryProgressCallback for TrackingCallback {
        fn on_stage_start(&self, _stage: Stage) {
            self.stages.fetch_add(1, Ordering::SeqCst);
        }

        fn on_slide_complete(&self, _index: usize, _total: usize, _url: &str, _attempts: u32) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_slide_fallback(&self, _index: usize, _total: usize, _error: &str) {
            self.fallbacks.fetch_add(1, Ordering::SeqCst);
        }

        fn on_story_complete(&self, generated: usize, _total: usize) {
            self.generated.store(generated, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage_start(Stage::Extract);
        cb.on_slide_start(1, 6);
        cb.on_slide_complete(1, 6, "https://cdn/x.jpg", 1);
        cb.on_slide_fallback(2, 6, "HTTP 500");
        cb.on_portrait_complete("https://cdn/p.jpg", false);
        cb.on_story_complete(5, 6);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_stage_start(Stage::Extract);
        tracker.on_stage_start(Stage::Illustrate);
        tracker.on_slide_complete(1, 6, "u", 1);
        tracker.on_slide_complete(2, 6, "u", 2);
        tracker.on_slide_fallback(3, 6, "boom");
        tracker.on_story_complete(2, 6);

        assert_eq!(tracker.stages.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.fallbacks.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.generated.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn stage_display_is_human_readable() {
        assert_eq!(Stage::Annotate.to_string(), "writing SEO metadata");
    }
}
