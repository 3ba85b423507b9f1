//! # notes2story
//!
//! Turn a photo of handwritten or printed notes into a six-slide "web story":
//! a title, five short paragraphs, six illustrations, a portrait cover and
//! SEO metadata, delivered as one flat JSON document.
//!
//! ## Pipeline Overview
//!
//! ```text
//! note image
//!  │
//!  ├─ 1. Extract     vision model reads the note → title, paragraphs, prompts
//!  ├─ 2. Illustrate  per slide: generate → download → 720×1200 JPEG → upload
//!  │                 (3 attempts, 5 s apart; default-error image on failure)
//!  │                 then slide 1 → 640×853 portrait cover
//!  ├─ 3. Annotate    text model → meta description + keywords
//!  └─ 4. Output      pretty JSON + `{title}_{YYYYMMDD_HHMMSS}.json` filename
//! ```
//!
//! Extraction and annotation failures abort the run. Illustration never
//! does: a slide whose image cannot be produced points at the configured
//! default-error image instead.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use notes2story::{create_story_from_input, StoryConfig, StorageConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StoryConfig::builder()
//!         .vision_endpoint(std::env::var("AZURE_OPENAI_ENDPOINT")?)
//!         .chat_api_key(std::env::var("AZURE_OPENAI_API_KEY")?)
//!         .image_endpoint(std::env::var("AZURE_IMAGE_ENDPOINT")?)
//!         .image_api_key(std::env::var("AZURE_IMAGE_API_KEY")?)
//!         .storage(StorageConfig::directory("media"))
//!         .cdn_base("https://cdn.example.com/")
//!         .build()?;
//!     let story = create_story_from_input("notes.jpg", &config).await?;
//!     println!("{}", story.json);
//!     eprintln!("{}/6 slides generated", story.stats.slides_generated);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `notes2story` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! notes2story = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod error;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod story;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ImageSize, RetryPolicy, S3Config, StorageConfig, StoryConfig, StoryConfigBuilder,
    DEFAULT_CHAT_DEPLOYMENT, DEFAULT_ERROR_IMAGE, DEFAULT_IMAGE_DEPLOYMENT,
};
pub use error::{AssetError, StoryError};
pub use output::{
    ContentDraft, Illustration, PortraitCover, SeoMetadata, SlideAsset, StoryArtifact,
    StoryDocument, StoryStats,
};
pub use progress::{NoopProgressCallback, ProgressCallback, Stage, StoryProgressCallback};
pub use story::{
    create_story, create_story_from_input, create_story_sync, create_story_to_file,
    create_story_with, write_artifact, Services,
};
