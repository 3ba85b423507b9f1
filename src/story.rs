//! Story generation entry points.
//!
//! [`create_story_with`] is the orchestrator: extract → illustrate →
//! annotate, strictly one after another, merged into one [`StoryDocument`].
//! Errors from extraction and annotation abort the run; illustration always
//! completes (failed images become the default-error URL).
//!
//! The other entry points are conveniences around it: building production
//! [`Services`] from the config, resolving a path or URL first, writing the
//! artifact to disk, or running without an async runtime.

use crate::backend::azure::{
    resolve_endpoint, AzureChatClient, AzureImageClient, CHAT_API_VERSION, IMAGE_API_VERSION,
};
use crate::backend::fs::DirectoryStore;
use crate::backend::http::{build_client, HttpFetcher};
use crate::backend::provider::{resolve_provider, ProviderChat};
use crate::backend::s3::S3Store;
use crate::backend::{ChatBackend, Fetcher, ImageGenerator, ObjectStore};
use crate::config::{StorageConfig, StoryConfig};
use crate::error::StoryError;
use crate::naming::{artifact_filename, SLIDE_COUNT};
use crate::output::{StoryArtifact, StoryDocument, StoryStats};
use crate::pipeline::illustrate::Illustrator;
use crate::pipeline::{annotate, extract, input};
use crate::progress::Stage;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// The external collaborators one run talks to.
///
/// Built from a [`StoryConfig`] by [`Services::from_config`], or assembled by
/// hand to swap in other backends (tests use in-memory ones).
#[derive(Clone)]
pub struct Services {
    /// Vision completion, used by extraction.
    pub chat: Arc<dyn ChatBackend>,
    /// Text completion, used by SEO annotation.
    pub seo_chat: Arc<dyn ChatBackend>,
    pub generator: Arc<dyn ImageGenerator>,
    pub fetcher: Arc<dyn Fetcher>,
    pub store: Arc<dyn ObjectStore>,
}

impl Services {
    /// Services that use the same chat backend for both completion calls.
    pub fn new(
        chat: Arc<dyn ChatBackend>,
        generator: Arc<dyn ImageGenerator>,
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            seo_chat: Arc::clone(&chat),
            chat,
            generator,
            fetcher,
            store,
        }
    }

    pub fn with_seo_chat(mut self, chat: Arc<dyn ChatBackend>) -> Self {
        self.seo_chat = chat;
        self
    }

    /// Build the production backends described by `config`.
    ///
    /// Clients are constructed once here and shared by every request of the
    /// run.
    pub fn from_config(config: &StoryConfig) -> Result<Self, StoryError> {
        let client = build_client(config.request_timeout_secs)?;

        let (chat, seo_chat): (Arc<dyn ChatBackend>, Arc<dyn ChatBackend>) =
            if config.uses_llm_provider() {
                let provider = resolve_provider(config)?;
                let name = match (&config.provider_name, &config.model) {
                    (Some(p), Some(m)) => format!("{p} ({m})"),
                    (Some(p), None) => p.clone(),
                    _ => "llm provider".to_string(),
                };
                let chat: Arc<dyn ChatBackend> = Arc::new(ProviderChat::new(name, provider));
                (Arc::clone(&chat), chat)
            } else {
                if config.vision_endpoint.trim().is_empty() {
                    return Err(StoryError::ProviderNotConfigured {
                        provider: "azure".into(),
                        hint: "set AZURE_OPENAI_ENDPOINT or choose a provider with --provider".into(),
                    });
                }
                (
                    Arc::new(AzureChatClient::new(
                        "vision completion",
                        chat_url(config, &config.vision_endpoint),
                        config.chat_api_key.as_str(),
                        client.clone(),
                    )),
                    Arc::new(AzureChatClient::new(
                        "text completion",
                        chat_url(config, config.seo_endpoint()),
                        config.chat_api_key.as_str(),
                        client.clone(),
                    )),
                )
            };

        let generator = Arc::new(AzureImageClient::new(
            image_url(config),
            config.image_api_key.as_str(),
            config.generation_size.as_str(),
            client.clone(),
        ));
        let fetcher = Arc::new(HttpFetcher::new(client));

        let store: Arc<dyn ObjectStore> = match &config.storage {
            StorageConfig::S3(s3) => Arc::new(S3Store::new(s3)),
            StorageConfig::Directory(root) => Arc::new(DirectoryStore::new(root.clone())),
            StorageConfig::Unset => {
                return Err(StoryError::InvalidConfig(
                    "no object storage configured".into(),
                ))
            }
        };

        Ok(Self {
            chat,
            seo_chat,
            generator,
            fetcher,
            store,
        })
    }
}

fn chat_url(config: &StoryConfig, endpoint: &str) -> String {
    resolve_endpoint(
        endpoint,
        &config.chat_deployment,
        "chat/completions",
        CHAT_API_VERSION,
    )
}

fn image_url(config: &StoryConfig) -> String {
    resolve_endpoint(
        &config.image_endpoint,
        &config.image_deployment,
        "images/generations",
        IMAGE_API_VERSION,
    )
}

/// Turn one note image into a story, using production backends.
///
/// # Errors
/// Returns `Err(StoryError)` when the image is not an image, a backend is
/// not configured, or the content or SEO request fails (non-success status
/// or an unparseable reply). Image generation problems never fail the run.
///
/// # Example
/// ```rust,no_run
/// use notes2story::{create_story, StoryConfig, StorageConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = StoryConfig::builder()
///     .vision_endpoint(std::env::var("AZURE_OPENAI_ENDPOINT")?)
///     .chat_api_key(std::env::var("AZURE_OPENAI_API_KEY")?)
///     .image_endpoint(std::env::var("AZURE_IMAGE_ENDPOINT")?)
///     .image_api_key(std::env::var("AZURE_IMAGE_API_KEY")?)
///     .storage(StorageConfig::directory("out/media"))
///     .cdn_base("https://cdn.example.com/")
///     .build()?;
/// let bytes = std::fs::read("notes.jpg")?;
/// let story = create_story(&bytes, &config).await?;
/// std::fs::write(&story.filename, &story.json)?;
/// # Ok(())
/// # }
/// ```
pub async fn create_story(
    image_bytes: &[u8],
    config: &StoryConfig,
) -> Result<StoryArtifact, StoryError> {
    let services = Services::from_config(config)?;
    create_story_with(image_bytes, &services, config).await
}

/// Run the pipeline against explicit collaborators.
pub async fn create_story_with(
    image_bytes: &[u8],
    services: &Services,
    config: &StoryConfig,
) -> Result<StoryArtifact, StoryError> {
    let total_start = Instant::now();
    input::ensure_image("<image bytes>", image_bytes)?;
    info!("Starting story generation ({} byte note image)", image_bytes.len());

    // ── Step 1: Content ──────────────────────────────────────────────────
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(Stage::Extract);
    }
    let extract_start = Instant::now();
    let draft = extract::extract(image_bytes, services.chat.as_ref(), config).await?;
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;

    // ── Step 2: Images ───────────────────────────────────────────────────
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(Stage::Illustrate);
    }
    let illustrate_start = Instant::now();
    let illustration = Illustrator::new(
        services.generator.as_ref(),
        services.fetcher.as_ref(),
        services.store.as_ref(),
        config,
    )
    .illustrate(&draft)
    .await;
    let illustrate_duration_ms = illustrate_start.elapsed().as_millis() as u64;

    // ── Step 3: SEO ──────────────────────────────────────────────────────
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(Stage::Annotate);
    }
    let annotate_start = Instant::now();
    let seo = annotate::annotate(&draft, services.seo_chat.as_ref(), config).await?;
    let annotate_duration_ms = annotate_start.elapsed().as_millis() as u64;

    // ── Step 4: Assemble ─────────────────────────────────────────────────
    let filename = artifact_filename(&draft.title, chrono::Local::now().naive_local());
    let generated = illustration.generated_count();
    let stats = StoryStats {
        slides_generated: generated,
        slides_fallback: illustration.slides.len() - generated,
        generation_attempts: illustration.total_attempts(),
        portrait_fallback: illustration.portrait.fell_back(),
        extract_duration_ms,
        illustrate_duration_ms,
        annotate_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    let document = StoryDocument {
        draft,
        illustration,
        seo,
    };
    let json = document
        .to_json_pretty()
        .map_err(|e| StoryError::Internal(format!("serialising story: {e}")))?;

    info!(
        "Story complete: {}/{} slides generated, {}ms total → {}",
        generated, SLIDE_COUNT, stats.total_duration_ms, filename
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_story_complete(generated, SLIDE_COUNT);
    }

    Ok(StoryArtifact {
        document,
        json,
        filename,
        stats,
    })
}

/// Resolve a local path or HTTP(S) URL to image bytes, then run
/// [`create_story`].
pub async fn create_story_from_input(
    input_str: impl AsRef<str>,
    config: &StoryConfig,
) -> Result<StoryArtifact, StoryError> {
    let bytes = input::load_image(input_str.as_ref(), config.download_timeout_secs).await?;
    create_story(&bytes, config).await
}

/// Generate a story and write its JSON into `output_dir` under the
/// suggested filename.
///
/// The file appears atomically (temp file in the same directory, then
/// rename). Returns the written path with the artifact.
pub async fn create_story_to_file(
    input_str: impl AsRef<str>,
    output_dir: impl AsRef<Path>,
    config: &StoryConfig,
) -> Result<(PathBuf, StoryArtifact), StoryError> {
    let artifact = create_story_from_input(input_str, config).await?;
    let path = write_artifact(&artifact, output_dir.as_ref())?;
    Ok((path, artifact))
}

/// Write `artifact.json` to `dir/artifact.filename` via temp file + rename.
pub fn write_artifact(artifact: &StoryArtifact, dir: &Path) -> Result<PathBuf, StoryError> {
    let path = dir.join(&artifact.filename);
    let write_err = |source: std::io::Error| StoryError::OutputWriteFailed {
        path: path.clone(),
        source,
    };

    std::fs::create_dir_all(dir).map_err(write_err)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(artifact.json.as_bytes()).map_err(write_err)?;
    tmp.persist(&path).map_err(|e| write_err(e.error))?;

    debug!("Wrote {}", path.display());
    Ok(path)
}

/// Synchronous wrapper around [`create_story`].
///
/// Creates a temporary tokio runtime internally.
pub fn create_story_sync(
    image_bytes: &[u8],
    config: &StoryConfig,
) -> Result<StoryArtifact, StoryError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| StoryError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(create_story(image_bytes, config))
}
