//! CLI binary for notes2story.
//!
//! A thin shim over the library crate that maps CLI flags (with environment
//! fallbacks) to `StoryConfig`, shows progress and writes the story JSON.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use notes2story::{
    create_story_from_input, write_artifact, ProgressCallback, RetryPolicy, S3Config, Stage,
    StorageConfig, StoryConfig, StoryProgressCallback, DEFAULT_CHAT_DEPLOYMENT,
    DEFAULT_ERROR_IMAGE, DEFAULT_IMAGE_DEPLOYMENT,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: a spinner for the two model calls, a six-step bar for
/// the slides, and one log line per slide.
struct CliProgressCallback {
    bar: ProgressBar,
    slide_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Loading note image…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            slide_started: Mutex::new(None),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:30.green/238}] {pos}/{len} slides  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Illustrating");
    }

    /// Stop the spinner in place so an error is not drawn over it.
    fn abandon(&self) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }

    fn slide_elapsed(&self) -> String {
        let secs = self
            .slide_started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        dim(&format!("{secs:.1}s"))
    }
}

impl StoryProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        match stage {
            Stage::Extract => {
                self.bar.set_prefix("Reading");
                self.bar.set_message("asking the vision model…");
            }
            Stage::Illustrate => {
                self.bar.println(format!("{} {}", cyan("◆"), bold("Generating slide images…")));
                self.activate_bar(6);
            }
            Stage::Annotate => {
                let spinner = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_strings(TICKS);
                self.bar.set_style(spinner);
                self.bar.set_prefix("Annotating");
                self.bar.set_message("writing SEO metadata…");
            }
        }
    }

    fn on_slide_start(&self, index: usize, _total: usize) {
        if let Ok(mut t) = self.slide_started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_message(format!("slide {index}"));
    }

    fn on_slide_complete(&self, index: usize, total: usize, url: &str, attempts: u32) {
        let retries = if attempts > 1 {
            dim(&format!("  ({attempts} attempts)"))
        } else {
            String::new()
        };
        self.bar.println(format!(
            "  {} Slide {}/{}  {}  {}{}",
            green("✓"),
            index,
            total,
            dim(url),
            self.slide_elapsed(),
            retries,
        ));
        self.bar.inc(1);
    }

    fn on_slide_fallback(&self, index: usize, total: usize, error: &str) {
        let msg = match error.char_indices().nth(80) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };
        self.bar.println(format!(
            "  {} Slide {}/{}  {}  {}",
            red("✗"),
            index,
            total,
            red(&msg),
            self.slide_elapsed(),
        ));
        self.bar.inc(1);
    }

    fn on_portrait_complete(&self, url: &str, fell_back: bool) {
        let mark = if fell_back { red("✗") } else { green("✓") };
        self.bar.println(format!("  {} Portrait cover  {}", mark, dim(url)));
    }

    fn on_story_complete(&self, generated: usize, total: usize) {
        self.bar.finish_and_clear();
        let failed = total.saturating_sub(generated);
        if failed == 0 {
            eprintln!("{} {} slides illustrated", green("✔"), bold(&generated.to_string()));
        } else {
            eprintln!(
                "{} {}/{} slides illustrated  ({} using the default image)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&generated.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Story JSON written to the current directory
  notes2story notes.jpg

  # Into a directory, from a URL
  notes2story https://example.com/notes.png -o stories/

  # Print the JSON instead of writing a file
  notes2story notes.jpg --stdout > story.json

  # Keep images on disk instead of S3 (offline runs)
  notes2story notes.jpg --store-dir media/ --cdn-base file://$PWD/media/

  # Completions through another provider (images still use the Azure endpoint)
  notes2story notes.jpg --provider openai --model gpt-4.1-mini

ENVIRONMENT VARIABLES:
  AZURE_OPENAI_ENDPOINT       Resource URL (or full deployment URL) for vision completions
  AZURE_OPENAI_TEXT_ENDPOINT  Completion endpoint for SEO (defaults to the vision one)
  AZURE_OPENAI_DEPLOYMENT     Chat deployment for a resource URL (default gpt-4)
  AZURE_OPENAI_API_KEY        api-key for the completion endpoints
  AZURE_IMAGE_ENDPOINT        Resource URL (or full deployment URL) for image generation
  AZURE_IMAGE_DEPLOYMENT      Image deployment for a resource URL (default dall-e-3)
  AZURE_IMAGE_API_KEY         api-key for the image endpoint
  AWS_ACCESS_KEY              S3 access key id
  AWS_SECRET_KEY              S3 secret access key
  AWS_REGION                  S3 region
  AWS_BUCKET                  S3 bucket
  S3_PREFIX                   Key prefix, e.g. "webstories/"
  S3_ENDPOINT_URL             Custom endpoint for S3-compatible stores
  CDN_BASE                    Public URL prefix for uploaded keys
  DEFAULT_ERROR_IMAGE         Image used when a slide cannot be produced
  RUST_LOG                    Overrides -v / -q log filtering
"#;

/// Turn a photo of notes into a six-slide web story.
#[derive(Parser, Debug)]
#[command(
    name = "notes2story",
    version,
    about = "Turn a photo of notes into a six-slide web story (JSON)",
    long_about = "Reads a note image with a vision model, writes a title and five short \
paragraphs, illustrates six slides with a text-to-image model, uploads the images and adds \
SEO metadata. The result is one flat JSON document ready for a story template.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local image path or HTTP/HTTPS URL.
    input: String,

    /// Directory the story JSON is written to.
    #[arg(short, long, env = "NOTES2STORY_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Print the story JSON to stdout instead of writing a file.
    #[arg(long)]
    stdout: bool,

    /// Vision chat-completion endpoint: resource base URL or full deployment URL.
    #[arg(long, env = "AZURE_OPENAI_ENDPOINT", default_value = "")]
    vision_endpoint: String,

    /// Text chat-completion endpoint for SEO metadata.
    #[arg(long, env = "AZURE_OPENAI_TEXT_ENDPOINT")]
    text_endpoint: Option<String>,

    /// Chat deployment appended to a base completion endpoint.
    #[arg(long, env = "AZURE_OPENAI_DEPLOYMENT", default_value = DEFAULT_CHAT_DEPLOYMENT)]
    chat_deployment: String,

    #[arg(long, env = "AZURE_OPENAI_API_KEY", default_value = "", hide_env_values = true)]
    chat_api_key: String,

    /// Image-generation endpoint: resource base URL or full deployment URL.
    #[arg(long, env = "AZURE_IMAGE_ENDPOINT", default_value = "")]
    image_endpoint: String,

    /// Image deployment appended to a base image endpoint.
    #[arg(long, env = "AZURE_IMAGE_DEPLOYMENT", default_value = DEFAULT_IMAGE_DEPLOYMENT)]
    image_deployment: String,

    #[arg(long, env = "AZURE_IMAGE_API_KEY", default_value = "", hide_env_values = true)]
    image_api_key: String,

    /// Use an edgequake-llm provider for completions: openai, anthropic, gemini, ollama.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Model ID for --provider.
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// Write images under this directory instead of uploading to S3.
    #[arg(long, env = "NOTES2STORY_STORE_DIR")]
    store_dir: Option<PathBuf>,

    #[arg(long, env = "AWS_BUCKET")]
    bucket: Option<String>,

    #[arg(long, env = "AWS_REGION", default_value = "")]
    region: String,

    #[arg(long, env = "AWS_ACCESS_KEY", default_value = "", hide_env_values = true)]
    access_key: String,

    #[arg(long, env = "AWS_SECRET_KEY", default_value = "", hide_env_values = true)]
    secret_key: String,

    /// Key prefix for uploads, e.g. "webstories/".
    #[arg(long, env = "S3_PREFIX", default_value = "")]
    s3_prefix: String,

    /// Custom S3 endpoint (MinIO, R2, …).
    #[arg(long, env = "S3_ENDPOINT_URL")]
    s3_endpoint: Option<String>,

    /// Public URL prefix; a slide's URL is this followed by its key.
    #[arg(long, env = "CDN_BASE", default_value = "")]
    cdn_base: String,

    /// Image URL used for slides that cannot be produced.
    #[arg(long, env = "DEFAULT_ERROR_IMAGE", default_value = DEFAULT_ERROR_IMAGE)]
    default_error_image: String,

    /// Image generation attempts per slide.
    #[arg(long, env = "NOTES2STORY_RETRIES", default_value_t = 3,
          value_parser = clap::value_parser!(u32).range(1..=10))]
    retries: u32,

    /// Seconds to wait between attempts.
    #[arg(long, env = "NOTES2STORY_RETRY_BACKOFF", default_value_t = 5)]
    retry_backoff_secs: u64,

    /// Per-request timeout for service calls, in seconds.
    #[arg(long, env = "NOTES2STORY_REQUEST_TIMEOUT")]
    request_timeout: Option<u64>,

    /// HTTP download timeout for URL inputs, in seconds.
    #[arg(long, env = "NOTES2STORY_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Disable progress bar.
    #[arg(long, env = "NOTES2STORY_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "NOTES2STORY_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "NOTES2STORY_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.stdout;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let cli_progress = show_progress.then(CliProgressCallback::new);
    let stop_progress = || {
        if let Some(ref cb) = cli_progress {
            cb.abandon();
        }
    };
    let progress_cb: Option<ProgressCallback> = cli_progress
        .clone()
        .map(|cb| cb as Arc<dyn StoryProgressCallback>);

    let config = build_config(&cli, progress_cb).inspect_err(|_| stop_progress())?;

    // ── Run ──────────────────────────────────────────────────────────────
    let story = create_story_from_input(&cli.input, &config)
        .await
        .inspect_err(|_| stop_progress())
        .context("Story generation failed")?;

    if cli.stdout {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(story.json.as_bytes())
            .context("Failed to write to stdout")?;
        handle.write_all(b"\n").ok();
        return Ok(());
    }

    let path = write_artifact(&story, &cli.output_dir)
        .with_context(|| format!("Failed to write story to {}", cli.output_dir.display()))?;

    if !cli.quiet {
        let stats = &story.stats;
        eprintln!(
            "{}  \"{}\"  {}/6 slides  {}ms  →  {}",
            if stats.slides_fallback == 0 && !stats.portrait_fallback {
                green("✔")
            } else {
                cyan("⚠")
            },
            story.document.draft.title,
            stats.slides_generated,
            stats.total_duration_ms,
            bold(&path.display().to_string()),
        );
        eprintln!(
            "   {} generation attempts  /  extract {}ms  illustrate {}ms  annotate {}ms",
            dim(&stats.generation_attempts.to_string()),
            stats.extract_duration_ms,
            stats.illustrate_duration_ms,
            stats.annotate_duration_ms,
        );
    }

    Ok(())
}

/// Map CLI args to `StoryConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<StoryConfig> {
    let storage = match (&cli.store_dir, &cli.bucket) {
        (Some(dir), _) => StorageConfig::directory(dir),
        (None, Some(bucket)) => StorageConfig::S3(S3Config {
            bucket: bucket.clone(),
            prefix: cli.s3_prefix.clone(),
            region: cli.region.clone(),
            access_key: cli.access_key.clone(),
            secret_key: cli.secret_key.clone(),
            endpoint_url: cli.s3_endpoint.clone(),
        }),
        (None, None) => anyhow::bail!(
            "No image storage configured: set AWS_BUCKET (with AWS_REGION and credentials) \
             or pass --store-dir"
        ),
    };

    let mut builder = StoryConfig::builder()
        .vision_endpoint(cli.vision_endpoint.as_str())
        .chat_deployment(cli.chat_deployment.as_str())
        .chat_api_key(cli.chat_api_key.as_str())
        .image_endpoint(cli.image_endpoint.as_str())
        .image_deployment(cli.image_deployment.as_str())
        .image_api_key(cli.image_api_key.as_str())
        .storage(storage)
        .cdn_base(cli.cdn_base.as_str())
        .default_error_image(cli.default_error_image.as_str())
        .retry(RetryPolicy::new(
            cli.retries,
            Duration::from_secs(cli.retry_backoff_secs),
        ))
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref url) = cli.text_endpoint {
        builder = builder.text_endpoint(url.as_str());
    }
    if let Some(ref name) = cli.provider {
        builder = builder.provider_name(name.as_str());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.as_str());
    }
    if let Some(secs) = cli.request_timeout {
        builder = builder.request_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
