//! Error types for the notes2story library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`StoryError`] — **Fatal**: the run cannot produce a document at all
//!   (the completion service rejected the request, the model replied with
//!   something that is not the declared JSON shape, the input is not an
//!   image). Returned as `Err(StoryError)` from the top-level `create_story*`
//!   functions.
//!
//! * [`AssetError`] — **Non-fatal**: one slide image (or the portrait cover)
//!   could not be generated, downloaded, decoded or uploaded. The slide falls
//!   back to the default-error image URL and the error is stored on the
//!   [`crate::output::SlideAsset`] so callers can see what went wrong.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the notes2story library.
///
/// Per-slide failures use [`AssetError`] and never surface here.
#[derive(Debug, Error)]
pub enum StoryError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input is empty or otherwise unusable.
    #[error("Invalid input '{input}': {reason}")]
    InvalidInput { input: String, reason: String },

    /// The bytes were read but are not an image format we can send.
    #[error("Input '{input}' is not a supported image\nFirst bytes: {magic:?}")]
    NotAnImage { input: String, magic: Vec<u8> },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Upstream errors ───────────────────────────────────────────────────
    /// A completion service answered with a non-success HTTP status.
    #[error("{service} returned HTTP {status}: {body}")]
    Upstream {
        service: String,
        status: u16,
        body: String,
    },

    /// The request never got an HTTP status (DNS, TLS, connection reset…).
    #[error("{service} request failed: {detail}")]
    Transport { service: String, detail: String },

    /// A provider client refused the request (auth, quota, bad request,
    /// unknown model) without exposing the HTTP status.
    #[error("{service} rejected the request: {detail}")]
    Rejected { service: String, detail: String },

    /// The reply was received but is not the declared JSON shape.
    #[error("Malformed {what}: {detail}")]
    Format { what: String, detail: String },

    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoryError {
    /// Shorthand for a [`StoryError::Format`].
    pub fn format(what: impl Into<String>, detail: impl Into<String>) -> Self {
        StoryError::Format {
            what: what.into(),
            detail: detail.into(),
        }
    }
}

/// A non-fatal error for a single slide image or the portrait cover.
///
/// Stored on [`crate::output::SlideAsset`] / [`crate::output::PortraitCover`]
/// when the asset fell back to the default-error image.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum AssetError {
    /// The image-generation service did not return an image.
    ///
    /// `status` is `None` when the request never got an HTTP status.
    #[error("image generation failed{}: {detail}", status_suffix(.status))]
    Generation { status: Option<u16>, detail: String },

    /// Downloading a generated (or previously uploaded) image failed.
    #[error("download of '{url}' failed: {detail}")]
    Download { url: String, detail: String },

    /// The downloaded bytes are not a decodable image.
    #[error("image decode failed: {detail}")]
    Decode { detail: String },

    /// Re-encoding the normalised canvas as JPEG failed.
    #[error("JPEG encode failed: {detail}")]
    Encode { detail: String },

    /// The object store refused the upload.
    #[error("upload to '{key}' failed: {detail}")]
    Upload { key: String, detail: String },
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {code})"),
        None => String::new(),
    }
}
