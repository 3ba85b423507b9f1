//! Pipeline stages for note-to-story generation.
//!
//! Each submodule implements exactly one transformation step and takes its
//! collaborators as trait objects from [`crate::backend`], so every stage can
//! be tested without a network.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ illustrate ──▶ annotate
//! (bytes)   (vision)    (6 slides +    (SEO)
//!                        portrait)
//! ```
//!
//! 1. [`input`]      — resolve a path or URL to note-image bytes
//! 2. [`extract`]    — one vision request → title, paragraphs, image prompts
//! 3. [`illustrate`] — generate, normalise and upload each slide image; the
//!    only stage that retries, and the only one that never fails the run
//! 4. [`annotate`]   — one text request → meta description and keywords
//!
//! [`encode`] and [`postprocess`] are shared helpers: image encoding in both
//! directions, and cleanup of model replies before JSON parsing.

pub mod annotate;
pub mod encode;
pub mod extract;
pub mod illustrate;
pub mod input;
pub mod postprocess;
