//! Deterministic names derived from the story title.
//!
//! Storage keys and the artifact filename are pure functions of the title
//! (plus the slide index or a timestamp), so re-running a story overwrites
//! the same objects instead of scattering new ones.

use chrono::NaiveDateTime;

/// Number of slides in every story (title slide + five paragraphs).
pub const SLIDE_COUNT: usize = 6;

/// Timestamp layout used in artifact filenames.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Slug namespacing a story's objects in storage.
///
/// Lowercases, turns spaces into hyphens and drops colons. Every other
/// character is kept as-is.
///
/// ```
/// assert_eq!(
///     notes2story::naming::slugify("AI & The Future: Part One"),
///     "ai-&-the-future-part-one"
/// );
/// ```
pub fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter(|&c| c != ':')
        .map(|c| if c == ' ' { '-' } else { c })
        .collect()
}

/// Storage key of slide `index` (1-indexed).
pub fn slide_key(prefix: &str, slug: &str, index: usize) -> String {
    format!("{prefix}{slug}/slide{index}.jpg")
}

/// Storage key of the portrait cover.
pub fn portrait_key(prefix: &str, slug: &str) -> String {
    format!("{prefix}{slug}/portrait_cover.jpg")
}

/// Suggested filename of the serialized story document.
///
/// `{title_with_underscores}_{YYYYMMDD_HHMMSS}.json`: lowercased, spaces to
/// underscores, colons dropped, path separators replaced so the name never
/// escapes the output directory.
pub fn artifact_filename(title: &str, at: NaiveDateTime) -> String {
    let stem: String = title
        .to_lowercase()
        .chars()
        .filter(|&c| c != ':')
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            other => other,
        })
        .collect();
    format!("{}_{}.json", stem, at.format(TIMESTAMP_FORMAT))
}
