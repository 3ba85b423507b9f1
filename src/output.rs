//! Output types: the content draft, per-slide assets, SEO metadata and the
//! merged [`StoryDocument`].

use crate::error::AssetError;
use crate::naming::SLIDE_COUNT;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Number of body paragraphs (slides 2 to 6).
pub const PARAGRAPH_COUNT: usize = SLIDE_COUNT - 1;

/// Text content derived from the note image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDraft {
    /// Short, catchy story title (slide 1).
    pub title: String,
    /// Body paragraphs for slides 2..=6.
    pub paragraphs: [String; PARAGRAPH_COUNT],
    /// Image-generation prompts for slides 1..=6.
    pub image_prompts: [String; SLIDE_COUNT],
}

impl ContentDraft {
    /// Paragraph shown on slide `index` (2..=6).
    pub fn paragraph(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(2)
            .and_then(|i| self.paragraphs.get(i))
            .map(String::as_str)
    }

    /// Image prompt of slide `index` (1..=6).
    pub fn image_prompt(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(1)
            .and_then(|i| self.image_prompts.get(i))
            .map(String::as_str)
    }
}

/// One illustrated slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideAsset {
    /// 1-indexed slide number.
    pub index: usize,
    /// Prompt sent to the image generator.
    pub prompt: String,
    /// Temporary URL returned by the generator on the successful attempt.
    pub remote_image_url: Option<String>,
    /// Deterministic storage key (set even when the slide fell back).
    pub storage_key: String,
    /// CDN URL of the upload, or the default-error image.
    pub public_url: String,
    /// Generation attempts made for this slide.
    pub attempts: u32,
    /// Last failure when the slide fell back.
    pub error: Option<AssetError>,
}

impl SlideAsset {
    pub fn fell_back(&self) -> bool {
        self.error.is_some()
    }
}

/// The portrait crop derived from slide 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortraitCover {
    pub storage_key: String,
    pub public_url: String,
    pub error: Option<AssetError>,
}

impl PortraitCover {
    pub fn fell_back(&self) -> bool {
        self.error.is_some()
    }
}

/// Everything the illustrator produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Illustration {
    /// Exactly [`SLIDE_COUNT`] slides, in order.
    pub slides: Vec<SlideAsset>,
    pub portrait: PortraitCover,
}

impl Illustration {
    pub fn generated_count(&self) -> usize {
        self.slides.iter().filter(|s| !s.fell_back()).count()
    }

    pub fn total_attempts(&self) -> u32 {
        self.slides.iter().map(|s| s.attempts).sum()
    }
}

/// SEO fields for the finished story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeoMetadata {
    pub metadescription: String,
    pub metakeywords: String,
}

/// The merged story: content, slide image URLs, portrait and SEO metadata.
///
/// Serialises to a flat object whose keys are the ones downstream story
/// templates consume: `storytitle`, `s2paragraph1`..`s6paragraph1`,
/// `s1alt1`..`s6alt1`, `s1image1`..`s6image1`, `potraitcoverurl`,
/// `metadescription`, `metakeywords`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryDocument {
    pub draft: ContentDraft,
    pub illustration: Illustration,
    pub seo: SeoMetadata,
}

impl StoryDocument {
    /// URL of slide `index` (1..=6).
    pub fn slide_url(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(1)
            .and_then(|i| self.illustration.slides.get(i))
            .map(|s| s.public_url.as_str())
    }

    pub fn portrait_url(&self) -> &str {
        &self.illustration.portrait.public_url
    }

    /// Pretty-printed JSON, the form handed to the caller.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Serialize for StoryDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = 1 + PARAGRAPH_COUNT + 2 * SLIDE_COUNT + 3;
        let mut map = serializer.serialize_map(Some(fields))?;
        map.serialize_entry("storytitle", &self.draft.title)?;
        for (i, paragraph) in self.draft.paragraphs.iter().enumerate() {
            map.serialize_entry(&format!("s{}paragraph1", i + 2), paragraph)?;
        }
        for (i, prompt) in self.draft.image_prompts.iter().enumerate() {
            map.serialize_entry(&format!("s{}alt1", i + 1), prompt)?;
        }
        for slide in &self.illustration.slides {
            map.serialize_entry(&format!("s{}image1", slide.index), &slide.public_url)?;
        }
        map.serialize_entry("potraitcoverurl", &self.illustration.portrait.public_url)?;
        map.serialize_entry("metadescription", &self.seo.metadescription)?;
        map.serialize_entry("metakeywords", &self.seo.metakeywords)?;
        map.end()
    }
}

/// Run statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryStats {
    pub slides_generated: usize,
    pub slides_fallback: usize,
    pub generation_attempts: u32,
    pub portrait_fallback: bool,
    pub extract_duration_ms: u64,
    pub illustrate_duration_ms: u64,
    pub annotate_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// The result of a run: the document, its serialized form and suggested
/// filename.
#[derive(Debug, Clone)]
pub struct StoryArtifact {
    pub document: StoryDocument,
    /// Pretty-printed UTF-8 JSON of `document`.
    pub json: String,
    /// `{title_with_underscores}_{YYYYMMDD_HHMMSS}.json`
    pub filename: String,
    pub stats: StoryStats,
}
