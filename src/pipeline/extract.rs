//! Content extraction: note image → [`ContentDraft`] via the vision model.
//!
//! One request, no retry. The reply must be the JSON object described in
//! [`crate::prompts::CONTENT_SYSTEM_PROMPT`]; anything else is a
//! [`StoryError::Format`] that aborts the run before any image is generated.

use crate::backend::{ChatBackend, ChatRequest};
use crate::config::StoryConfig;
use crate::error::StoryError;
use crate::output::ContentDraft;
use crate::pipeline::{encode, postprocess};
use crate::prompts::CONTENT_SYSTEM_PROMPT;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Longest paragraph kept, in characters.
pub const MAX_PARAGRAPH_CHARS: usize = 400;

const WHAT: &str = "content draft";

/// Field names as the model returns them.
#[derive(Debug, Deserialize)]
struct RawContentDraft {
    storytitle: String,
    s2paragraph1: String,
    s3paragraph1: String,
    s4paragraph1: String,
    s5paragraph1: String,
    s6paragraph1: String,
    s1alt1: String,
    s2alt1: String,
    s3alt1: String,
    s4alt1: String,
    s5alt1: String,
    s6alt1: String,
}

/// Ask the vision model for the story content of a note image.
pub async fn extract(
    image_bytes: &[u8],
    chat: &dyn ChatBackend,
    config: &StoryConfig,
) -> Result<ContentDraft, StoryError> {
    let request = ChatRequest {
        system: CONTENT_SYSTEM_PROMPT.to_string(),
        user_text: String::new(),
        image: Some(encode::inline_image(image_bytes)),
        temperature: config.content_temperature,
        max_tokens: config.content_max_tokens,
    };

    info!("Extracting story content via {}", chat.name());
    let reply = chat.complete(&request).await?;
    debug!("Content reply: {} chars", reply.len());

    let draft = parse_content_draft(&reply)?;
    info!("Extracted story \"{}\"", draft.title);
    Ok(draft)
}

/// Parse and validate a content reply.
pub fn parse_content_draft(reply: &str) -> Result<ContentDraft, StoryError> {
    let cleaned = postprocess::clean_json_reply(reply);
    let raw: RawContentDraft =
        serde_json::from_str(&cleaned).map_err(|e| StoryError::format(WHAT, e.to_string()))?;

    let title = raw.storytitle.trim().to_string();
    if title.is_empty() {
        return Err(StoryError::format(WHAT, "storytitle is blank"));
    }

    let mut paragraphs = [
        raw.s2paragraph1,
        raw.s3paragraph1,
        raw.s4paragraph1,
        raw.s5paragraph1,
        raw.s6paragraph1,
    ];
    for (i, paragraph) in paragraphs.iter_mut().enumerate() {
        clamp_paragraph(i + 2, paragraph);
    }

    Ok(ContentDraft {
        title,
        paragraphs,
        image_prompts: [
            raw.s1alt1, raw.s2alt1, raw.s3alt1, raw.s4alt1, raw.s5alt1, raw.s6alt1,
        ],
    })
}

fn clamp_paragraph(slide: usize, paragraph: &mut String) {
    if let Some((cut, _)) = paragraph.char_indices().nth(MAX_PARAGRAPH_CHARS) {
        warn!(
            "Slide {}: paragraph has {} chars, truncating to {}",
            slide,
            paragraph.chars().count(),
            MAX_PARAGRAPH_CHARS
        );
        paragraph.truncate(cut);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reply(title: &str) -> String {
        json!({
            "storytitle": title,
            "s2paragraph1": "Plants capture light.",
            "s3paragraph1": "Chlorophyll absorbs red and blue.",
            "s4paragraph1": "Water is split.",
            "s5paragraph1": "Carbon dioxide is fixed.",
            "s6paragraph1": "Glucose is produced.",
            "s1alt1": "A leaf in sunlight, vector style",
            "s2alt1": "Sun rays hitting a plant",
            "s3alt1": "Green chloroplast",
            "s4alt1": "Water droplets splitting",
            "s5alt1": "CO2 molecules entering a leaf",
            "s6alt1": "Sugar cubes made of leaves"
        })
        .to_string()
    }

    #[test]
    fn parses_all_fields_in_slide_order() {
        let draft = parse_content_draft(&reply("Photosynthesis")).unwrap();
        assert_eq!(draft.title, "Photosynthesis");
        assert_eq!(draft.paragraphs[0], "Plants capture light.");
        assert_eq!(draft.paragraphs[4], "Glucose is produced.");
        assert_eq!(draft.image_prompts[0], "A leaf in sunlight, vector style");
        assert_eq!(draft.image_prompts[5], "Sugar cubes made of leaves");
    }

    #[test]
    fn fenced_reply_is_accepted() {
        let fenced = format!("```json\n{}\n```", reply("Photosynthesis"));
        assert!(parse_content_draft(&fenced).is_ok());
    }

    #[test]
    fn non_json_reply_is_format_error() {
        let err = parse_content_draft("I cannot read this image.").unwrap_err();
        assert!(matches!(err, StoryError::Format { .. }));
    }

    #[test]
    fn missing_field_is_format_error_naming_it() {
        let mut v: serde_json::Value = serde_json::from_str(&reply("T")).unwrap();
        v.as_object_mut().unwrap().remove("s4paragraph1");
        let err = parse_content_draft(&v.to_string()).unwrap_err();
        assert!(matches!(err, StoryError::Format { .. }));
        assert!(err.to_string().contains("s4paragraph1"), "got: {err}");
    }

    #[test]
    fn blank_title_is_format_error() {
        let err = parse_content_draft(&reply("   ")).unwrap_err();
        assert!(err.to_string().contains("storytitle"));
    }

    #[test]
    fn long_paragraph_is_truncated_on_char_boundary() {
        let mut v: serde_json::Value = serde_json::from_str(&reply("T")).unwrap();
        v["s3paragraph1"] = json!("ü".repeat(450));
        let draft = parse_content_draft(&v.to_string()).unwrap();
        assert_eq!(draft.paragraphs[1].chars().count(), MAX_PARAGRAPH_CHARS);
    }

    #[test]
    fn extra_fields_are_ignored() {
        let mut v: serde_json::Value = serde_json::from_str(&reply("T")).unwrap();
        v["s7paragraph1"] = json!("bonus");
        assert!(parse_content_draft(&v.to_string()).is_ok());
    }
}
