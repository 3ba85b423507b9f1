//! SEO annotation: finished slide text → [`SeoMetadata`].
//!
//! Same contract as extraction: one request, no retry, and a reply that is
//! not `{ "metadescription": …, "metakeywords": … }` aborts the run.

use crate::backend::{ChatBackend, ChatRequest};
use crate::config::StoryConfig;
use crate::error::StoryError;
use crate::output::{ContentDraft, SeoMetadata};
use crate::pipeline::postprocess;
use crate::prompts::{seo_prompt, SEO_SYSTEM_PROMPT};
use serde::Deserialize;
use tracing::info;

const WHAT: &str = "SEO metadata";

#[derive(Debug, Deserialize)]
struct RawSeo {
    metadescription: String,
    metakeywords: Keywords,
}

/// Models return keywords either as one comma-separated string or a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Keywords {
    Text(String),
    List(Vec<String>),
}

impl Keywords {
    fn into_text(self) -> String {
        match self {
            Keywords::Text(text) => text,
            Keywords::List(items) => items.join(", "),
        }
    }
}

/// Ask the completion service for SEO metadata of a story.
pub async fn annotate(
    draft: &ContentDraft,
    chat: &dyn ChatBackend,
    config: &StoryConfig,
) -> Result<SeoMetadata, StoryError> {
    let request = ChatRequest {
        system: SEO_SYSTEM_PROMPT.to_string(),
        user_text: seo_prompt(draft),
        image: None,
        temperature: config.seo_temperature,
        max_tokens: config.seo_max_tokens,
    };

    info!("Generating SEO metadata via {}", chat.name());
    let reply = chat.complete(&request).await?;
    parse_seo(&reply)
}

/// Parse and validate an SEO reply.
pub fn parse_seo(reply: &str) -> Result<SeoMetadata, StoryError> {
    let cleaned = postprocess::clean_json_reply(reply);
    let raw: RawSeo =
        serde_json::from_str(&cleaned).map_err(|e| StoryError::format(WHAT, e.to_string()))?;
    Ok(SeoMetadata {
        metadescription: raw.metadescription.trim().to_string(),
        metakeywords: raw.metakeywords.into_text().trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_string_keywords() {
        let seo = parse_seo(r#"{"metadescription":"How plants eat light.","metakeywords":"photosynthesis, biology"}"#)
            .unwrap();
        assert_eq!(seo.metadescription, "How plants eat light.");
        assert_eq!(seo.metakeywords, "photosynthesis, biology");
    }

    #[test]
    fn list_keywords_are_joined() {
        let seo = parse_seo(r#"{"metadescription":"d","metakeywords":["a","b","c"]}"#).unwrap();
        assert_eq!(seo.metakeywords, "a, b, c");
    }

    #[test]
    fn fenced_reply_is_accepted() {
        let seo = parse_seo("```json\n{\"metadescription\":\"d\",\"metakeywords\":\"k\"}\n```").unwrap();
        assert_eq!(seo.metakeywords, "k");
    }

    #[test]
    fn missing_keywords_is_format_error() {
        let err = parse_seo(r#"{"metadescription":"d"}"#).unwrap_err();
        assert!(matches!(err, StoryError::Format { .. }));
    }

    #[test]
    fn prose_reply_is_format_error() {
        assert!(matches!(
            parse_seo("Here are some keywords: a, b"),
            Err(StoryError::Format { .. })
        ));
    }
}
