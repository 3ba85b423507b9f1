//! Prompts for the two completion calls.
//!
//! Both replies are parsed as JSON, so each prompt spells out the exact
//! object shape the parser in [`crate::pipeline`] expects. Keep the field
//! names here and in the parsers in sync.

use crate::output::ContentDraft;

/// System prompt for turning a notes image into story content.
pub const CONTENT_SYSTEM_PROMPT: &str = r#"You are a teaching assistant. The student has uploaded a notes image.

Your job:
1. Extract a short and catchy title → storytitle
2. Summarise the content and break it into 5 slides (s2paragraph1 to s6paragraph1), each under 400 characters.
3. For each paragraph (including the title), generate a vivid DALL·E prompt (vector-style, no text). → s1alt1 to s6alt1

Respond in this JSON format:
{
  "storytitle": "...",
  "s2paragraph1": "...",
  "s3paragraph1": "...",
  "s4paragraph1": "...",
  "s5paragraph1": "...",
  "s6paragraph1": "...",
  "s1alt1": "...",
  "s2alt1": "...",
  "s3alt1": "...",
  "s4alt1": "...",
  "s5alt1": "...",
  "s6alt1": "..."
}"#;

/// System prompt for the SEO call.
pub const SEO_SYSTEM_PROMPT: &str = "You are an expert SEO assistant.";

/// User prompt asking for SEO metadata of a finished story.
pub fn seo_prompt(draft: &ContentDraft) -> String {
    let mut prompt = String::from("Generate SEO metadata for this web story:\n\n");
    prompt.push_str(&format!("Title: {}\nSlides:\n", draft.title));
    for paragraph in &draft.paragraphs {
        prompt.push_str(&format!("- {paragraph}\n"));
    }
    prompt.push_str("\nRespond as:\n{ \"metadescription\": \"...\", \"metakeywords\": \"...\" }\n");
    prompt
}
