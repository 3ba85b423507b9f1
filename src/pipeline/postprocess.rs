//! Post-processing: deterministic cleanup of model replies before JSON parsing.
//!
//! Chat models asked for "JSON only" still sometimes wrap the object in a
//! ```` ```json ```` fence, prepend a byte-order mark, or answer with CRLF
//! line endings. These rules remove exactly those wrappers and nothing else;
//! a reply that is still not valid JSON afterwards is a format error, never
//! re-asked or repaired.
//!
//! ## Rule Order
//!
//! Line endings are normalised first so the fence regex only has to match
//! `\n`; invisible characters are removed before fence detection because a
//! leading BOM would hide the opening fence.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to a raw model reply.
///
/// 1. Normalise line endings (CRLF → LF)
/// 2. Strip invisible Unicode (BOM, zero-width spaces, soft hyphens)
/// 3. Strip an outer code fence (` ```json `, ` ```JSON `, bare ` ``` `)
/// 4. Trim surrounding whitespace
pub fn clean_json_reply(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = strip_code_fences(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ──────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?si)^```(?:json)?[ \t]*\n(.*)\n```\s*$").unwrap());

fn strip_code_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fence() {
        let input = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(input), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_fence_no_lang() {
        let input = "```\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(input), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_fence_uppercase_lang() {
        let input = "```JSON\n{}\n```\n";
        assert_eq!(strip_code_fences(input), "{}");
    }

    #[test]
    fn test_no_fences_passthrough() {
        let input = "{\"a\": 1}";
        assert_eq!(strip_code_fences(input), input);
    }

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_remove_invisible() {
        assert_eq!(remove_invisible_chars("\u{FEFF}{\u{200B}}"), "{}");
    }

    #[test]
    fn test_clean_reply_full_pipeline() {
        let input = "\u{FEFF}```json\r\n{\r\n  \"metadescription\": \"x\"\r\n}\r\n```  \r\n";
        let cleaned = clean_json_reply(input);
        assert_eq!(cleaned, "{\n  \"metadescription\": \"x\"\n}");
        let v: serde_json::Value = serde_json::from_str(&cleaned).unwrap();
        assert_eq!(v["metadescription"], "x");
    }

    #[test]
    fn test_prose_is_left_alone() {
        let input = "Sure! Here is your JSON: {\"a\": 1}";
        assert_eq!(clean_json_reply(input), input);
    }
}
