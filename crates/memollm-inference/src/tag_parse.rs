//! Parsing of model output into tag lists.
//!
//! [`parse_tag_list`] is the primary path: the model was asked for a strict
//! JSON array of strings. [`extract_tags_from_text`] is the recovery path for
//! replies that ignore the requested format, and is only used when the
//! primary parse fails.

use memollm_core::defaults::MAX_TAG_LEN;

/// Delimiters tried in order; the first that yields any valid tag wins.
const DELIMITERS: [&str; 4] = [",", "\n", ";", " "];

/// Characters stripped from both ends of each candidate.
const TRIM_CHARS: &[char] = &[' ', '\t', '\n', '\r', '"', '\'', '[', ']', '{', '}', '#', '-'];

/// Strict parse of a JSON array of strings.
pub fn parse_tag_list(content: &str) -> Option<Vec<String>> {
    serde_json::from_str::<Vec<String>>(content.trim()).ok()
}

/// Heuristic recovery of tags from free-form text.
pub fn extract_tags_from_text(text: &str) -> Vec<String> {
    for delimiter in DELIMITERS {
        let tags: Vec<String> = text
            .split(delimiter)
            .map(|part| part.trim_matches(TRIM_CHARS))
            .filter(|part| is_valid_tag(part))
            .map(str::to_string)
            .collect();
        if !tags.is_empty() {
            return tags;
        }
    }
    Vec::new()
}

/// 1-50 chars of ASCII letters, digits, `-` or `_`, with at least one letter.
pub fn is_valid_tag(tag: &str) -> bool {
    if tag.is_empty() || tag.len() > MAX_TAG_LEN {
        return false;
    }
    let mut has_letter = false;
    for c in tag.chars() {
        if c.is_ascii_alphabetic() {
            has_letter = true;
        } else if !(c.is_ascii_digit() || c == '-' || c == '_') {
            return false;
        }
    }
    has_letter
}
