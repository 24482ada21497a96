//! Code block extraction from model output.
//!
//! Generated responses usually arrive wrapped in a markdown fence with a
//! language tag (```` ```python ... ``` ````). This module strips that
//! wrapping so the remainder of the pipeline sees bare source text.
//!
//! This is a heuristic, not a markdown parser: a single fenced block is
//! assumed, and unfenced responses pass through unchanged.

/// Language tags that may follow an opening fence.
const LANGUAGE_TAGS: &[&str] = &[
    "python",
    "py",
    "html",
    "css",
    "javascript",
    "js",
    "json",
    "bash",
    "sh",
];

/// Strip a single markdown code fence and a leading language tag.
///
/// If the trimmed input both starts and ends with a triple-backtick fence,
/// the fences are removed and exactly one leading language-tag token is
/// stripped if present. Unfenced input is returned unchanged, treating the
/// whole response as code. Empty input yields an empty string.
pub fn extract_code(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if trimmed.len() < 6 || !trimmed.starts_with("```") || !trimmed.ends_with("```") {
        return raw.to_string();
    }

    let inner = &trimmed[3..trimmed.len() - 3];
    strip_language_tag(inner).to_string()
}

/// Remove one leading language-tag token, if the text begins with one.
///
/// The tag must end at a token boundary so that code starting with an
/// identifier (e.g. `python_helper = ...`) is left alone.
fn strip_language_tag(text: &str) -> &str {
    for tag in LANGUAGE_TAGS {
        if let Some(rest) = text.strip_prefix(tag) {
            let boundary = rest
                .chars()
                .next()
                .is_none_or(|c| !c.is_ascii_alphanumeric() && c != '_');
            if boundary {
                return rest;
            }
        }
    }
    text
}
