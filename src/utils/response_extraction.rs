//! Defensive extraction of file content from LLM responses.
//!
//! Generation prompts instruct the model to answer with a JSON object of the
//! shape `{"filename": "...", "content": "..."}`, but models routinely wrap
//! that object in prose, markdown fences, or ignore the instruction entirely.
//! [`extract`] recovers the `content` field when it can and otherwise falls
//! back to the raw response text, so a stage always has something to write.
//!
//! The `filename` field is advisory only: the write target of a stage is
//! fixed by the pipeline topology, never by what the model claims.
//!
//! # Example
//!
//! ```
//! use appforge::utils::response_extraction::extract;
//!
//! let reply = r#"Here you go: {"filename": "Main.kt", "content": "fun main() {}"} done!"#;
//! let extracted = extract(reply);
//! assert!(extracted.was_structured);
//! assert_eq!(extracted.content, "fun main() {}");
//! ```

/// Result of extracting file content from a raw model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    /// The usable file content: either the structured `content` field or the
    /// raw response verbatim.
    pub content: String,
    /// Whether the content came from a well-formed structured payload.
    pub was_structured: bool,
}

impl ExtractedContent {
    fn structured(content: String) -> Self {
        Self {
            content,
            was_structured: true,
        }
    }

    fn fallback(raw: &str) -> Self {
        Self {
            content: raw.to_string(),
            was_structured: false,
        }
    }
}

/// Extract usable file content from a raw model response.
///
/// Takes the substring between the first `{` and the last `}` (inclusive)
/// and, if it parses as a JSON object with a non-empty string `content`
/// field, returns that field with `was_structured = true`. On any other
/// shape — no braces, unbalanced braces, parse failure, missing or empty
/// `content` — the entire raw response is returned verbatim with
/// `was_structured = false`.
///
/// Never fails: malformed input always degrades to the fallback path. Pure
/// function over its input.
pub fn extract(raw: &str) -> ExtractedContent {
    let Some(start) = raw.find('{') else {
        return ExtractedContent::fallback(raw);
    };
    let Some(end) = raw.rfind('}') else {
        return ExtractedContent::fallback(raw);
    };
    if end < start {
        return ExtractedContent::fallback(raw);
    }

    let candidate = &raw[start..=end];
    match serde_json::from_str::<serde_json::Value>(candidate) {
        Ok(value) => match value.get("content").and_then(|c| c.as_str()) {
            Some(content) if !content.is_empty() => {
                ExtractedContent::structured(content.to_string())
            }
            _ => ExtractedContent::fallback(raw),
        },
        Err(_) => ExtractedContent::fallback(raw),
    }
}
