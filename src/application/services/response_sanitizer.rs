//! Turns raw model text into a JSON document that is known to parse.
//!
//! The steps run in a fixed order: reject empty text, unwrap a ```json fence,
//! trim, try a strict parse, and only if that fails double every backslash
//! that does not start a JSON escape and try once more. The function is pure,
//! so the same text always yields the same result.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```json(.*)```").expect("valid fence regex"));

static ESCAPE_PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\\(.)").expect("valid escape regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedJson {
    pub json: String,
    /// True when invalid escapes had to be rewritten for the text to parse.
    pub repaired: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SanitizeError {
    #[error("AI response was empty")]
    Empty,
    /// `text` is the model's text as received, before escape repair.
    #[error("failed to parse valid JSON even after sanitization: {text}")]
    Unparseable { text: String },
}

pub fn sanitize_json_response(raw: &str) -> Result<SanitizedJson, SanitizeError> {
    if raw.trim().is_empty() {
        return Err(SanitizeError::Empty);
    }

    let trimmed = extract_fenced_json(raw).trim();

    if is_strict_json(trimmed) {
        return Ok(SanitizedJson {
            json: trimmed.to_string(),
            repaired: false,
        });
    }

    let repaired = repair_invalid_escapes(trimmed);
    if is_strict_json(&repaired) {
        tracing::warn!(
            original_len = trimmed.len(),
            repaired_len = repaired.len(),
            "Model output needed escape repair to parse"
        );
        return Ok(SanitizedJson {
            json: repaired,
            repaired: true,
        });
    }

    Err(SanitizeError::Unparseable {
        text: trimmed.to_string(),
    })
}

/// Returns the body of a ```json fence, or the whole text when there is none.
fn extract_fenced_json(raw: &str) -> &str {
    if !raw.contains("```") {
        return raw;
    }

    JSON_FENCE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(raw)
}

/// Whole-document parse; trailing content after the value is rejected.
fn is_strict_json(text: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(text).is_ok()
}

/// Doubles backslashes that do not begin one of `\" \\ \/ \b \f \n \r \t \u`.
///
/// Matching walks escape pairs left to right, so an existing `\\` is consumed
/// as a unit and never split into two candidates.
fn repair_invalid_escapes(text: &str) -> String {
    ESCAPE_PAIR
        .replace_all(text, |caps: &Captures| {
            let escaped = &caps[1];
            if is_json_escape(escaped) {
                caps[0].to_string()
            } else {
                format!(r"\\{escaped}")
            }
        })
        .into_owned()
}

fn is_json_escape(escaped: &str) -> bool {
    matches!(escaped, "\"" | "\\" | "/" | "b" | "f" | "n" | "r" | "t" | "u")
}
