//! Live preview text from a partially streamed claims document
//!
//! The generator streams a JSON document of the form
//! `{"claims":[{"text":...,"citations":[...]}, ...]}` in arbitrary fragments.
//! [`extract_preview`] is called with the whole accumulation after every
//! fragment and recomputes the preview from scratch; it keeps no state.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// `"text"`, optional whitespace, `:`, optional whitespace, then a quoted
/// run in which a backslash escapes exactly one character.
static TEXT_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""text"\s*:\s*"((?:[^"\\]|\\.)*)""#).expect("static pattern compiles")
});

/// Same field, still open at the very end of the buffer. A dangling
/// backslash is left out of the value.
static OPEN_TEXT_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""text"\s*:\s*"((?:[^"\\]|\\.)*)\\?$"#).expect("static pattern compiles")
});

/// Best-effort preview of the claim texts in `buffer`.
///
/// 1. If `buffer` is complete JSON with a `claims` array, join the non-empty
///    claim texts with a space (a document without `claims` yields nothing).
/// 2. Otherwise join every closed `"text": "..."` value found by scanning,
///    followed by a value still open at the end of the buffer, restoring
///    `\"` and `\n`.
///
/// A value containing an unescaped quote ends at that quote.
#[must_use]
pub fn extract_preview(buffer: &str) -> String {
    match serde_json::from_str::<Value>(buffer) {
        Ok(document) => complete_preview(&document),
        Err(_) => partial_preview(buffer),
    }
}

fn complete_preview(document: &Value) -> String {
    let Some(claims) = document.get("claims").and_then(Value::as_array) else {
        return String::new();
    };
    claims
        .iter()
        .map(|claim| claim.get("text").and_then(Value::as_str).unwrap_or_default())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn partial_preview(buffer: &str) -> String {
    let mut texts = Vec::new();
    let mut tail_start = 0;
    for captures in TEXT_FIELD.captures_iter(buffer) {
        if let (Some(whole), Some(value)) = (captures.get(0), captures.get(1)) {
            texts.push(unescape(value.as_str()));
            tail_start = whole.end();
        }
    }

    let open = OPEN_TEXT_FIELD
        .captures(&buffer[tail_start..])
        .and_then(|captures| captures.get(1))
        .map(|value| unescape(value.as_str()));
    if let Some(open) = open.filter(|text| !text.is_empty()) {
        texts.push(open);
    }

    texts.join(" ")
}

fn unescape(raw: &str) -> String {
    raw.replace("\\\"", "\"").replace("\\n", "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_document_joins_texts() {
        assert_eq!(
            extract_preview(r#"{"claims":[{"text":"A"},{"text":"B"}]}"#),
            "A B"
        );
    }

    #[test]
    fn complete_document_skips_missing_text() {
        assert_eq!(
            extract_preview(r#"{"claims":[{"text":"A"},{"citations":[]},{"text":"C"}]}"#),
            "A C"
        );
    }

    #[test]
    fn complete_document_without_claims_is_empty() {
        assert_eq!(extract_preview(r#"{"text":"ignored"}"#), "");
        assert_eq!(extract_preview(r#"{"claims":"nope"}"#), "");
    }

    #[test]
    fn partial_document_shows_open_value() {
        assert_eq!(extract_preview(r#"{"claims":[{"text":"Hello wo"#), "Hello wo");
        assert_eq!(
            extract_preview(r#"{"claims":[{"text":"Hello wo""#),
            "Hello wo"
        );
    }

    #[test]
    fn open_value_follows_closed_ones() {
        let buffer = r#"{"claims":[{"text":"A","citations":[]},{"text":"B is gro"#;
        assert_eq!(extract_preview(buffer), "A B is gro");
    }

    #[test]
    fn open_value_drops_dangling_backslash() {
        assert_eq!(extract_preview(r#"{"claims":[{"text":"say \"#), "say ");
        assert_eq!(extract_preview(r#"{"claims":[{"text":""#), "");
    }

    #[test]
    fn partial_document_restores_escapes() {
        assert_eq!(
            extract_preview(r#"{"text":"she said \"hi\"""#),
            r#"she said "hi""#
        );
        assert_eq!(extract_preview(r#"{"claims":[{"text":"a\nb","#), "a\nb");
    }

    #[test]
    fn partial_document_keeps_order_and_whitespace_variants() {
        let buffer = r#"{"claims":[{"text" : "first","citations":[]},{"text":  "second""#;
        assert_eq!(extract_preview(buffer), "first second");
    }

    #[test]
    fn empty_buffer_is_empty() {
        assert_eq!(extract_preview(""), "");
    }

    #[test]
    fn idempotent() {
        let buffer = r#"{"claims":[{"text":"X causes Y","citations":[{"chunk_id":3"#;
        assert_eq!(extract_preview(buffer), extract_preview(buffer));
    }
}
