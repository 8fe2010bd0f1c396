//! Isolates an embedded `[...]` data literal from raw script text.
//!
//! This is a bracket counter, not a JavaScript parser: it assumes the literal is
//! well-nested and only guards against brackets inside double-quoted strings.

use crate::error::LiteralError;
use scraper::{Html, Selector};
use serde::de::DeserializeOwned;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Markers preceding the weekly guide literal on the listings page.
pub const GUIDE_MARKERS: [&str; 2] = ["__guideData = ", "__guideData="];

static SCRIPT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script").expect("Invalid script selector"));

/// Returns the balanced `[...]` literal that starts right after `marker` in `text`.
pub fn scan_literal<'a>(text: &'a str, marker: &str) -> Result<&'a str, LiteralError> {
    let start = text.find(marker).ok_or(LiteralError::NotFound)? + marker.len();
    let after = &text[start..];

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;
    for (i, b) in after.bytes().enumerate() {
        if escape {
            escape = false;
            continue;
        }
        match b {
            b'\\' => escape = true,
            b'"' => in_string = !in_string,
            b'[' if !in_string => depth += 1,
            b']' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Ok(after[..=i].trim_start());
                }
            }
            _ => {}
        }
    }
    Err(LiteralError::Unterminated {
        marker: marker.to_string(),
    })
}

/// Scans `text` for each marker in turn and decodes the first literal that parses.
///
/// When every marker fails, the most informative error is returned: a malformed or
/// unterminated literal wins over a missing marker.
pub fn decode_literal<T: DeserializeOwned>(
    text: &str,
    markers: &[&str],
) -> Result<T, LiteralError> {
    let mut last = LiteralError::NotFound;
    for marker in markers {
        let span = match scan_literal(text, marker) {
            Ok(span) => span,
            Err(LiteralError::NotFound) => continue,
            Err(e) => {
                last = e;
                continue;
            }
        };
        match serde_json::from_str(span) {
            Ok(value) => return Ok(value),
            Err(source) => {
                let preview: String = span.chars().take(200).collect();
                warn!("literal after {:?} failed to decode: {}", marker, source);
                debug!("problematic literal: {}...", preview);
                last = LiteralError::Malformed {
                    marker: marker.to_string(),
                    source,
                };
            }
        }
    }
    Err(last)
}

/// Runs [`decode_literal`] over every `<script>` block of a parsed page.
pub fn decode_from_scripts<T: DeserializeOwned>(
    doc: &Html,
    markers: &[&str],
) -> Result<T, LiteralError> {
    let mut last = LiteralError::NotFound;
    for script in doc.select(&SCRIPT_SELECTOR) {
        let content: String = script.text().collect();
        if content.trim().is_empty() {
            continue;
        }
        match decode_literal(&content, markers) {
            Ok(value) => return Ok(value),
            Err(e) if e.marker_found() => last = e,
            Err(_) => {}
        }
    }
    Err(last)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn depth_at_close(span: &str) -> i32 {
        let mut depth = 0;
        let mut in_string = false;
        let mut escape = false;
        for b in span.bytes() {
            if escape {
                escape = false;
                continue;
            }
            match b {
                b'\\' => escape = true,
                b'"' => in_string = !in_string,
                b'[' if !in_string => depth += 1,
                b']' if !in_string => depth -= 1,
                _ => {}
            }
        }
        depth
    }

    #[test]
    fn test_scan_simple_literal() {
        let text = r#"var x = 1; __guideData = [{"Title":"Jaws"}]; var y = [2];"#;
        let span = scan_literal(text, "__guideData = ").unwrap();
        assert_eq!(span, r#"[{"Title":"Jaws"}]"#);
        assert_eq!(depth_at_close(span), 0);
    }

    #[test]
    fn test_scan_bracket_inside_string_does_not_terminate() {
        let text = r#"X=[{"t":"A]B"}] trailing ]"#;
        let span = scan_literal(text, "X=").unwrap();
        assert_eq!(span, r#"[{"t":"A]B"}]"#);
    }

    #[test]
    fn test_scan_open_bracket_inside_string() {
        let text = r#"X=[{"t":"A[B"},{"t":"C"}];"#;
        let span = scan_literal(text, "X=").unwrap();
        assert_eq!(span, r#"[{"t":"A[B"},{"t":"C"}]"#);
    }

    #[test]
    fn test_scan_escaped_quote_keeps_string_open() {
        let text = r#"X=[{"t":"say \"]\" now"}, [1]] rest"#;
        let span = scan_literal(text, "X=").unwrap();
        assert_eq!(span, r#"[{"t":"say \"]\" now"}, [1]]"#);
        assert_eq!(depth_at_close(span), 0);
    }

    #[test]
    fn test_scan_nested_arrays() {
        let text = "X=[[1,[2]],[3]];[4]";
        assert_eq!(scan_literal(text, "X=").unwrap(), "[[1,[2]],[3]]");
    }

    #[test]
    fn test_scan_marker_missing() {
        let result = scan_literal("var a = [1];", "__guideData=");
        assert!(matches!(result, Err(LiteralError::NotFound)));
    }

    #[test]
    fn test_scan_unterminated() {
        let result = scan_literal(r#"X=[{"t":"A"}"#, "X=");
        assert!(matches!(result, Err(LiteralError::Unterminated { .. })));
    }

    #[test]
    fn test_scan_unterminated_string_swallows_brackets() {
        let result = scan_literal(r#"X=[{"t":"A]}]"#, "X=");
        assert!(matches!(result, Err(LiteralError::Unterminated { .. })));
    }

    #[test]
    fn test_decode_tries_markers_in_order() {
        let text = "__guideData=[1,2,3];";
        let values: Vec<u32> = decode_literal(text, &GUIDE_MARKERS).unwrap();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn test_decode_malformed() {
        let text = "__guideData = [{Title: 'not json'}];";
        let result: Result<Vec<serde_json::Value>, _> = decode_literal(text, &GUIDE_MARKERS);
        assert!(matches!(result, Err(LiteralError::Malformed { .. })));
    }

    #[test]
    fn test_decode_from_scripts_skips_unrelated_blocks() {
        let html = r#"<html><head>
            <script>var analytics = [1, 2];</script>
            <script>window.__guideData = [{"a": 1}];</script>
            </head><body></body></html>"#;
        let doc = Html::parse_document(html);
        let values: Vec<serde_json::Value> = decode_from_scripts(&doc, &GUIDE_MARKERS).unwrap();
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_decode_from_scripts_without_literal() {
        let doc = Html::parse_document("<html><body><p>nothing</p></body></html>");
        let result: Result<Vec<serde_json::Value>, _> = decode_from_scripts(&doc, &GUIDE_MARKERS);
        assert!(matches!(result, Err(LiteralError::NotFound)));
    }
}
