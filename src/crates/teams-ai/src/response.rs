//! JSON extraction from free-form model output
//!
//! Models wrap JSON in prose, code fences and apologies. The scanner here
//! looks for the first `{` and then tries every following `}` in order,
//! returning the first substring that parses as a JSON object. A `{` that
//! never closes validly is skipped and scanning resumes at the next one.
//!
//! The strategy is greedy on the *first* valid close. For a nested object the
//! inner `}` alone never yields valid JSON from the outer `{`, so nesting works;
//! but when the outer object is itself malformed, the scan falls through to
//! the next `{` and can return an inner object instead.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Find the first JSON object embedded in `text`
///
/// Returns the object together with the byte range it occupied. Inputs shorter
/// than two characters cannot hold an object and yield `None`.
pub fn find_json_object(text: &str) -> Option<(Map<String, Value>, std::ops::Range<usize>)> {
    find_json_object_from(text, 0)
}

fn find_json_object_from(
    text: &str,
    offset: usize,
) -> Option<(Map<String, Value>, std::ops::Range<usize>)> {
    if text.len() < 2 || offset >= text.len() {
        return None;
    }

    let tail = &text[offset..];
    for (open, _) in tail.match_indices('{') {
        let start = offset + open;
        for (close, _) in text[start..].match_indices('}') {
            let end = start + close + 1;
            if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(&text[start..end]) {
                return Some((object, start..end));
            }
        }
    }

    None
}

/// Parse the first JSON object in `text`
///
/// ```rust
/// use teams_ai::response::parse_json;
///
/// let value = parse_json("Sure! {\"a\": 1} hope that helps").unwrap();
/// assert_eq!(value["a"], 1);
/// assert!(parse_json("{").is_none());
/// ```
pub fn parse_json(text: &str) -> Option<Value> {
    find_json_object(text).map(|(object, _)| Value::Object(object))
}

/// Parse every JSON object in `text`, left to right
///
/// Each search resumes right after the previous object, so objects nested
/// inside an extracted one are not reported separately.
pub fn parse_all_json(text: &str) -> Vec<Value> {
    let mut objects = Vec::new();
    let mut offset = 0;

    while let Some((object, range)) = find_json_object_from(text, offset) {
        objects.push(Value::Object(object));
        offset = range.end;
    }

    objects
}

/// Parse the first JSON object in `text` into `T`
///
/// Only the first object is considered. An object that does not fit `T`
/// yields `None` even when a later one would.
pub fn parse_json_as<T: DeserializeOwned>(text: &str) -> Option<T> {
    parse_json(text).and_then(|value| serde_json::from_value(value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_short_input_yields_nothing() {
        assert!(parse_json("").is_none());
        assert!(parse_json("{").is_none());
        assert!(parse_json("}").is_none());
        assert!(parse_all_json("x").is_empty());
    }

    #[test]
    fn test_empty_object() {
        assert_eq!(parse_json("{}"), Some(json!({})));
    }

    #[test]
    fn test_object_surrounded_by_prose() {
        let text = "Here you go:\n```json\n{\"type\":\"plan\",\"commands\":[]}\n```\nAnything else?";
        assert_eq!(parse_json(text), Some(json!({"type": "plan", "commands": []})));
    }

    #[test]
    fn test_nested_object_extracted_whole() {
        let text = r#"x {"a": {"b": 1}, "c": 2} y"#;
        assert_eq!(parse_json(text), Some(json!({"a": {"b": 1}, "c": 2})));
    }

    #[test]
    fn test_brace_inside_string_value() {
        let text = r#"{"text": "a } b", "n": 1}"#;
        assert_eq!(parse_json(text), Some(json!({"text": "a } b", "n": 1})));
    }

    #[test]
    fn test_malformed_outer_falls_through_to_inner() {
        // The outer object never closes, so the scan resumes at the inner `{`.
        let text = r#"{"outer": {"inner": true}"#;
        assert_eq!(parse_json(text), Some(json!({"inner": true})));
    }

    #[test]
    fn test_unclosed_candidate_skipped() {
        let text = r#"{ not json } and then {"ok": 1}"#;
        assert_eq!(parse_json(text), Some(json!({"ok": 1})));
    }

    #[test]
    fn test_parse_all_json() {
        let text = r#"first {"a": 1} second {"b": {"c": 2}} third {"#;
        assert_eq!(
            parse_all_json(text),
            vec![json!({"a": 1}), json!({"b": {"c": 2}})]
        );
    }

    #[test]
    fn test_non_object_json_ignored() {
        assert!(parse_json("[1, 2, 3]").is_none());
    }

    #[test]
    fn test_multibyte_text_around_object() {
        let text = "héllo {\"é\": \"ü\"} wörld";
        assert_eq!(parse_json(text), Some(json!({"é": "ü"})));
    }

    #[test]
    fn test_parse_json_as() {
        #[derive(serde::Deserialize)]
        struct Point {
            x: i32,
        }

        let point: Point = parse_json_as("point: {\"x\": 3}").unwrap();
        assert_eq!(point.x, 3);
        assert!(parse_json_as::<Point>("{\"y\": 3}").is_none());
    }
}
