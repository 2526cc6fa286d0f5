//! Structured output adapter.
//!
//! Generation responses that are meant to be JSON arrive in several shapes:
//! a bare object, an object wrapped in a Markdown code fence, a list holding
//! the object, or prose with the object somewhere inside it. [`parse_first`]
//! accepts all of these and yields the first value of the wanted type.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Parses the first `T` out of a structured response.
///
/// - object: deserialized directly
/// - non-empty list: its first element is deserialized
/// - empty list, scalar, or unparseable text: `None`
pub fn parse_first<T: DeserializeOwned>(text: &str) -> Option<T> {
    let value = parse_value(text)?;

    let first = match value {
        Value::Object(_) => value,
        Value::Array(items) => items.into_iter().next()?,
        _ => return None,
    };

    serde_json::from_value(first).ok()
}

fn parse_value(text: &str) -> Option<Value> {
    let body = strip_code_fence(text.trim());

    if let Ok(value) = serde_json::from_str::<Value>(body) {
        return Some(value);
    }

    // Prose around the payload: take the outermost bracketed span.
    let start = body.find(['{', '['])?;
    let close = if body[start..].starts_with('{') { '}' } else { ']' };
    let end = body.rfind(close)?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&body[start..=end]).ok()
}

/// Removes a surrounding ```` ``` ```` or ```` ```json ```` fence.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Pick {
        title: String,
    }

    #[test]
    fn test_object() {
        let pick: Option<Pick> = parse_first(r#"{"title": "Hello"}"#);
        assert_eq!(pick, Some(Pick { title: "Hello".to_string() }));
    }

    #[test]
    fn test_non_empty_list_yields_first() {
        let pick: Option<Pick> = parse_first(r#"[{"title": "First"}, {"title": "Second"}]"#);
        assert_eq!(pick.unwrap().title, "First");
    }

    #[test]
    fn test_empty_list_is_none() {
        assert_eq!(parse_first::<Pick>("[]"), None);
    }

    #[test]
    fn test_fenced_json() {
        let text = "```json\n{\"title\": \"Fenced\"}\n```";
        assert_eq!(parse_first::<Pick>(text).unwrap().title, "Fenced");
    }

    #[test]
    fn test_prose_wrapped_json() {
        let text = "Sure! Here you go: {\"title\": \"Wrapped\"} Hope that helps.";
        assert_eq!(parse_first::<Pick>(text).unwrap().title, "Wrapped");
    }

    #[test]
    fn test_garbage_and_scalars() {
        assert_eq!(parse_first::<Pick>("no json here"), None);
        assert_eq!(parse_first::<Pick>("42"), None);
        assert_eq!(parse_first::<Pick>(r#"{"other": 1}"#), None);
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("[1]"), "[1]");
    }
}
