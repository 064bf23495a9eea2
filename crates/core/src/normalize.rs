//! Response normalizer — total extraction of structured data from free-form
//! model text.
//!
//! Models wrap JSON in code fences, add prose around it, drop quotes from
//! keys, or return nothing usable at all. `normalize` works through a strict
//! ladder of recovery strategies and is guaranteed to return a value of the
//! caller-expected shape: it never fails, it only degrades toward the
//! supplied fallback.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Hard cap on items recovered by quoted-substring scavenging — matches the
/// largest list any prompt asks for.
const MAX_EXTRACTED_ITEMS: usize = 7;

static BARE_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([{,]\s*)([A-Za-z_][A-Za-z0-9_\-]*)(\s*:)"#).unwrap());
static BARE_VALUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#":\s*([A-Za-z_][A-Za-z0-9 _\-]*?)\s*([,}\]])"#).unwrap());
static QUOTED_ITEM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]{2,})""#).unwrap());

/// Extracts a JSON value of the same shape as `fallback` from raw model text.
///
/// Strategy ladder, first success wins:
/// 1. strip a surrounding code fence
/// 2. slice the outermost bracket pair matching the expected shape
/// 3. strict parse (+ numeric coercion against the fallback's field types)
/// 4. light repair (quote bare keys/values) and one strict re-parse
/// 5. field-level regex extraction keyed by the fallback's field names
/// 6. return `fallback` unchanged
pub fn normalize(raw: &str, fallback: &Value) -> Value {
    let text = strip_code_fence(raw.trim());
    let expect_object = fallback.is_object();

    let candidate = slice_outermost(text, expect_object);

    if let Some(candidate) = candidate {
        // Strict parse first; repaired parse second.
        if let Some(value) = parse_checked(candidate, fallback) {
            return value;
        }
        let repaired = repair(candidate);
        if let Some(value) = parse_checked(&repaired, fallback) {
            debug!("Normalizer recovered value via light repair");
            return value;
        }
    }

    warn!("Structured parse failed; falling back to field-level extraction");
    if expect_object {
        extract_object_fields(raw, fallback)
    } else {
        extract_list(raw).unwrap_or_else(|| fallback.clone())
    }
}

/// Typed wrapper around [`normalize`]: the fallback establishes both the
/// expected shape and the defaults for unrecoverable fields.
pub fn normalize_into<T>(raw: &str, fallback: &T) -> T
where
    T: Serialize + DeserializeOwned + Clone,
{
    let fallback_value = match serde_json::to_value(fallback) {
        Ok(v) => v,
        Err(_) => return fallback.clone(),
    };
    let value = normalize(raw, &fallback_value);
    serde_json::from_value(value).unwrap_or_else(|_| fallback.clone())
}

/// Takes the content between the first pair of ``` fences, if any.
/// Handles both ```json-tagged and bare fences, with or without prose around.
fn strip_code_fence(text: &str) -> &str {
    let open = match text.find("```") {
        Some(idx) => idx,
        None => return text,
    };
    let after = &text[open + 3..];
    // Skip an optional language tag on the fence line.
    let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after[body_start..];
    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

/// Substring between the first opening and last closing bracket of the
/// expected kind. `None` when no such pair exists.
fn slice_outermost(text: &str, expect_object: bool) -> Option<&str> {
    let (open, close) = if expect_object { ('{', '}') } else { ('[', ']') };
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if start < end {
        Some(&text[start..=end])
    } else {
        None
    }
}

/// Strict parse + shape check + field adaptation. `None` on any miss.
fn parse_checked(candidate: &str, fallback: &Value) -> Option<Value> {
    let decoded: Value = serde_json::from_str(candidate).ok()?;
    match (fallback, decoded) {
        (Value::Object(defaults), Value::Object(found)) => {
            Some(Value::Object(merge_object(defaults, found)))
        }
        (Value::Array(_), arr @ Value::Array(_)) => Some(arr),
        _ => None,
    }
}

/// Overlays decoded fields on a copy of the defaults, coercing string-typed
/// numbers for fields the fallback declares numeric. Missing fields keep
/// their defaults; extra decoded fields are kept as-is.
fn merge_object(defaults: &Map<String, Value>, found: Map<String, Value>) -> Map<String, Value> {
    let mut merged = defaults.clone();
    for (key, value) in found {
        let parsed_number = match (defaults.get(&key), &value) {
            (Some(Value::Number(_)), Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64),
            _ => None,
        };
        let coerced = match parsed_number {
            Some(n) => Value::Number(n),
            None => value,
        };
        merged.insert(key, coerced);
    }
    merged
}

/// Light repair heuristics for almost-JSON: quote bare keys, quote bare
/// non-numeric scalar values, collapse the stacked-quote artifacts the value
/// pass can produce on partially quoted input.
fn repair(candidate: &str) -> String {
    let keyed = BARE_KEY_RE.replace_all(candidate, "$1\"$2\"$3");
    let valued = BARE_VALUE_RE.replace_all(&keyed, |caps: &regex::Captures<'_>| {
        let token = &caps[1];
        if matches!(token, "true" | "false" | "null") {
            format!(": {}{}", token, &caps[2])
        } else {
            format!(": \"{}\"{}", token, &caps[2])
        }
    });
    valued.replace("\"\"\"", "\"")
}

/// Per-field regex extraction for object shapes: each numeric field of the
/// fallback is searched for by name, found values are merged into a copy of
/// the fallback. String fields keep their defaults.
fn extract_object_fields(raw: &str, fallback: &Value) -> Value {
    let defaults = match fallback.as_object() {
        Some(map) => map,
        None => return fallback.clone(),
    };
    let mut merged = defaults.clone();
    let mut found_any = false;

    for (key, default_value) in defaults {
        if !default_value.is_number() {
            continue;
        }
        let pattern = format!(r#"(?i)"?{}"?\s*:?\s*(-?\d+\.?\d*)"#, regex::escape(key));
        let re = match Regex::new(&pattern) {
            Ok(re) => re,
            Err(_) => continue,
        };
        if let Some(caps) = re.captures(raw) {
            if let Some(number) = caps[1]
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
            {
                merged.insert(key.clone(), Value::Number(number));
                found_any = true;
            }
        }
    }

    if found_any {
        debug!("Normalizer recovered numeric fields by regex extraction");
    }
    Value::Object(merged)
}

/// List extraction of last resort: a bracketed comma-split if a bracket pair
/// exists, otherwise every quoted substring of length ≥ 2, capped.
fn extract_list(raw: &str) -> Option<Value> {
    if let Some(inner) = slice_outermost(raw, false) {
        let items: Vec<Value> = inner[1..inner.len() - 1]
            .split(',')
            .map(|s| s.trim().trim_matches(|c| c == '"' || c == '\'').trim())
            .filter(|s| !s.is_empty())
            .map(|s| Value::String(s.to_string()))
            .collect();
        if !items.is_empty() {
            return Some(Value::Array(items));
        }
    }

    let quoted: Vec<Value> = QUOTED_ITEM_RE
        .captures_iter(raw)
        .take(MAX_EXTRACTED_ITEMS)
        .map(|caps| Value::String(caps[1].to_string()))
        .collect();
    if quoted.is_empty() {
        None
    } else {
        Some(Value::Array(quoted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sentiment_fallback() -> Value {
        json!({"polarity": 0.0, "subjectivity": 0.5})
    }

    fn list_fallback() -> Value {
        json!(["general"])
    }

    #[test]
    fn test_clean_json_object_roundtrips() {
        let raw = r#"{"polarity": 0.8, "subjectivity": 0.6}"#;
        let value = normalize(raw, &sentiment_fallback());
        assert_eq!(value, json!({"polarity": 0.8, "subjectivity": 0.6}));
    }

    #[test]
    fn test_fenced_json_with_tag() {
        let raw = "```json\n{\"polarity\": 0.3, \"subjectivity\": 0.9}\n```";
        let value = normalize(raw, &sentiment_fallback());
        assert_eq!(value, json!({"polarity": 0.3, "subjectivity": 0.9}));
    }

    #[test]
    fn test_fenced_json_without_tag() {
        let raw = "```\n[\"rust\", \"tokio\"]\n```";
        let value = normalize(raw, &list_fallback());
        assert_eq!(value, json!(["rust", "tokio"]));
    }

    #[test]
    fn test_prose_around_json_object() {
        let raw = "Sure! Here is the analysis:\n{\"polarity\": -0.2, \"subjectivity\": 0.4}\nHope this helps.";
        let value = normalize(raw, &sentiment_fallback());
        assert_eq!(value, json!({"polarity": -0.2, "subjectivity": 0.4}));
    }

    #[test]
    fn test_unquoted_keys_repaired() {
        // Scenario from the wild: fence + bare keys.
        let raw = "```json\n{polarity: 0.8, subjectivity: 0.6}\n```";
        let value = normalize(raw, &sentiment_fallback());
        assert_eq!(value, json!({"polarity": 0.8, "subjectivity": 0.6}));
    }

    #[test]
    fn test_bare_string_value_repaired() {
        let raw = r#"{"quality_score": 0.7, "structure_notes": solid intro, "improvement_areas": ["flow"]}"#;
        let fallback = json!({
            "quality_score": 0.5,
            "structure_notes": "Unable to analyze",
            "improvement_areas": ["clarity"]
        });
        let value = normalize(raw, &fallback);
        assert_eq!(value["quality_score"], json!(0.7));
        assert_eq!(value["structure_notes"], json!("solid intro"));
        assert_eq!(value["improvement_areas"], json!(["flow"]));
    }

    #[test]
    fn test_numeric_coercion_from_string_fields() {
        let raw = r#"{"polarity": "0.25", "subjectivity": "0.75"}"#;
        let value = normalize(raw, &sentiment_fallback());
        assert_eq!(value, json!({"polarity": 0.25, "subjectivity": 0.75}));
    }

    #[test]
    fn test_missing_fields_keep_defaults() {
        let raw = r#"{"polarity": 1.0}"#;
        let value = normalize(raw, &sentiment_fallback());
        assert_eq!(value, json!({"polarity": 1.0, "subjectivity": 0.5}));
    }

    #[test]
    fn test_regex_field_extraction_when_json_unusable() {
        let raw = "The polarity: 0.9 here, with subjectivity 0.2 overall";
        let value = normalize(raw, &sentiment_fallback());
        assert_eq!(value, json!({"polarity": 0.9, "subjectivity": 0.2}));
    }

    #[test]
    fn test_list_from_bracketed_text() {
        let raw = "Keywords: [rust, async runtimes, 'backpressure']";
        let value = normalize(raw, &list_fallback());
        assert_eq!(value, json!(["rust", "async runtimes", "backpressure"]));
    }

    #[test]
    fn test_list_from_quoted_substrings_is_capped() {
        let raw = r#"I suggest "one" and "two" and "three" and "four" and "five" and "six" and "seven" and "eight" and "nine""#;
        let value = normalize(raw, &list_fallback());
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 7);
        assert_eq!(items[0], json!("one"));
    }

    #[test]
    fn test_garbage_returns_fallback_unchanged() {
        let value = normalize("no structure here at all", &list_fallback());
        assert_eq!(value, list_fallback());
    }

    #[test]
    fn test_garbage_object_returns_fallback_unchanged() {
        let value = normalize("%%% total nonsense %%%", &sentiment_fallback());
        assert_eq!(value, sentiment_fallback());
    }

    #[test]
    fn test_shape_mismatch_returns_fallback() {
        // Expected a list, got an object with nothing list-like to scavenge.
        let value = normalize("{oops: true}", &list_fallback());
        assert_eq!(value, list_fallback());
    }

    #[test]
    fn test_list_scavenged_from_quoted_strings_in_prose() {
        // No brackets at all, but quoted fragments are still recoverable.
        let value = normalize(r#"Try "rust" or "tokio" as keywords."#, &list_fallback());
        assert_eq!(value, json!(["rust", "tokio"]));
    }

    #[test]
    fn test_normalize_into_typed_list() {
        let fallback = vec!["general".to_string()];
        let topics: Vec<String> = normalize_into("```json\n[\"ml\", \"rust\"]\n```", &fallback);
        assert_eq!(topics, vec!["ml".to_string(), "rust".to_string()]);
    }

    #[test]
    fn test_normalize_into_falls_back_on_garbage() {
        let fallback = vec!["general".to_string()];
        let topics: Vec<String> = normalize_into("???", &fallback);
        assert_eq!(topics, fallback);
    }

    #[test]
    fn test_idempotent_on_serialized_value() {
        let original = json!({"polarity": -0.5, "subjectivity": 0.1});
        let raw = serde_json::to_string(&original).unwrap();
        assert_eq!(normalize(&raw, &sentiment_fallback()), original);
    }
}
