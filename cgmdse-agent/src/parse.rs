//! Pulling JSON out of model replies
//!
//! Models are told to answer with bare JSON but regularly wrap it in
//! Markdown fences, prepend a sentence, or nest the list in an envelope.
//! Each extractor tries, in order: the whole reply, the body of the first
//! fenced block, then the span from the first opening bracket to the last
//! closing one.

use serde_json::{Map, Value};

/// Extract a JSON list. A bare array is taken as is; an object is unwrapped
/// when it carries the list under `envelope` (e.g. `"candidates"`).
pub fn extract_list(reply: &str, envelope: &str) -> Option<Vec<Value>> {
    attempts(reply, '[', ']').find_map(|value| match value {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => match map.remove(envelope) {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    })
}

/// Extract a JSON object.
pub fn extract_object(reply: &str) -> Option<Map<String, Value>> {
    attempts(reply, '{', '}').find_map(|value| match value {
        Value::Object(map) => Some(map),
        _ => None,
    })
}

fn attempts(reply: &str, open: char, close: char) -> impl Iterator<Item = Value> + '_ {
    let whole = Some(reply.trim());
    let fenced = fenced_block(reply);
    let span = bracket_span(reply, open, close);

    [whole, fenced, span]
        .into_iter()
        .flatten()
        .filter_map(|text| serde_json::from_str::<Value>(text).ok())
}

/// Body of the first Markdown code fence, with or without a `json` tag.
fn fenced_block(content: &str) -> Option<&str> {
    let body = if content.contains("```json") {
        content.split("```json").nth(1)?
    } else {
        content.split("```").nth(1)?
    };
    Some(body.split("```").next().unwrap_or(body).trim())
}

/// From the first `open` to the last `close`, inclusive.
fn bracket_span(content: &str, open: char, close: char) -> Option<&str> {
    let start = content.find(open)?;
    let end = content.rfind(close)?;
    (end > start).then(|| &content[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_array() {
        let items = extract_list(r#"[{"id": 1}, {"id": 2}]"#, "candidates").unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_envelope_is_unwrapped() {
        let reply = r#"{"evaluations": [{"candidate_id": 1, "overall_score": 8}]}"#;
        let items = extract_list(reply, "evaluations").unwrap();
        assert_eq!(items[0]["overall_score"], json!(8));

        assert!(extract_list(reply, "candidates").is_none());
    }

    #[test]
    fn test_fenced_reply() {
        let reply = "Here you go:\n```json\n[{\"id\": 1}]\n```\nLet me know!";
        assert_eq!(extract_list(reply, "candidates").unwrap().len(), 1);

        let reply = "```\n{\"top_pick\": {\"id\": 2}}\n```";
        assert_eq!(extract_object(reply).unwrap()["top_pick"]["id"], json!(2));
    }

    #[test]
    fn test_prose_around_array() {
        let reply = "Sure! The candidates are [{\"id\": 1, \"adc_bits\": [12, 14]}] as requested.";
        let items = extract_list(reply, "candidates").unwrap();
        assert_eq!(items[0]["adc_bits"], json!([12, 14]));
    }

    #[test]
    fn test_prose_around_object() {
        let reply = "Final answer: {\"top_pick\": {\"id\": 3}, \"selection_reasoning\": \"Lowest power.\"} Thanks.";
        let obj = extract_object(reply).unwrap();
        assert_eq!(obj["selection_reasoning"], json!("Lowest power."));
    }

    #[test]
    fn test_unparseable_reply() {
        assert!(extract_list("I cannot help with that.", "candidates").is_none());
        assert!(extract_list("[not json]", "candidates").is_none());
        assert!(extract_object("] backwards {").is_none());
    }
}
