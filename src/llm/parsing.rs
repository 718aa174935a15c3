//! Recovery of validated slide guides from raw model output.
//!
//! Model output is untrusted: it may be wrapped in markdown fences, padded
//! with prose, or drift from the schema. Structural problems (not JSON,
//! wrong number of guides, misnumbered guides, missing required fields)
//! reject the whole batch. Cosmetic problems are repaired: optional lists
//! default to empty, scalars inside lists become strings and unknown energy
//! values pass through.

use serde_json::{Map, Value};

use crate::error::{GuideError, Result};
use crate::guide::{Energy, SlideGuide, SpeakerReminder};

/// Parse a raw completion into exactly `expected` guides, numbered 1..=expected.
pub fn parse_guides(response: &str, expected: usize) -> Result<Vec<SlideGuide>> {
    let items = guide_items(response)?;

    if items.len() != expected {
        return Err(GuideError::SlideCountMismatch {
            expected,
            received: items.len(),
        });
    }

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| validate_guide(item, i + 1))
        .collect()
}

/// Locate the array of guide objects in the response.
fn guide_items(response: &str) -> Result<Vec<Value>> {
    let stripped = strip_code_fences(response.trim());

    // a bare object is either a single guide or a wrapper like {"guides": [...]}
    if stripped.starts_with('{')
        && let Ok(Value::Object(map)) = serde_json::from_str::<Value>(stripped)
    {
        return unwrap_object(map);
    }

    if let Some(items) = extract_json_array(stripped) {
        return Ok(items);
    }

    match serde_json::from_str::<Value>(stripped) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(_) => Err(GuideError::MalformedResponse(
            "expected a JSON array of guides".to_string(),
        )),
        Err(e) => Err(GuideError::MalformedResponse(format!(
            "response is not valid JSON: {e}"
        ))),
    }
}

fn unwrap_object(map: Map<String, Value>) -> Result<Vec<Value>> {
    if map.contains_key("slideNumber") {
        return Ok(vec![Value::Object(map)]);
    }

    let mut arrays: Vec<Vec<Value>> = map
        .into_iter()
        .filter_map(|(_, value)| match value {
            Value::Array(items) => Some(items),
            _ => None,
        })
        .collect();

    match arrays.len() {
        1 => Ok(arrays.remove(0)),
        _ => Err(GuideError::MalformedResponse(
            "expected a JSON array of guides, got an object".to_string(),
        )),
    }
}

fn validate_guide(item: Value, position: usize) -> Result<SlideGuide> {
    let Value::Object(obj) = item else {
        return Err(malformed(position, "is not an object"));
    };

    let slide_number = slide_number(obj.get("slideNumber"))
        .ok_or_else(|| malformed(position, "has no valid slideNumber"))?;
    if slide_number != position as u64 {
        return Err(GuideError::SlideNumberMismatch {
            expected: position,
            found: slide_number,
        });
    }

    let key_talking_points = string_list(obj.get("keyTalkingPoints"));
    if key_talking_points.is_empty() {
        return Err(malformed(position, "has no keyTalkingPoints"));
    }

    let reminder = match obj.get("speakerReminder") {
        Some(Value::Object(reminder)) => reminder,
        _ => return Err(malformed(position, "has no speakerReminder")),
    };
    let timing = reminder
        .get("timing")
        .and_then(scalar_string)
        .ok_or_else(|| malformed(position, "has no speakerReminder.timing"))?;
    let energy = reminder
        .get("energy")
        .and_then(scalar_string)
        .map(|raw| Energy::parse_lenient(&raw))
        .unwrap_or_else(|| Energy::Unrecognized(String::new()));

    Ok(SlideGuide {
        slide_number: position,
        title: required_string(&obj, "title", position)?,
        key_talking_points,
        transition_statement: required_string(&obj, "transitionStatement", position)?,
        emphasis_topic: required_string(&obj, "emphasisTopic", position)?,
        keywords: string_list(obj.get("keywords")),
        stats: string_list(obj.get("stats")),
        speaker_reminder: SpeakerReminder { timing, energy },
    })
}

fn malformed(position: usize, problem: &str) -> GuideError {
    GuideError::MalformedResponse(format!("guide {position} {problem}"))
}

/// Accepts `3`, `3.0` and `"3"`.
fn slide_number(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 1.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn required_string(obj: &Map<String, Value>, field: &str, position: usize) -> Result<String> {
    obj.get(field)
        .and_then(scalar_string)
        .ok_or_else(|| malformed(position, &format!("has no {field}")))
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Lenient list of strings: missing or null is empty, a lone string is a
/// one-element list, blank entries are dropped.
fn string_list(value: Option<&Value>) -> Vec<String> {
    let items: Vec<String> = match value {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_string).collect(),
        Some(other) => scalar_string(other).into_iter().collect(),
        None => Vec::new(),
    };
    items.into_iter().filter(|s| !s.is_empty()).collect()
}

/// Find the array of guide objects in a response that may contain extra text.
///
/// Every `[` is a candidate start. The first balanced span that parses as a
/// non-empty array of objects wins, so bracketed prose such as `[Acme Pitch]`
/// or a citation `[1]` before the answer is skipped, and so are the string
/// lists nested inside a truncated answer.
fn extract_json_array(text: &str) -> Option<Vec<Value>> {
    text.match_indices('[').find_map(|(start, _)| {
        let end = start + find_matching_bracket(&text[start..])?;
        match serde_json::from_str::<Value>(&text[start..=end]) {
            Ok(Value::Array(items)) if !items.is_empty() && items.iter().all(Value::is_object) => {
                Some(items)
            }
            _ => None,
        }
    })
}

/// Strip markdown code fences (``` or ```json) from around content.
fn strip_code_fences(s: &str) -> &str {
    let s = s.trim();

    if s.starts_with("```")
        && let Some(first_newline) = s.find('\n')
    {
        let inner = &s[first_newline + 1..];
        if let Some(closing) = inner.rfind("```") {
            return inner[..closing].trim();
        }
        return inner.trim();
    }

    s
}

/// Byte index of the `]` matching the first `[` in the string.
///
/// Returns `None` if brackets are unbalanced.
fn find_matching_bracket(s: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        if c == '\\' && in_string {
            escape_next = true;
            continue;
        }
        if c == '"' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

// ─── Tests ──────────────────────────────────────────────────────────────────
