// file: src/extractor/response.rs
// description: lenient parsing of JSON answers embedded in model output
// reference: https://docs.rs/serde_json

use crate::models::{DocumentSource, ExtractedField, ScoringItem};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

lazy_static! {
    static ref FENCED_JSON: Regex = Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```")
        .expect("FENCED_JSON regex is valid");

    static ref BARE_OBJECT: Regex = Regex::new(r"(?s)\{.*\}")
        .expect("BARE_OBJECT regex is valid");
}

/// Finds the JSON object in `text`, preferring a fenced block.
pub fn extract_json(text: &str) -> Option<Map<String, Value>> {
    let candidates = FENCED_JSON
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .into_iter()
        .chain(BARE_OBJECT.find(text).map(|m| m.as_str()));

    for candidate in candidates {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(candidate) {
            return Some(map);
        }
    }

    None
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn number_of(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn source_of(map: &Map<String, Value>) -> Option<DocumentSource> {
    let source = DocumentSource {
        page_number: map
            .get("page_number")
            .and_then(number_of)
            .filter(|n| *n >= 0.0)
            .map(|n| n as u32),
        section: map.get("section").and_then(text_of),
        source_text: map.get("source_text").and_then(text_of),
    };

    if source == DocumentSource::default() {
        None
    } else {
        Some(source)
    }
}

/// Accepts either a bare scalar or `{"value": ..., "source_text": ...}`.
/// Blank values yield `None`.
pub fn parse_field(value: &Value) -> Option<ExtractedField> {
    match value {
        Value::Object(map) => {
            let text = map.get("value").and_then(text_of)?;
            let mut field = ExtractedField::new(text);
            field.source = source_of(map);
            if let Some(confidence) = map.get("confidence").and_then(number_of) {
                field = field.with_confidence(confidence);
            }
            if let Some(notes) = map.get("notes").and_then(text_of) {
                field = field.with_notes(notes);
            }
            Some(field)
        }
        other => text_of(other).map(ExtractedField::new),
    }
}

pub fn parse_field_list(value: &Value) -> Vec<ExtractedField> {
    match value {
        Value::Array(items) => items.iter().filter_map(parse_field).collect(),
        other => parse_field(other).into_iter().collect(),
    }
}

pub fn parse_scoring_items(value: &Value) -> Vec<ScoringItem> {
    let Value::Array(items) = value else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let map = item.as_object()?;
            let item_name = map.get("item_name").and_then(text_of)?;
            Some(ScoringItem {
                category: map
                    .get("category")
                    .and_then(text_of)
                    .unwrap_or_else(|| "uncategorized".to_string()),
                item_name,
                max_score: map.get("max_score").and_then(number_of),
                criteria: map.get("criteria").and_then(text_of),
                source: source_of(map),
            })
        })
        .collect()
}
