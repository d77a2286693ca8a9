//! Turn a model answer into [`ExtractionRecord`]s and locate them in the text.
//!
//! Accepted answer shapes:
//!
//! - `{"extractions": [ ... ]}` or a bare `[ ... ]`, optionally fenced
//! - items keyed by class: `{"keyword": "AI", "keyword_attributes": {...}}`
//! - items with explicit fields: `{"extraction_class": "keyword",
//!   "extraction_text": "AI", "attributes": {...}}`

use crate::errors::ExtractionError;
use crate::extraction::chunking::Chunk;
use crate::extraction::prompt::ATTRIBUTE_SUFFIX;
use crate::models::{AlignmentStatus, CharInterval, ExtractionRecord};
use crate::utils::looks_truncated;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

static FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").unwrap());

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error("unexpected shape: {0}")]
    Shape(String),
}

impl ResolveError {
    /// The answer was cut off mid-JSON and is worth asking for again.
    pub fn is_truncated(&self) -> bool {
        matches!(self, ResolveError::Json(e) if looks_truncated(e))
    }
}

impl From<ResolveError> for ExtractionError {
    fn from(e: ResolveError) -> Self {
        ExtractionError::Malformed(e.to_string())
    }
}

/// The JSON body of an answer, without fences or leading prose.
fn strip_fence(answer: &str) -> &str {
    if let Some(body) = FENCE.captures(answer).and_then(|c| c.get(1)) {
        return body.as_str().trim();
    }
    // An unterminated fence means the answer was cut short.
    let rest = match answer.find("```") {
        Some(start) => {
            let rest = &answer[start + 3..];
            rest.strip_prefix("json").unwrap_or(rest)
        }
        None => answer,
    };
    match rest.find(['{', '[']) {
        Some(start) => rest[start..].trim(),
        None => rest.trim(),
    }
}

/// Parse a raw answer into unaligned records, in answer order.
pub fn parse_answer(answer: &str) -> Result<Vec<ExtractionRecord>, ResolveError> {
    let value: Value = serde_json::from_str(strip_fence(answer)).map_err(ResolveError::Json)?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("extractions") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) => Vec::new(),
            Some(other) => {
                return Err(ResolveError::Shape(format!(
                    "\"extractions\" is {}, expected an array",
                    kind(&other)
                )));
            }
            None => return Err(ResolveError::Shape("missing \"extractions\"".to_string())),
        },
        other => {
            return Err(ResolveError::Shape(format!(
                "top level is {}, expected an object or array",
                kind(&other)
            )));
        }
    };

    let mut records = Vec::new();
    for item in items {
        match item {
            Value::Object(obj) => records.extend(records_from_item(&obj)),
            other => {
                return Err(ResolveError::Shape(format!(
                    "extraction item is {}, expected an object",
                    kind(&other)
                )));
            }
        }
    }
    Ok(records)
}

fn records_from_item(obj: &Map<String, Value>) -> Vec<ExtractionRecord> {
    if let (Some(Value::String(class)), Some(text)) =
        (obj.get("extraction_class"), obj.get("extraction_text").and_then(scalar_text))
    {
        return vec![ExtractionRecord {
            attributes: attribute_map(obj.get("attributes")),
            ..ExtractionRecord::new(class, &text)
        }];
    }

    obj.iter()
        .filter(|(key, _)| !key.ends_with(ATTRIBUTE_SUFFIX) && !key.ends_with("_index"))
        .filter_map(|(class, value)| {
            let text = scalar_text(value)?;
            let attributes = attribute_map(obj.get(&format!("{class}{ATTRIBUTE_SUFFIX}")));
            Some(ExtractionRecord {
                attributes,
                ..ExtractionRecord::new(class, &text)
            })
        })
        .collect()
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn attribute_map(value: Option<&Value>) -> BTreeMap<String, String> {
    let Some(Value::Object(attrs)) = value else {
        return BTreeMap::new();
    };
    attrs
        .iter()
        .filter_map(|(k, v)| {
            let rendered = match v {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                Value::Array(items) => items
                    .iter()
                    .map(|i| match i {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(", "),
                other => other.to_string(),
            };
            Some((k.clone(), rendered))
        })
        .collect()
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Locate each record in `chunk`, setting document-level character spans.
///
/// Records are searched in order from just after the previous match so
/// repeated keywords map to successive occurrences; exact matches win over
/// case-insensitive ones. Unlocated records keep no span.
pub fn align(records: &mut [ExtractionRecord], chunk: &Chunk) {
    let hay: Vec<char> = chunk.text.chars().collect();
    let hay_folded: Vec<char> = hay.iter().map(|&c| fold(c)).collect();
    let mut cursor = 0;

    for record in records.iter_mut() {
        let needle: Vec<char> = record.extraction_text.chars().collect();
        let needle_folded: Vec<char> = needle.iter().map(|&c| fold(c)).collect();

        let found = find_chars(&hay, &needle, cursor)
            .or_else(|| find_chars(&hay, &needle, 0))
            .map(|i| (i, AlignmentStatus::MatchExact))
            .or_else(|| {
                find_chars(&hay_folded, &needle_folded, cursor)
                    .or_else(|| find_chars(&hay_folded, &needle_folded, 0))
                    .map(|i| (i, AlignmentStatus::MatchFuzzy))
            });

        if let Some((start, status)) = found {
            record.char_interval = Some(CharInterval {
                start_pos: chunk.char_offset + start,
                end_pos: chunk.char_offset + start + needle.len(),
            });
            record.alignment_status = Some(status);
            cursor = start + needle.len();
        }
    }
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn find_chars(hay: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() || needle.len() > hay.len() {
        return None;
    }
    (from..=hay.len() - needle.len()).find(|&i| hay[i..i + needle.len()] == *needle)
}
