//! Few-shot prompt rendering.
//!
//! The prompt is a task description followed by question/answer pairs, one
//! per example, and finally the live chunk as an open question:
//!
//! ```text
//! <description>
//!
//! Examples
//! Q: <example text>
//! A: ```json
//! {"extractions": [{"keyword": "...", "keyword_attributes": {...}}]}
//! ```
//!
//! Q: <chunk>
//! A:
//! ```

use crate::models::{ExampleData, ExtractionRecord};
use serde_json::{Map, Value, json};
use std::fmt::Write;

/// Suffix of the key carrying a class's attributes in answer JSON.
pub const ATTRIBUTE_SUFFIX: &str = "_attributes";

pub fn render_prompt(description: &str, examples: &[ExampleData], question: &str) -> String {
    let mut prompt = String::new();
    prompt.push_str(description.trim());
    prompt.push_str("\n\n");

    if !examples.is_empty() {
        prompt.push_str("Examples\n");
        for example in examples {
            let _ = write!(
                prompt,
                "Q: {}\nA: {}\n\n",
                example.text.trim(),
                fenced_answer(&example.extractions)
            );
        }
    }

    let _ = write!(prompt, "Q: {}\nA: ", question);
    prompt
}

/// Render extractions the way the model is expected to answer.
pub fn fenced_answer(extractions: &[ExtractionRecord]) -> String {
    let items: Vec<Value> = extractions.iter().map(answer_item).collect();
    let body = serde_json::to_string_pretty(&json!({ "extractions": items }))
        .unwrap_or_else(|_| "{\"extractions\": []}".to_string());
    format!("```json\n{body}\n```")
}

fn answer_item(record: &ExtractionRecord) -> Value {
    let mut item = Map::new();
    item.insert(
        record.extraction_class.clone(),
        Value::String(record.extraction_text.clone()),
    );
    let attributes: Map<String, Value> = record
        .attributes
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    item.insert(
        format!("{}{}", record.extraction_class, ATTRIBUTE_SUFFIX),
        Value::Object(attributes),
    );
    Value::Object(item)
}
