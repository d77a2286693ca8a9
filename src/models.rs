//! Data models shared across the pipeline.
//!
//! - [`Source`]: one article URL and the group it is reported under
//! - [`Document`]: a source's cleaned text, consumed once by extraction
//! - [`ExtractionRecord`]: one labelled span returned by the extraction service
//! - [`ExampleData`]: a few-shot example steering the extraction service
//! - [`Row`] / [`ReportGroup`]: flat report rows, one sheet per group
//! - [`AnnotatedDocument`]: one line of the JSONL log

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An article URL together with its group label (e.g. a language).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub group: String,
    pub url: String,
}

/// The cleaned plain text of a [`Source`].
#[derive(Debug)]
pub struct Document {
    pub source: Source,
    pub text: String,
}

/// Half-open character interval `[start_pos, end_pos)` into the document text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharInterval {
    pub start_pos: usize,
    pub end_pos: usize,
}

impl CharInterval {
    pub fn overlaps(&self, other: &CharInterval) -> bool {
        self.start_pos < other.end_pos && other.start_pos < self.end_pos
    }
}

/// How an extraction's text was located in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentStatus {
    MatchExact,
    MatchFuzzy,
}

/// One labelled span produced by the extraction service.
///
/// Span offsets are informational; correctness of the report never depends
/// on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub extraction_class: String,
    pub extraction_text: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub char_interval: Option<CharInterval>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment_status: Option<AlignmentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_index: Option<usize>,
}

impl ExtractionRecord {
    pub fn new(class: &str, text: &str) -> Self {
        Self {
            extraction_class: class.to_string(),
            extraction_text: text.to_string(),
            attributes: BTreeMap::new(),
            char_interval: None,
            alignment_status: None,
            extraction_index: None,
        }
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }
}

/// A worked example: input text and the extractions expected from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleData {
    pub text: String,
    pub extractions: Vec<ExtractionRecord>,
}

/// One report row. A placeholder row has empty `keyword` and `category`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub source: String,
    pub keyword: String,
    pub category: String,
}

impl Row {
    pub fn placeholder(source: &str) -> Self {
        Self {
            source: source.to_string(),
            keyword: String::new(),
            category: String::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.keyword.is_empty() && self.category.is_empty()
    }
}

/// Rows sharing a group label, in source processing order. One sheet each.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReportGroup {
    pub label: String,
    pub rows: Vec<Row>,
}

/// One processed document as written to the annotated-documents log.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnnotatedDocument {
    pub document_id: String,
    pub group: String,
    pub source: String,
    pub text: String,
    pub prompt_description: String,
    pub examples: Vec<ExampleData>,
    pub extractions: Vec<ExtractionRecord>,
    pub model_id: String,
    pub extracted_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
