//! Map extraction records to report rows.

use crate::models::{ExtractionRecord, Row};

/// Attribute copied into the report's `category` column.
pub const CATEGORY_ATTRIBUTE: &str = "category";

/// Keep records of `target_class` and flatten them into rows for `source`.
///
/// A source that ends up with no matching record still gets exactly one
/// placeholder row, so every source is visible in the report.
pub fn normalize(source: &str, records: &[ExtractionRecord], target_class: &str) -> Vec<Row> {
    let rows: Vec<Row> = records
        .iter()
        .filter(|r| r.extraction_class == target_class)
        .map(|r| Row {
            source: source.to_string(),
            keyword: r.extraction_text.clone(),
            category: r
                .attributes
                .get(CATEGORY_ATTRIBUTE)
                .cloned()
                .unwrap_or_default(),
        })
        .collect();

    if rows.is_empty() {
        vec![Row::placeholder(source)]
    } else {
        rows
    }
}
