//! Annotated-documents log.
//!
//! One JSON object per processed document, one document per line: the
//! cleaned text, the prompt and examples it was sent with, and every
//! extraction that came back.

use crate::errors::WriteError;
use crate::models::AnnotatedDocument;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Serialize documents as JSON Lines.
pub fn to_jsonl(documents: &[AnnotatedDocument]) -> Result<String, WriteError> {
    let mut out = String::new();
    for document in documents {
        out.push_str(&serde_json::to_string(document)?);
        out.push('\n');
    }
    Ok(out)
}

/// Write documents to `path`, replacing any existing file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_annotated_documents(
    documents: &[AnnotatedDocument],
    path: &Path,
) -> Result<(), WriteError> {
    let body = to_jsonl(documents)?;
    fs::write(path, body).await?;
    info!(documents = documents.len(), "Wrote annotated documents");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExampleData, ExtractionRecord};

    fn document(source: &str, extractions: Vec<ExtractionRecord>) -> AnnotatedDocument {
        AnnotatedDocument {
            document_id: "doc_0000abcd".into(),
            group: "English".into(),
            source: source.into(),
            text: "Line one.\nLine two with \"quotes\".".into(),
            prompt_description: "Extract keywords.".into(),
            examples: vec![ExampleData {
                text: "AI is here.".into(),
                extractions: vec![ExtractionRecord::new("keyword", "AI")],
            }],
            extractions,
            model_id: "gpt-4o".into(),
            extracted_at: "2025-01-01T00:00:00+00:00".into(),
            error: None,
        }
    }

    #[test]
    fn test_one_object_per_line() {
        let docs = vec![
            document(
                "https://e.test/1",
                vec![
                    ExtractionRecord::new("keyword", "quotes")
                        .with_attribute("category", "concept"),
                ],
            ),
            document("https://e.test/2", vec![]),
        ];
        let body = to_jsonl(&docs).unwrap();
        let lines: Vec<_> = body.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: AnnotatedDocument = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.source, "https://e.test/1");
        assert_eq!(first.text, "Line one.\nLine two with \"quotes\".");
        assert_eq!(first.extractions[0].attributes["category"], "concept");
        assert_eq!(first.examples.len(), 1);
        assert!(!lines[1].contains("\"error\""));
    }

    #[test]
    fn test_empty_log_is_empty_file() {
        assert_eq!(to_jsonl(&[]).unwrap(), "");
    }

    #[tokio::test]
    async fn test_write_annotated_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extracted.jsonl");
        write_annotated_documents(&[document("https://e.test/1", vec![])], &path)
            .await
            .unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.ends_with('\n'));
        assert!(written.contains("\"document_id\":\"doc_0000abcd\""));
    }
}
