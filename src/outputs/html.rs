//! Self-contained HTML preview of the annotated documents.
//!
//! One section per document: its source, a table of extractions and the
//! cleaned text with every aligned span wrapped in `<mark>`. Spans without a
//! `char_interval`, out of range, or overlapping an earlier span are listed
//! in the table but not highlighted.

use crate::errors::WriteError;
use crate::models::{AnnotatedDocument, CharInterval, ExtractionRecord};
use std::fmt::Write as _;
use std::iter;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

const STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:960px;margin:24px auto;\
padding:0 16px;color:#222;}
section{border-top:1px solid #ddd;padding:16px 0;}
h2{font-size:16px;word-break:break-all;}
.meta{font-size:12px;color:#777;}
.error{color:#c62828;}
table{border-collapse:collapse;font-size:13px;margin:8px 0;}
th,td{border:1px solid #ddd;padding:4px 8px;text-align:left;}
.text{white-space:pre-wrap;line-height:1.6;}
mark{background:#fffb8f;padding:0 2px;border-radius:2px;}";

/// Write the preview to `path`, replacing any existing file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_preview(documents: &[AnnotatedDocument], path: &Path) -> Result<(), WriteError> {
    fs::write(path, render_preview(documents)).await?;
    info!(documents = documents.len(), "Wrote extraction preview");
    Ok(())
}

pub fn render_preview(documents: &[AnnotatedDocument]) -> String {
    let mut html = String::new();
    html.push_str("<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Extraction preview</title>\n<style>\n");
    html.push_str(STYLE);
    html.push_str("\n</style>\n</head>\n<body>\n<h1>Extraction preview</h1>\n");
    for document in documents {
        render_document(&mut html, document);
    }
    html.push_str("</body>\n</html>\n");
    html
}

fn render_document(html: &mut String, document: &AnnotatedDocument) {
    let _ = writeln!(
        html,
        "<section id=\"{id}\">\n<h2>{source}</h2>\n<p class=\"meta\">{group} · {model} · {at}</p>",
        id = html_escape(&document.document_id),
        source = html_escape(&document.source),
        group = html_escape(&document.group),
        model = html_escape(&document.model_id),
        at = html_escape(&document.extracted_at),
    );
    if let Some(error) = &document.error {
        let _ = writeln!(html, "<p class=\"error\">{}</p>", html_escape(error));
    }

    if !document.extractions.is_empty() {
        html.push_str("<table>\n<tr><th>class</th><th>text</th>");
        html.push_str("<th>attributes</th><th>span</th></tr>\n");
        for record in &document.extractions {
            let _ = writeln!(
                html,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                html_escape(&record.extraction_class),
                html_escape(&record.extraction_text),
                html_escape(&attributes_cell(record)),
                span_cell(record),
            );
        }
        html.push_str("</table>\n");
    }

    html.push_str("<div class=\"text\">");
    html.push_str(&highlight(&document.text, &document.extractions));
    html.push_str("</div>\n</section>\n");
}

fn attributes_cell(record: &ExtractionRecord) -> String {
    record
        .attributes
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn span_cell(record: &ExtractionRecord) -> String {
    match (record.char_interval, record.alignment_status) {
        (Some(span), Some(status)) => {
            let status = serde_json::to_value(status)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            format!("{}..{} ({status})", span.start_pos, span.end_pos)
        }
        (Some(span), None) => format!("{}..{}", span.start_pos, span.end_pos),
        _ => "unaligned".to_string(),
    }
}

/// Escaped `text` with non-overlapping aligned spans wrapped in `<mark>`.
pub fn highlight(text: &str, records: &[ExtractionRecord]) -> String {
    // Byte offset of every char position, plus the end of the text.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(iter::once(text.len()))
        .collect();

    let mut spans: Vec<(CharInterval, &ExtractionRecord)> = records
        .iter()
        .filter_map(|r| r.char_interval.map(|span| (span, r)))
        .filter(|(span, _)| span.start_pos < span.end_pos && span.end_pos < bounds.len())
        .collect();
    spans.sort_by_key(|(span, _)| (span.start_pos, span.end_pos));

    let mut out = String::new();
    let mut cursor = 0;
    for (span, record) in spans {
        if span.start_pos < cursor {
            continue;
        }
        out.push_str(&html_escape(&text[bounds[cursor]..bounds[span.start_pos]]));
        let _ = write!(
            out,
            "<mark title=\"{class} [{start}..{end}]\">{segment}</mark>",
            class = html_escape(&record.extraction_class),
            start = span.start_pos,
            end = span.end_pos,
            segment = html_escape(&text[bounds[span.start_pos]..bounds[span.end_pos]]),
        );
        cursor = span.end_pos;
    }
    out.push_str(&html_escape(&text[bounds[cursor]..]));
    out
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
