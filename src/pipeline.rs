//! Batch driver: fetch → extract → normalize → accumulate, one source at a time.
//!
//! Sources are processed strictly in configuration order. A failing source
//! never aborts the batch: fetch and extraction failures are logged with the
//! URL and the source still contributes exactly one placeholder row. After
//! every source the driver pauses for a fixed delay to bound the request rate
//! against the extraction service; there is no pause after the last source.

use crate::config::{ExtractionTask, SourceGroup};
use crate::extraction::Extract;
use crate::models::{AnnotatedDocument, Document, ReportGroup, Row, Source};
use crate::normalize::normalize;
use crate::scrapers::Fetch;
use chrono::Utc;
use rand::{Rng, rng};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, instrument, warn};

/// Fixed inputs of one run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub task: ExtractionTask,
    pub model_id: String,
    /// Pause between consecutive sources.
    pub delay: Duration,
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub sources: usize,
    pub fetch_failures: usize,
    pub extraction_failures: usize,
    pub placeholder_rows: usize,
    pub rows: usize,
}

/// Everything a run produces: report rows per group plus the document log.
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub groups: Vec<ReportGroup>,
    pub documents: Vec<AnnotatedDocument>,
    pub stats: RunStats,
}

/// Process every source of every group, in order.
#[instrument(level = "info", skip_all, fields(groups = groups.len()))]
pub async fn run<F, E>(
    groups: &[SourceGroup],
    fetcher: &F,
    extractor: &E,
    settings: &RunSettings,
) -> RunOutcome
where
    F: Fetch,
    E: Extract,
{
    let mut outcome = RunOutcome::default();
    let total: usize = groups.iter().map(|g| g.urls.len()).sum();

    for group in groups {
        info!(group = %group.label, total = group.urls.len(), "Processing group");
        let mut report = ReportGroup {
            label: group.label.clone(),
            rows: Vec::new(),
        };

        for source in group.sources() {
            let rows = process_source(&source, fetcher, extractor, settings, &mut outcome).await;
            outcome.stats.sources += 1;
            outcome.stats.rows += rows.len();
            outcome.stats.placeholder_rows += rows.iter().filter(|r| r.is_placeholder()).count();
            report.rows.extend(rows);

            if !settings.delay.is_zero() && outcome.stats.sources < total {
                sleep(settings.delay).await;
            }
        }

        info!(group = %report.label, rows = report.rows.len(), "Finished group");
        outcome.groups.push(report);
    }

    outcome
}

async fn process_source<F, E>(
    source: &Source,
    fetcher: &F,
    extractor: &E,
    settings: &RunSettings,
    outcome: &mut RunOutcome,
) -> Vec<Row>
where
    F: Fetch,
    E: Extract,
{
    info!(url = %source.url, group = %source.group, "Fetching source");
    let document = match fetcher.fetch(&source.url).await {
        Ok(text) => Document {
            source: source.clone(),
            text,
        },
        Err(e) => {
            warn!(url = %source.url, error = %e, "Fetch failed; emitting placeholder row");
            outcome.stats.fetch_failures += 1;
            return vec![Row::placeholder(&source.url)];
        }
    };

    let task = &settings.task;
    let (records, error) = match extractor
        .extract(&document.text, &task.prompt, &task.examples)
        .await
    {
        Ok(records) => (records, None),
        Err(e) => {
            warn!(url = %source.url, error = %e, "Extraction failed; emitting placeholder row");
            outcome.stats.extraction_failures += 1;
            (Vec::new(), Some(e.to_string()))
        }
    };

    let rows = normalize(&document.source.url, &records, &task.target_class);
    info!(url = %source.url, records = records.len(), rows = rows.len(), "Source processed");

    outcome.documents.push(AnnotatedDocument {
        document_id: format!("doc_{:08x}", rng().random::<u32>()),
        group: document.source.group,
        source: document.source.url,
        text: document.text,
        prompt_description: task.prompt.clone(),
        examples: task.examples.clone(),
        extractions: records,
        model_id: settings.model_id.clone(),
        extracted_at: Utc::now().to_rfc3339(),
        error,
    });

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ExtractionError, FetchError};
    use crate::models::{ExampleData, ExtractionRecord};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned page text; unknown URLs fail with HTTP 404.
    struct FakeFetcher {
        pages: HashMap<String, String>,
        requested: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(u, t)| (u.to_string(), t.to_string()))
                    .collect(),
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    impl Fetch for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.requested.lock().unwrap().push(url.to_string());
            self.pages.get(url).cloned().ok_or(FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    /// Treats every comma-separated word of the text as a keyword; the text
    /// `FAIL` makes the service fail.
    struct FakeExtractor {
        seen_examples: Mutex<Vec<usize>>,
    }

    impl FakeExtractor {
        fn new() -> Self {
            Self {
                seen_examples: Mutex::new(Vec::new()),
            }
        }
    }

    impl Extract for FakeExtractor {
        async fn extract(
            &self,
            text: &str,
            _prompt: &str,
            examples: &[ExampleData],
        ) -> Result<Vec<ExtractionRecord>, ExtractionError> {
            self.seen_examples.lock().unwrap().push(examples.len());
            if text == "FAIL" {
                return Err(ExtractionError::Api {
                    status: 500,
                    message: "boom".into(),
                });
            }
            Ok(text
                .split(',')
                .map(str::trim)
                .filter(|w| !w.is_empty())
                .map(|w| ExtractionRecord::new("keyword", w).with_attribute("category", "concept"))
                .collect())
        }
    }

    fn settings() -> RunSettings {
        RunSettings {
            task: ExtractionTask::default(),
            model_id: "test-model".into(),
            delay: Duration::ZERO,
        }
    }

    fn groups() -> Vec<SourceGroup> {
        vec![
            SourceGroup {
                label: "English".into(),
                urls: vec![
                    "https://a.test/1".into(),
                    "https://a.test/empty".into(),
                    "https://a.test/missing".into(),
                ],
            },
            SourceGroup {
                label: "Hindi".into(),
                urls: vec!["https://b.test/fail".into(), "https://b.test/2".into()],
            },
        ]
    }

    fn fetcher() -> FakeFetcher {
        FakeFetcher::new(&[
            ("https://a.test/1", "SEBI, demat, nominee"),
            ("https://a.test/empty", ""),
            ("https://b.test/fail", "FAIL"),
            ("https://b.test/2", "TER"),
        ])
    }

    #[tokio::test]
    async fn test_rows_per_group_follow_source_order() {
        let outcome = run(&groups(), &fetcher(), &FakeExtractor::new(), &settings()).await;

        let labels: Vec<_> = outcome.groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["English", "Hindi"]);

        let english: Vec<_> = outcome.groups[0]
            .rows
            .iter()
            .map(|r| (r.source.as_str(), r.keyword.as_str()))
            .collect();
        assert_eq!(
            english,
            vec![
                ("https://a.test/1", "SEBI"),
                ("https://a.test/1", "demat"),
                ("https://a.test/1", "nominee"),
                ("https://a.test/empty", ""),
                ("https://a.test/missing", ""),
            ]
        );
    }

    #[tokio::test]
    async fn test_row_count_is_records_or_one_per_source() {
        let outcome = run(&groups(), &fetcher(), &FakeExtractor::new(), &settings()).await;
        // English: 3 + 1 (no records) + 1 (fetch failed); Hindi: 1 (extraction failed) + 1.
        assert_eq!(outcome.groups[0].rows.len(), 5);
        assert_eq!(outcome.groups[1].rows.len(), 2);
        assert_eq!(
            outcome.stats,
            RunStats {
                sources: 5,
                fetch_failures: 1,
                extraction_failures: 1,
                placeholder_rows: 3,
                rows: 7,
            }
        );
    }

    #[tokio::test]
    async fn test_successful_source_has_no_placeholder() {
        let outcome = run(&groups(), &fetcher(), &FakeExtractor::new(), &settings()).await;
        let rows: Vec<_> = outcome.groups[0]
            .rows
            .iter()
            .filter(|r| r.source == "https://a.test/1")
            .collect();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| !r.is_placeholder() && r.category == "concept"));
    }

    #[tokio::test]
    async fn test_failed_sources_get_exactly_one_placeholder() {
        let outcome = run(&groups(), &fetcher(), &FakeExtractor::new(), &settings()).await;
        for url in ["https://a.test/missing", "https://b.test/fail"] {
            let rows: Vec<_> = outcome
                .groups
                .iter()
                .flat_map(|g| &g.rows)
                .filter(|r| r.source == url)
                .collect();
            assert_eq!(rows.len(), 1, "{url}");
            assert!(rows[0].is_placeholder());
        }
    }

    #[tokio::test]
    async fn test_document_log_covers_fetched_sources() {
        let outcome = run(&groups(), &fetcher(), &FakeExtractor::new(), &settings()).await;
        let sources: Vec<_> = outcome.documents.iter().map(|d| d.source.as_str()).collect();
        assert_eq!(
            sources,
            vec![
                "https://a.test/1",
                "https://a.test/empty",
                "https://b.test/fail",
                "https://b.test/2",
            ]
        );

        let failed = &outcome.documents[2];
        assert!(failed.extractions.is_empty());
        assert!(failed.error.as_deref().unwrap().contains("boom"));
        assert_eq!(failed.group, "Hindi");

        let ok = &outcome.documents[0];
        assert_eq!(ok.extractions.len(), 3);
        assert_eq!(ok.model_id, "test-model");
        assert!(ok.document_id.starts_with("doc_"));
        assert!(ok.error.is_none());
    }

    #[tokio::test]
    async fn test_delay_only_between_sources() {
        let fetcher = fetcher();
        let extractor = FakeExtractor::new();
        let group = |urls: &[&str]| {
            vec![SourceGroup {
                label: "English".into(),
                urls: urls.iter().map(|u| u.to_string()).collect(),
            }]
        };

        let single = RunSettings {
            delay: Duration::from_secs(5),
            ..settings()
        };
        let t0 = std::time::Instant::now();
        run(&group(&["https://a.test/1"]), &fetcher, &extractor, &single).await;
        assert!(t0.elapsed() < Duration::from_secs(2));

        let pair = RunSettings {
            delay: Duration::from_secs(1),
            ..settings()
        };
        let t0 = std::time::Instant::now();
        run(&group(&["https://a.test/1", "https://b.test/2"]), &fetcher, &extractor, &pair).await;
        let elapsed = t0.elapsed();
        assert!(elapsed >= Duration::from_secs(1));
        assert!(elapsed < Duration::from_millis(1900));
    }

    #[tokio::test]
    async fn test_every_call_gets_the_same_examples() {
        let extractor = FakeExtractor::new();
        let fetcher = fetcher();
        run(&groups(), &fetcher, &extractor, &settings()).await;

        let seen = extractor.seen_examples.lock().unwrap().clone();
        assert_eq!(seen, vec![1, 1, 1, 1]);
        assert_eq!(fetcher.requested.lock().unwrap().len(), 5);
    }
}
