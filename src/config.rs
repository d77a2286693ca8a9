//! Run configuration: which sources to process and how to steer extraction.
//!
//! Sources come from a YAML file or from `--url` flags. The extraction prompt
//! and few-shot examples default to a built-in keyword task and can be
//! overridden from the same YAML file.
//!
//! ```yaml
//! groups:
//!   - label: English
//!     urls:
//!       - https://english.mahamoney.com/govt-plans-e-commerce-export-boost-for-msmes
//! extraction:
//!   target_class: keyword
//! ```

use crate::errors::ConfigError;
use crate::models::{ExampleData, ExtractionRecord, Source};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, instrument};
use url::Url;

pub const DEFAULT_TARGET_CLASS: &str = "keyword";

const DEFAULT_PROMPT: &str = "Extract important keywords and phrases from the text.
Each extraction should be an exact text span, no paraphrasing.
Add a meaningful attribute 'category' describing the keyword type \
(e.g. 'technology', 'person', 'concept', etc).";

/// A labelled, ordered list of article URLs.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SourceGroup {
    pub label: String,
    pub urls: Vec<String>,
}

impl SourceGroup {
    pub fn sources(&self) -> Vec<Source> {
        self.urls
            .iter()
            .map(|url| Source {
                group: self.label.clone(),
                url: url.clone(),
            })
            .collect()
    }
}

/// The extraction task: what to ask for and how to recognise the answer.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractionTask {
    pub target_class: String,
    pub prompt: String,
    pub examples: Vec<ExampleData>,
}

impl Default for ExtractionTask {
    fn default() -> Self {
        Self {
            target_class: DEFAULT_TARGET_CLASS.to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            examples: default_examples(),
        }
    }
}

fn default_examples() -> Vec<ExampleData> {
    vec![ExampleData {
        text: "Elasticsearch is a distributed, open-source search and analytics engine \
               that helps you store, search, and analyze large volumes of data quickly."
            .to_string(),
        extractions: vec![
            ExtractionRecord::new("keyword", "Elasticsearch")
                .with_attribute("category", "technology"),
            ExtractionRecord::new("keyword", "open-source search")
                .with_attribute("category", "concept"),
            ExtractionRecord::new("keyword", "analytics engine")
                .with_attribute("category", "technology"),
        ],
    }]
}

/// Contents of a sources file.
#[derive(Debug, Deserialize)]
pub struct SourcesFile {
    pub groups: Vec<SourceGroup>,
    #[serde(default)]
    pub extraction: Option<ExtractionTask>,
}

impl SourcesFile {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let file: SourcesFile = serde_yaml::from_str(yaml)?;
        validate_groups(&file.groups)?;
        if let Some(task) = &file.extraction {
            if task.target_class.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "extraction.target_class must not be empty".to_string(),
                ));
            }
        }
        Ok(file)
    }
}

/// Load and validate a sources file from disk.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_sources_file(path: &Path) -> Result<SourcesFile, ConfigError> {
    let yaml = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
    let file = SourcesFile::from_yaml(&yaml)?;
    info!(
        groups = file.groups.len(),
        sources = file.groups.iter().map(|g| g.urls.len()).sum::<usize>(),
        "Loaded sources file"
    );
    Ok(file)
}

/// Build a single group from URLs given on the command line.
pub fn group_from_urls(label: &str, urls: &[String]) -> Result<Vec<SourceGroup>, ConfigError> {
    let groups = vec![SourceGroup {
        label: label.to_string(),
        urls: urls.to_vec(),
    }];
    validate_groups(&groups)?;
    Ok(groups)
}

fn validate_groups(groups: &[SourceGroup]) -> Result<(), ConfigError> {
    if groups.iter().all(|g| g.urls.is_empty()) {
        return Err(ConfigError::NoSources);
    }
    for group in groups {
        if group.label.trim().is_empty() {
            return Err(ConfigError::EmptyLabel);
        }
        for raw in &group.urls {
            validate_url(&group.label, raw)?;
        }
    }
    debug!(groups = groups.len(), "Validated source groups");
    Ok(())
}

fn validate_url(group: &str, raw: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        group: group.to_string(),
        url: raw.to_string(),
        reason,
    };
    let parsed = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
groups:
  - label: Marathi
    urls:
      - https://mahamoney.com/unclaimed-money-check-claim-process-bank-insurance
      - https://mahamoney.com/investment-slow-progress-7-year-rule-compound-interest
  - label: English
    urls:
      - https://english.mahamoney.com/govt-plans-e-commerce-export-boost-for-msmes
"#;

    #[test]
    fn test_groups_keep_file_order() {
        let file = SourcesFile::from_yaml(SAMPLE).unwrap();
        let labels: Vec<_> = file.groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["Marathi", "English"]);
        assert_eq!(file.groups[0].urls.len(), 2);
        assert!(file.extraction.is_none());
    }

    #[test]
    fn test_sources_carry_group_label() {
        let file = SourcesFile::from_yaml(SAMPLE).unwrap();
        let sources = file.groups[0].sources();
        assert_eq!(sources.len(), 2);
        assert!(sources.iter().all(|s| s.group == "Marathi"));
    }

    #[test]
    fn test_extraction_block_overrides_parts_of_default() {
        let yaml = format!(
            "{SAMPLE}\nextraction:\n  target_class: entity\n  prompt: Find entities.\n"
        );
        let file = SourcesFile::from_yaml(&yaml).unwrap();
        let task = file.extraction.unwrap();
        assert_eq!(task.target_class, "entity");
        assert_eq!(task.prompt, "Find entities.");
        // Examples were not given, so the built-in ones remain.
        assert_eq!(task.examples, default_examples());
    }

    #[test]
    fn test_rejects_non_http_url() {
        let yaml = "groups:\n  - label: X\n    urls: [\"ftp://example.com/a\"]\n";
        let err = SourcesFile::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
    }

    #[test]
    fn test_rejects_unparseable_url() {
        let err = group_from_urls("X", &["not a url".to_string()]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
    }

    #[test]
    fn test_rejects_empty_configuration() {
        let err = SourcesFile::from_yaml("groups: []\n").unwrap_err();
        assert!(matches!(err, ConfigError::NoSources));
    }

    #[test]
    fn test_rejects_blank_label() {
        let yaml = "groups:\n  - label: \"  \"\n    urls: [\"https://example.com\"]\n";
        let err = SourcesFile::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyLabel));
    }

    #[test]
    fn test_default_task_targets_keywords() {
        let task = ExtractionTask::default();
        assert_eq!(task.target_class, "keyword");
        assert_eq!(task.examples.len(), 1);
        assert_eq!(task.examples[0].extractions.len(), 3);
    }

    #[tokio::test]
    async fn test_load_sources_file_missing_path() {
        let err = load_sources_file(Path::new("/definitely/not/here.yaml"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
