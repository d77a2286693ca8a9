//! Error taxonomy for the extraction pipeline.
//!
//! Fetch and extraction errors are recoverable per source: the batch driver
//! logs them and moves on. Write and configuration errors abort the run.

use thiserror::Error;

/// Failure to retrieve an article.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

impl FetchError {
    pub(crate) fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Request {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// Failure of the extraction service or of its output.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("extraction service unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("authentication rejected by extraction service (HTTP {status})")]
    Auth { status: u16 },

    #[error("extraction service error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("extraction service returned no content")]
    EmptyResponse,

    #[error("malformed extraction output: {0}")]
    Malformed(String),
}

impl ExtractionError {
    /// Whether a later attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ExtractionError::Transport(_) => true,
            ExtractionError::Api { status, .. } => *status == 429 || *status >= 500,
            ExtractionError::EmptyResponse => true,
            ExtractionError::Auth { .. } | ExtractionError::Malformed(_) => false,
        }
    }
}

/// Failure to serialize a report. Always fatal.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("spreadsheet encoding failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sheet '{sheet}' has more rows than the format allows")]
    TooManyRows { sheet: String },
}

/// Invalid or missing run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse sources file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid URL '{url}' in group '{group}': {reason}")]
    InvalidUrl {
        group: String,
        url: String,
        reason: String,
    },

    #[error("no sources configured (use --sources or --url)")]
    NoSources,

    #[error("group label must not be empty")]
    EmptyLabel,

    #[error("no API key provided (use --api-key, EXTRACT_API_KEY or {env_hint})")]
    MissingApiKey { env_hint: &'static str },

    #[error("{0}")]
    Invalid(String),
}
