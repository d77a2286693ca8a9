//! Command-line interface definitions.
//!
//! Every option can also be set through an environment variable. Credentials
//! are only ever read from `--api-key`, `EXTRACT_API_KEY` or the provider's
//! own variable (`OPENAI_API_KEY` / `GEMINI_API_KEY`).

use crate::api::Provider;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for a keyword extraction run.
///
/// # Examples
///
/// ```sh
/// # All groups from a sources file, OpenAI
/// OPENAI_API_KEY=... article_keywords -s sources.yaml
///
/// # A single article with Gemini, two extraction passes
/// GEMINI_API_KEY=... article_keywords --provider gemini \
///     -u https://english.mahamoney.com/govt-plans-e-commerce-export-boost-for-msmes \
///     --extraction-passes 2
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// YAML file listing source groups and, optionally, the extraction task
    #[arg(short, long, env = "SOURCES_FILE")]
    pub sources: Option<PathBuf>,

    /// Article URL to process (repeatable); ignored when --sources is given
    #[arg(short = 'u', long = "url")]
    pub urls: Vec<String>,

    /// Group label used for --url sources
    #[arg(short, long, default_value = "Default")]
    pub group: String,

    /// Extraction provider
    #[arg(long, value_enum, env = "EXTRACT_PROVIDER", default_value_t = Provider::Openai)]
    pub provider: Provider,

    /// Model identifier (defaults to the provider's recommended model)
    #[arg(long, env = "EXTRACT_MODEL")]
    pub model: Option<String>,

    /// Base URL of the OpenAI-compatible API (defaults per provider)
    #[arg(long, env = "EXTRACT_BASE_URL")]
    pub base_url: Option<String>,

    /// API key for the extraction provider
    #[arg(long, env = "EXTRACT_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Maximum concurrent requests per document (values below 1 act as 1)
    #[arg(long, env = "EXTRACT_MAX_WORKERS", default_value_t = 4)]
    pub max_workers: usize,

    /// Number of extraction passes per document; more passes improve recall
    #[arg(long, env = "EXTRACT_PASSES", default_value_t = 1)]
    pub extraction_passes: usize,

    /// Maximum characters of article text per request
    #[arg(long, env = "EXTRACT_MAX_CHAR_BUFFER", default_value_t = 1000)]
    pub max_char_buffer: usize,

    /// Sampling temperature passed to the model
    #[arg(long, env = "EXTRACT_TEMPERATURE")]
    pub temperature: Option<f32>,

    /// Retries for transient extraction failures (rate limits, 5xx, network)
    #[arg(long, env = "EXTRACT_MAX_RETRIES", default_value_t = 2)]
    pub max_retries: usize,

    /// Timeout for one extraction request, in seconds
    #[arg(long, env = "EXTRACT_TIMEOUT_SECS", default_value_t = 120)]
    pub request_timeout_secs: u64,

    /// Timeout for fetching one article, in seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 15)]
    pub fetch_timeout_secs: u64,

    /// Pause between consecutive sources, in milliseconds
    #[arg(long, env = "DELAY_MS", default_value_t = 500)]
    pub delay_ms: u64,

    /// Spreadsheet report path
    #[arg(short, long, env = "REPORT_PATH", default_value = "article_keywords.xlsx")]
    pub output: PathBuf,

    /// Annotated-documents log path (JSON Lines)
    #[arg(short, long, env = "JSONL_PATH", default_value = "extracted.jsonl")]
    pub jsonl: PathBuf,

    /// Optional HTML preview with extracted spans highlighted
    #[arg(long, env = "HTML_PATH")]
    pub html: Option<PathBuf>,
}
