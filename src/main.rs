//! # Article Keywords
//!
//! Fetches articles from configured URLs, strips them to paragraph text,
//! asks a language model to extract keywords with a category attribute using
//! a few-shot prompt, and writes the results as a multi-sheet spreadsheet
//! plus a JSON Lines log of every annotated document and, optionally, an HTML
//! preview of the extracted spans.
//!
//! ## Usage
//!
//! ```sh
//! OPENAI_API_KEY=... article_keywords -s sources.yaml -o article_keywords.xlsx
//! ```
//!
//! ## Architecture
//!
//! The application is one sequential pipeline:
//! 1. **Fetching**: download a source and keep its paragraph text
//! 2. **Extraction**: chunk the text and query the model (bounded concurrency per document)
//! 3. **Normalizing**: flatten keyword records into `source | keyword | category` rows
//! 4. **Output**: one sheet per group with merged source cells, the JSONL log, the HTML preview

use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod errors;
mod extraction;
mod models;
mod normalize;
mod outputs;
mod pipeline;
mod scrapers;
#[cfg(test)]
mod testing;
mod utils;

use api::{ChatCompletionsClient, RetryAsk};
use cli::Cli;
use config::{ExtractionTask, SourceGroup};
use errors::ConfigError;
use extraction::{ExtractOptions, LlmExtractor};
use outputs::{html, jsonl, xlsx};
use pipeline::RunSettings;
use scrapers::article::ArticleFetcher;
use utils::ensure_writable_parent;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("article_keywords starting up");

    let args = Cli::parse();
    debug!(?args.sources, ?args.output, ?args.jsonl, "Parsed CLI arguments");

    // Early check: fail on a bad output path before any network work
    for path in [&args.output, &args.jsonl].into_iter().chain(args.html.as_ref()) {
        if let Err(e) = ensure_writable_parent(path).await {
            error!(path = %path.display(), error = %e, "Output location is not writable");
            return Err(e);
        }
    }

    // ---- Sources & task ----
    let (groups, task) = load_groups(&args).await?;
    info!(
        groups = groups.len(),
        sources = groups.iter().map(|g| g.urls.len()).sum::<usize>(),
        target_class = %task.target_class,
        examples = task.examples.len(),
        "Configuration loaded"
    );

    // ---- Clients ----
    let api_key = resolve_api_key(&args)?;
    let base_url = args
        .base_url
        .clone()
        .unwrap_or_else(|| args.provider.default_base_url().to_string());
    let model = args
        .model
        .clone()
        .unwrap_or_else(|| args.provider.default_model().to_string());

    let fetcher = ArticleFetcher::new(Duration::from_secs(args.fetch_timeout_secs))?;
    let client = ChatCompletionsClient::new(
        &base_url,
        &api_key,
        &model,
        Duration::from_secs(args.request_timeout_secs),
    )?
    .with_temperature(args.temperature);
    let model_id = client.model().to_string();
    info!(provider = ?args.provider, %base_url, model = %model_id, "Extraction client ready");

    let extractor = LlmExtractor::new(
        RetryAsk::new(client, args.max_retries, Duration::from_secs(1)),
        ExtractOptions {
            max_workers: args.max_workers,
            extraction_passes: args.extraction_passes,
            max_char_buffer: args.max_char_buffer,
        },
    );

    // ---- Run ----
    let settings = RunSettings {
        task,
        model_id,
        delay: Duration::from_millis(args.delay_ms),
    };
    let outcome = pipeline::run(&groups, &fetcher, &extractor, &settings).await;

    // ---- Outputs (any failure here is fatal) ----
    if let Err(e) = xlsx::write_report(&outcome.groups, &args.output) {
        error!(path = %args.output.display(), error = %e, "Failed to write spreadsheet report");
        return Err(e.into());
    }
    info!(path = %args.output.display(), "Spreadsheet report written");

    if let Err(e) = jsonl::write_annotated_documents(&outcome.documents, &args.jsonl).await {
        error!(path = %args.jsonl.display(), error = %e, "Failed to write annotated documents");
        return Err(e.into());
    }

    if let Some(path) = &args.html {
        if let Err(e) = html::write_preview(&outcome.documents, path).await {
            error!(path = %path.display(), error = %e, "Failed to write extraction preview");
            return Err(e.into());
        }
    }

    let stats = outcome.stats;
    let elapsed = start_time.elapsed();
    info!(
        sources = stats.sources,
        fetch_failures = stats.fetch_failures,
        extraction_failures = stats.extraction_failures,
        rows = stats.rows,
        placeholder_rows = stats.placeholder_rows,
        ?elapsed,
        secs = elapsed.as_secs(),
        "Execution complete"
    );

    Ok(())
}

/// Source groups and extraction task from `--sources`, or from `--url` flags.
async fn load_groups(args: &Cli) -> Result<(Vec<SourceGroup>, ExtractionTask), ConfigError> {
    if let Some(path) = &args.sources {
        let file = config::load_sources_file(path).await?;
        return Ok((file.groups, file.extraction.unwrap_or_default()));
    }
    if args.urls.is_empty() {
        return Err(ConfigError::NoSources);
    }
    let groups = config::group_from_urls(&args.group, &args.urls)?;
    Ok((groups, ExtractionTask::default()))
}

fn resolve_api_key(args: &Cli) -> Result<String, ConfigError> {
    let env_name = args.provider.api_key_env();
    args.api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .or_else(|| std::env::var(env_name).ok().filter(|k| !k.trim().is_empty()))
        .ok_or(ConfigError::MissingApiKey { env_hint: env_name })
}
