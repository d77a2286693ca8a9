//! Keyword/entity extraction through a language model.
//!
//! The batch driver only sees the [`Extract`] trait. [`LlmExtractor`] is the
//! production implementation: it chunks the document, renders a few-shot
//! prompt per chunk, asks the model (at most `max_workers` requests in
//! flight), resolves the answers into records, and merges repeated passes.
//!
//! # Submodules
//!
//! - [`chunking`]: split text into model-sized chunks
//! - [`prompt`]: few-shot prompt rendering
//! - [`resolver`]: answer parsing and span alignment

pub mod chunking;
pub mod prompt;
pub mod resolver;

use crate::api::AskAsync;
use crate::errors::ExtractionError;
use crate::models::{ExampleData, ExtractionRecord};
use crate::utils::truncate_for_log;
use chunking::{Chunk, chunk_text};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};

/// Extract labelled spans from `text`, steered by `prompt` and `examples`.
///
/// The same prompt and examples should be supplied for every document of a
/// run; the service's answers are not deterministic, the request is.
pub trait Extract {
    async fn extract(
        &self,
        text: &str,
        prompt: &str,
        examples: &[ExampleData],
    ) -> Result<Vec<ExtractionRecord>, ExtractionError>;
}

/// Tuning knobs for [`LlmExtractor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Maximum concurrent chunk requests.
    pub max_workers: usize,
    /// Number of full sweeps over the document; later sweeps add recall.
    pub extraction_passes: usize,
    /// Maximum characters per chunk.
    pub max_char_buffer: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_workers: 4,
            extraction_passes: 1,
            max_char_buffer: 1000,
        }
    }
}

/// [`Extract`] implementation backed by any [`AskAsync`] model client.
#[derive(Debug)]
pub struct LlmExtractor<A> {
    ask: A,
    options: ExtractOptions,
}

impl<A> LlmExtractor<A>
where
    A: AskAsync,
{
    pub fn new(ask: A, options: ExtractOptions) -> Self {
        Self { ask, options }
    }

    #[instrument(level = "debug", skip_all, fields(offset = chunk.char_offset))]
    async fn extract_chunk(
        &self,
        chunk: &Chunk,
        prompt: &str,
        examples: &[ExampleData],
    ) -> Result<Vec<ExtractionRecord>, ExtractionError> {
        let request = prompt::render_prompt(prompt, examples, &chunk.text);

        let answer = self.ask.ask(&request).await?;
        let mut records = match resolver::parse_answer(&answer) {
            Ok(records) => records,
            // A cut-off answer gets exactly one more chance.
            Err(e) if e.is_truncated() => {
                warn!(error = %e, "EOF while parsing answer; re-asking once");
                let retry = self.ask.ask(&request).await?;
                resolver::parse_answer(&retry).map_err(|e| {
                    warn!(
                        error = %e,
                        response_preview = %truncate_for_log(&retry, 300),
                        "Re-asked answer is still not valid"
                    );
                    ExtractionError::from(e)
                })?
            }
            Err(e) => {
                warn!(
                    error = %e,
                    response_preview = %truncate_for_log(&answer, 300),
                    "Model returned non-conforming JSON"
                );
                return Err(e.into());
            }
        };

        resolver::align(&mut records, chunk);
        debug!(count = records.len(), "Resolved chunk");
        Ok(records)
    }
}

impl<A> Extract for LlmExtractor<A>
where
    A: AskAsync,
{
    #[instrument(level = "info", skip_all, fields(chars = text.chars().count()))]
    async fn extract(
        &self,
        text: &str,
        prompt: &str,
        examples: &[ExampleData],
    ) -> Result<Vec<ExtractionRecord>, ExtractionError> {
        let chunks = chunk_text(text, self.options.max_char_buffer);
        if chunks.is_empty() {
            info!("No text to extract from");
            return Ok(Vec::new());
        }

        let workers = self.options.max_workers.max(1);
        let passes = self.options.extraction_passes.max(1);
        let mut merged: Vec<ExtractionRecord> = Vec::new();

        for pass in 1..=passes {
            let results: Vec<Result<Vec<ExtractionRecord>, ExtractionError>> =
                stream::iter(chunks.iter())
                    .map(|chunk| self.extract_chunk(chunk, prompt, examples))
                    .buffered(workers)
                    .collect()
                    .await;

            let mut found = Vec::new();
            for result in results {
                found.extend(result?);
            }
            let before = merged.len();
            merge_pass(&mut merged, found);
            debug!(pass, added = merged.len() - before, "Extraction pass complete");
        }

        for (i, record) in merged.iter_mut().enumerate() {
            record.extraction_index = Some(i + 1);
        }
        info!(chunks = chunks.len(), passes, records = merged.len(), "Extraction complete");
        Ok(merged)
    }
}

/// Fold a pass's records into the accepted set.
///
/// The first pass is taken whole. Later passes only contribute records whose
/// span overlaps nothing accepted earlier; unlocated records are compared by
/// class and case-folded text instead.
fn merge_pass(accepted: &mut Vec<ExtractionRecord>, candidates: Vec<ExtractionRecord>) {
    if accepted.is_empty() {
        accepted.extend(candidates);
        return;
    }
    let prior = accepted.len();
    for candidate in candidates {
        let earlier = &accepted[..prior];
        let duplicate = match candidate.char_interval {
            Some(span) => earlier
                .iter()
                .any(|a| a.char_interval.is_some_and(|s| s.overlaps(&span))),
            None => earlier.iter().any(|a| {
                a.char_interval.is_none()
                    && a.extraction_class == candidate.extraction_class
                    && a.extraction_text.to_lowercase() == candidate.extraction_text.to_lowercase()
            }),
        };
        if !duplicate {
            accepted.push(candidate);
        }
    }
}
