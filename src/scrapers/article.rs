//! Generic article fetcher.
//!
//! Downloads a page with a bounded timeout, drops structurally non-content
//! elements (`script`, `style`, `nav`, `footer`, `header`) and keeps the text
//! of every `<p>` in document order, one paragraph per line.
//!
//! There is no retry: one attempt per call, failures surface as
//! [`FetchError`] and the caller decides what to do with the source.

use crate::errors::FetchError;
use crate::scrapers::Fetch;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, info, instrument};

static NOISE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script, style, nav, footer, header").unwrap());
static PARAGRAPH_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// HTTP fetcher with a per-request timeout.
#[derive(Debug, Clone)]
pub struct ArticleFetcher {
    client: Client,
}

impl ArticleFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

impl Fetch for ArticleFetcher {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        debug!(bytes = body.len(), "Downloaded page");

        let text = clean_html(&body);
        info!(chars = text.chars().count(), "Parsed article");
        Ok(text)
    }
}

/// Strip noise elements and return paragraph text joined by newlines.
///
/// Text nodes inside a paragraph are trimmed and joined with a single space;
/// paragraphs with no text are dropped.
pub fn clean_html(html: &str) -> String {
    let mut document = Html::parse_document(html);

    let noise: Vec<_> = document.select(&NOISE_SELECTOR).map(|el| el.id()).collect();
    for id in noise {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }

    // Detached nodes stay in the arena; walk from the root to skip them.
    document
        .root_element()
        .select(&PARAGRAPH_SELECTOR)
        .map(|p| {
            p.text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
