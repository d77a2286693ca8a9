//! Article fetching.
//!
//! A [`Fetch`] implementation turns a URL into cleaned paragraph text. The
//! batch driver only depends on this trait, so tests can substitute canned
//! pages for the network.
//!
//! - [`article`]: HTTP fetcher plus the HTML cleaning pass

pub mod article;

use crate::errors::FetchError;

/// Retrieve a URL and return its paragraph text, one paragraph per line.
pub trait Fetch {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}
