//! Quote persistence
//!
//! The engine talks to persistence only through [`QuoteStore`]. Two
//! implementations ship with the crate: an in-memory store for local-only
//! quotes and tests, and a SQLite repository.

mod memory;
mod sqlite;

pub use memory::MemoryQuoteStore;
pub use sqlite::SqliteQuoteStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::quote::{normalize_url, Quote};

/// Kind of quote to list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Any,
    /// Quotes without a comment
    Highlight,
    /// Quotes carrying a comment
    Note,
}

impl ContentType {
    pub fn matches(&self, quote: &Quote) -> bool {
        match self {
            ContentType::Any => true,
            ContentType::Highlight => !quote.has_comment(),
            ContentType::Note => quote.has_comment(),
        }
    }
}

/// Filters for listing quotes
#[derive(Debug, Clone, Default)]
pub struct QuoteQuery {
    /// Page URL; compared after normalization
    pub url: Option<String>,
    pub content_type: ContentType,
}

impl QuoteQuery {
    /// Quotes captured on the page at `url`
    pub fn for_page(url: &str) -> Self {
        Self {
            url: Some(url.to_string()),
            ..Default::default()
        }
    }

    pub fn matches(&self, quote: &Quote) -> bool {
        let url_matches = self
            .url
            .as_deref()
            .map(|url| normalize_url(url) == quote.normalized_url())
            .unwrap_or(true);
        url_matches && self.content_type.matches(quote)
    }
}

/// Persistence collaborator
#[async_trait]
pub trait QuoteStore: Send + Sync {
    /// Persist a new quote and return it as stored
    async fn create(&self, quote: Quote) -> Result<Quote, StoreError>;

    /// Quotes matching `query`, oldest first
    async fn list(&self, query: &QuoteQuery) -> Result<Vec<Quote>, StoreError>;

    /// Replace the mutable fields of an existing quote
    async fn update(&self, quote: Quote) -> Result<Quote, StoreError>;

    /// Remove a quote
    async fn delete(&self, quote: &Quote) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::Color;

    #[test]
    fn test_query_matching() {
        let quote = Quote::captured_at("https://x.com/a?x=1#frag", vec!["t".into()], Color::Pink, 1).unwrap();
        let noted = quote.clone().with_comment("note");

        assert!(QuoteQuery::for_page("https://x.com/a").matches(&quote));
        assert!(!QuoteQuery::for_page("https://x.com/b").matches(&quote));
        assert!(QuoteQuery::default().matches(&quote));

        let notes = QuoteQuery {
            content_type: ContentType::Note,
            ..Default::default()
        };
        assert!(!notes.matches(&quote));
        assert!(notes.matches(&noted));
        assert!(ContentType::Highlight.matches(&quote));
    }
}
