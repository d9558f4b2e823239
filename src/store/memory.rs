//! In-memory quote store

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{QuoteQuery, QuoteStore};
use crate::error::StoreError;
use crate::quote::{Quote, QuoteId};

/// Local-only store keyed by quote identity
#[derive(Debug, Clone, Default)]
pub struct MemoryQuoteStore {
    quotes: Arc<RwLock<HashMap<QuoteId, Quote>>>,
}

impl MemoryQuoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.quotes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.quotes.read().await.is_empty()
    }

    pub async fn get(&self, id: &QuoteId) -> Option<Quote> {
        self.quotes.read().await.get(id).cloned()
    }
}

#[async_trait]
impl QuoteStore for MemoryQuoteStore {
    async fn create(&self, quote: Quote) -> Result<Quote, StoreError> {
        let id = quote.id();
        let mut quotes = self.quotes.write().await;
        if quotes.contains_key(&id) {
            return Err(StoreError::Duplicate(id));
        }
        quotes.insert(id, quote.clone());
        Ok(quote)
    }

    async fn list(&self, query: &QuoteQuery) -> Result<Vec<Quote>, StoreError> {
        let quotes = self.quotes.read().await;
        let mut matching: Vec<Quote> = quotes.values().filter(|q| query.matches(q)).cloned().collect();
        matching.sort_by_key(|q| q.created_at);
        Ok(matching)
    }

    async fn update(&self, quote: Quote) -> Result<Quote, StoreError> {
        let id = quote.id();
        let mut quotes = self.quotes.write().await;
        match quotes.get_mut(&id) {
            Some(existing) => {
                *existing = quote.clone();
                Ok(quote)
            }
            None => Err(StoreError::NotFound(id)),
        }
    }

    async fn delete(&self, quote: &Quote) -> Result<(), StoreError> {
        let id = quote.id();
        match self.quotes.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(id)),
        }
    }
}
