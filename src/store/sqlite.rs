//! SQLite storage for quotes
//!
//! One row per quote, keyed by the quote identity. Contents, locators and
//! the note reference are stored as JSON columns; the normalized page URL
//! gets its own indexed column for page lookups.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::debug;

use super::{ContentType, QuoteQuery, QuoteStore};
use crate::error::StoreError;
use crate::quote::{normalize_url, Color, Quote};

/// Repository for quote persistence
#[derive(Debug, Clone)]
pub struct SqliteQuoteStore {
    pool: SqlitePool,
}

impl SqliteQuoteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `url` and initialize it
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        // Every connection to an in-memory database gets its own database
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        let store = Self::new(pool);
        store.init().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the quotes table
    pub async fn init(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS quotes (
                id TEXT PRIMARY KEY,
                source_url TEXT NOT NULL,
                page_url TEXT NOT NULL,
                contents_json TEXT NOT NULL,
                locators_json TEXT,
                comment TEXT NOT NULL DEFAULT '',
                color TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                note_json TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_quotes_page ON quotes(page_url);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Count quotes captured on a page
    pub async fn count_for_url(&self, url: &str) -> Result<i64, StoreError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM quotes WHERE page_url = ?")
            .bind(normalize_url(url))
            .fetch_one(&self.pool)
            .await?;

        Ok(row.0)
    }

    async fn exists(&self, id: &str) -> Result<bool, StoreError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM quotes WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.0 > 0)
    }
}

#[async_trait]
impl QuoteStore for SqliteQuoteStore {
    async fn create(&self, quote: Quote) -> Result<Quote, StoreError> {
        let id = quote.id();
        if self.exists(id.as_str()).await? {
            return Err(StoreError::Duplicate(id));
        }

        let contents_json = serde_json::to_string(&quote.contents)?;
        let locators_json = quote.locators.as_ref().map(serde_json::to_string).transpose()?;
        let note_json = quote.note.as_ref().map(serde_json::to_string).transpose()?;

        sqlx::query(
            r#"
            INSERT INTO quotes (
                id, source_url, page_url, contents_json, locators_json,
                comment, color, created_at, note_json
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.as_str())
        .bind(&quote.source_url)
        .bind(quote.normalized_url())
        .bind(&contents_json)
        .bind(&locators_json)
        .bind(&quote.comment)
        .bind(quote.color.as_str())
        .bind(quote.created_at)
        .bind(&note_json)
        .execute(&self.pool)
        .await?;

        debug!(id = %id, "quote stored");
        Ok(quote)
    }

    async fn list(&self, query: &QuoteQuery) -> Result<Vec<Quote>, StoreError> {
        let mut sql = String::from(
            r#"
            SELECT id, source_url, contents_json, locators_json,
                   comment, color, created_at, note_json
            FROM quotes
            WHERE 1=1
            "#,
        );

        if query.url.is_some() {
            sql.push_str(" AND page_url = ?");
        }
        match query.content_type {
            ContentType::Any => {}
            ContentType::Highlight => sql.push_str(" AND TRIM(comment) = ''"),
            ContentType::Note => sql.push_str(" AND TRIM(comment) != ''"),
        }
        sql.push_str(" ORDER BY created_at ASC");

        let mut q = sqlx::query_as::<_, QuoteRow>(&sql);
        if let Some(ref url) = query.url {
            q = q.bind(normalize_url(url));
        }

        let rows = q.fetch_all(&self.pool).await?;

        rows.into_iter().map(|r| r.into_quote()).collect()
    }

    async fn update(&self, quote: Quote) -> Result<Quote, StoreError> {
        let id = quote.id();
        let locators_json = quote.locators.as_ref().map(serde_json::to_string).transpose()?;
        let note_json = quote.note.as_ref().map(serde_json::to_string).transpose()?;

        let result = sqlx::query(
            r#"
            UPDATE quotes
            SET source_url = ?, locators_json = ?, comment = ?, note_json = ?
            WHERE id = ?
            "#,
        )
        .bind(&quote.source_url)
        .bind(&locators_json)
        .bind(&quote.comment)
        .bind(&note_json)
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(quote)
    }

    async fn delete(&self, quote: &Quote) -> Result<(), StoreError> {
        let id = quote.id();
        let result = sqlx::query("DELETE FROM quotes WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

/// Database row representation
#[derive(sqlx::FromRow)]
struct QuoteRow {
    id: String,
    source_url: String,
    contents_json: String,
    locators_json: Option<String>,
    comment: String,
    color: String,
    created_at: i64,
    note_json: Option<String>,
}

impl QuoteRow {
    fn into_quote(self) -> Result<Quote, StoreError> {
        let contents = serde_json::from_str(&self.contents_json)?;
        let locators = self
            .locators_json
            .map(|s| serde_json::from_str(&s))
            .transpose()?;
        let note = self.note_json.map(|s| serde_json::from_str(&s)).transpose()?;

        let color = Color::parse(&self.color).unwrap_or_else(|| {
            debug!(id = %self.id, color = %self.color, "unknown stored color");
            Color::default()
        });

        Ok(Quote {
            source_url: self.source_url,
            contents,
            locators,
            comment: self.comment,
            color,
            created_at: self.created_at,
            note,
        })
    }
}
