//! TTL-bound cache for reference content (articles and tips).
//!
//! Rows are keyed by remote id, so a refresh overwrites rather than
//! accumulates. Every write stamps `expires_at = now + ttl`; reads hide
//! expired rows unless asked not to, which lets the UI fall back to stale
//! content when a refresh fails.

use std::time::Duration;

use rusqlite::types::Type;
use rusqlite::{Connection, Row, params, params_from_iter};
use tracing::debug;

use crate::clock::duration_millis;
use crate::error::StoreError;
use crate::model::{Article, Tip};
use crate::storage::Database;

/// Default time-to-live for cached content.
pub const DEFAULT_CONTENT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Read filter for cached content.
#[derive(Debug, Clone, Default)]
pub struct ContentFilter {
    pub category: Option<String>,
    /// Include rows whose `expires_at` has passed
    pub include_expired: bool,
}

impl ContentFilter {
    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn include_expired(mut self, include: bool) -> Self {
        self.include_expired = include;
        self
    }
}

/// A content type that can live in the cache.
pub trait CachedItem: Sized + Send + 'static {
    /// Backing table.
    const TABLE: &'static str;
    /// Column list, `expires_at` last.
    const COLUMNS: &'static str;
    /// ORDER BY clause for reads.
    const ORDER_BY: &'static str;

    /// Insert or replace this item with the given expiry.
    fn write(&self, conn: &Connection, expires_at: i64) -> Result<(), StoreError>;

    /// Build an item from a row selected with [`Self::COLUMNS`].
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

impl CachedItem for Article {
    const TABLE: &'static str = "cached_articles";
    const COLUMNS: &'static str =
        "id, title, summary, body, category, tags, image_url, published_at, expires_at";
    const ORDER_BY: &'static str = "published_at DESC, title ASC";

    fn write(&self, conn: &Connection, expires_at: i64) -> Result<(), StoreError> {
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {} ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                Self::TABLE,
                Self::COLUMNS
            ),
            params![
                self.id,
                self.title,
                self.summary,
                self.body,
                self.category,
                serde_json::to_string(&self.tags)?,
                self.image_url,
                self.published_at,
                expires_at,
            ],
        )?;
        Ok(())
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            summary: row.get(2)?,
            body: row.get(3)?,
            category: row.get(4)?,
            tags: parse_tags(row, 5)?,
            image_url: row.get(6)?,
            published_at: row.get(7)?,
            expires_at: row.get(8)?,
        })
    }
}

impl CachedItem for Tip {
    const TABLE: &'static str = "cached_tips";
    const COLUMNS: &'static str = "id, title, body, category, week, tags, expires_at";
    const ORDER_BY: &'static str = "week ASC, title ASC";

    fn write(&self, conn: &Connection, expires_at: i64) -> Result<(), StoreError> {
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {} ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                Self::TABLE,
                Self::COLUMNS
            ),
            params![
                self.id,
                self.title,
                self.body,
                self.category,
                self.week,
                serde_json::to_string(&self.tags)?,
                expires_at,
            ],
        )?;
        Ok(())
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            body: row.get(2)?,
            category: row.get(3)?,
            week: row.get(4)?,
            tags: parse_tags(row, 5)?,
            expires_at: row.get(6)?,
        })
    }
}

fn parse_tags(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Cache of remote reference content.
#[derive(Debug, Clone)]
pub struct ContentCache {
    db: Database,
}

impl ContentCache {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Write a batch sharing one expiry of `now + ttl`.
    ///
    /// # Errors
    ///
    /// Returns an error if any write fails; none are applied then.
    pub async fn cache_items<T: CachedItem>(&self, items: Vec<T>, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = self.db.clock().now_millis().saturating_add(duration_millis(ttl));
        let count = items.len();
        self.db
            .call(move |conn| {
                let tx = conn.transaction()?;
                for item in &items {
                    item.write(&tx, expires_at)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await?;
        debug!(table = T::TABLE, count, expires_at, "Cached content batch");
        Ok(())
    }

    /// Cached items matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_items<T: CachedItem>(&self, filter: ContentFilter) -> Result<Vec<T>, StoreError> {
        let now = self.db.clock().now_millis();
        self.db
            .call(move |conn| {
                let mut clauses = Vec::new();
                let mut values: Vec<rusqlite::types::Value> = Vec::new();
                if let Some(category) = filter.category {
                    clauses.push("category = ?");
                    values.push(category.into());
                }
                if !filter.include_expired {
                    clauses.push("(expires_at IS NULL OR expires_at >= ?)");
                    values.push(now.into());
                }
                let where_sql = if clauses.is_empty() {
                    String::new()
                } else {
                    format!("WHERE {}", clauses.join(" AND "))
                };

                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM {} {where_sql} ORDER BY {}",
                    T::COLUMNS,
                    T::TABLE,
                    T::ORDER_BY
                ))?;
                let items = stmt
                    .query_map(params_from_iter(values.iter()), T::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(items)
            })
            .await
    }

    /// Delete rows whose expiry has passed, in both tables. Rows without an
    /// expiry are never purged. Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub async fn purge_expired(&self) -> Result<usize, StoreError> {
        let now = self.db.clock().now_millis();
        let purged = self
            .db
            .call(move |conn| {
                let mut purged = 0;
                for table in [Article::TABLE, Tip::TABLE] {
                    purged += conn.execute(
                        &format!("DELETE FROM {table} WHERE expires_at IS NOT NULL AND expires_at < ?1"),
                        [now],
                    )?;
                }
                Ok(purged)
            })
            .await?;
        debug!(purged, "Purged expired content");
        Ok(purged)
    }

    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn cache_articles(&self, articles: Vec<Article>, ttl: Duration) -> Result<(), StoreError> {
        self.cache_items(articles, ttl).await
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_cached_articles(&self, filter: ContentFilter) -> Result<Vec<Article>, StoreError> {
        self.get_items(filter).await
    }

    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn cache_tips(&self, tips: Vec<Tip>, ttl: Duration) -> Result<(), StoreError> {
        self.cache_items(tips, ttl).await
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_cached_tips(&self, filter: ContentFilter) -> Result<Vec<Tip>, StoreError> {
        self.get_items(filter).await
    }
}
