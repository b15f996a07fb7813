//! SQLite-backed source catalog.
//!
//! A single `sources` table with a unique index on `url`. `add_source` uses
//! `INSERT ... ON CONFLICT(url) DO NOTHING` followed by a read-back, so the
//! uniqueness check and the insert are atomic at the storage layer and a
//! losing concurrent writer receives the winning row.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::error::{CatalogError, CatalogResult};
use crate::types::{Source, SourceType};

use super::{CatalogStats, SourceCatalog};

/// SQLite-based source catalog.
pub struct SqliteCatalog {
    pool: SqlitePool,
}

impl SqliteCatalog {
    /// Create a catalog with the given connection URL.
    ///
    /// # Example URLs
    /// - `sqlite::memory:` - In-memory database (ephemeral)
    /// - `sqlite://data/sources.db?mode=rwc` - Create if not exists
    pub async fn new(database_url: &str) -> CatalogResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(CatalogError::storage)?;

        let catalog = Self { pool };
        catalog.run_migrations().await?;
        Ok(catalog)
    }

    /// Create an in-memory catalog (for testing).
    ///
    /// A single connection: every pooled connection to `:memory:` would
    /// otherwise get its own empty database.
    pub async fn in_memory() -> CatalogResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(CatalogError::storage)?;

        let catalog = Self { pool };
        catalog.run_migrations().await?;
        Ok(catalog)
    }

    async fn run_migrations(&self) -> CatalogResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sources (
                source_id TEXT PRIMARY KEY,
                type TEXT NOT NULL,
                title TEXT NOT NULL,
                authors TEXT NOT NULL DEFAULT '',
                publication TEXT,
                publication_date TEXT,
                url TEXT NOT NULL UNIQUE,
                doi TEXT,
                isbn TEXT,
                retrieved_at TEXT NOT NULL,
                credibility_score REAL NOT NULL DEFAULT 0.5,
                is_primary_source INTEGER NOT NULL DEFAULT 0,
                stored_content_path TEXT,
                content_hash TEXT,
                is_manual INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_sources_url ON sources(url);
            CREATE INDEX IF NOT EXISTS idx_sources_hash ON sources(content_hash);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(CatalogError::storage)?;

        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn row_to_source(row: &sqlx::sqlite::SqliteRow) -> CatalogResult<Source> {
        let retrieved_at = chrono::DateTime::parse_from_rfc3339(row.get("retrieved_at"))
            .map_err(CatalogError::storage)?
            .with_timezone(&chrono::Utc);

        let authors_raw: String = row.get("authors");
        let authors: Vec<String> = authors_raw
            .split(',')
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();

        let type_tag: String = row.get("type");

        Ok(Source {
            source_id: row.get("source_id"),
            source_type: SourceType::parse(&type_tag),
            title: row.get("title"),
            authors,
            publication: row.get("publication"),
            publication_date: row.get("publication_date"),
            url: row.get("url"),
            doi: row.get("doi"),
            isbn: row.get("isbn"),
            retrieved_at,
            credibility_score: row.get("credibility_score"),
            is_primary_source: row.get::<i64, _>("is_primary_source") != 0,
            content_hash: row.get("content_hash"),
            stored_content_path: row.get("stored_content_path"),
            is_manual: row.get::<i64, _>("is_manual") != 0,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT source_id, type, title, authors, publication, publication_date,
           url, doi, isbn, retrieved_at, credibility_score, is_primary_source,
           stored_content_path, content_hash, is_manual
    FROM sources
"#;

#[async_trait]
impl SourceCatalog for SqliteCatalog {
    async fn add_source(&self, source: &Source) -> CatalogResult<Source> {
        let authors_joined = source.authors.join(",");

        // The unique constraint on url is the dedup invariant; a conflicting
        // insert is a no-op and the read-back returns whichever row won.
        sqlx::query(
            r#"
            INSERT INTO sources (
                source_id, type, title, authors, publication, publication_date,
                url, doi, isbn, retrieved_at, credibility_score, is_primary_source,
                stored_content_path, content_hash, is_manual
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT(url) DO NOTHING
            "#,
        )
        .bind(&source.source_id)
        .bind(source.source_type.as_str())
        .bind(&source.title)
        .bind(&authors_joined)
        .bind(&source.publication)
        .bind(&source.publication_date)
        .bind(&source.url)
        .bind(&source.doi)
        .bind(&source.isbn)
        .bind(source.retrieved_at.to_rfc3339())
        .bind(source.credibility_score)
        .bind(source.is_primary_source as i64)
        .bind(&source.stored_content_path)
        .bind(&source.content_hash)
        .bind(source.is_manual as i64)
        .execute(&self.pool)
        .await
        .map_err(CatalogError::storage)?;

        self.get_by_url(&source.url)
            .await?
            .ok_or_else(|| CatalogError::ReadBack {
                url: source.url.clone(),
            })
    }

    async fn get_by_url(&self, url: &str) -> CatalogResult<Option<Source>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE url = $1"))
            .bind(url)
            .fetch_optional(&self.pool)
            .await
            .map_err(CatalogError::storage)?;

        row.as_ref().map(Self::row_to_source).transpose()
    }

    async fn get_by_id(&self, source_id: &str) -> CatalogResult<Option<Source>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE source_id = $1"))
            .bind(source_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(CatalogError::storage)?;

        row.as_ref().map(Self::row_to_source).transpose()
    }

    async fn get_by_ids(&self, source_ids: &[String]) -> CatalogResult<BTreeMap<String, Source>> {
        if source_ids.is_empty() {
            return Ok(BTreeMap::new());
        }

        let placeholders = (1..=source_ids.len())
            .map(|i| format!("${i}"))
            .collect::<Vec<_>>()
            .join(",");
        let query_str = format!("{SELECT_COLUMNS} WHERE source_id IN ({placeholders})");

        let mut query = sqlx::query(&query_str);
        for id in source_ids {
            query = query.bind(id);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(CatalogError::storage)?;

        let mut result = BTreeMap::new();
        for row in &rows {
            let source = Self::row_to_source(row)?;
            result.insert(source.source_id.clone(), source);
        }
        Ok(result)
    }

    async fn update_stored_content_path(&self, source_id: &str, path: &str) -> CatalogResult<()> {
        sqlx::query("UPDATE sources SET stored_content_path = $1 WHERE source_id = $2")
            .bind(path)
            .bind(source_id)
            .execute(&self.pool)
            .await
            .map_err(CatalogError::storage)?;
        Ok(())
    }

    async fn stats(&self) -> CatalogResult<CatalogStats> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS n FROM sources")
            .fetch_one(&self.pool)
            .await
            .map_err(CatalogError::storage)?
            .get("n");

        let type_rows = sqlx::query("SELECT type, COUNT(*) AS n FROM sources GROUP BY type")
            .fetch_all(&self.pool)
            .await
            .map_err(CatalogError::storage)?;

        let by_type: BTreeMap<String, usize> = type_rows
            .into_iter()
            .map(|row| (row.get::<String, _>("type"), row.get::<i64, _>("n") as usize))
            .collect();

        let primary: i64 =
            sqlx::query("SELECT COUNT(*) AS n FROM sources WHERE is_primary_source = 1")
                .fetch_one(&self.pool)
                .await
                .map_err(CatalogError::storage)?
                .get("n");

        Ok(CatalogStats {
            total_sources: total as usize,
            by_type,
            primary_sources: primary as usize,
            secondary_sources: (total - primary) as usize,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::source_id;

    fn sample_source(url: &str, title: &str) -> Source {
        Source::new(source_id(url, "src"), SourceType::Wikipedia, title, url)
            .with_authors(vec!["Wikipedia contributors".to_string()])
            .with_credibility(0.75)
    }

    #[tokio::test]
    async fn test_add_source_round_trip() {
        let catalog = SqliteCatalog::in_memory().await.unwrap();
        let source = sample_source("https://en.wikipedia.org/wiki/Isaac_Newton", "Isaac Newton");

        let stored = catalog.add_source(&source).await.unwrap();
        assert_eq!(stored.source_id, source.source_id);
        assert_eq!(stored.url, source.url);
        assert_eq!(stored.authors, source.authors);

        let by_id = catalog.get_by_id(&source.source_id).await.unwrap().unwrap();
        assert_eq!(by_id.title, "Isaac Newton");
    }

    #[tokio::test]
    async fn test_add_source_dedup_by_url() {
        let catalog = SqliteCatalog::in_memory().await.unwrap();
        let url = "https://en.wikipedia.org/wiki/Isaac_Newton";

        let first = sample_source(url, "Isaac Newton");
        let stored_first = catalog.add_source(&first).await.unwrap();

        // Same URL, every other field different
        let mut second = Source::new("other_id", SourceType::AcademicPaper, "Different title", url)
            .with_credibility(0.95)
            .with_primary(true);
        second.is_manual = true;

        let stored_second = catalog.add_source(&second).await.unwrap();

        assert_eq!(stored_second.source_id, stored_first.source_id);
        assert_eq!(stored_second.title, "Isaac Newton");
        assert_eq!(stored_second.source_type, SourceType::Wikipedia);
        assert!(!stored_second.is_manual);

        let stats = catalog.stats().await.unwrap();
        assert_eq!(stats.total_sources, 1);
    }

    #[tokio::test]
    async fn test_get_by_ids() {
        let catalog = SqliteCatalog::in_memory().await.unwrap();
        let a = catalog
            .add_source(&sample_source("https://example.com/a", "A"))
            .await
            .unwrap();
        let b = catalog
            .add_source(&sample_source("https://example.com/b", "B"))
            .await
            .unwrap();

        let ids = vec![
            a.source_id.clone(),
            b.source_id.clone(),
            "missing_id".to_string(),
        ];
        let found = catalog.get_by_ids(&ids).await.unwrap();

        assert_eq!(found.len(), 2);
        assert!(found.contains_key(&a.source_id));
        assert!(found.contains_key(&b.source_id));
        assert!(!found.contains_key("missing_id"));
    }

    #[tokio::test]
    async fn test_stats_counts() {
        let catalog = SqliteCatalog::in_memory().await.unwrap();
        catalog
            .add_source(&sample_source("https://example.com/w", "W"))
            .await
            .unwrap();

        let paper = Source::new(
            source_id("https://example.com/p", "scholar"),
            SourceType::AcademicPaper,
            "P",
            "https://example.com/p",
        )
        .with_primary(true);
        catalog.add_source(&paper).await.unwrap();

        let stats = catalog.stats().await.unwrap();
        assert_eq!(stats.total_sources, 2);
        assert_eq!(stats.by_type.get("wikipedia"), Some(&1));
        assert_eq!(stats.by_type.get("academic_paper"), Some(&1));
        assert_eq!(stats.primary_sources, 1);
        assert_eq!(stats.secondary_sources, 1);
    }

    #[tokio::test]
    async fn test_update_stored_content_path() {
        let catalog = SqliteCatalog::in_memory().await.unwrap();
        let stored = catalog
            .add_source(&sample_source("https://example.com/x", "X"))
            .await
            .unwrap();
        assert!(stored.stored_content_path.is_none());

        catalog
            .update_stored_content_path(&stored.source_id, "rawSources/X_Q1/wikipedia/content.txt")
            .await
            .unwrap();

        let reread = catalog.get_by_id(&stored.source_id).await.unwrap().unwrap();
        assert_eq!(
            reread.stored_content_path.as_deref(),
            Some("rawSources/X_Q1/wikipedia/content.txt")
        );
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let catalog = SqliteCatalog::in_memory().await.unwrap();
        assert!(catalog.get_by_url("https://nope").await.unwrap().is_none());
        assert!(catalog.get_by_id("nope").await.unwrap().is_none());
    }
}
