//! The source catalog: a durable, URL-unique registry of every source ever
//! ingested.
//!
//! Deduplication contract: the URL is the sole dedup key. `add_source` is
//! idempotent by URL — if a row with the URL exists, the existing record is
//! returned unchanged and the incoming record's other fields are ignored.
//! The constraint lives in the storage layer, not application logic, so the
//! check-then-insert stays correct under concurrent writers.

pub mod memory;
pub mod sqlite;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::CatalogResult;
use crate::types::Source;

pub use memory::MemoryCatalog;
pub use sqlite::SqliteCatalog;

/// Aggregate counts over the whole catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogStats {
    pub total_sources: usize,
    pub by_type: BTreeMap<String, usize>,
    pub primary_sources: usize,
    pub secondary_sources: usize,
}

/// Persistent, URL-indexed source registry.
#[async_trait]
pub trait SourceCatalog: Send + Sync {
    /// Insert a source, idempotently by URL.
    ///
    /// Returns the stored record: the freshly inserted one, or the existing
    /// row when the URL was already cataloged. Storage failures are fatal
    /// for the operation — a write that errors is not persisted.
    async fn add_source(&self, source: &Source) -> CatalogResult<Source>;

    async fn get_by_url(&self, url: &str) -> CatalogResult<Option<Source>>;

    async fn get_by_id(&self, source_id: &str) -> CatalogResult<Option<Source>>;

    /// Resolve many IDs at once; absent IDs are simply missing from the map.
    async fn get_by_ids(&self, source_ids: &[String]) -> CatalogResult<BTreeMap<String, Source>>;

    /// Backfill the stored content path on an existing row.
    ///
    /// The single permitted mutation of a cataloged source, used when an
    /// artifact is re-persisted after the filesystem drifted from the
    /// catalog.
    async fn update_stored_content_path(&self, source_id: &str, path: &str) -> CatalogResult<()>;

    async fn stats(&self) -> CatalogResult<CatalogStats>;
}
