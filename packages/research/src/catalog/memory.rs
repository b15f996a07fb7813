//! In-memory source catalog.
//!
//! Same contract as the SQLite catalog, held in a map behind a lock. Useful
//! for tests and single-run pipelines that don't need durability.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::CatalogResult;
use crate::types::Source;

use super::{CatalogStats, SourceCatalog};

/// In-memory catalog keyed by URL.
#[derive(Default)]
pub struct MemoryCatalog {
    by_url: RwLock<BTreeMap<String, Source>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SourceCatalog for MemoryCatalog {
    async fn add_source(&self, source: &Source) -> CatalogResult<Source> {
        let mut by_url = self.by_url.write().expect("catalog lock poisoned");
        // Single map operation keeps check-then-insert atomic under the lock.
        let stored = by_url
            .entry(source.url.clone())
            .or_insert_with(|| source.clone());
        Ok(stored.clone())
    }

    async fn get_by_url(&self, url: &str) -> CatalogResult<Option<Source>> {
        let by_url = self.by_url.read().expect("catalog lock poisoned");
        Ok(by_url.get(url).cloned())
    }

    async fn get_by_id(&self, source_id: &str) -> CatalogResult<Option<Source>> {
        let by_url = self.by_url.read().expect("catalog lock poisoned");
        Ok(by_url.values().find(|s| s.source_id == source_id).cloned())
    }

    async fn get_by_ids(&self, source_ids: &[String]) -> CatalogResult<BTreeMap<String, Source>> {
        let by_url = self.by_url.read().expect("catalog lock poisoned");
        Ok(by_url
            .values()
            .filter(|s| source_ids.contains(&s.source_id))
            .map(|s| (s.source_id.clone(), s.clone()))
            .collect())
    }

    async fn update_stored_content_path(&self, source_id: &str, path: &str) -> CatalogResult<()> {
        let mut by_url = self.by_url.write().expect("catalog lock poisoned");
        if let Some(source) = by_url.values_mut().find(|s| s.source_id == source_id) {
            source.stored_content_path = Some(path.to_string());
        }
        Ok(())
    }

    async fn stats(&self) -> CatalogResult<CatalogStats> {
        let by_url = self.by_url.read().expect("catalog lock poisoned");

        let mut by_type: BTreeMap<String, usize> = BTreeMap::new();
        let mut primary = 0usize;
        for source in by_url.values() {
            *by_type
                .entry(source.source_type.as_str().to_string())
                .or_insert(0) += 1;
            if source.is_primary_source {
                primary += 1;
            }
        }

        let total = by_url.len();
        Ok(CatalogStats {
            total_sources: total,
            by_type,
            primary_sources: primary,
            secondary_sources: total - primary,
        })
    }
}
