//! Source aggregation: fetchers + catalog + on-disk artifacts for one entity.
//!
//! The aggregator enforces the dedup invariant end to end: every candidate is
//! checked against the catalog by URL before a new row is created, and
//! catalog rows whose on-disk artifacts have drifted away are repaired
//! without re-inserting. A family that fails outright costs the entity that
//! family's sources, nothing more.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::catalog::SourceCatalog;
use crate::error::Result;
use crate::fetchers::{FetchedDocument, SourceFetcher};
use crate::ident::content_hash;
use crate::layout::{SourceFamily, StorageLayout};
use crate::types::{KgEntity, Source};

/// Default number of candidates requested per paper family.
pub const DEFAULT_MAX_RESULTS: usize = 3;

pub struct SourceAggregator {
    catalog: Arc<dyn SourceCatalog>,
    layout: StorageLayout,
    fetchers: Vec<Box<dyn SourceFetcher>>,
    max_results_per_family: usize,
}

impl SourceAggregator {
    pub fn new(catalog: Arc<dyn SourceCatalog>, layout: StorageLayout) -> Self {
        Self {
            catalog,
            layout,
            fetchers: Vec::new(),
            max_results_per_family: DEFAULT_MAX_RESULTS,
        }
    }

    /// Register a fetcher; families run in registration order.
    pub fn with_fetcher(mut self, fetcher: Box<dyn SourceFetcher>) -> Self {
        self.fetchers.push(fetcher);
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results_per_family = max_results;
        self
    }

    pub fn catalog(&self) -> &Arc<dyn SourceCatalog> {
        &self.catalog
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Fetch all available sources for an entity.
    ///
    /// Returns `(Source, extracted text)` pairs in family-then-candidate
    /// order. Ordering beyond that is not guaranteed across runs.
    pub async fn fetch_for_entity(&self, entity: &KgEntity) -> Result<Vec<(Source, String)>> {
        let mut results: Vec<(Source, String)> = Vec::new();

        for fetcher in &self.fetchers {
            let family = fetcher.family();

            // Singleton families have a predictable URL, so the catalog can
            // short-circuit the network fetch entirely when the artifacts
            // are intact.
            if family.is_singleton() {
                if let Some(url) = entity.wikipedia_url.as_deref() {
                    match self.read_cached(url).await {
                        Ok(Some(cached)) => {
                            info!(url = %url, source_id = %cached.0.source_id,
                                "source already cataloged with intact artifacts");
                            results.push(cached);
                            continue;
                        }
                        Ok(None) => {}
                        Err(e) => {
                            warn!(url = %url, error = %e, "cached lookup failed, refetching");
                        }
                    }
                }
            }

            match fetcher.fetch(entity, self.max_results_per_family).await {
                Ok(outcome) => {
                    for skip in &outcome.skipped {
                        debug!(family = %family, reason = %skip, "candidate skipped");
                    }
                    for document in outcome.documents {
                        let url = document.source.url.clone();
                        match self.store_document(entity, family, document).await {
                            Ok(pair) => results.push(pair),
                            Err(e) => {
                                warn!(family = %family, url = %url, error = %e,
                                    "failed to persist document");
                            }
                        }
                    }
                }
                Err(e) => {
                    // A whole family failing is a degraded-quality outcome
                    // for the entity, not a pipeline abort.
                    warn!(family = %family, entity = %entity.label, error = %e,
                        "family fetch failed entirely");
                }
            }
        }

        info!(entity = %entity.label, count = results.len(), "aggregated sources");
        Ok(results)
    }

    /// Return a cataloged source with its stored content, but only when both
    /// the content file and the raw artifact are still on disk.
    async fn read_cached(&self, url: &str) -> Result<Option<(Source, String)>> {
        let Some(existing) = self.catalog.get_by_url(url).await? else {
            return Ok(None);
        };
        let Some(rel) = existing.stored_content_path.as_deref() else {
            return Ok(None);
        };

        let content_path = self.layout.resolve(rel);
        let Some(source_dir) = content_path.parent() else {
            return Ok(None);
        };

        if !artifact_present(source_dir.to_path_buf()) {
            debug!(url = %url, "raw artifact missing, will repair");
            return Ok(None);
        }

        match std::fs::read_to_string(&content_path) {
            Ok(content) => Ok(Some((existing, content))),
            Err(e) => {
                debug!(url = %url, error = %e, "stored content unreadable, will refetch");
                Ok(None)
            }
        }
    }

    /// Persist one fetched document, deduplicating by URL.
    ///
    /// A catalog hit repairs any missing artifacts in place and returns the
    /// existing record; a miss writes the full artifact set and inserts.
    async fn store_document(
        &self,
        entity: &KgEntity,
        family: SourceFamily,
        document: FetchedDocument,
    ) -> Result<(Source, String)> {
        if let Some(existing) = self.catalog.get_by_url(&document.source.url).await? {
            info!(source_id = %existing.source_id, url = %existing.url,
                "source already cataloged");
            let repaired = self.repair_artifacts(entity, family, existing, &document).await?;
            return Ok((repaired, document.content));
        }

        let entity_dir = self.layout.entity_dir(&entity.label, &entity.id)?;
        let source_dir = self.layout.allocate_source_dir(&entity_dir, family)?;

        let content_path = source_dir.join("content.txt");
        std::fs::write(&content_path, &document.content)?;

        let original_path = source_dir.join(format!("original.{}", document.raw_extension));
        std::fs::write(&original_path, &document.raw)?;

        let mut source = document.source;
        source.content_hash = Some(content_hash(&document.content));
        source.is_manual = false;
        source.stored_content_path = Some(self.layout.relative_to_data_dir(&content_path));

        std::fs::write(
            source_dir.join("metadata.json"),
            serde_json::to_string_pretty(&source)?,
        )?;

        // The unique constraint decides; under a concurrent writer the row
        // that won is the one we hand back.
        let stored = self.catalog.add_source(&source).await?;
        info!(source_id = %stored.source_id, title = %stored.title, "stored new source");

        Ok((stored, document.content))
    }

    /// Rewrite whatever artifacts drifted away for an already-cataloged
    /// source. Never touches the catalog row except to backfill a missing
    /// stored-content path.
    async fn repair_artifacts(
        &self,
        entity: &KgEntity,
        family: SourceFamily,
        mut existing: Source,
        document: &FetchedDocument,
    ) -> Result<Source> {
        let source_dir = match existing.stored_content_path.as_deref() {
            Some(rel) => match self.layout.resolve(rel).parent() {
                Some(dir) => dir.to_path_buf(),
                None => self.allocate_and_backfill(entity, family, &mut existing).await?,
            },
            None => self.allocate_and_backfill(entity, family, &mut existing).await?,
        };
        std::fs::create_dir_all(&source_dir)?;

        let content_path = source_dir.join("content.txt");
        if !content_path.exists() {
            info!(source_id = %existing.source_id, "rewriting missing content file");
            std::fs::write(&content_path, &document.content)?;
        }

        let original_path = source_dir.join(format!("original.{}", document.raw_extension));
        if !original_path.exists() {
            info!(source_id = %existing.source_id, path = %original_path.display(),
                "rewriting missing raw artifact");
            std::fs::write(&original_path, &document.raw)?;
        }

        let metadata_path = source_dir.join("metadata.json");
        if !metadata_path.exists() {
            std::fs::write(&metadata_path, serde_json::to_string_pretty(&existing)?)?;
        }

        Ok(existing)
    }

    /// Allocate a directory for a row that never recorded one and backfill
    /// the catalog — the single permitted mutation of an existing record.
    async fn allocate_and_backfill(
        &self,
        entity: &KgEntity,
        family: SourceFamily,
        existing: &mut Source,
    ) -> Result<PathBuf> {
        let entity_dir = self.layout.entity_dir(&entity.label, &entity.id)?;
        let source_dir = self.layout.allocate_source_dir(&entity_dir, family)?;
        let content_path = source_dir.join("content.txt");
        let rel = self.layout.relative_to_data_dir(&content_path);

        self.catalog
            .update_stored_content_path(&existing.source_id, &rel)
            .await?;
        existing.stored_content_path = Some(rel);

        Ok(source_dir)
    }
}

/// Whether a source directory still holds its raw artifact.
fn artifact_present(source_dir: PathBuf) -> bool {
    source_dir.join("original.html").exists() || source_dir.join("original.pdf").exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::error::FetchError;
    use crate::testing::{FailingFetcher, MockFetcher};
    use crate::types::SourceType;

    fn entity() -> KgEntity {
        KgEntity {
            id: "Q935".to_string(),
            label: "Isaac Newton".to_string(),
            description: Some("English physicist".to_string()),
            aliases: Vec::new(),
            claims: serde_json::Map::new(),
            wikipedia_url: Some("https://en.wikipedia.org/wiki/Isaac_Newton".to_string()),
        }
    }

    fn wiki_document() -> FetchedDocument {
        let url = "https://en.wikipedia.org/wiki/Isaac_Newton";
        FetchedDocument {
            source: Source::new(
                crate::ident::source_id(url, "wiki"),
                SourceType::Wikipedia,
                "Isaac Newton",
                url,
            )
            .with_credibility(0.75),
            content: "Isaac Newton was an English polymath.".to_string(),
            raw: b"<html>Isaac Newton</html>".to_vec(),
            raw_extension: "html",
        }
    }

    fn aggregator(
        catalog: Arc<dyn SourceCatalog>,
        data_dir: &std::path::Path,
        fetcher: MockFetcher,
    ) -> SourceAggregator {
        SourceAggregator::new(catalog, StorageLayout::new(data_dir))
            .with_fetcher(Box::new(fetcher))
    }

    #[tokio::test]
    async fn test_new_source_persisted_and_cataloged() {
        let tmp = tempfile::tempdir().unwrap();
        let catalog: Arc<dyn SourceCatalog> = Arc::new(MemoryCatalog::new());
        let agg = aggregator(
            catalog.clone(),
            tmp.path(),
            MockFetcher::new(SourceFamily::Wikipedia).with_document(wiki_document()),
        );

        let results = agg.fetch_for_entity(&entity()).await.unwrap();
        assert_eq!(results.len(), 1);

        let (source, content) = &results[0];
        assert_eq!(content, "Isaac Newton was an English polymath.");
        assert!(source.content_hash.is_some());

        let stored_rel = source.stored_content_path.as_deref().unwrap();
        let content_path = tmp.path().join(stored_rel);
        assert!(content_path.exists());
        assert!(content_path.parent().unwrap().join("original.html").exists());
        assert!(content_path.parent().unwrap().join("metadata.json").exists());
        assert!(stored_rel.contains("Isaac_Newton_Q935/wikipedia"));

        assert_eq!(catalog.stats().await.unwrap().total_sources, 1);
    }

    #[tokio::test]
    async fn test_rerun_does_not_duplicate() {
        let tmp = tempfile::tempdir().unwrap();
        let catalog: Arc<dyn SourceCatalog> = Arc::new(MemoryCatalog::new());
        let agg = aggregator(
            catalog.clone(),
            tmp.path(),
            MockFetcher::new(SourceFamily::Wikipedia).with_document(wiki_document()),
        );

        let first = agg.fetch_for_entity(&entity()).await.unwrap();
        let second = agg.fetch_for_entity(&entity()).await.unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(first[0].0.source_id, second[0].0.source_id);
        assert_eq!(catalog.stats().await.unwrap().total_sources, 1);
    }

    #[tokio::test]
    async fn test_missing_artifact_repaired_without_new_row() {
        let tmp = tempfile::tempdir().unwrap();
        let catalog: Arc<dyn SourceCatalog> = Arc::new(MemoryCatalog::new());
        let agg = aggregator(
            catalog.clone(),
            tmp.path(),
            MockFetcher::new(SourceFamily::Wikipedia).with_document(wiki_document()),
        );

        let first = agg.fetch_for_entity(&entity()).await.unwrap();
        let stored_rel = first[0].0.stored_content_path.clone().unwrap();
        let original = tmp
            .path()
            .join(&stored_rel)
            .parent()
            .unwrap()
            .join("original.html");

        // Prune the artifact behind the catalog's back
        std::fs::remove_file(&original).unwrap();
        assert!(!original.exists());

        let second = agg.fetch_for_entity(&entity()).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].0.source_id, first[0].0.source_id);
        assert!(original.exists(), "artifact was not repaired");
        assert_eq!(catalog.stats().await.unwrap().total_sources, 1);
    }

    #[tokio::test]
    async fn test_numbered_family_gets_ordinal_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let catalog: Arc<dyn SourceCatalog> = Arc::new(MemoryCatalog::new());

        let make_doc = |n: usize| {
            let url = format!("https://example.org/paper/{n}");
            FetchedDocument {
                source: Source::new(
                    crate::ident::source_id(&url, "scholar"),
                    SourceType::AcademicPaper,
                    format!("Paper {n}"),
                    &url,
                )
                .with_credibility(0.95),
                content: format!("Abstract of paper {n}"),
                raw: format!("raw {n}").into_bytes(),
                raw_extension: "html",
            }
        };

        let agg = aggregator(
            catalog.clone(),
            tmp.path(),
            MockFetcher::new(SourceFamily::Scholar)
                .with_document(make_doc(1))
                .with_document(make_doc(2)),
        );

        let results = agg.fetch_for_entity(&entity()).await.unwrap();
        assert_eq!(results.len(), 2);

        let rel_first = results[0].0.stored_content_path.as_deref().unwrap();
        let rel_second = results[1].0.stored_content_path.as_deref().unwrap();
        assert!(rel_first.contains("scholar_001"));
        assert!(rel_second.contains("scholar_002"));
    }

    #[tokio::test]
    async fn test_family_failure_does_not_abort_entity() {
        let tmp = tempfile::tempdir().unwrap();
        let catalog: Arc<dyn SourceCatalog> = Arc::new(MemoryCatalog::new());

        let agg = SourceAggregator::new(catalog.clone(), StorageLayout::new(tmp.path()))
            .with_fetcher(Box::new(FailingFetcher::new(
                SourceFamily::Scholar,
                FetchError::Search {
                    family: "scholar",
                    message: "network down".to_string(),
                },
            )))
            .with_fetcher(Box::new(
                MockFetcher::new(SourceFamily::Wikipedia).with_document(wiki_document()),
            ));

        let results = agg.fetch_for_entity(&entity()).await.unwrap();
        assert_eq!(results.len(), 1, "surviving family should still produce sources");
    }

    #[tokio::test]
    async fn test_skipped_candidates_are_not_persisted() {
        let tmp = tempfile::tempdir().unwrap();
        let catalog: Arc<dyn SourceCatalog> = Arc::new(MemoryCatalog::new());

        let fetcher = MockFetcher::new(SourceFamily::Arxiv)
            .with_skip(FetchError::TextTooShort {
                url: "https://example.org/short".to_string(),
                length: 12,
            });

        let agg = aggregator(catalog.clone(), tmp.path(), fetcher);
        let results = agg.fetch_for_entity(&entity()).await.unwrap();

        assert!(results.is_empty());
        assert_eq!(catalog.stats().await.unwrap().total_sources, 0);
    }
}
