//! Document fetchers, one per external source family.
//!
//! Contract: a fetcher turns an entity into candidate documents. Single
//! candidates that fail (network error, unextractable PDF, too-short text)
//! are recorded as skips and the loop continues; only a failure to initiate
//! the family search at all surfaces as `Err`, and even that is degraded to
//! "zero sources from this family" by the aggregator.

pub mod arxiv;
pub mod pacer;
pub mod scholar;
pub mod wikipedia;

use async_trait::async_trait;

use crate::error::{FetchError, FetchResult};
use crate::layout::SourceFamily;
use crate::types::{KgEntity, Source};

pub use arxiv::ArxivFetcher;
pub use pacer::FetchPacer;
pub use scholar::ScholarFetcher;
pub use wikipedia::WikipediaFetcher;

/// Minimum extracted-text length below which a candidate is treated as an
/// extraction failure rather than a usable document.
pub const MIN_TEXT_LENGTH: usize = 500;

/// One successfully fetched and extracted document.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub source: Source,
    /// Extracted plain text, with the family's metadata header prepended
    pub content: String,
    /// Raw bytes as downloaded (HTML or PDF)
    pub raw: Vec<u8>,
    /// Extension for the persisted original file ("html" or "pdf")
    pub raw_extension: &'static str,
}

/// Everything a family search produced: usable documents plus the candidates
/// that were skipped, so skip-vs-fail is visible to callers and tests.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub documents: Vec<FetchedDocument>,
    pub skipped: Vec<FetchError>,
}

impl FetchOutcome {
    pub fn push_document(&mut self, document: FetchedDocument) {
        self.documents.push(document);
    }

    pub fn push_skip(&mut self, error: FetchError) {
        self.skipped.push(error);
    }
}

/// A fetcher for one source family.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// The family this fetcher serves (also names its artifact directories).
    fn family(&self) -> SourceFamily;

    /// Fetch up to `max_results` candidate documents for an entity.
    async fn fetch(&self, entity: &KgEntity, max_results: usize) -> FetchResult<FetchOutcome>;
}

/// Build the biographical search query shared by the paper families.
pub(crate) fn biographical_query(entity: &KgEntity) -> String {
    let mut query = format!("\"{}\"", entity.label);
    if let Some(description) = &entity.description {
        query.push(' ');
        query.push_str(description);
    }
    query
}
