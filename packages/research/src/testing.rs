//! Testing utilities including mock implementations.
//!
//! Useful for exercising the aggregation and synthesis plumbing without
//! network or LLM calls. Mocks take a zero-delay pacer implicitly: they
//! never wait.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::agent::{Retriever, Synthesizer};
use crate::error::{FetchError, FetchResult, ResearchError, Result};
use crate::fetchers::{FetchOutcome, FetchedDocument, SourceFetcher};
use crate::layout::SourceFamily;
use crate::rag::DocumentChunk;
use crate::types::{KgEntity, Relationship, SharedProperty, StructuredAnalysis};
use crate::wikidata::KnowledgeGraph;

/// A fetcher returning a fixed set of documents and skips.
pub struct MockFetcher {
    family: SourceFamily,
    documents: Vec<FetchedDocument>,
    documents_by_entity: BTreeMap<String, Vec<FetchedDocument>>,
    skipped_templates: Vec<FetchError>,
    calls: Arc<RwLock<usize>>,
}

impl MockFetcher {
    pub fn new(family: SourceFamily) -> Self {
        Self {
            family,
            documents: Vec::new(),
            documents_by_entity: BTreeMap::new(),
            skipped_templates: Vec::new(),
            calls: Arc::new(RwLock::new(0)),
        }
    }

    /// Document returned for every entity.
    pub fn with_document(mut self, document: FetchedDocument) -> Self {
        self.documents.push(document);
        self
    }

    /// Document returned only when fetching for the given entity.
    pub fn with_document_for(mut self, entity_id: &str, document: FetchedDocument) -> Self {
        self.documents_by_entity
            .entry(entity_id.to_string())
            .or_default()
            .push(document);
        self
    }

    pub fn with_skip(mut self, error: FetchError) -> Self {
        self.skipped_templates.push(error);
        self
    }

    /// Number of times `fetch` has been called.
    pub fn call_count(&self) -> usize {
        *self.calls.read().expect("mock lock poisoned")
    }

    fn clone_skip(error: &FetchError) -> FetchError {
        match error {
            FetchError::Http { url, message } => FetchError::Http {
                url: url.clone(),
                message: message.clone(),
            },
            FetchError::Search { family, message } => FetchError::Search {
                family: *family,
                message: message.clone(),
            },
            FetchError::InvalidUrl { url } => FetchError::InvalidUrl { url: url.clone() },
            FetchError::TextTooShort { url, length } => FetchError::TextTooShort {
                url: url.clone(),
                length: *length,
            },
            FetchError::Pdf { url, message } => FetchError::Pdf {
                url: url.clone(),
                message: message.clone(),
            },
            FetchError::BadResponse { url, message } => FetchError::BadResponse {
                url: url.clone(),
                message: message.clone(),
            },
        }
    }
}

#[async_trait]
impl SourceFetcher for MockFetcher {
    fn family(&self) -> SourceFamily {
        self.family
    }

    async fn fetch(&self, entity: &KgEntity, max_results: usize) -> FetchResult<FetchOutcome> {
        *self.calls.write().expect("mock lock poisoned") += 1;

        let mut outcome = FetchOutcome::default();
        let per_entity = self.documents_by_entity.get(&entity.id);
        let documents = per_entity
            .into_iter()
            .flatten()
            .chain(self.documents.iter());
        for document in documents.take(max_results) {
            outcome.push_document(document.clone());
        }
        for skip in &self.skipped_templates {
            outcome.push_skip(Self::clone_skip(skip));
        }
        Ok(outcome)
    }
}

/// A fetcher whose search always fails outright.
pub struct FailingFetcher {
    family: SourceFamily,
    error: FetchError,
}

impl FailingFetcher {
    pub fn new(family: SourceFamily, error: FetchError) -> Self {
        Self { family, error }
    }
}

#[async_trait]
impl SourceFetcher for FailingFetcher {
    fn family(&self) -> SourceFamily {
        self.family
    }

    async fn fetch(&self, _entity: &KgEntity, _max_results: usize) -> FetchResult<FetchOutcome> {
        Err(MockFetcher::clone_skip(&self.error))
    }
}

/// A synthesizer returning a canned structured analysis.
pub struct MockSynthesizer {
    analysis: StructuredAnalysis,
    queries_issued: Arc<RwLock<Vec<String>>>,
}

impl MockSynthesizer {
    pub fn new(analysis: StructuredAnalysis) -> Self {
        Self {
            analysis,
            queries_issued: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Retrieval queries the mock issued during synthesis.
    pub fn queries_issued(&self) -> Vec<String> {
        self.queries_issued.read().expect("mock lock poisoned").clone()
    }
}

#[async_trait]
impl Synthesizer for MockSynthesizer {
    async fn synthesize(
        &self,
        _context: &str,
        retriever: &dyn Retriever,
    ) -> std::result::Result<StructuredAnalysis, ResearchError> {
        // Exercise the retrieval callback once so tests can observe it.
        let query = "rivalry evidence".to_string();
        let _ = retriever.retrieve(&query).await;
        self.queries_issued
            .write()
            .expect("mock lock poisoned")
            .push(query);
        Ok(self.analysis.clone())
    }
}

/// A knowledge graph serving a fixed set of entities.
#[derive(Default)]
pub struct MockKnowledgeGraph {
    entities: BTreeMap<String, KgEntity>,
    relationships: Vec<Relationship>,
    shared_properties: BTreeMap<String, SharedProperty>,
}

impl MockKnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, entity: KgEntity) -> Self {
        self.entities.insert(entity.id.clone(), entity);
        self
    }

    pub fn with_relationship(mut self, relationship: Relationship) -> Self {
        self.relationships.push(relationship);
        self
    }

    pub fn with_shared_property(mut self, property_id: &str, property: SharedProperty) -> Self {
        self.shared_properties
            .insert(property_id.to_string(), property);
        self
    }
}

#[async_trait]
impl KnowledgeGraph for MockKnowledgeGraph {
    async fn get_entity(&self, entity_id: &str) -> Result<KgEntity> {
        self.entities
            .get(entity_id)
            .cloned()
            .ok_or_else(|| ResearchError::Entity {
                id: entity_id.to_string(),
                reason: "not found".to_string(),
            })
    }

    async fn get_direct_relationships(
        &self,
        _entity1: &KgEntity,
        _entity2: &KgEntity,
    ) -> Result<Vec<Relationship>> {
        Ok(self.relationships.clone())
    }

    async fn get_shared_properties(
        &self,
        _entity_id1: &str,
        _entity_id2: &str,
    ) -> Result<BTreeMap<String, SharedProperty>> {
        Ok(self.shared_properties.clone())
    }
}

/// A retriever returning fixed chunks for every query.
#[derive(Default)]
pub struct MockRetriever {
    chunks: Vec<DocumentChunk>,
    queries: Arc<RwLock<Vec<String>>>,
}

impl MockRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk(mut self, chunk: DocumentChunk) -> Self {
        self.chunks.push(chunk);
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.read().expect("mock lock poisoned").clone()
    }
}

#[async_trait]
impl Retriever for MockRetriever {
    async fn retrieve(&self, query: &str) -> Vec<DocumentChunk> {
        self.queries
            .write()
            .expect("mock lock poisoned")
            .push(query.to_string());
        self.chunks.clone()
    }
}
