//! Rivalry research: source ingestion, deduplication, and evidence
//! validation behind a citation-backed rivalry analysis pipeline.

pub mod agent;
pub mod aggregator;
pub mod analysis_store;
pub mod catalog;
pub mod config;
pub mod credibility;
pub mod error;
pub mod fetchers;
pub mod ident;
pub mod layout;
pub mod pdf;
pub mod pipeline;
pub mod rag;
pub mod scanner;
pub mod types;
pub mod validation;
pub mod wikidata;

pub mod testing;

// Re-exports for clean API
pub use agent::{OpenAiSynthesizer, Retriever, Synthesizer};
pub use aggregator::SourceAggregator;
pub use catalog::{MemoryCatalog, SourceCatalog, SqliteCatalog};
pub use config::Settings;
pub use error::{CatalogError, FetchError, ResearchError, Result};
pub use fetchers::{ArxivFetcher, FetchPacer, ScholarFetcher, SourceFetcher, WikipediaFetcher};
pub use layout::{SourceFamily, StorageLayout};
pub use pipeline::RivalryPipeline;
pub use types::{
    EventSource, KgEntity, RivalryAnalysis, RivalryEntity, Source, SourceType, SourcesSummary,
    StructuredAnalysis, TimelineEvent,
};
pub use wikidata::{KnowledgeGraph, WikidataClient};
