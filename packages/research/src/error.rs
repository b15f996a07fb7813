//! Typed errors for the research library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can make
//! skip-vs-fail decisions in the type system instead of parsing log output.

use thiserror::Error;

/// Errors that can occur during research operations.
#[derive(Debug, Error)]
pub enum ResearchError {
    /// A source fetch failed in a way the aggregator could not absorb
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Catalog operation failed
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Knowledge-graph request failed
    #[error("knowledge graph error: {0}")]
    KnowledgeGraph(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Entity exists but cannot be analyzed (missing, no label, ...)
    #[error("entity not usable: {id}: {reason}")]
    Entity { id: String, reason: String },

    /// Synthesis call failed or returned unparseable output
    #[error("synthesis error: {0}")]
    Synthesis(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Saved analysis not found on disk
    #[error("analysis not found: {id}")]
    AnalysisNotFound { id: String },

    /// Filesystem operation failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

/// Errors that can occur while fetching a single source candidate.
///
/// Candidate-level failures are collected by the fetchers and reported as
/// skips; only a failure to initiate the family search propagates as `Err`.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed
    #[error("HTTP error fetching {url}: {message}")]
    Http { url: String, message: String },

    /// The family search itself could not be initiated
    #[error("{family} search failed: {message}")]
    Search { family: &'static str, message: String },

    /// URL could not be parsed or has an unexpected shape
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// Extracted text fell below the minimum length threshold
    #[error("extracted text too short for {url}: {length} chars")]
    TextTooShort { url: String, length: usize },

    /// PDF parsing failed
    #[error("PDF extraction failed for {url}: {message}")]
    Pdf { url: String, message: String },

    /// Remote response could not be interpreted
    #[error("bad response from {url}: {message}")]
    BadResponse { url: String, message: String },
}

/// Errors from the persistent source catalog.
///
/// Storage failures are fatal for the operation that hit them; a write that
/// errors must not be treated as persisted.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Underlying storage failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A row that must exist after an insert could not be read back
    #[error("source vanished after insert: {url}")]
    ReadBack { url: String },
}

impl CatalogError {
    pub(crate) fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage(Box::new(err))
    }
}

/// Result type alias for research operations.
pub type Result<T> = std::result::Result<T, ResearchError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for catalog operations.
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
