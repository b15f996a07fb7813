//! Source records: the atomic unit of evidence.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Closed set of source kinds.
///
/// The first group is what the fetchers and the scanner actually produce;
/// the second group exists for manually registered material and drives the
/// credibility table and the always-primary classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Wikipedia,
    AcademicPaper,
    ArxivPaper,
    Manual,
    Unknown,
    PeerReviewedJournal,
    Book,
    NewsArticle,
    Encyclopedia,
    Archive,
    Government,
    Biography,
    Interview,
    Letter,
    Autobiography,
    Diary,
    Manuscript,
    OriginalPublication,
    Speech,
    Memoir,
    Publication,
    Web,
}

impl SourceType {
    /// Stable string tag, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wikipedia => "wikipedia",
            Self::AcademicPaper => "academic_paper",
            Self::ArxivPaper => "arxiv_paper",
            Self::Manual => "manual",
            Self::Unknown => "unknown",
            Self::PeerReviewedJournal => "peer_reviewed_journal",
            Self::Book => "book",
            Self::NewsArticle => "news_article",
            Self::Encyclopedia => "encyclopedia",
            Self::Archive => "archive",
            Self::Government => "government",
            Self::Biography => "biography",
            Self::Interview => "interview",
            Self::Letter => "letter",
            Self::Autobiography => "autobiography",
            Self::Diary => "diary",
            Self::Manuscript => "manuscript",
            Self::OriginalPublication => "original_publication",
            Self::Speech => "speech",
            Self::Memoir => "memoir",
            Self::Publication => "publication",
            Self::Web => "web",
        }
    }

    /// Parse a stored tag; anything unrecognized maps to `Unknown`.
    pub fn parse(tag: &str) -> Self {
        match tag {
            "wikipedia" => Self::Wikipedia,
            "academic_paper" => Self::AcademicPaper,
            "arxiv_paper" => Self::ArxivPaper,
            "manual" => Self::Manual,
            "peer_reviewed_journal" => Self::PeerReviewedJournal,
            "book" => Self::Book,
            "news_article" => Self::NewsArticle,
            "encyclopedia" => Self::Encyclopedia,
            "archive" => Self::Archive,
            "government" => Self::Government,
            "biography" => Self::Biography,
            "interview" => Self::Interview,
            "letter" => Self::Letter,
            "autobiography" => Self::Autobiography,
            "diary" => Self::Diary,
            "manuscript" => Self::Manuscript,
            "original_publication" => Self::OriginalPublication,
            "speech" => Self::Speech,
            "memoir" => Self::Memoir,
            "publication" => Self::Publication,
            "web" => Self::Web,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One deduplicated external document record.
///
/// The `url` is the identity key: two sources with the same URL are the same
/// Source, and the catalog enforces that with a unique constraint. A record
/// is never mutated after insertion except to backfill a missing
/// `stored_content_path`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Source {
    /// Stable identifier derived from the URL (same URL, same ID, forever)
    pub source_id: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    pub publication: Option<String>,
    /// Year or full date, free form
    pub publication_date: Option<String>,
    pub url: String,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub isbn: Option<String>,
    pub retrieved_at: DateTime<Utc>,
    pub credibility_score: f64,
    pub is_primary_source: bool,
    /// SHA-256 hex of the extracted text, integrity signal only
    pub content_hash: Option<String>,
    /// Path to the persisted extracted text, relative to the data root
    pub stored_content_path: Option<String>,
    /// Human-added out-of-band vs auto-fetched
    #[serde(default)]
    pub is_manual: bool,
}

impl Source {
    /// Create a source with the fields every family fills in; the rest
    /// start empty and are set by the aggregator during persistence.
    pub fn new(
        source_id: impl Into<String>,
        source_type: SourceType,
        title: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            source_type,
            title: title.into(),
            authors: Vec::new(),
            publication: None,
            publication_date: None,
            url: url.into(),
            doi: None,
            isbn: None,
            retrieved_at: Utc::now(),
            credibility_score: 0.5,
            is_primary_source: false,
            content_hash: None,
            stored_content_path: None,
            is_manual: false,
        }
    }

    pub fn with_authors(mut self, authors: Vec<String>) -> Self {
        self.authors = authors;
        self
    }

    pub fn with_publication(mut self, publication: impl Into<String>) -> Self {
        self.publication = Some(publication.into());
        self
    }

    pub fn with_publication_date(mut self, date: impl Into<String>) -> Self {
        self.publication_date = Some(date.into());
        self
    }

    pub fn with_credibility(mut self, score: f64) -> Self {
        self.credibility_score = score;
        self
    }

    pub fn with_primary(mut self, is_primary: bool) -> Self {
        self.is_primary_source = is_primary;
        self
    }
}

/// Earliest/latest publication dates over a catalog slice.
///
/// Best-effort lexicographic ordering over whatever date strings are present;
/// mixed YYYY and YYYY-MM-DD formats are tolerated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DateRange {
    pub earliest: String,
    pub latest: String,
}

/// Aggregate statistics over a catalog slice.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SourcesSummary {
    pub total_sources: usize,
    pub by_type: BTreeMap<String, usize>,
    pub primary_sources: usize,
    pub secondary_sources: usize,
    /// Mean credibility, rounded to 2 decimals
    pub average_credibility: f64,
    pub date_range: Option<DateRange>,
}
