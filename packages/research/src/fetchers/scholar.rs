//! Academic paper metadata fetcher (Semantic Scholar).
//!
//! Searches the Semantic Scholar graph API for papers about an entity and
//! produces abstract-level documents. Scholarly metadata endpoints are
//! aggressively rate limited, so the courtesy interval is a full 2 seconds.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::credibility::{credibility_score, entity_among_authors};
use crate::error::{FetchError, FetchResult};
use crate::ident::source_id;
use crate::layout::SourceFamily;
use crate::types::{KgEntity, Source, SourceType};

use super::{biographical_query, FetchOutcome, FetchPacer, FetchedDocument, SourceFetcher};

const DEFAULT_API_BASE: &str = "https://api.semanticscholar.org/graph/v1";
const USER_AGENT: &str = "RivalryResearch/0.1.0 (https://github.com/rivalry-research)";
const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(2);

/// Abstracts shorter than this are still useful; the floor only rejects
/// entries with essentially no text.
const MIN_ABSTRACT_LENGTH: usize = 200;

pub struct ScholarFetcher {
    client: reqwest::Client,
    pacer: FetchPacer,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<PaperRecord>,
}

#[derive(Debug, Deserialize)]
struct PaperRecord {
    title: Option<String>,
    r#abstract: Option<String>,
    year: Option<i64>,
    venue: Option<String>,
    url: Option<String>,
    #[serde(default)]
    authors: Vec<PaperAuthor>,
    #[serde(rename = "externalIds", default)]
    external_ids: Option<ExternalIds>,
    #[serde(rename = "citationCount", default)]
    citation_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct PaperAuthor {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalIds {
    #[serde(rename = "DOI")]
    doi: Option<String>,
}

impl ScholarFetcher {
    pub fn new(pacer: FetchPacer) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .user_agent(USER_AGENT)
                .build()
                .expect("failed to create HTTP client"),
            pacer,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// The family's default pacer.
    pub fn default_pacer() -> FetchPacer {
        FetchPacer::with_min_interval(MIN_REQUEST_INTERVAL)
    }

    /// Point the fetcher at a different API endpoint (tests, proxies).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    async fn search(&self, query: &str, limit: usize) -> FetchResult<Vec<PaperRecord>> {
        self.pacer.pace().await;

        let url = format!("{}/paper/search", self.api_base);
        let limit_param = limit.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("query", query),
                ("limit", limit_param.as_str()),
                (
                    "fields",
                    "title,abstract,year,venue,url,authors,externalIds,citationCount",
                ),
            ])
            .send()
            .await
            .map_err(|e| FetchError::Search {
                family: "scholar",
                message: e.to_string(),
            })?
            .error_for_status()
            .map_err(|e| FetchError::Search {
                family: "scholar",
                message: e.to_string(),
            })?;

        let body: SearchResponse = response.json().await.map_err(|e| FetchError::Search {
            family: "scholar",
            message: format!("unparseable search response: {e}"),
        })?;

        Ok(body.data)
    }
}

#[async_trait]
impl SourceFetcher for ScholarFetcher {
    fn family(&self) -> SourceFamily {
        SourceFamily::Scholar
    }

    async fn fetch(&self, entity: &KgEntity, max_results: usize) -> FetchResult<FetchOutcome> {
        let query = biographical_query(entity);
        info!(entity = %entity.label, query = %query, "searching scholarly metadata");

        let papers = self.search(&query, max_results).await?;
        debug!(count = papers.len(), "scholar search returned candidates");

        let mut outcome = FetchOutcome::default();

        for paper in papers.into_iter().take(max_results) {
            match build_document(paper, entity) {
                Ok(document) => {
                    info!(
                        source_id = %document.source.source_id,
                        title = %document.source.title,
                        "fetched scholar paper"
                    );
                    outcome.push_document(document);
                }
                Err(e) => {
                    warn!(error = %e, "skipping scholar candidate");
                    outcome.push_skip(e);
                }
            }
        }

        Ok(outcome)
    }
}

fn build_document(paper: PaperRecord, entity: &KgEntity) -> FetchResult<FetchedDocument> {
    let title = paper.title.unwrap_or_else(|| "Unknown Title".to_string());
    let url = paper.url.ok_or_else(|| FetchError::InvalidUrl {
        url: format!("scholar result without URL: {title}"),
    })?;

    let abstract_text = paper.r#abstract.unwrap_or_default();
    if abstract_text.trim().len() < MIN_ABSTRACT_LENGTH {
        return Err(FetchError::TextTooShort {
            url,
            length: abstract_text.trim().len(),
        });
    }

    let authors: Vec<String> = paper.authors.into_iter().filter_map(|a| a.name).collect();
    let venue = paper.venue.filter(|v| !v.is_empty());
    let year = paper.year.map(|y| y.to_string());
    let is_primary = entity_among_authors(&entity.label, &authors);

    let mut source = Source::new(
        source_id(&url, "scholar"),
        SourceType::AcademicPaper,
        &title,
        &url,
    )
    .with_authors(authors.clone())
    .with_credibility(credibility_score(SourceType::AcademicPaper, venue.as_deref()))
    .with_primary(is_primary);

    if let Some(venue) = &venue {
        source = source.with_publication(venue.clone());
    }
    if let Some(year) = &year {
        source = source.with_publication_date(year.clone());
    }
    source.doi = paper.external_ids.and_then(|ids| ids.doi);

    let content = format_paper_content(
        &title,
        &authors,
        year.as_deref(),
        venue.as_deref(),
        &abstract_text,
        paper.citation_count.unwrap_or(0),
        &url,
        entity,
    );

    // Metadata-only family: the formatted document doubles as the raw
    // artifact, stored as HTML-free text.
    let raw = content.clone().into_bytes();

    Ok(FetchedDocument {
        source,
        content,
        raw,
        raw_extension: "html",
    })
}

#[allow(clippy::too_many_arguments)]
fn format_paper_content(
    title: &str,
    authors: &[String],
    year: Option<&str>,
    venue: Option<&str>,
    abstract_text: &str,
    citations: i64,
    url: &str,
    entity: &KgEntity,
) -> String {
    let authors_str = if authors.is_empty() {
        "Unknown".to_string()
    } else {
        authors.join(", ")
    };
    let year_str = year.unwrap_or("Unknown");
    let venue_str = venue.unwrap_or("Unknown");

    let mut document = format!(
        "---\n\
         Source: Scholar\n\
         Type: Academic Paper\n\
         Title: {title}\n\
         Authors: {authors_str}\n\
         Year: {year_str}\n\
         Venue: {venue_str}\n\
         URL: {url}\n\
         Citations: {citations}\n\
         Related Entity: {label} ({id})\n\
         ---\n\n\
         # {title}\n\n\
         **Authors:** {authors_str}\n\n\
         **Published:** {year_str}",
        label = entity.label,
        id = entity.id,
    );
    if venue.is_some() {
        document.push_str(&format!(" in {venue_str}"));
    }
    document.push_str(&format!("\n\n**Abstract:**\n\n{abstract_text}\n"));
    document
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity() -> KgEntity {
        KgEntity {
            id: "Q9021".to_string(),
            label: "Max Planck".to_string(),
            description: Some("German physicist".to_string()),
            aliases: Vec::new(),
            claims: serde_json::Map::new(),
            wikipedia_url: None,
        }
    }

    fn paper(title: &str, abstract_len: usize, authors: &[&str]) -> PaperRecord {
        PaperRecord {
            title: Some(title.to_string()),
            r#abstract: Some("a".repeat(abstract_len)),
            year: Some(1901),
            venue: Some("Annalen der Physik".to_string()),
            url: Some(format!("https://example.org/{}", title.replace(' ', "-"))),
            authors: authors
                .iter()
                .map(|n| PaperAuthor {
                    name: Some(n.to_string()),
                })
                .collect(),
            external_ids: Some(ExternalIds {
                doi: Some("10.1000/demo".to_string()),
            }),
            citation_count: Some(42),
        }
    }

    #[test]
    fn test_build_document_primary_when_entity_authored() {
        let doc = build_document(
            paper("On the Law of Distribution", 300, &["Max Planck"]),
            &entity(),
        )
        .unwrap();
        assert!(doc.source.is_primary_source);
        assert_eq!(doc.source.source_type, SourceType::AcademicPaper);
        assert_eq!(doc.source.publication_date.as_deref(), Some("1901"));
        assert_eq!(doc.source.doi.as_deref(), Some("10.1000/demo"));
        assert!(doc.content.contains("**Abstract:**"));
    }

    #[test]
    fn test_build_document_secondary_for_other_authors() {
        let doc = build_document(
            paper("Planck biography study", 300, &["J. Historian"]),
            &entity(),
        )
        .unwrap();
        assert!(!doc.source.is_primary_source);
    }

    #[test]
    fn test_short_abstract_is_extraction_failure() {
        let err = build_document(paper("Stub entry", 50, &["A. Nobody"]), &entity()).unwrap_err();
        assert!(matches!(err, FetchError::TextTooShort { .. }));
    }

    #[test]
    fn test_missing_url_is_skipped() {
        let mut record = paper("No URL", 300, &["A. Nobody"]);
        record.url = None;
        let err = build_document(record, &entity()).unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }

    #[test]
    fn test_biographical_query_includes_description() {
        let query = biographical_query(&entity());
        assert_eq!(query, "\"Max Planck\" German physicist");
    }
}
