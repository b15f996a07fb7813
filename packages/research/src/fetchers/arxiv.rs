//! arXiv preprint fetcher.
//!
//! Queries the arXiv Atom API, downloads each candidate's PDF, and extracts
//! the full text. arXiv papers are open access, so extraction is expected to
//! succeed for most results; candidates whose text comes out too short are
//! skipped as extraction failures.

use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::credibility::{credibility_score, entity_among_authors};
use crate::error::{FetchError, FetchResult};
use crate::ident::source_id;
use crate::layout::SourceFamily;
use crate::pdf;
use crate::types::{KgEntity, Source, SourceType};

use super::{
    biographical_query, FetchOutcome, FetchPacer, FetchedDocument, SourceFetcher, MIN_TEXT_LENGTH,
};

const DEFAULT_API_BASE: &str = "http://export.arxiv.org/api/query";
const USER_AGENT: &str = "RivalryResearch/0.1.0 (https://github.com/rivalry-research)";
const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(3);

pub struct ArxivFetcher {
    client: reqwest::Client,
    pacer: FetchPacer,
    api_base: String,
}

/// One `<entry>` from the Atom feed.
#[derive(Debug, Clone)]
struct ArxivEntry {
    entry_id: String,
    title: String,
    summary: String,
    authors: Vec<String>,
    published: Option<String>,
    categories: Vec<String>,
    pdf_url: Option<String>,
}

impl ArxivFetcher {
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

    /// The family's default pacer (arXiv asks for a 3 second gap).
    pub fn default_pacer() -> FetchPacer {
        FetchPacer::with_min_interval(MIN_REQUEST_INTERVAL)
    }

    /// Point the fetcher at a different API endpoint (tests, mirrors).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    async fn search(&self, query: &str, max_results: usize) -> FetchResult<Vec<ArxivEntry>> {
        self.pacer.pace().await;

        let search_query = format!("all:{query}");
        let max_results_param = max_results.to_string();
        let response = self
            .client
            .get(&self.api_base)
            .query(&[
                ("search_query", search_query.as_str()),
                ("max_results", max_results_param.as_str()),
                ("sortBy", "relevance"),
            ])
            .send()
            .await
            .map_err(|e| FetchError::Search {
                family: "arxiv",
                message: e.to_string(),
            })?
            .error_for_status()
            .map_err(|e| FetchError::Search {
                family: "arxiv",
                message: e.to_string(),
            })?;

        let feed = response.text().await.map_err(|e| FetchError::Search {
            family: "arxiv",
            message: e.to_string(),
        })?;

        Ok(parse_feed(&feed))
    }

    async fn download_pdf(&self, pdf_url: &str) -> FetchResult<Vec<u8>> {
        self.pacer.pace().await;

        let response = self
            .client
            .get(pdf_url)
            .header("Accept", "application/pdf,*/*")
            .send()
            .await
            .map_err(|e| FetchError::Http {
                url: pdf_url.to_string(),
                message: e.to_string(),
            })?
            .error_for_status()
            .map_err(|e| FetchError::Http {
                url: pdf_url.to_string(),
                message: e.to_string(),
            })?;

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();
        if !content_type.contains("pdf") && !pdf_url.to_lowercase().ends_with(".pdf") {
            debug!(url = %pdf_url, content_type = %content_type, "response may not be a PDF");
        }

        let bytes = response.bytes().await.map_err(|e| FetchError::Http {
            url: pdf_url.to_string(),
            message: e.to_string(),
        })?;

        Ok(bytes.to_vec())
    }

    async fn process_entry(&self, entry: ArxivEntry, entity: &KgEntity) -> FetchResult<FetchedDocument> {
        let pdf_url = entry.pdf_url.clone().ok_or_else(|| FetchError::InvalidUrl {
            url: entry.entry_id.clone(),
        })?;

        debug!(title = %entry.title, "downloading arXiv PDF");
        let pdf_bytes = self.download_pdf(&pdf_url).await?;

        let extraction = pdf::extract_text(&pdf_bytes);
        if !extraction.success {
            return Err(FetchError::Pdf {
                url: pdf_url,
                message: extraction.error.unwrap_or_else(|| "unknown".to_string()),
            });
        }
        if extraction.text.trim().len() < MIN_TEXT_LENGTH {
            return Err(FetchError::TextTooShort {
                url: pdf_url,
                length: extraction.text.trim().len(),
            });
        }

        let is_primary = entity_among_authors(&entity.label, &entry.authors);
        let year = entry.published.as_deref().map(|d| d[..4.min(d.len())].to_string());

        let mut source = Source::new(
            source_id(&entry.entry_id, "arxiv"),
            SourceType::ArxivPaper,
            &entry.title,
            &pdf_url,
        )
        .with_authors(entry.authors.clone())
        .with_publication("arXiv")
        .with_credibility(credibility_score(SourceType::ArxivPaper, None))
        .with_primary(is_primary);

        if let Some(date) = entry.published.as_deref() {
            source = source.with_publication_date(date[..10.min(date.len())].to_string());
        }

        let content = format_paper_content(&entry, entity, year.as_deref(), &extraction.text);

        info!(
            source_id = %source.source_id,
            title = %source.title,
            pages = extraction.page_count,
            "fetched arXiv paper"
        );

        Ok(FetchedDocument {
            source,
            content,
            raw: pdf_bytes,
            raw_extension: "pdf",
        })
    }
}

#[async_trait]
impl SourceFetcher for ArxivFetcher {
    fn family(&self) -> SourceFamily {
        SourceFamily::Arxiv
    }

    async fn fetch(&self, entity: &KgEntity, max_results: usize) -> FetchResult<FetchOutcome> {
        // Biographical keywords steer relevance ranking toward historical
        // material rather than the entity's own technical output.
        let query = format!(
            "{} (biography OR life OR career OR history OR biographical)",
            biographical_query(entity)
        );
        info!(entity = %entity.label, query = %query, "searching arXiv");

        let entries = self.search(&query, max_results).await?;
        debug!(count = entries.len(), "arXiv search returned candidates");

        let mut outcome = FetchOutcome::default();
        for entry in entries.into_iter().take(max_results) {
            let title = entry.title.clone();
            match self.process_entry(entry, entity).await {
                Ok(document) => outcome.push_document(document),
                Err(e) => {
                    warn!(title = %title, error = %e, "skipping arXiv candidate");
                    outcome.push_skip(e);
                }
            }
        }

        Ok(outcome)
    }
}

/// Pull entries out of an Atom feed.
///
/// The feed is simple enough that targeted patterns beat a full XML stack,
/// same approach as the HTML cleanup elsewhere in this crate.
fn parse_feed(feed: &str) -> Vec<ArxivEntry> {
    let entry_pattern = Regex::new(r"(?s)<entry>(.*?)</entry>").expect("valid regex");
    let id_pattern = Regex::new(r"<id>([^<]+)</id>").expect("valid regex");
    let title_pattern = Regex::new(r"(?s)<title[^>]*>(.*?)</title>").expect("valid regex");
    let summary_pattern = Regex::new(r"(?s)<summary[^>]*>(.*?)</summary>").expect("valid regex");
    let author_pattern = Regex::new(r"(?s)<name>([^<]+)</name>").expect("valid regex");
    let published_pattern = Regex::new(r"<published>([^<]+)</published>").expect("valid regex");
    let category_pattern = Regex::new(r#"<category[^>]*term="([^"]+)""#).expect("valid regex");
    let pdf_link_pattern =
        Regex::new(r#"<link[^>]*title="pdf"[^>]*href="([^"]+)""#).expect("valid regex");
    let pdf_link_pattern_alt =
        Regex::new(r#"<link[^>]*href="([^"]+)"[^>]*title="pdf""#).expect("valid regex");

    entry_pattern
        .captures_iter(feed)
        .filter_map(|cap| {
            let body = cap.get(1)?.as_str();

            let entry_id = id_pattern.captures(body)?.get(1)?.as_str().trim().to_string();
            let title = title_pattern
                .captures(body)?
                .get(1)?
                .as_str()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            let summary = summary_pattern
                .captures(body)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default();
            let authors = author_pattern
                .captures_iter(body)
                .filter_map(|c| c.get(1).map(|m| m.as_str().trim().to_string()))
                .collect();
            let published = published_pattern
                .captures(body)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string());
            let categories = category_pattern
                .captures_iter(body)
                .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
                .collect();
            let pdf_url = pdf_link_pattern
                .captures(body)
                .or_else(|| pdf_link_pattern_alt.captures(body))
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string());

            Some(ArxivEntry {
                entry_id,
                title,
                summary,
                authors,
                published,
                categories,
                pdf_url,
            })
        })
        .collect()
}

fn format_paper_content(
    entry: &ArxivEntry,
    entity: &KgEntity,
    year: Option<&str>,
    full_text: &str,
) -> String {
    let authors_str = if entry.authors.is_empty() {
        "Unknown".to_string()
    } else {
        entry.authors.join(", ")
    };
    let year_str = year.unwrap_or("Unknown");
    let categories_str = if entry.categories.is_empty() {
        "Unknown".to_string()
    } else {
        entry.categories.join(", ")
    };

    let mut document = format!(
        "---\n\
         Source: arXiv\n\
         Type: Academic Paper (Preprint)\n\
         Title: {title}\n\
         Authors: {authors_str}\n\
         Year: {year_str}\n\
         Categories: {categories_str}\n\
         arXiv ID: {entry_id}\n\
         URL: {url}\n\
         Related Entity: {label} ({id})\n\
         ---\n\n\
         # {title}\n\n\
         **Authors:** {authors_str}\n\n\
         **Published:** {year_str}\n\n\
         **Categories:** {categories_str}\n\n",
        title = entry.title,
        entry_id = entry.entry_id,
        url = entry.pdf_url.as_deref().unwrap_or("N/A"),
        label = entity.label,
        id = entity.id,
    );
    if !entry.summary.is_empty() {
        document.push_str(&format!("**Abstract:** {}\n\n", entry.summary));
    }
    document.push_str(&format!("## Full Text\n\n{full_text}\n"));
    document
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>ArXiv Query Results</title>
  <entry>
    <id>http://arxiv.org/abs/1234.5678v1</id>
    <title>The Planck-Mach  dispute
      revisited</title>
    <summary>
      A study of the philosophical dispute between Planck and Mach.
    </summary>
    <published>1998-04-01T00:00:00Z</published>
    <author><name>A. Historian</name></author>
    <author><name>B. Scholar</name></author>
    <category term="physics.hist-ph"/>
    <link href="http://arxiv.org/abs/1234.5678v1" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/1234.5678v1" rel="related" type="application/pdf"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/9999.0001v2</id>
    <title>Unrelated paper</title>
    <published>2005-01-15T00:00:00Z</published>
    <author><name>C. Author</name></author>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_feed_extracts_entries() {
        let entries = parse_feed(SAMPLE_FEED);
        assert_eq!(entries.len(), 2);

        let first = &entries[0];
        assert_eq!(first.entry_id, "http://arxiv.org/abs/1234.5678v1");
        assert_eq!(first.title, "The Planck-Mach dispute revisited");
        assert_eq!(first.authors, vec!["A. Historian", "B. Scholar"]);
        assert_eq!(first.published.as_deref(), Some("1998-04-01T00:00:00Z"));
        assert_eq!(first.categories, vec!["physics.hist-ph"]);
        assert_eq!(first.pdf_url.as_deref(), Some("http://arxiv.org/pdf/1234.5678v1"));
        assert!(first.summary.contains("philosophical dispute"));
    }

    #[test]
    fn test_parse_feed_entry_without_pdf_link() {
        let entries = parse_feed(SAMPLE_FEED);
        assert!(entries[1].pdf_url.is_none());
    }

    #[test]
    fn test_parse_empty_feed() {
        assert!(parse_feed("<feed></feed>").is_empty());
    }

    #[test]
    fn test_format_paper_content_sections() {
        let entries = parse_feed(SAMPLE_FEED);
        let entity = KgEntity {
            id: "Q9021".to_string(),
            label: "Max Planck".to_string(),
            description: None,
            aliases: Vec::new(),
            claims: serde_json::Map::new(),
            wikipedia_url: None,
        };

        let doc = format_paper_content(&entries[0], &entity, Some("1998"), "Extracted body.");

        assert!(doc.contains("Source: arXiv"));
        assert!(doc.contains("Related Entity: Max Planck (Q9021)"));
        assert!(doc.contains("**Abstract:**"));
        assert!(doc.ends_with("## Full Text\n\nExtracted body.\n"));
    }
}
