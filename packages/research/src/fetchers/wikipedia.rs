//! Wikipedia article fetcher.
//!
//! Fetches the rendered article HTML through the MediaWiki parse API, strips
//! it down to plain text, and wraps it with a metadata header for retrieval.
//! At most one article per entity; the courtesy interval is 500ms per
//! Wikipedia's API guidelines.

use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info};

use crate::credibility::credibility_score;
use crate::error::{FetchError, FetchResult};
use crate::ident::source_id;
use crate::layout::SourceFamily;
use crate::types::{KgEntity, Source, SourceType};

use super::{FetchOutcome, FetchPacer, FetchedDocument, SourceFetcher, MIN_TEXT_LENGTH};

const DEFAULT_API_BASE: &str = "https://en.wikipedia.org/w/api.php";
const USER_AGENT: &str = "RivalryResearch/0.1.0 (https://github.com/rivalry-research)";
const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(500);

pub struct WikipediaFetcher {
    client: reqwest::Client,
    pacer: FetchPacer,
    api_base: String,
}

impl WikipediaFetcher {
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

    /// Point the fetcher at a different API endpoint (tests, mirrors).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Fetch an article and return (title, html, clean text).
    async fn fetch_article(&self, wikipedia_url: &str) -> FetchResult<(String, String, String)> {
        self.pacer.pace().await;

        let article_title = article_title_from_url(wikipedia_url)?;

        let response = self
            .client
            .get(&self.api_base)
            .query(&[
                ("action", "parse"),
                ("page", article_title.as_str()),
                ("format", "json"),
                ("prop", "text"),
                ("disableeditsection", "1"),
                ("disabletoc", "1"),
            ])
            .send()
            .await
            .map_err(|e| FetchError::Http {
                url: wikipedia_url.to_string(),
                message: e.to_string(),
            })?
            .error_for_status()
            .map_err(|e| FetchError::Http {
                url: wikipedia_url.to_string(),
                message: e.to_string(),
            })?;

        let data: serde_json::Value = response.json().await.map_err(|e| FetchError::BadResponse {
            url: wikipedia_url.to_string(),
            message: e.to_string(),
        })?;

        if let Some(error) = data.get("error") {
            return Err(FetchError::BadResponse {
                url: wikipedia_url.to_string(),
                message: error
                    .get("info")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown API error")
                    .to_string(),
            });
        }

        let html = data
            .pointer("/parse/text/*")
            .and_then(|v| v.as_str())
            .ok_or_else(|| FetchError::BadResponse {
                url: wikipedia_url.to_string(),
                message: format!("no parse text for article {article_title}"),
            })?
            .to_string();

        let text = clean_html_to_text(&html);
        Ok((article_title, html, text))
    }
}

#[async_trait]
impl SourceFetcher for WikipediaFetcher {
    fn family(&self) -> SourceFamily {
        SourceFamily::Wikipedia
    }

    async fn fetch(&self, entity: &KgEntity, _max_results: usize) -> FetchResult<FetchOutcome> {
        let Some(wikipedia_url) = entity.wikipedia_url.as_deref() else {
            debug!(entity = %entity.id, "entity has no Wikipedia URL");
            return Ok(FetchOutcome::default());
        };

        info!(entity = %entity.label, url = %wikipedia_url, "fetching Wikipedia article");

        let mut outcome = FetchOutcome::default();
        let (article_title, html, text) = self.fetch_article(wikipedia_url).await?;

        if text.len() < MIN_TEXT_LENGTH {
            outcome.push_skip(FetchError::TextTooShort {
                url: wikipedia_url.to_string(),
                length: text.len(),
            });
            return Ok(outcome);
        }

        let source = Source::new(
            source_id(wikipedia_url, "wiki"),
            SourceType::Wikipedia,
            &article_title,
            wikipedia_url,
        )
        .with_authors(vec!["Wikipedia contributors".to_string()])
        .with_publication("Wikipedia")
        .with_credibility(credibility_score(SourceType::Wikipedia, Some("Wikipedia")))
        .with_primary(false);

        let content = format_as_document(&article_title, &text, entity);

        info!(source_id = %source.source_id, title = %article_title, "created Wikipedia source");

        outcome.push_document(FetchedDocument {
            source,
            content,
            raw: html.into_bytes(),
            raw_extension: "html",
        });
        Ok(outcome)
    }
}

/// Extract the article title from a Wikipedia URL.
fn article_title_from_url(wikipedia_url: &str) -> FetchResult<String> {
    let parsed = url::Url::parse(wikipedia_url).map_err(|_| FetchError::InvalidUrl {
        url: wikipedia_url.to_string(),
    })?;

    let mut segments = parsed.path_segments().ok_or_else(|| FetchError::InvalidUrl {
        url: wikipedia_url.to_string(),
    })?;

    match (segments.next(), segments.next()) {
        (Some("wiki"), Some(title)) if !title.is_empty() => Ok(urlencoding::decode(title)
            .map(|t| t.into_owned())
            .unwrap_or_else(|_| title.to_string())),
        _ => Err(FetchError::InvalidUrl {
            url: wikipedia_url.to_string(),
        }),
    }
}

/// Convert Wikipedia article HTML to clean plain text.
fn clean_html_to_text(html: &str) -> String {
    let script_pattern = Regex::new(r"(?s)<script[^>]*>.*?</script>").expect("valid regex");
    let style_pattern = Regex::new(r"(?s)<style[^>]*>.*?</style>").expect("valid regex");
    let sup_pattern = Regex::new(r"(?s)<sup[^>]*>.*?</sup>").expect("valid regex");
    let reference_pattern =
        Regex::new(r#"(?s)<span[^>]*class="[^"]*reference-text[^"]*"[^>]*>.*?</span>"#)
            .expect("valid regex");
    let tag_pattern = Regex::new(r"<[^>]+>").expect("valid regex");
    let citation_pattern = Regex::new(r"\[\d+\]").expect("valid regex");
    let newline_pattern = Regex::new(r"\n{3,}").expect("valid regex");
    let space_pattern = Regex::new(r" {2,}").expect("valid regex");

    let mut text = script_pattern.replace_all(html, "").into_owned();
    text = style_pattern.replace_all(&text, "").into_owned();
    text = sup_pattern.replace_all(&text, "").into_owned();
    text = reference_pattern.replace_all(&text, "").into_owned();
    text = tag_pattern.replace_all(&text, "").into_owned();
    text = citation_pattern.replace_all(&text, "").into_owned();

    text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");

    text = newline_pattern.replace_all(&text, "\n\n").into_owned();
    text = space_pattern.replace_all(&text, " ").into_owned();

    text.trim().to_string()
}

/// Prepend the metadata header used for retrieval ingestion.
fn format_as_document(article_title: &str, article_text: &str, entity: &KgEntity) -> String {
    format!(
        "---\n\
         Source: Wikipedia\n\
         Article: {article_title}\n\
         Entity ID: {id}\n\
         Entity Name: {label}\n\
         URL: {url}\n\
         Description: {description}\n\
         ---\n\n\
         {article_text}",
        id = entity.id,
        label = entity.label,
        url = entity.wikipedia_url.as_deref().unwrap_or("N/A"),
        description = entity.description.as_deref().unwrap_or("N/A"),
    )
}
