//! The synthesis boundary.
//!
//! The language model is an opaque collaborator behind [`Synthesizer`]:
//! it receives an assembled context and a retrieval callback, and returns a
//! [`StructuredAnalysis`]. The reference implementation talks to an
//! OpenAI-compatible chat completions endpoint with a JSON-schema response
//! format; prompt construction and tool-calling internals stay out of the
//! pipeline's view.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ResearchError;
use crate::rag::DocumentChunk;
use crate::types::{Relationship, RivalryEntity, SharedProperty, Source, StructuredAnalysis};

/// Retrieval callback supplied by the pipeline.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> Vec<DocumentChunk>;
}

/// Opaque synthesis collaborator.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(
        &self,
        context: &str,
        retriever: &dyn Retriever,
    ) -> Result<StructuredAnalysis, ResearchError>;
}

const SYSTEM_PROMPT: &str = "You are a rivalry analysis expert examining the \
relationship between two people using structured knowledge-graph facts and \
biographical document excerpts.\n\
\n\
Guidelines:\n\
- Be conservative: mark rivalry_exists true only on clear evidence.\n\
- Extract ONLY rivalry-relevant timeline events (direct conflicts, parallel \
competing work, essential context, resolution). Exclude routine biography.\n\
- For each event set rivalry_relevance to one of: direct, parallel, context, \
resolution.\n\
- Cite evidence: every event's sources array must reference the provided \
source IDs, each with the supporting_text excerpt that evidences the claim. \
Embed inline {source_id} markers in descriptions immediately after the claim \
they support.\n\
- Capture direct quotes verbatim with attribution in direct_quotes.\n\
- rivalry_score reflects intensity: 0.0-0.3 weak, 0.4-0.6 moderate, 0.7-1.0 \
intense and well documented.\n\
- Give rivalry_period_start/end in YYYY form when determinable.\n\
- The summary is 200-300 words and leads with the defining aspect of the \
rivalry.";

/// Targeted retrieval probes run before synthesis. `{1}` and `{2}` expand to
/// the two entity labels.
const RETRIEVAL_PROBES: &[&str] = &[
    "conflicts between {1} and {2}",
    "disputes between {1} and {2}",
    "what {1} said about {2}",
    "what {2} said about {1}",
    "meetings between {1} and {2}",
    "criticism rivalry feud {1} {2}",
    "priority dispute controversy {1} {2}",
];

/// Everything the synthesizer needs to know, pre-rendered.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    pub entity1: RivalryEntity,
    pub entity2: RivalryEntity,
    pub relationships: Vec<Relationship>,
    pub shared_properties: BTreeMap<String, SharedProperty>,
    pub sources: BTreeMap<String, Source>,
}

impl AnalysisContext {
    /// Render the context block handed to the model.
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str(&render_entity("Entity 1", &self.entity1));
        out.push_str(&render_entity("Entity 2", &self.entity2));

        out.push_str("\nDirect Relationships Found:\n");
        if self.relationships.is_empty() {
            out.push_str("No direct relationships found in the knowledge graph.\n");
        } else {
            for rel in &self.relationships {
                out.push_str(&format!(
                    "- {} --[{}]--> {}\n",
                    rel.source_entity_label, rel.property_label, rel.target_entity_label
                ));
            }
        }

        out.push_str("\nShared Properties (Common Connections):\n");
        if self.shared_properties.is_empty() {
            out.push_str("No shared properties found.\n");
        } else {
            // Cap the listing to keep the prompt bounded.
            for (_, prop) in self.shared_properties.iter().take(15) {
                let labels: Vec<&str> = prop
                    .values
                    .iter()
                    .take(3)
                    .map(|v| v.label.as_str())
                    .collect();
                let mut line = format!("- Both: {} = {}", prop.label, labels.join(", "));
                if prop.values.len() > 3 {
                    line.push_str(&format!(" (and {} more)", prop.values.len() - 3));
                }
                line.push('\n');
                out.push_str(&line);
            }
        }

        out.push_str("\nAvailable Sources (for citation in timeline events):\n");
        if self.sources.is_empty() {
            out.push_str("No sources available.\n");
        } else {
            for source in self.sources.values() {
                out.push_str(&format!(
                    "- Source ID: {}\n  - Type: {}\n  - Title: {}\n  - URL: {}\n  - Credibility: {:.2}\n  - Primary Source: {}\n",
                    source.source_id,
                    source.source_type,
                    source.title,
                    source.url,
                    source.credibility_score,
                    source.is_primary_source,
                ));
            }
        }

        out.push_str(
            "\nBased on this data and the biographical excerpts, analyze whether a \
             rivalry exists between these two people.\n",
        );
        out
    }

    fn probe_queries(&self) -> Vec<String> {
        RETRIEVAL_PROBES
            .iter()
            .map(|probe| {
                probe
                    .replace("{1}", &self.entity1.label)
                    .replace("{2}", &self.entity2.label)
            })
            .collect()
    }
}

fn render_entity(heading: &str, entity: &RivalryEntity) -> String {
    format!(
        "{heading}:\n\
         - ID: {}\n\
         - Name: {}\n\
         - Description: {}\n\
         - Birth Date: {}\n\
         - Death Date: {}\n\
         - Occupation: {}\n\
         - Nationality: {}\n",
        entity.id,
        entity.label,
        entity.description.as_deref().unwrap_or("N/A"),
        entity.birth_date.as_deref().unwrap_or("Unknown"),
        entity.death_date.as_deref().unwrap_or("Unknown"),
        if entity.occupation.is_empty() {
            "N/A".to_string()
        } else {
            entity.occupation.join(", ")
        },
        entity.nationality.as_deref().unwrap_or("N/A"),
    )
}

/// OpenAI-compatible synthesizer using the JSON-schema response format.
#[derive(Clone)]
pub struct OpenAiSynthesizer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl OpenAiSynthesizer {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(180))
                .build()
                .expect("failed to create HTTP client"),
            api_key: api_key.into(),
            model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    /// Create from the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self, ResearchError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ResearchError::Config("OPENAI_API_KEY not set".to_string()))?;
        Ok(Self::new(api_key))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom base URL (proxies, compatible providers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn generate_structured(
        &self,
        system: &str,
        user: &str,
        schema: serde_json::Value,
    ) -> Result<String, ResearchError> {
        let request = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": 0.0,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "rivalry_analysis",
                    "schema": schema,
                },
            },
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ResearchError::Synthesis(Box::new(e)))?
            .error_for_status()
            .map_err(|e| ResearchError::Synthesis(Box::new(e)))?;

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ResearchError::Synthesis(Box::new(e)))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                ResearchError::Synthesis("model returned no content".to_string().into())
            })
    }
}

#[async_trait]
impl Synthesizer for OpenAiSynthesizer {
    async fn synthesize(
        &self,
        context: &str,
        retriever: &dyn Retriever,
    ) -> Result<StructuredAnalysis, ResearchError> {
        // The retrieval callback stands in for a tool-calling loop: probe the
        // document store up front and fold the evidence into the prompt.
        let mut evidence = String::new();
        let mut chunk_count = 0usize;
        for query in probe_queries_from_context(context) {
            for chunk in retriever.retrieve(&query).await {
                chunk_count += 1;
                evidence.push_str(&format!(
                    "\n[excerpt {} | source {}]\n{}\n",
                    chunk_count, chunk.source_id, chunk.content
                ));
            }
        }
        debug!(chunks = chunk_count, "collected retrieval evidence");

        let user = format!(
            "{context}\n\nBiographical document excerpts retrieved for this \
             analysis:\n{evidence}"
        );

        let schema = serde_json::to_value(schemars::schema_for!(StructuredAnalysis))?;
        let raw = self.generate_structured(SYSTEM_PROMPT, &user, schema).await?;

        let analysis: StructuredAnalysis = serde_json::from_str(&raw)
            .map_err(|e| ResearchError::Synthesis(Box::new(e)))?;

        info!(
            rivalry_exists = analysis.rivalry_exists,
            score = analysis.rivalry_score,
            events = analysis.timeline.len(),
            "synthesis complete"
        );
        Ok(analysis)
    }
}

/// Recover the probe queries from a rendered context.
///
/// The rendered block names both entities on its `Name:` lines; the probes
/// need just the two labels.
fn probe_queries_from_context(context: &str) -> Vec<String> {
    let labels: Vec<&str> = context
        .lines()
        .filter_map(|line| line.trim().strip_prefix("- Name: "))
        .take(2)
        .collect();

    match labels.as_slice() {
        [first, second] => RETRIEVAL_PROBES
            .iter()
            .map(|probe| probe.replace("{1}", first).replace("{2}", second))
            .collect(),
        _ => vec!["rivalry conflict dispute".to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rivalry_entity(id: &str, label: &str) -> RivalryEntity {
        RivalryEntity {
            id: id.to_string(),
            label: label.to_string(),
            description: None,
            birth_date: Some("1643-01-04".to_string()),
            death_date: None,
            occupation: vec!["physicist".to_string()],
            nationality: Some("Q145".to_string()),
        }
    }

    fn context() -> AnalysisContext {
        AnalysisContext {
            entity1: rivalry_entity("Q935", "Isaac Newton"),
            entity2: rivalry_entity("Q9047", "Gottfried Wilhelm Leibniz"),
            relationships: Vec::new(),
            shared_properties: BTreeMap::new(),
            sources: BTreeMap::new(),
        }
    }

    #[test]
    fn test_render_contains_entities_and_sections() {
        let rendered = context().render();

        assert!(rendered.contains("- ID: Q935"));
        assert!(rendered.contains("- Name: Isaac Newton"));
        assert!(rendered.contains("- Name: Gottfried Wilhelm Leibniz"));
        assert!(rendered.contains("Direct Relationships Found:"));
        assert!(rendered.contains("No sources available."));
    }

    #[test]
    fn test_probe_queries_expand_labels() {
        let queries = context().probe_queries();
        assert_eq!(queries.len(), RETRIEVAL_PROBES.len());
        assert!(queries[0].contains("Isaac Newton"));
        assert!(queries[0].contains("Gottfried Wilhelm Leibniz"));
    }

    #[test]
    fn test_probe_queries_recovered_from_rendered_context() {
        let rendered = context().render();
        let queries = probe_queries_from_context(&rendered);

        assert_eq!(queries.len(), RETRIEVAL_PROBES.len());
        assert!(queries
            .iter()
            .all(|q| q.contains("Isaac Newton") && q.contains("Gottfried Wilhelm Leibniz")));
    }

    #[test]
    fn test_probe_queries_fallback_without_labels() {
        let queries = probe_queries_from_context("no entity lines here");
        assert_eq!(queries, vec!["rivalry conflict dispute".to_string()]);
    }
}
