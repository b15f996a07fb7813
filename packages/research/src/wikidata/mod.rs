//! Knowledge-graph boundary: Wikidata SPARQL and MediaWiki API client.
//!
//! Consumed, not reimplemented: this module only turns remote entity and
//! relationship records into the typed structures the pipeline needs.

pub mod claims;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ResearchError, Result};
use crate::fetchers::FetchPacer;
use crate::types::{
    EntitySearchResult, KgEntity, Relationship, RivalryEntity, SharedProperty, SharedValue,
};

/// The knowledge-graph collaborator as the pipeline consumes it.
#[async_trait]
pub trait KnowledgeGraph: Send + Sync {
    async fn get_entity(&self, entity_id: &str) -> Result<KgEntity>;

    async fn get_direct_relationships(
        &self,
        entity1: &KgEntity,
        entity2: &KgEntity,
    ) -> Result<Vec<Relationship>>;

    async fn get_shared_properties(
        &self,
        entity_id1: &str,
        entity_id2: &str,
    ) -> Result<BTreeMap<String, SharedProperty>>;
}

const SPARQL_ENDPOINT: &str = "https://query.wikidata.org/sparql";
const MEDIAWIKI_API: &str = "https://www.wikidata.org/w/api.php";
const USER_AGENT: &str = "RivalryResearch/0.1.0 (https://github.com/rivalry-research)";
const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(100);

pub struct WikidataClient {
    client: reqwest::Client,
    pacer: FetchPacer,
    sparql_endpoint: String,
    api_endpoint: String,
}

impl Default for WikidataClient {
    fn default() -> Self {
        Self::new()
    }
}

impl WikidataClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .user_agent(USER_AGENT)
                .build()
                .expect("failed to create HTTP client"),
            pacer: FetchPacer::with_min_interval(MIN_REQUEST_INTERVAL),
            sparql_endpoint: SPARQL_ENDPOINT.to_string(),
            api_endpoint: MEDIAWIKI_API.to_string(),
        }
    }

    /// Override endpoints and pacing (tests, mirrors).
    pub fn with_endpoints(
        mut self,
        sparql_endpoint: impl Into<String>,
        api_endpoint: impl Into<String>,
    ) -> Self {
        self.sparql_endpoint = sparql_endpoint.into();
        self.api_endpoint = api_endpoint.into();
        self
    }

    pub fn with_pacer(mut self, pacer: FetchPacer) -> Self {
        self.pacer = pacer;
        self
    }

    fn kg_error(e: impl std::error::Error + Send + Sync + 'static) -> ResearchError {
        ResearchError::KnowledgeGraph(Box::new(e))
    }

    /// Search entities by name, for disambiguation.
    pub async fn search_entities(
        &self,
        search_term: &str,
        limit: usize,
    ) -> Result<Vec<EntitySearchResult>> {
        self.pacer.pace().await;

        let limit_param = limit.to_string();
        let response = self
            .client
            .get(&self.api_endpoint)
            .query(&[
                ("action", "wbsearchentities"),
                ("search", search_term),
                ("language", "en"),
                ("type", "item"),
                ("limit", limit_param.as_str()),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(Self::kg_error)?
            .error_for_status()
            .map_err(Self::kg_error)?;

        let data: Value = response.json().await.map_err(Self::kg_error)?;

        let results = data
            .get("search")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        Some(EntitySearchResult {
                            id: item.get("id")?.as_str()?.to_string(),
                            label: item
                                .get("label")
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .to_string(),
                            description: item
                                .get("description")
                                .and_then(Value::as_str)
                                .map(String::from),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(results)
    }

    /// Fetch a full entity record, including claims and the Wikipedia URL.
    pub async fn get_entity(&self, entity_id: &str) -> Result<KgEntity> {
        self.pacer.pace().await;

        let response = self
            .client
            .get(&self.api_endpoint)
            .query(&[
                ("action", "wbgetentities"),
                ("ids", entity_id),
                ("format", "json"),
                ("languages", "en"),
            ])
            .send()
            .await
            .map_err(Self::kg_error)?
            .error_for_status()
            .map_err(Self::kg_error)?;

        let data: Value = response.json().await.map_err(Self::kg_error)?;

        let entity_data = data
            .pointer(&format!("/entities/{entity_id}"))
            .ok_or_else(|| ResearchError::Entity {
                id: entity_id.to_string(),
                reason: "not found".to_string(),
            })?;

        if entity_data.get("missing").is_some() {
            return Err(ResearchError::Entity {
                id: entity_id.to_string(),
                reason: "does not exist".to_string(),
            });
        }

        let label = entity_data
            .pointer("/labels/en/value")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let description = entity_data
            .pointer("/descriptions/en/value")
            .and_then(Value::as_str)
            .map(String::from);

        let aliases = entity_data
            .pointer("/aliases/en")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(|a| a.get("value").and_then(Value::as_str).map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        let claims = entity_data
            .get("claims")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let wikipedia_url = entity_data
            .pointer("/sitelinks/enwiki/title")
            .and_then(Value::as_str)
            .map(|title| {
                format!(
                    "https://en.wikipedia.org/wiki/{}",
                    urlencoding::encode(&title.replace(' ', "_"))
                )
            });

        info!(entity = %entity_id, label = %label, "fetched knowledge-graph entity");

        Ok(KgEntity {
            id: entity_id.to_string(),
            label,
            description,
            aliases,
            claims,
            wikipedia_url,
        })
    }

    async fn execute_sparql(&self, query: &str) -> Result<Vec<Value>> {
        self.pacer.pace().await;

        let response = self
            .client
            .get(&self.sparql_endpoint)
            .header("Accept", "application/sparql-results+json")
            .query(&[("query", query), ("format", "json")])
            .send()
            .await
            .map_err(Self::kg_error)?
            .error_for_status()
            .map_err(Self::kg_error)?;

        let data: Value = response.json().await.map_err(Self::kg_error)?;

        data.pointer("/results/bindings")
            .and_then(Value::as_array)
            .cloned()
            .ok_or_else(|| {
                ResearchError::KnowledgeGraph("invalid SPARQL response format".to_string().into())
            })
    }

    /// Find properties directly connecting two entities, in either direction.
    pub async fn get_direct_relationships(
        &self,
        entity1: &KgEntity,
        entity2: &KgEntity,
    ) -> Result<Vec<Relationship>> {
        // UNION covers both directions; BIND tags which one matched.
        let query = format!(
            r#"
            SELECT ?prop ?propLabel ?direction WHERE {{
              {{
                wd:{id1} ?prop wd:{id2} .
                BIND("forward" AS ?direction)
              }}
              UNION
              {{
                wd:{id2} ?prop wd:{id1} .
                BIND("reverse" AS ?direction)
              }}
              FILTER(STRSTARTS(STR(?prop), "http://www.wikidata.org/prop/direct/"))
              SERVICE wikibase:label {{
                bd:serviceParam wikibase:language "en".
              }}
            }}
            "#,
            id1 = entity1.id,
            id2 = entity2.id,
        );

        let bindings = self.execute_sparql(&query).await?;
        debug!(count = bindings.len(), "direct relationship bindings");

        let relationships = bindings
            .iter()
            .filter_map(|binding| {
                let prop_uri = binding.pointer("/prop/value")?.as_str()?;
                let property_id = prop_uri.rsplit('/').next()?.to_string();
                let property_label = binding
                    .pointer("/propLabel/value")
                    .and_then(Value::as_str)
                    .unwrap_or(&property_id)
                    .to_string();
                let forward = binding
                    .pointer("/direction/value")
                    .and_then(Value::as_str)
                    .unwrap_or("forward")
                    == "forward";

                let (source, target) = if forward {
                    (entity1, entity2)
                } else {
                    (entity2, entity1)
                };

                Some(Relationship {
                    source_entity_id: source.id.clone(),
                    source_entity_label: source.label.clone(),
                    property_id,
                    property_label,
                    target_entity_id: target.id.clone(),
                    target_entity_label: target.label.clone(),
                })
            })
            .collect();

        Ok(relationships)
    }

    /// Find properties where both entities point at the same values.
    pub async fn get_shared_properties(
        &self,
        entity_id1: &str,
        entity_id2: &str,
    ) -> Result<BTreeMap<String, SharedProperty>> {
        // Entity values only: shared strings and dates are mostly noise.
        let query = format!(
            r#"
            SELECT ?prop ?propLabel ?value ?valueLabel WHERE {{
              wd:{entity_id1} ?prop ?value .
              wd:{entity_id2} ?prop ?value .
              FILTER(STRSTARTS(STR(?prop), "http://www.wikidata.org/prop/direct/"))
              FILTER(STRSTARTS(STR(?value), "http://www.wikidata.org/entity/Q"))
              SERVICE wikibase:label {{
                bd:serviceParam wikibase:language "en".
              }}
            }}
            LIMIT 50
            "#,
        );

        let bindings = self.execute_sparql(&query).await?;

        let mut shared: BTreeMap<String, SharedProperty> = BTreeMap::new();
        for binding in &bindings {
            let Some(prop_uri) = binding.pointer("/prop/value").and_then(Value::as_str) else {
                continue;
            };
            let Some(property_id) = prop_uri.rsplit('/').next().map(String::from) else {
                continue;
            };
            let property_label = binding
                .pointer("/propLabel/value")
                .and_then(Value::as_str)
                .unwrap_or(&property_id)
                .to_string();

            let value_id = binding
                .pointer("/value/value")
                .and_then(Value::as_str)
                .and_then(|uri| uri.rsplit('/').next())
                .unwrap_or_default()
                .to_string();
            let value_label = binding
                .pointer("/valueLabel/value")
                .and_then(Value::as_str)
                .unwrap_or(&value_id)
                .to_string();

            shared
                .entry(property_id)
                .or_insert_with(|| SharedProperty {
                    label: property_label,
                    values: Vec::new(),
                })
                .values
                .push(SharedValue {
                    id: value_id,
                    label: value_label,
                });
        }

        Ok(shared)
    }
}

#[async_trait]
impl KnowledgeGraph for WikidataClient {
    async fn get_entity(&self, entity_id: &str) -> Result<KgEntity> {
        WikidataClient::get_entity(self, entity_id).await
    }

    async fn get_direct_relationships(
        &self,
        entity1: &KgEntity,
        entity2: &KgEntity,
    ) -> Result<Vec<Relationship>> {
        WikidataClient::get_direct_relationships(self, entity1, entity2).await
    }

    async fn get_shared_properties(
        &self,
        entity_id1: &str,
        entity_id2: &str,
    ) -> Result<BTreeMap<String, SharedProperty>> {
        WikidataClient::get_shared_properties(self, entity_id1, entity_id2).await
    }
}

/// Build the biographical view of an entity from its claims.
///
/// P569 date of birth, P570 date of death, P106 occupation, P27 country of
/// citizenship.
pub fn to_rivalry_entity(entity: &KgEntity) -> RivalryEntity {
    RivalryEntity {
        id: entity.id.clone(),
        label: entity.label.clone(),
        description: entity.description.clone(),
        birth_date: claims::time_value(&entity.claims, "P569"),
        death_date: claims::time_value(&entity.claims, "P570"),
        occupation: claims::entity_values(&entity.claims, "P106"),
        nationality: claims::first_entity_value(&entity.claims, "P27"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_rivalry_entity_extracts_claims() {
        let claims = serde_json::from_value(serde_json::json!({
            "P569": [
                { "mainsnak": { "datavalue": { "value": { "time": "+1643-01-04T00:00:00Z" } } } }
            ],
            "P570": [
                { "mainsnak": { "datavalue": { "value": { "time": "+1727-03-31T00:00:00Z" } } } }
            ],
            "P106": [
                { "mainsnak": { "datavalue": { "value": { "id": "Q169470" } } } }
            ],
            "P27": [
                { "mainsnak": { "datavalue": { "value": { "id": "Q145" } } } }
            ]
        }))
        .unwrap();

        let entity = KgEntity {
            id: "Q935".to_string(),
            label: "Isaac Newton".to_string(),
            description: Some("English physicist".to_string()),
            aliases: Vec::new(),
            claims,
            wikipedia_url: None,
        };

        let rivalry = to_rivalry_entity(&entity);
        assert_eq!(rivalry.birth_date.as_deref(), Some("1643-01-04"));
        assert_eq!(rivalry.death_date.as_deref(), Some("1727-03-31"));
        assert_eq!(rivalry.occupation, vec!["Q169470"]);
        assert_eq!(rivalry.nationality.as_deref(), Some("Q145"));
    }

    #[test]
    fn test_to_rivalry_entity_tolerates_empty_claims() {
        let entity = KgEntity {
            id: "Q1".to_string(),
            label: "Nobody".to_string(),
            description: None,
            aliases: Vec::new(),
            claims: serde_json::Map::new(),
            wikipedia_url: None,
        };

        let rivalry = to_rivalry_entity(&entity);
        assert!(rivalry.birth_date.is_none());
        assert!(rivalry.occupation.is_empty());
    }
}
