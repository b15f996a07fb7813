//! Knowledge-graph entity records and the biographical view of them.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Search hit used for entity disambiguation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySearchResult {
    /// Knowledge-graph entity ID (e.g. "Q935")
    pub id: String,
    pub label: String,
    pub description: Option<String>,
}

/// Full knowledge-graph entity as returned by the boundary client.
///
/// `claims` stays a raw JSON map only until it crosses into
/// [`crate::wikidata::claims`], which resolves it through typed extractors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KgEntity {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub claims: serde_json::Map<String, serde_json::Value>,
    /// Direct URL to the English Wikipedia article, when one exists
    pub wikipedia_url: Option<String>,
}

/// A direct relationship between the two subjects.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Relationship {
    pub source_entity_id: String,
    pub source_entity_label: String,
    pub property_id: String,
    pub property_label: String,
    pub target_entity_id: String,
    pub target_entity_label: String,
}

/// One value both entities share under the same property.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedValue {
    pub id: String,
    pub label: String,
}

/// A property where both entities point at the same values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedProperty {
    pub label: String,
    pub values: Vec<SharedValue>,
}

/// Map of property ID to shared property data.
pub type SharedProperties = BTreeMap<String, SharedProperty>;

/// Biographical view of a subject, extracted from knowledge-graph claims.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RivalryEntity {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    /// YYYY or YYYY-MM-DD
    pub birth_date: Option<String>,
    pub death_date: Option<String>,
    #[serde(default)]
    pub occupation: Vec<String>,
    pub nationality: Option<String>,
}
