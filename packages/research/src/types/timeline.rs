//! Timeline events and their citation links.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How an event relates to the rivalry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RivalryRelevance {
    /// Head-to-head conflict
    Direct,
    /// Competing work, simultaneous discoveries
    Parallel,
    /// Establishing competitive overlap
    Context,
    /// Ending, recognition, reconciliation
    Resolution,
}

/// A link from a timeline claim to one supporting source.
///
/// Many-to-many: one event cites 0..N sources, one source can support many
/// events.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EventSource {
    pub source_id: String,
    /// The excerpt from the source that evidences the claim
    pub supporting_text: String,
    pub page_reference: Option<String>,
}

/// One rivalry-relevant incident.
///
/// `source_count`, `has_multiple_sources`, `has_primary_source`, and
/// `confidence` are derived by the evidence validator on every analysis run;
/// they are never persisted independently and never cached.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TimelineEvent {
    /// Free-form date: year, ISO date, or an era ("late 1600s")
    pub date: String,
    /// achievement, conflict, publication, meeting, correspondence, ...
    pub event_type: String,
    /// May embed inline `{source_id}` citation markers
    pub description: String,
    /// One of the two subject IDs, or "both"
    pub entity_id: String,
    pub rivalry_relevance: RivalryRelevance,
    #[serde(default)]
    pub direct_quotes: Vec<String>,
    #[serde(default)]
    pub sources: Vec<EventSource>,
    #[serde(default)]
    pub source_count: usize,
    #[serde(default)]
    pub has_multiple_sources: bool,
    #[serde(default)]
    pub has_primary_source: bool,
    #[serde(default)]
    pub confidence: f64,
}
