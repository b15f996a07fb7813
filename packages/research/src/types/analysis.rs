//! The root analysis output and the synthesis boundary type.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::entity::{Relationship, RivalryEntity};
use super::source::{Source, SourcesSummary};
use super::timeline::TimelineEvent;

/// The model-authored part of an analysis.
///
/// This is exactly what the synthesis collaborator returns; the pipeline
/// wraps it into a [`RivalryAnalysis`] by attaching the entities, the
/// relationship records, the catalog slice, and the computed summary.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StructuredAnalysis {
    pub rivalry_exists: bool,
    /// Strength of the rivalry, 0 = none, 1 = intense
    pub rivalry_score: f64,
    /// When the rivalry began (YYYY), if one exists
    pub rivalry_period_start: Option<String>,
    /// When it ended or was resolved (YYYY), null if ongoing
    pub rivalry_period_end: Option<String>,
    /// Natural-language summary of the rivalry
    pub summary: String,
    /// Rivalry-relevant events only, chronologically sorted
    #[serde(default)]
    pub timeline: Vec<TimelineEvent>,
}

/// Run metadata recorded alongside each analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub pipeline_version: String,
    pub model_used: String,
    pub total_sources: usize,
}

/// Complete analysis of the rivalry between two people.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RivalryAnalysis {
    pub entity1: RivalryEntity,
    pub entity2: RivalryEntity,
    pub rivalry_exists: bool,
    pub rivalry_score: f64,
    pub rivalry_period_start: Option<String>,
    pub rivalry_period_end: Option<String>,
    pub summary: String,
    #[serde(default)]
    pub timeline: Vec<TimelineEvent>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    /// The catalog slice actually offered to the synthesizer, by source ID
    #[serde(default)]
    pub sources: BTreeMap<String, Source>,
    #[serde(default)]
    pub sources_summary: SourcesSummary,
    pub analyzed_at: DateTime<Utc>,
    #[serde(default)]
    pub analysis_metadata: AnalysisMetadata,
}

impl RivalryAnalysis {
    /// Directory name this analysis is stored under: `<id1>_<id2>`.
    pub fn analysis_id(&self) -> String {
        format!("{}_{}", self.entity1.id, self.entity2.id)
    }
}
