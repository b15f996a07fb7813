//! Core data model: sources, entities, timeline events, and analyses.

pub mod analysis;
pub mod entity;
pub mod source;
pub mod timeline;

pub use analysis::{AnalysisMetadata, RivalryAnalysis, StructuredAnalysis};
pub use entity::{EntitySearchResult, KgEntity, Relationship, RivalryEntity, SharedProperty, SharedValue};
pub use source::{DateRange, Source, SourceType, SourcesSummary};
pub use timeline::{EventSource, RivalryRelevance, TimelineEvent};
