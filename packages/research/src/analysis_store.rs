//! Saving and loading rivalry analyses.
//!
//! One directory per entity pair: `analyses/<id1>_<id2>/analysis.json`.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::catalog::SourceCatalog;
use crate::error::{ResearchError, Result};
use crate::layout::StorageLayout;
use crate::types::RivalryAnalysis;

/// Listing entry for one saved analysis.
#[derive(Debug, Clone)]
pub struct AnalysisListing {
    pub analysis_id: String,
    pub entity1_id: String,
    pub entity2_id: String,
    pub path: PathBuf,
    pub analyzed_at: Option<String>,
}

/// Save an analysis as pretty-printed JSON; returns the file path.
pub fn save_analysis(layout: &StorageLayout, analysis: &RivalryAnalysis) -> Result<PathBuf> {
    let analysis_dir = layout.analyses_dir().join(analysis.analysis_id());
    std::fs::create_dir_all(&analysis_dir)?;

    let output_file = analysis_dir.join("analysis.json");
    let json = serde_json::to_string_pretty(analysis)?;
    std::fs::write(&output_file, json)?;

    info!(path = %output_file.display(), "saved analysis");
    Ok(output_file)
}

/// Load an analysis by its `<id1>_<id2>` identifier.
pub fn load_analysis(layout: &StorageLayout, analysis_id: &str) -> Result<RivalryAnalysis> {
    let analysis_file = layout
        .analyses_dir()
        .join(analysis_id)
        .join("analysis.json");

    if !analysis_file.exists() {
        return Err(ResearchError::AnalysisNotFound {
            id: analysis_id.to_string(),
        });
    }

    let json = std::fs::read_to_string(&analysis_file)?;
    let analysis = serde_json::from_str(&json)?;
    info!(path = %analysis_file.display(), "loaded analysis");
    Ok(analysis)
}

/// Replace an analysis's source records with fresh rows from the catalog.
///
/// Useful when the saved JSON predates catalog repairs or path backfills.
pub async fn hydrate_sources(
    analysis: &mut RivalryAnalysis,
    catalog: &dyn SourceCatalog,
) -> Result<()> {
    if analysis.sources.is_empty() {
        return Ok(());
    }

    let ids: Vec<String> = analysis.sources.keys().cloned().collect();
    let hydrated = catalog.get_by_ids(&ids).await?;

    for (id, source) in hydrated {
        analysis.sources.insert(id, source);
    }
    Ok(())
}

/// List saved analyses, newest first.
pub fn list_analyses(layout: &StorageLayout) -> Result<Vec<AnalysisListing>> {
    let analyses_dir = layout.analyses_dir();
    if !analyses_dir.exists() {
        return Ok(Vec::new());
    }

    let mut listings = Vec::new();
    for entry in std::fs::read_dir(&analyses_dir)? {
        let dir = entry?.path();
        if !dir.is_dir() {
            continue;
        }

        let analysis_file = dir.join("analysis.json");
        if !analysis_file.exists() {
            continue;
        }

        let analysis_id = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let Some((entity1_id, entity2_id)) = analysis_id.split_once('_') else {
            warn!(dir = %analysis_id, "unexpected analysis directory format");
            continue;
        };

        let analyzed_at = std::fs::read_to_string(&analysis_file)
            .ok()
            .and_then(|json| serde_json::from_str::<serde_json::Value>(&json).ok())
            .and_then(|v| {
                v.get("analyzed_at")
                    .and_then(|t| t.as_str())
                    .map(String::from)
            });

        listings.push(AnalysisListing {
            analysis_id: analysis_id.clone(),
            entity1_id: entity1_id.to_string(),
            entity2_id: entity2_id.to_string(),
            path: analysis_file,
            analyzed_at,
        });
    }

    listings.sort_by(|a, b| b.analyzed_at.cmp(&a.analyzed_at));
    Ok(listings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnalysisMetadata, RivalryEntity, SourcesSummary};
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn sample_analysis(id1: &str, id2: &str) -> RivalryAnalysis {
        let entity = |id: &str| RivalryEntity {
            id: id.to_string(),
            label: format!("Person {id}"),
            description: None,
            birth_date: None,
            death_date: None,
            occupation: Vec::new(),
            nationality: None,
        };

        RivalryAnalysis {
            entity1: entity(id1),
            entity2: entity(id2),
            rivalry_exists: true,
            rivalry_score: 0.8,
            rivalry_period_start: Some("1684".to_string()),
            rivalry_period_end: Some("1716".to_string()),
            summary: "A famous dispute.".to_string(),
            timeline: Vec::new(),
            relationships: Vec::new(),
            sources: BTreeMap::new(),
            sources_summary: SourcesSummary::default(),
            analyzed_at: Utc::now(),
            analysis_metadata: AnalysisMetadata::default(),
        }
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(tmp.path());
        let analysis = sample_analysis("Q935", "Q9047");

        let path = save_analysis(&layout, &analysis).unwrap();
        assert!(path.ends_with("analyses/Q935_Q9047/analysis.json"));

        let loaded = load_analysis(&layout, "Q935_Q9047").unwrap();
        assert_eq!(loaded.entity1.id, "Q935");
        assert_eq!(loaded.rivalry_score, 0.8);
        assert_eq!(loaded.summary, "A famous dispute.");
    }

    #[test]
    fn test_load_missing_analysis() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(tmp.path());

        let err = load_analysis(&layout, "Q1_Q2").unwrap_err();
        assert!(matches!(err, ResearchError::AnalysisNotFound { .. }));
    }

    #[test]
    fn test_list_analyses() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(tmp.path());

        save_analysis(&layout, &sample_analysis("Q935", "Q9047")).unwrap();
        save_analysis(&layout, &sample_analysis("Q9021", "Q93996")).unwrap();

        let listings = list_analyses(&layout).unwrap();
        assert_eq!(listings.len(), 2);
        assert!(listings.iter().any(|l| l.analysis_id == "Q935_Q9047"));
        assert!(listings.iter().all(|l| l.analyzed_at.is_some()));
    }
}
