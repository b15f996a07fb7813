//! Evidence validation: resolving citations and computing confidence.
//!
//! Confidence is recomputed from the catalog slice on every run, never
//! cached. A citation to an unknown source ID is dropped with a warning;
//! the remaining citations still count.

use std::collections::BTreeMap;

use tracing::warn;

use crate::types::{DateRange, EventSource, RivalryAnalysis, Source, SourcesSummary};

const MULTI_SOURCE_BOOST: f64 = 0.1;
const PRIMARY_SOURCE_BOOST: f64 = 0.1;

/// Validation metadata for one event's citations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceValidation {
    pub source_count: usize,
    pub has_multiple_sources: bool,
    pub has_primary_source: bool,
    pub confidence: f64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Confidence for an event given its resolved sources.
///
/// Mean credibility plus corroboration and primary-source boosts, clamped to
/// [0, 1] and rounded to 2 decimals. Zero sources means exactly 0.0.
pub fn event_confidence(
    sources: &[&Source],
    has_multiple_sources: bool,
    has_primary_source: bool,
) -> f64 {
    if sources.is_empty() {
        return 0.0;
    }

    let avg: f64 =
        sources.iter().map(|s| s.credibility_score).sum::<f64>() / sources.len() as f64;
    let multi = if has_multiple_sources { MULTI_SOURCE_BOOST } else { 0.0 };
    let primary = if has_primary_source { PRIMARY_SOURCE_BOOST } else { 0.0 };

    round2((avg + multi + primary).clamp(0.0, 1.0))
}

/// Resolve an event's citations against a catalog slice.
pub fn validate_event_sources(
    event_sources: &[EventSource],
    catalog: &BTreeMap<String, Source>,
) -> SourceValidation {
    if event_sources.is_empty() {
        return SourceValidation::default();
    }

    let mut resolved: Vec<&Source> = Vec::with_capacity(event_sources.len());
    for event_source in event_sources {
        match catalog.get(&event_source.source_id) {
            Some(source) => resolved.push(source),
            None => {
                warn!(source_id = %event_source.source_id, "cited source not found in catalog");
            }
        }
    }

    let has_multiple = resolved.len() > 1;
    let has_primary = resolved.iter().any(|s| s.is_primary_source);

    SourceValidation {
        source_count: resolved.len(),
        has_multiple_sources: has_multiple,
        has_primary_source: has_primary,
        confidence: event_confidence(&resolved, has_multiple, has_primary),
    }
}

/// Compute aggregate statistics over a catalog slice.
pub fn compute_sources_summary(sources: &BTreeMap<String, Source>) -> SourcesSummary {
    if sources.is_empty() {
        return SourcesSummary::default();
    }

    let mut by_type: BTreeMap<String, usize> = BTreeMap::new();
    let mut primary = 0usize;
    let mut credibility_sum = 0.0f64;
    let mut dates: Vec<&str> = Vec::new();

    for source in sources.values() {
        *by_type.entry(source.source_type.as_str().to_string()).or_insert(0) += 1;
        if source.is_primary_source {
            primary += 1;
        }
        credibility_sum += source.credibility_score;
        if let Some(date) = source.publication_date.as_deref() {
            dates.push(date);
        }
    }

    let total = sources.len();

    // Best-effort lexicographic ordering over mixed YYYY / YYYY-MM-DD
    // strings, not calendar-aware.
    let date_range = if dates.is_empty() {
        None
    } else {
        dates.sort_unstable();
        Some(DateRange {
            earliest: dates[0].to_string(),
            latest: dates[dates.len() - 1].to_string(),
        })
    };

    SourcesSummary {
        total_sources: total,
        by_type,
        primary_sources: primary,
        secondary_sources: total - primary,
        average_credibility: round2(credibility_sum / total as f64),
        date_range,
    }
}

/// Recompute every derived field on an analysis in place.
///
/// Runs per-event validation against the analysis's own catalog slice, then
/// refreshes the sources summary.
pub fn apply_validation(analysis: &mut RivalryAnalysis) {
    for event in &mut analysis.timeline {
        let validation = validate_event_sources(&event.sources, &analysis.sources);
        event.source_count = validation.source_count;
        event.has_multiple_sources = validation.has_multiple_sources;
        event.has_primary_source = validation.has_primary_source;
        event.confidence = validation.confidence;
    }
    analysis.sources_summary = compute_sources_summary(&analysis.sources);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceType;

    fn source(id: &str, source_type: SourceType, credibility: f64, primary: bool) -> Source {
        Source::new(id, source_type, format!("Title {id}"), format!("https://example.com/{id}"))
            .with_credibility(credibility)
            .with_primary(primary)
    }

    fn catalog(sources: Vec<Source>) -> BTreeMap<String, Source> {
        sources.into_iter().map(|s| (s.source_id.clone(), s)).collect()
    }

    fn cite(id: &str) -> EventSource {
        EventSource {
            source_id: id.to_string(),
            supporting_text: "supporting excerpt".to_string(),
            page_reference: None,
        }
    }

    #[test]
    fn test_no_sources_means_zero_confidence() {
        let validation = validate_event_sources(&[], &BTreeMap::new());
        assert_eq!(validation.confidence, 0.0);
        assert_eq!(validation.source_count, 0);
        assert!(!validation.has_multiple_sources);
        assert!(!validation.has_primary_source);
    }

    #[test]
    fn test_unknown_citation_is_dropped_not_fatal() {
        let cat = catalog(vec![source("a", SourceType::Wikipedia, 0.75, false)]);
        let validation = validate_event_sources(&[cite("a"), cite("ghost")], &cat);

        assert_eq!(validation.source_count, 1);
        assert!(!validation.has_multiple_sources);
        assert_eq!(validation.confidence, 0.75);
    }

    #[test]
    fn test_confidence_bounds() {
        let cat = catalog(vec![
            source("a", SourceType::AcademicPaper, 0.95, true),
            source("b", SourceType::AcademicPaper, 0.95, true),
        ]);
        let validation = validate_event_sources(&[cite("a"), cite("b")], &cat);
        assert!(validation.confidence >= 0.0 && validation.confidence <= 1.0);
        // 0.95 + 0.1 + 0.1 clamps at 1.0
        assert_eq!(validation.confidence, 1.0);
    }

    #[test]
    fn test_confidence_monotonic_in_primary_source() {
        let secondary_only = catalog(vec![source("a", SourceType::Wikipedia, 0.75, false)]);
        let base = validate_event_sources(&[cite("a")], &secondary_only).confidence;

        let with_primary = catalog(vec![
            source("a", SourceType::Wikipedia, 0.75, false),
            source("p", SourceType::Letter, 0.90, true),
        ]);
        let boosted = validate_event_sources(&[cite("a"), cite("p")], &with_primary).confidence;

        assert!(boosted >= base);
    }

    #[test]
    fn test_confidence_monotonic_in_corroboration() {
        let cat = catalog(vec![
            source("a", SourceType::Wikipedia, 0.75, false),
            source("b", SourceType::Wikipedia, 0.75, false),
        ]);
        let single = validate_event_sources(&[cite("a")], &cat).confidence;
        let double = validate_event_sources(&[cite("a"), cite("b")], &cat).confidence;
        assert!(double >= single);
    }

    #[test]
    fn test_summary_scenario() {
        let cat = catalog(vec![
            source("w", SourceType::Wikipedia, 0.75, false),
            source("p1", SourceType::AcademicPaper, 0.95, true),
            source("p2", SourceType::AcademicPaper, 0.95, false),
        ]);

        let summary = compute_sources_summary(&cat);

        assert_eq!(summary.total_sources, 3);
        assert_eq!(summary.by_type.get("wikipedia"), Some(&1));
        assert_eq!(summary.by_type.get("academic_paper"), Some(&2));
        assert_eq!(summary.primary_sources, 1);
        assert_eq!(summary.secondary_sources, 2);
        // (0.75 + 0.95 + 0.95) / 3 = 0.8833... rounds to 0.88
        assert_eq!(summary.average_credibility, 0.88);
    }

    #[test]
    fn test_summary_date_range_lexicographic() {
        let mut a = source("a", SourceType::AcademicPaper, 0.95, false);
        a.publication_date = Some("1999".to_string());
        let mut b = source("b", SourceType::AcademicPaper, 0.95, false);
        b.publication_date = Some("2004-06-01".to_string());
        let mut c = source("c", SourceType::AcademicPaper, 0.95, false);
        c.publication_date = None;

        let summary = compute_sources_summary(&catalog(vec![a, b, c]));
        let range = summary.date_range.unwrap();
        assert_eq!(range.earliest, "1999");
        assert_eq!(range.latest, "2004-06-01");
    }

    #[test]
    fn test_empty_summary() {
        let summary = compute_sources_summary(&BTreeMap::new());
        assert_eq!(summary.total_sources, 0);
        assert_eq!(summary.average_credibility, 0.0);
        assert!(summary.date_range.is_none());
    }
}
