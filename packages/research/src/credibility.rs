//! Source credibility scoring and primary/secondary classification.

use crate::types::{Source, SourceType};

/// Venue names that earn a small credibility boost on substring match.
const REPUTABLE_VENUES: &[&str] = &[
    "nature",
    "science",
    "cell",
    "lancet",
    "nejm",
    "new york times",
    "washington post",
    "guardian",
    "bbc",
    "oxford",
    "cambridge",
    "harvard",
    "mit press",
    "britannica",
    "stanford",
];

const VENUE_BOOST: f64 = 0.05;

/// Base credibility by source type. Unknown kinds score mid-range.
fn base_score(source_type: SourceType) -> f64 {
    match source_type {
        SourceType::AcademicPaper | SourceType::PeerReviewedJournal => 0.95,
        SourceType::ArxivPaper => 0.90,
        SourceType::Government | SourceType::Letter => 0.90,
        SourceType::Book | SourceType::Encyclopedia => 0.85,
        SourceType::Interview | SourceType::Publication => 0.85,
        SourceType::NewsArticle | SourceType::Archive | SourceType::Biography => 0.80,
        SourceType::Wikipedia => 0.75,
        SourceType::Autobiography
        | SourceType::Diary
        | SourceType::Manuscript
        | SourceType::OriginalPublication
        | SourceType::Speech
        | SourceType::Memoir => 0.85,
        SourceType::Web | SourceType::Manual | SourceType::Unknown => 0.50,
    }
}

/// Calculate the credibility score for a source type and optional venue.
///
/// The score is the fixed per-type base, boosted by [`VENUE_BOOST`] when the
/// publication matches the reputable-venue list (case-insensitive substring),
/// capped at 1.0.
pub fn credibility_score(source_type: SourceType, publication: Option<&str>) -> f64 {
    let mut score = base_score(source_type);

    if let Some(publication) = publication {
        let publication = publication.to_lowercase();
        if REPUTABLE_VENUES.iter().any(|v| publication.contains(v)) {
            score = (score + VENUE_BOOST).min(1.0);
        }
    }

    score
}

/// Whether this source type is first-hand by nature, regardless of
/// authorship.
pub fn is_primary_type(source_type: SourceType) -> bool {
    matches!(
        source_type,
        SourceType::Letter
            | SourceType::Interview
            | SourceType::Autobiography
            | SourceType::Diary
            | SourceType::Manuscript
            | SourceType::OriginalPublication
            | SourceType::Speech
            | SourceType::Memoir
    )
}

/// Authorship-overlap heuristic for primary-source detection.
///
/// Case-insensitive substring containment in either direction. Intentionally
/// permissive: false positives on common surnames are accepted over false
/// negatives.
pub fn entity_among_authors(entity_label: &str, authors: &[String]) -> bool {
    let entity = entity_label.to_lowercase();
    authors.iter().any(|author| {
        let author = author.to_lowercase();
        author.contains(&entity) || entity.contains(&author)
    })
}

/// Sort sources by credibility, highest first.
pub fn rank_by_credibility(mut sources: Vec<Source>) -> Vec<Source> {
    sources.sort_by(|a, b| {
        b.credibility_score
            .partial_cmp(&a.credibility_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    sources
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_scores() {
        assert_eq!(credibility_score(SourceType::Wikipedia, None), 0.75);
        assert_eq!(credibility_score(SourceType::AcademicPaper, None), 0.95);
        assert_eq!(credibility_score(SourceType::ArxivPaper, None), 0.90);
        assert_eq!(credibility_score(SourceType::Unknown, None), 0.50);
    }

    #[test]
    fn test_venue_boost_capped() {
        let boosted = credibility_score(SourceType::AcademicPaper, Some("Nature Physics"));
        assert_eq!(boosted, 1.0);

        let modest = credibility_score(SourceType::NewsArticle, Some("The Guardian"));
        assert!((modest - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_venue_match_is_case_insensitive() {
        let a = credibility_score(SourceType::Book, Some("OXFORD University Press"));
        let b = credibility_score(SourceType::Book, Some("oxford university press"));
        assert_eq!(a, b);
        assert!((a - 0.90).abs() < 1e-9);
    }

    #[test]
    fn test_primary_types() {
        assert!(is_primary_type(SourceType::Letter));
        assert!(is_primary_type(SourceType::Memoir));
        assert!(!is_primary_type(SourceType::Wikipedia));
        assert!(!is_primary_type(SourceType::AcademicPaper));
    }

    #[test]
    fn test_authorship_overlap_either_direction() {
        let authors = vec!["I. Newton".to_string(), "G. Leibniz".to_string()];
        assert!(entity_among_authors("Newton", &authors));
        // Author string contained in entity label
        let authors = vec!["Planck".to_string()];
        assert!(entity_among_authors("Max Planck", &authors));
        assert!(!entity_among_authors("Ernst Mach", &authors));
    }
}
