//! Typed extraction from knowledge-graph claims.
//!
//! Claims arrive as deeply nested untyped JSON. They are resolved here, once,
//! through a tagged union per datavalue kind; the raw maps never propagate
//! past this module.

use serde_json::Value;

/// A claim's resolved datavalue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimValue {
    /// Reference to another entity (Q-id)
    EntityRef(String),
    /// Point in time, normalized to YYYY-MM-DD (or shorter)
    Time(String),
    /// Plain string value
    Text(String),
}

impl ClaimValue {
    /// Resolve a single claim's main snak into a typed value.
    fn from_claim(claim: &Value) -> Option<Self> {
        let value = claim.pointer("/mainsnak/datavalue/value")?;

        if let Some(text) = value.as_str() {
            return Some(Self::Text(text.to_string()));
        }

        if let Some(id) = value.get("id").and_then(Value::as_str) {
            return Some(Self::EntityRef(id.to_string()));
        }

        if let Some(time) = value.get("time").and_then(Value::as_str) {
            return Some(Self::Time(normalize_time(time)));
        }

        None
    }
}

/// Normalize the knowledge graph's time format (`+1643-01-04T00:00:00Z`)
/// to a plain date string.
fn normalize_time(time: &str) -> String {
    let trimmed = time.trim_start_matches('+');
    match trimmed.split_once('T') {
        Some((date, _)) => date.to_string(),
        None => trimmed.to_string(),
    }
}

fn property_claims<'a>(
    claims: &'a serde_json::Map<String, Value>,
    property_id: &str,
) -> impl Iterator<Item = &'a Value> {
    claims
        .get(property_id)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

/// First time value for a property (e.g. P569, date of birth).
pub fn time_value(claims: &serde_json::Map<String, Value>, property_id: &str) -> Option<String> {
    property_claims(claims, property_id)
        .filter_map(ClaimValue::from_claim)
        .find_map(|v| match v {
            ClaimValue::Time(t) => Some(t),
            _ => None,
        })
}

/// All entity-reference values for a property (e.g. P106, occupation).
pub fn entity_values(claims: &serde_json::Map<String, Value>, property_id: &str) -> Vec<String> {
    property_claims(claims, property_id)
        .filter_map(ClaimValue::from_claim)
        .filter_map(|v| match v {
            ClaimValue::EntityRef(id) => Some(id),
            _ => None,
        })
        .collect()
}

/// First entity-reference value for a property (e.g. P27, citizenship).
pub fn first_entity_value(
    claims: &serde_json::Map<String, Value>,
    property_id: &str,
) -> Option<String> {
    entity_values(claims, property_id).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_fixture() -> serde_json::Map<String, Value> {
        serde_json::from_value(serde_json::json!({
            "P569": [
                { "mainsnak": { "datavalue": { "value": { "time": "+1643-01-04T00:00:00Z" } } } }
            ],
            "P106": [
                { "mainsnak": { "datavalue": { "value": { "id": "Q169470" } } } },
                { "mainsnak": { "datavalue": { "value": { "id": "Q170790" } } } },
                { "mainsnak": { "datavalue": { "value": "not an entity" } } }
            ],
            "P27": [
                { "mainsnak": { "datavalue": { "value": { "id": "Q145" } } } }
            ],
            "P999": [
                { "mainsnak": {} }
            ]
        }))
        .expect("valid fixture")
    }

    #[test]
    fn test_time_value_normalized() {
        let claims = claims_fixture();
        assert_eq!(time_value(&claims, "P569"), Some("1643-01-04".to_string()));
    }

    #[test]
    fn test_entity_values_skip_non_entities() {
        let claims = claims_fixture();
        assert_eq!(entity_values(&claims, "P106"), vec!["Q169470", "Q170790"]);
    }

    #[test]
    fn test_first_entity_value() {
        let claims = claims_fixture();
        assert_eq!(first_entity_value(&claims, "P27"), Some("Q145".to_string()));
    }

    #[test]
    fn test_missing_and_malformed_properties() {
        let claims = claims_fixture();
        assert_eq!(time_value(&claims, "P570"), None);
        assert_eq!(time_value(&claims, "P999"), None);
        assert!(entity_values(&claims, "P570").is_empty());
    }

    #[test]
    fn test_negative_years_keep_date_part() {
        assert_eq!(normalize_time("-0300-00-00T00:00:00Z"), "-0300-00-00");
    }
}
