// 🛤️ Line Order - Ordered stops per line and the income profile along a line

use crate::station::{StationId, StationRecord};
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Line shown first when none is requested
pub const DEFAULT_PROFILE_LINE: &str = "N";

// ============================================================================
// LINE ORDER
// ============================================================================

/// Line identifier -> station ids in travel order.
/// Lines keep the order of the source file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineOrder {
    lines: Vec<(String, Vec<StationId>)>,
}

impl LineOrder {
    /// Parse the companion JSON object `{ "N": [1, 2, ...], ... }`
    pub fn from_json_str(content: &str) -> Result<Self> {
        let object: Map<String, Value> =
            serde_json::from_str(content).context("Failed to parse line order JSON")?;

        let mut lines = Vec::with_capacity(object.len());
        for (line, stops) in object {
            let ids: Vec<StationId> = serde_json::from_value(stops)
                .with_context(|| format!("Invalid station list for line {}", line))?;
            lines.push((line, ids));
        }

        Ok(LineOrder { lines })
    }

    /// Line identifiers in file order
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|(line, _)| line.as_str())
    }

    pub fn stops(&self, line: &str) -> Option<&[StationId]> {
        self.lines
            .iter()
            .find(|(name, _)| name == line)
            .map(|(_, ids)| ids.as_slice())
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

// ============================================================================
// INCOME PROFILE
// ============================================================================

/// One point of the income-along-a-line series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfilePoint {
    pub station: String,
    pub income: f64,
    pub tract: String,
}

/// Income at each stop of `line`, in travel order.
///
/// Stops are skipped when the id is not in the dataset, when the income is
/// absent, zero or unparseable, or when the stop has no census tract.
/// Returns `None` for a line the order file does not know.
pub fn income_profile(
    stations: &[StationRecord],
    order: &LineOrder,
    line: &str,
) -> Option<Vec<ProfilePoint>> {
    let stops = order.stops(line)?;

    let by_id: HashMap<&StationId, &StationRecord> =
        stations.iter().map(|s| (&s.station_id, s)).collect();

    let points = stops
        .iter()
        .filter_map(|id| by_id.get(id))
        .filter_map(|station| {
            let income = station.median_household_income.as_ref()?.as_f64();
            if income.is_nan() || income == 0.0 || station.tract.is_empty() {
                return None;
            }
            Some(ProfilePoint {
                station: station.stop_name.clone(),
                income,
                tract: station.tract.clone(),
            })
        })
        .collect();

    Some(points)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stations() -> Vec<StationRecord> {
        serde_json::from_value(json!([
            { "station_id": 1, "stop_name": "Astoria-Ditmars Blvd", "borough": "Q",
              "daytime_routes": "N W", "median_household_income": 87500, "tract": "113" },
            { "station_id": 2, "stop_name": "Astoria Blvd", "borough": "Q",
              "daytime_routes": "N W", "median_household_income": null, "tract": "97" },
            { "station_id": 3, "stop_name": "30 Av", "borough": "Q",
              "daytime_routes": "N W", "median_household_income": "$72,100", "tract": "" },
            { "station_id": 4, "stop_name": "Broadway", "borough": "Q",
              "daytime_routes": "N W", "median_household_income": "$64,900", "tract": "69" }
        ]))
        .unwrap()
    }

    #[test]
    fn test_parse_preserves_line_order() {
        let order = LineOrder::from_json_str(r#"{"W": [4, 3], "N": ["1", 2], "A": []}"#).unwrap();
        assert_eq!(order.lines().collect::<Vec<_>>(), vec!["W", "N", "A"]);
        assert_eq!(order.stops("N").unwrap(), &[StationId::from("1"), StationId::from(2u64)]);
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn test_parse_rejects_non_list() {
        assert!(LineOrder::from_json_str(r#"{"N": "1 2 3"}"#).is_err());
        assert!(LineOrder::from_json_str("[1, 2]").is_err());
    }

    #[test]
    fn test_profile_follows_travel_order() {
        let order = LineOrder::from_json_str(r#"{"N": [4, 3, 2, 1, 99]}"#).unwrap();
        let profile = income_profile(&stations(), &order, "N").unwrap();

        let names: Vec<&str> = profile.iter().map(|p| p.station.as_str()).collect();
        assert_eq!(names, vec!["Broadway", "Astoria-Ditmars Blvd"]);
        assert_eq!(profile[0].income, 64900.0);
        assert_eq!(profile[0].tract, "69");
    }

    #[test]
    fn test_profile_unknown_line() {
        let order = LineOrder::from_json_str(r#"{"N": [1]}"#).unwrap();
        assert!(income_profile(&stations(), &order, "Q").is_none());
    }
}
