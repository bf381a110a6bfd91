// 🔎 Filter Criteria - Search, route, borough and sort selection
// Criteria are values: every change builds a new one, nothing is edited in place

use crate::columns::Column;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// SORT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn reversed(&self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn is_descending(&self) -> bool {
        *self == SortDirection::Descending
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Ascending),
            "desc" | "descending" => Ok(SortDirection::Descending),
            other => Err(format!("unknown sort direction {:?} (expected asc or desc)", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub column: Column,
    pub direction: SortDirection,
}

// ============================================================================
// ROUTE MATCHING
// ============================================================================

/// How a selected route code is compared against a station's route string.
///
/// `Substring` is what the explorer has always done and stays the default;
/// it lets "S" select stations on the "SIR". `Token` requires the code to be
/// one of the whitespace-separated routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteMatching {
    #[default]
    Substring,
    Token,
}

impl FromStr for RouteMatching {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "substring" => Ok(RouteMatching::Substring),
            "token" => Ok(RouteMatching::Token),
            other => Err(format!("unknown route matching {:?} (expected substring or token)", other)),
        }
    }
}

impl fmt::Display for RouteMatching {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteMatching::Substring => f.write_str("substring"),
            RouteMatching::Token => f.write_str("token"),
        }
    }
}

// ============================================================================
// FILTER CRITERIA
// ============================================================================

/// Everything a view is derived from, besides the data itself.
/// Empty query and empty selections match every station.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub query: String,
    pub routes: BTreeSet<String>,
    pub boroughs: BTreeSet<String>,
    pub sort: Option<SortOrder>,
    #[serde(default)]
    pub route_matching: RouteMatching,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(self, query: impl Into<String>) -> Self {
        FilterCriteria {
            query: query.into(),
            ..self
        }
    }

    pub fn with_routes<I, S>(self, routes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterCriteria {
            routes: routes.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    pub fn with_boroughs<I, S>(self, boroughs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterCriteria {
            boroughs: boroughs.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    pub fn with_route_matching(self, route_matching: RouteMatching) -> Self {
        FilterCriteria {
            route_matching,
            ..self
        }
    }

    /// Set an explicit sort, or none for dataset order
    pub fn with_sort(self, sort: Option<SortOrder>) -> Self {
        FilterCriteria { sort, ..self }
    }

    /// Header-click semantics: the current key flips direction, any other
    /// key starts ascending.
    pub fn sorted_by(self, column: Column) -> Self {
        let direction = match self.sort {
            Some(current) if current.column == column => current.direction.reversed(),
            _ => SortDirection::Ascending,
        };
        self.with_sort(Some(SortOrder { column, direction }))
    }

    /// Selected route set with `route` flipped
    pub fn toggle_route(mut self, route: &str) -> Self {
        if !self.routes.remove(route) {
            self.routes.insert(route.to_string());
        }
        self
    }

    /// Selected borough set with `borough` flipped
    pub fn toggle_borough(mut self, borough: &str) -> Self {
        if !self.boroughs.remove(borough) {
            self.boroughs.insert(borough.to_string());
        }
        self
    }

    /// Drop search and selections, keep sort and matching mode
    pub fn cleared(self) -> Self {
        FilterCriteria {
            query: String::new(),
            routes: BTreeSet::new(),
            boroughs: BTreeSet::new(),
            ..self
        }
    }

    /// True when no search or selection narrows the view
    pub fn is_unfiltered(&self) -> bool {
        self.query.trim().is_empty() && self.routes.is_empty() && self.boroughs.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_key_starts_ascending() {
        let criteria = FilterCriteria::new().sorted_by(Column::Income);
        assert_eq!(
            criteria.sort,
            Some(SortOrder { column: Column::Income, direction: SortDirection::Ascending })
        );
    }

    #[test]
    fn test_same_key_toggles_direction() {
        let criteria = FilterCriteria::new().sorted_by(Column::Income).sorted_by(Column::Income);
        assert_eq!(criteria.sort.unwrap().direction, SortDirection::Descending);

        let criteria = criteria.sorted_by(Column::Income);
        assert_eq!(criteria.sort.unwrap().direction, SortDirection::Ascending);
    }

    #[test]
    fn test_other_key_resets_to_ascending() {
        let criteria = FilterCriteria::new()
            .sorted_by(Column::Income)
            .sorted_by(Column::Income)
            .sorted_by(Column::StopName);
        assert_eq!(
            criteria.sort,
            Some(SortOrder { column: Column::StopName, direction: SortDirection::Ascending })
        );
    }

    #[test]
    fn test_toggle_route_and_borough() {
        let criteria = FilterCriteria::new()
            .toggle_route("A")
            .toggle_route("C")
            .toggle_route("A")
            .toggle_borough("Queens");
        assert_eq!(criteria.routes.iter().collect::<Vec<_>>(), vec!["C"]);
        assert!(criteria.boroughs.contains("Queens"));
    }

    #[test]
    fn test_cleared_keeps_sort() {
        let criteria = FilterCriteria::new()
            .with_query("court")
            .with_routes(["G"])
            .with_boroughs(["Queens"])
            .sorted_by(Column::Borough)
            .cleared();
        assert!(criteria.is_unfiltered());
        assert_eq!(criteria.sort.unwrap().column, Column::Borough);
    }

    #[test]
    fn test_whitespace_query_is_unfiltered() {
        assert!(FilterCriteria::new().with_query("   ").is_unfiltered());
        assert!(!FilterCriteria::new().with_query("x").is_unfiltered());
    }

    #[test]
    fn test_parse_direction_and_matching() {
        assert_eq!("DESC".parse::<SortDirection>(), Ok(SortDirection::Descending));
        assert_eq!("asc".parse::<SortDirection>(), Ok(SortDirection::Ascending));
        assert!("up".parse::<SortDirection>().is_err());
        assert_eq!("token".parse::<RouteMatching>(), Ok(RouteMatching::Token));
        assert!("exact".parse::<RouteMatching>().is_err());
    }
}
