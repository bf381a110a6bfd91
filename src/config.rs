// ⚙️ Configuration - Data locations and explorer defaults
// Read from an optional JSON file; command-line flags override individual values

use crate::columns::{Column, ColumnSet};
use crate::criteria::RouteMatching;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_STATIONS_PATH: &str = "data/station_data.json";
pub const DEFAULT_LINE_ORDER_PATH: &str = "data/station_order.json";
pub const DEFAULT_LISTEN: &str = "0.0.0.0:3000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Station dataset (JSON array)
    pub stations_path: PathBuf,

    /// Line -> ordered station ids (JSON object). Profiles are unavailable
    /// without it. The default path may be absent; any other path must exist.
    pub line_order_path: Option<PathBuf>,

    pub route_matching: RouteMatching,

    /// Columns visible when the explorer starts
    pub columns: Vec<Column>,

    /// Address the HTTP API binds to
    pub listen: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            stations_path: PathBuf::from(DEFAULT_STATIONS_PATH),
            line_order_path: Some(PathBuf::from(DEFAULT_LINE_ORDER_PATH)),
            route_matching: RouteMatching::default(),
            columns: ColumnSet::default().iter().collect(),
            listen: DEFAULT_LISTEN.to_string(),
        }
    }
}

impl Config {
    /// Load from a JSON file. Missing keys keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))
    }

    /// File config when a path is given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Config::from_file(path),
            None => Ok(Config::default()),
        }
    }

    pub fn column_set(&self) -> ColumnSet {
        ColumnSet::from_columns(self.columns.iter().copied())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.stations_path, PathBuf::from("data/station_data.json"));
        assert_eq!(config.route_matching, RouteMatching::Substring);
        assert_eq!(config.column_set(), ColumnSet::default());
        assert_eq!(config.listen, "0.0.0.0:3000");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"{ "route_matching": "token", "columns": ["stop_name", "median_household_income"] }"#,
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.route_matching, RouteMatching::Token);
        assert_eq!(config.columns, vec![Column::StopName, Column::Income]);
        assert_eq!(config.stations_path, PathBuf::from(DEFAULT_STATIONS_PATH));
    }

    #[test]
    fn test_unknown_column_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{ "columns": ["lines"] }"#).unwrap();
        assert!(Config::from_file(file.path()).is_err());
    }

    #[test]
    fn test_load_or_default_without_path() {
        assert_eq!(Config::load_or_default(None).unwrap(), Config::default());
    }
}
