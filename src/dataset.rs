// 🗂️ Dataset - Loads station records and line order once at startup

use crate::config::DEFAULT_LINE_ORDER_PATH;
use crate::lines::LineOrder;
use crate::station::{StationId, StationRecord};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Immutable collection of stations plus the line order used for profiles
#[derive(Debug, Clone)]
pub struct Dataset {
    pub stations: Vec<StationRecord>,
    pub line_order: LineOrder,
    /// SHA-256 of the station file bytes
    pub fingerprint: String,
    pub loaded_at: DateTime<Utc>,
}

impl Dataset {
    /// Load the station file and, when given, the line order file
    pub fn load<P: AsRef<Path>>(stations_path: P, line_order_path: Option<P>) -> Result<Self> {
        let stations_path = stations_path.as_ref();
        let content = fs::read_to_string(stations_path)
            .with_context(|| format!("Failed to read station data: {:?}", stations_path))?;

        let mut dataset = Dataset::from_json_str(&content)
            .with_context(|| format!("Invalid station data in {:?}", stations_path))?;

        if let Some(order_path) = line_order_path {
            let order_path = order_path.as_ref();
            let required = order_path != Path::new(DEFAULT_LINE_ORDER_PATH);
            dataset.line_order = read_line_order(order_path, required)?;
        }

        info!(
            stations = dataset.stations.len(),
            lines = dataset.line_order.len(),
            path = %stations_path.display(),
            "dataset loaded"
        );

        Ok(dataset)
    }

    /// Parse a JSON array of station objects
    pub fn from_json_str(content: &str) -> Result<Self> {
        let stations: Vec<StationRecord> =
            serde_json::from_str(content).context("Failed to parse station JSON")?;

        validate(&stations)?;

        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        let fingerprint = format!("{:x}", hasher.finalize());

        debug!(stations = stations.len(), %fingerprint, "station data parsed");

        Ok(Dataset {
            stations,
            line_order: LineOrder::default(),
            fingerprint,
            loaded_at: Utc::now(),
        })
    }

    pub fn with_line_order(self, line_order: LineOrder) -> Self {
        Dataset { line_order, ..self }
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

/// Unique ids, and measures that are either absent or non-negative
fn validate(stations: &[StationRecord]) -> Result<()> {
    let mut seen: HashSet<&StationId> = HashSet::with_capacity(stations.len());

    for station in stations {
        if !seen.insert(&station.station_id) {
            bail!("Duplicate station id: {}", station.station_id);
        }

        let measures = [
            ("median_household_income", &station.median_household_income),
            ("2023_average_weekday_ridership", &station.weekday_ridership),
            ("2023_average_weekend_ridership", &station.weekend_ridership),
        ];
        for (field, measure) in measures {
            if let Some(measure) = measure {
                let value = measure.as_f64();
                if value < 0.0 {
                    bail!(
                        "Negative {} ({}) for station {}",
                        field,
                        value,
                        station.station_id
                    );
                }
            }
        }
    }

    Ok(())
}

/// Read a line order file. A missing optional file leaves profiles empty
/// instead of failing the whole load.
fn read_line_order(path: &Path, required: bool) -> Result<LineOrder> {
    if !required && !path.exists() {
        warn!(path = %path.display(), "line order file not found, line profiles unavailable");
        return Ok(LineOrder::default());
    }

    let order = fs::read_to_string(path)
        .with_context(|| format!("Failed to read line order: {:?}", path))?;
    LineOrder::from_json_str(&order).with_context(|| format!("Invalid line order in {:?}", path))
}

// ============================================================================
// TESTS
// ============================================================================
