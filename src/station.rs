// 🚇 Station Records - Core data model
// One record per subway stop: identity, display fields, measures and amenity flags

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fmt;

// ============================================================================
// FIXED VOCABULARIES
// ============================================================================

/// Raw borough codes and the full names shown to users
pub const BOROUGHS: [(&str, &str); 5] = [
    ("Q", "Queens"),
    ("M", "Manhattan"),
    ("Bk", "Brooklyn"),
    ("Bx", "Bronx"),
    ("SI", "Staten Island"),
];

/// Route codes offered by the line filter, in display order
pub const ROUTE_CODES: [&str; 25] = [
    "1", "2", "3", "4", "5", "6", "7", "A", "B", "C", "D", "E", "F", "G", "H", "J", "L", "M", "N",
    "Q", "R", "S", "SIR", "W", "Z",
];

/// Translate a raw borough code to its full name.
/// Unknown codes come back unchanged.
pub fn translate_borough(code: &str) -> &str {
    BOROUGHS
        .iter()
        .find(|(short, _)| *short == code)
        .map(|(_, name)| *name)
        .unwrap_or(code)
}

/// Full borough names in filter order
pub fn borough_names() -> impl Iterator<Item = &'static str> {
    BOROUGHS.iter().map(|(_, name)| *name)
}

// ============================================================================
// STATION ID
// ============================================================================

/// Station identifier. The dataset stores these as integers, the line order
/// file sometimes as strings, so both are accepted and kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StationId(String);

impl StationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for StationId {
    fn from(id: u64) -> Self {
        StationId(id.to_string())
    }
}

impl From<&str> for StationId {
    fn from(id: &str) -> Self {
        StationId(id.to_string())
    }
}

impl<'de> Deserialize<'de> for StationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(StationId(s)),
            Value::Number(n) => Ok(StationId(n.to_string())),
            other => Err(de::Error::custom(format!(
                "station id must be a string or number, got {}",
                other
            ))),
        }
    }
}

// ============================================================================
// MEASURE
// ============================================================================

/// A present numeric field. Most rows carry plain numbers but some sources
/// ship formatted strings like "$50,000"; those are kept raw and coerced
/// only when compared.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Measure {
    Number(f64),
    Text(String),
}

impl Measure {
    /// Numeric value used for ordering. NaN when a raw string has no
    /// parseable number in it.
    pub fn as_f64(&self) -> f64 {
        match self {
            Measure::Number(n) => *n,
            Measure::Text(raw) => coerce_numeric(raw),
        }
    }

    /// Lowercase-able text form used by free-text search
    pub fn search_text(&self) -> Cow<'_, str> {
        match self {
            Measure::Number(n) => Cow::Owned(n.to_string()),
            Measure::Text(raw) => Cow::Borrowed(raw),
        }
    }
}

/// Strip everything except digits, '.' and '-', then read the longest
/// leading decimal number. Mirrors how a browser's parseFloat treats the
/// cleaned string: "$50,000" -> 50000, "1.2.3" -> 1.2, "n/a" -> NaN.
pub fn coerce_numeric(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    let bytes = cleaned.as_bytes();

    let mut end = 0;
    if bytes.first() == Some(&b'-') {
        end = 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut has_digits = end > int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let mut frac_end = end + 1;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        let has_fraction = frac_end > end + 1;
        if has_digits || has_fraction {
            has_digits = true;
            end = frac_end;
        }
    }

    if !has_digits {
        return f64::NAN;
    }

    cleaned[..end].parse::<f64>().unwrap_or(f64::NAN)
}

// ============================================================================
// STATION RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationRecord {
    pub station_id: StationId,

    pub stop_name: String,

    /// Raw borough code (Q, M, Bk, Bx, SI)
    pub borough: String,

    /// Space-delimited route codes, e.g. "N W"
    #[serde(default)]
    pub daytime_routes: String,

    #[serde(default, deserialize_with = "optional_measure")]
    pub median_household_income: Option<Measure>,

    #[serde(
        rename = "2023_average_weekday_ridership",
        default,
        deserialize_with = "optional_measure"
    )]
    pub weekday_ridership: Option<Measure>,

    #[serde(
        rename = "2023_average_weekend_ridership",
        default,
        deserialize_with = "optional_measure"
    )]
    pub weekend_ridership: Option<Measure>,

    #[serde(default, deserialize_with = "flag")]
    pub ada_accessible: bool,

    #[serde(default, deserialize_with = "flag")]
    pub police_station: bool,

    #[serde(default, deserialize_with = "flag")]
    pub bathroom: bool,

    /// Census tract, display only
    #[serde(default, deserialize_with = "text_or_number")]
    pub tract: String,

    /// Everything else in the source object (coordinates, line name, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StationRecord {
    /// Full borough name for display and filtering
    pub fn borough_name(&self) -> &str {
        translate_borough(&self.borough)
    }

    /// Individual route codes served at this stop
    pub fn routes(&self) -> impl Iterator<Item = &str> {
        self.daytime_routes.split_whitespace()
    }

    /// String form of every field that free-text search looks at.
    /// Absent values are left out, so they can never match.
    pub fn search_fields(&self) -> Vec<Cow<'_, str>> {
        let mut fields: Vec<Cow<'_, str>> = vec![
            Cow::Borrowed(self.station_id.as_str()),
            Cow::Borrowed(&self.stop_name),
            Cow::Borrowed(&self.borough),
            Cow::Borrowed(&self.daytime_routes),
        ];

        for measure in [
            &self.median_household_income,
            &self.weekday_ridership,
            &self.weekend_ridership,
        ]
        .into_iter()
        .flatten()
        {
            fields.push(measure.search_text());
        }

        for flag in [self.ada_accessible, self.police_station, self.bathroom] {
            fields.push(Cow::Borrowed(if flag { "true" } else { "false" }));
        }

        if !self.tract.is_empty() {
            fields.push(Cow::Borrowed(&self.tract));
        }

        for value in self.extra.values() {
            if let Some(text) = value_text(value) {
                fields.push(text);
            }
        }

        fields
    }
}

/// Text form of an arbitrary JSON value for search. Objects and nulls have
/// no useful text and are skipped.
fn value_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::Null | Value::Object(_) => None,
        Value::String(s) => Some(Cow::Borrowed(s)),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Borrowed(if *b { "true" } else { "false" })),
        Value::Array(items) => Some(Cow::Owned(
            items
                .iter()
                .map(|item| value_text(item).map(|t| t.into_owned()).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(","),
        )),
    }
}

// ============================================================================
// FIELD DESERIALIZERS
// ============================================================================

fn optional_measure<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Measure>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .map(|v| Some(Measure::Number(v)))
            .ok_or_else(|| de::Error::custom(format!("numeric value out of range: {}", n))),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => Ok(Some(Measure::Text(s))),
        other => Err(de::Error::custom(format!(
            "expected number, string or null, got {}",
            other
        ))),
    }
}

fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(b),
        Value::Number(n) => Ok(n.as_f64().map(|v| v != 0.0).unwrap_or(false)),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Ok(true),
            "false" | "no" | "n" | "0" | "" => Ok(false),
            other => Err(de::Error::custom(format!("not a boolean flag: {:?}", other))),
        },
        other => Err(de::Error::custom(format!("not a boolean flag: {}", other))),
    }
}

fn text_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("expected string or number, got {}", other))),
    }
}

// ============================================================================
// TESTS
// ============================================================================
