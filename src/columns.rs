// 📋 Columns - Which fields are shown and how each cell is rendered
// Projection runs after filter/sort and never changes which rows are in the view

use crate::station::{Measure, StationRecord};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Placeholder shown as the only row of an empty view
pub const NOTHING_FOUND: &str = "Nothing found";

/// Cell text for an absent measure
pub const NOT_AVAILABLE: &str = "N/A";

// ============================================================================
// COLUMN
// ============================================================================

/// A displayable, sortable field of a station record.
/// Declaration order is the order columns are rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Column {
    #[serde(rename = "stop_name")]
    StopName,
    #[serde(rename = "borough")]
    Borough,
    #[serde(rename = "daytime_routes")]
    Routes,
    #[serde(rename = "median_household_income")]
    Income,
    #[serde(rename = "2023_average_weekday_ridership")]
    WeekdayRidership,
    #[serde(rename = "2023_average_weekend_ridership")]
    WeekendRidership,
    #[serde(rename = "ada_accessible")]
    Accessible,
    #[serde(rename = "police_station")]
    Police,
    #[serde(rename = "bathroom")]
    Bathroom,
}

impl Column {
    pub const ALL: [Column; 9] = [
        Column::StopName,
        Column::Borough,
        Column::Routes,
        Column::Income,
        Column::WeekdayRidership,
        Column::WeekendRidership,
        Column::Accessible,
        Column::Police,
        Column::Bathroom,
    ];

    /// Field name as it appears in the dataset
    pub fn key(&self) -> &'static str {
        match self {
            Column::StopName => "stop_name",
            Column::Borough => "borough",
            Column::Routes => "daytime_routes",
            Column::Income => "median_household_income",
            Column::WeekdayRidership => "2023_average_weekday_ridership",
            Column::WeekendRidership => "2023_average_weekend_ridership",
            Column::Accessible => "ada_accessible",
            Column::Police => "police_station",
            Column::Bathroom => "bathroom",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Column::StopName => "Stop Name",
            Column::Borough => "Borough",
            Column::Routes => "Lines",
            Column::Income => "Income",
            Column::WeekdayRidership => "Weekday",
            Column::WeekendRidership => "Weekend",
            Column::Accessible => "ADA ♿️",
            Column::Police => "NYPD 🚓",
            Column::Bathroom => "Restroom",
        }
    }

    pub fn tooltip(&self) -> Option<&'static str> {
        match self {
            Column::Income => Some("2022 Median Household Income"),
            Column::WeekdayRidership => Some("2023 Average Weekday Ridership"),
            Column::WeekendRidership => Some("2023 Average Weekend Ridership"),
            Column::Bathroom => Some("Open from 7am to 7pm"),
            _ => None,
        }
    }

    pub fn from_key(key: &str) -> Option<Column> {
        Column::ALL.iter().copied().find(|c| c.key() == key)
    }

    /// Numeric columns are compared as numbers, everything else as text
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Column::Income | Column::WeekdayRidership | Column::WeekendRidership
        )
    }

    /// Measure backing a numeric column
    pub fn measure<'a>(&self, record: &'a StationRecord) -> Option<&'a Measure> {
        match self {
            Column::Income => record.median_household_income.as_ref(),
            Column::WeekdayRidership => record.weekday_ridership.as_ref(),
            Column::WeekendRidership => record.weekend_ridership.as_ref(),
            _ => None,
        }
    }

    /// Rendered cell text for one record
    pub fn cell(&self, record: &StationRecord) -> String {
        match self {
            Column::StopName => record.stop_name.clone(),
            Column::Borough => record.borough_name().to_string(),
            Column::Routes => record.routes().collect::<Vec<_>>().join(" "),
            Column::Income => match &record.median_household_income {
                Some(measure) => format_measure(measure, "$"),
                None => NOT_AVAILABLE.to_string(),
            },
            Column::WeekdayRidership | Column::WeekendRidership => match self.measure(record) {
                Some(measure) => format_measure(measure, ""),
                None => NOT_AVAILABLE.to_string(),
            },
            Column::Accessible => flag_cell(record.ada_accessible, "♿️"),
            Column::Police => flag_cell(record.police_station, "🚓"),
            Column::Bathroom => flag_cell(record.bathroom, "🚽"),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Column {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Column::from_key(s.trim()).ok_or_else(|| {
            let known: Vec<&str> = Column::ALL.iter().map(|c| c.key()).collect();
            format!("unknown column {:?} (expected one of: {})", s, known.join(", "))
        })
    }
}

fn flag_cell(value: bool, icon: &str) -> String {
    let text = if value { icon } else { "🚫" };
    text.to_string()
}

// ============================================================================
// NUMBER FORMATTING
// ============================================================================

/// Present measure as display text. Raw strings that hold no number are
/// shown as-is.
fn format_measure(measure: &Measure, prefix: &str) -> String {
    let value = measure.as_f64();
    if value.is_nan() {
        if let Measure::Text(raw) = measure {
            return raw.clone();
        }
    }
    format!("{}{}", prefix, format_grouped(value))
}

/// en-US style grouping: thousands separated by commas, at most three
/// fraction digits with trailing zeros dropped. 1234567.5 -> "1,234,567.5"
pub fn format_grouped(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let fixed = format!("{:.3}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let negative = value < 0.0 && (int_part != "0" || !frac_part.is_empty());
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

// ============================================================================
// COLUMN SET
// ============================================================================

/// Visible columns. Always iterated in canonical column order, whatever
/// order they were picked in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSet {
    enabled: [bool; 9],
}

impl ColumnSet {
    pub fn from_columns<I: IntoIterator<Item = Column>>(columns: I) -> Self {
        let mut enabled = [false; 9];
        for column in columns {
            enabled[column as usize] = true;
        }
        ColumnSet { enabled }
    }

    pub fn all() -> Self {
        ColumnSet { enabled: [true; 9] }
    }

    pub fn contains(&self, column: Column) -> bool {
        self.enabled[column as usize]
    }

    /// New set with `column` flipped on or off
    pub fn toggled(&self, column: Column) -> Self {
        let mut enabled = self.enabled;
        enabled[column as usize] = !enabled[column as usize];
        ColumnSet { enabled }
    }

    pub fn iter(&self) -> impl Iterator<Item = Column> + '_ {
        Column::ALL.iter().copied().filter(|c| self.contains(*c))
    }

    pub fn len(&self) -> usize {
        self.enabled.iter().filter(|e| **e).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ColumnSet {
    fn default() -> Self {
        ColumnSet::from_columns([Column::StopName, Column::Borough, Column::Routes])
    }
}

// ============================================================================
// TABLE PROJECTION
// ============================================================================

/// Rendered table: headers, cell text per row, and the placeholder to show
/// when there are no rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<&'static str>,
}

impl TableView {
    pub fn headers(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.label()).collect()
    }
}

/// Project already filtered and sorted rows onto the visible columns
pub fn project(rows: &[&StationRecord], columns: &ColumnSet) -> TableView {
    let visible: Vec<Column> = columns.iter().collect();
    let cells = rows
        .iter()
        .map(|record| visible.iter().map(|c| c.cell(record)).collect())
        .collect::<Vec<Vec<String>>>();

    let placeholder = if cells.is_empty() { Some(NOTHING_FOUND) } else { None };

    TableView {
        columns: visible,
        rows: cells,
        placeholder,
    }
}

// ============================================================================
// TESTS
// ============================================================================
