// Subway Station Explorer - Core Library
// Exposes the view engine and data model for the terminal explorer, API server, and tests

pub mod station;    // Station records, borough codes, route codes
pub mod criteria;   // Search / filter / sort selection
pub mod engine;     // Filter + sort over the in-memory dataset
pub mod columns;    // Column visibility and cell formatting
pub mod lines;      // Line order and income profile
pub mod dataset;    // Loading and validation
pub mod config;
pub mod logging;

// Re-export commonly used types
pub use station::{
    StationRecord, StationId, Measure,
    translate_borough, borough_names, coerce_numeric,
    BOROUGHS, ROUTE_CODES,
};
pub use criteria::{
    FilterCriteria, SortOrder, SortDirection, RouteMatching,
};
pub use engine::{view, view_indices, matches, compare, collate};
pub use columns::{
    Column, ColumnSet, TableView, project, format_grouped,
    NOTHING_FOUND, NOT_AVAILABLE,
};
pub use lines::{LineOrder, ProfilePoint, income_profile, DEFAULT_PROFILE_LINE};
pub use dataset::Dataset;
pub use config::Config;
