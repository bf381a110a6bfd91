// Subway Station Explorer - Web Server
// REST API over the in-memory station dataset with Axum

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use subway_explorer::{
    borough_names, income_profile, logging, project, view, Column, ColumnSet, Config, Dataset,
    FilterCriteria, ProfilePoint, RouteMatching, SortDirection, SortOrder, ROUTE_CODES,
};

/// HTTP API for the subway station dataset
#[derive(Parser)]
#[command(name = "subway-server")]
struct Args {
    /// JSON config file. Flags below override its values.
    #[arg(long, env = "SUBWAY_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "SUBWAY_STATIONS")]
    stations: Option<PathBuf>,

    #[arg(long, env = "SUBWAY_LINE_ORDER")]
    line_order: Option<PathBuf>,

    /// Default route matching when a request omits `match`
    #[arg(long, env = "SUBWAY_ROUTE_MATCHING")]
    route_matching: Option<RouteMatching>,

    /// Bind address, e.g. 0.0.0.0:3000
    #[arg(long, env = "SUBWAY_LISTEN")]
    listen: Option<String>,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    dataset: Arc<Dataset>,
    route_matching: RouteMatching,
    columns: ColumnSet,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message.into()),
        }
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::error(message))).into_response()
}

fn bad_request(message: String) -> Response {
    warn!(error = message.as_str(), "rejected stations query");
    error_response(StatusCode::BAD_REQUEST, message)
}

/// Meta response
#[derive(Serialize)]
struct MetaResponse {
    stations: usize,
    lines: usize,
    fingerprint: String,
    loaded_at: String,
}

#[derive(Serialize)]
struct ColumnInfo {
    key: &'static str,
    label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tooltip: Option<&'static str>,
    numeric: bool,
}

impl From<Column> for ColumnInfo {
    fn from(column: Column) -> Self {
        Self {
            key: column.key(),
            label: column.label(),
            tooltip: column.tooltip(),
            numeric: column.is_numeric(),
        }
    }
}

/// Choices offered by the filter controls
#[derive(Serialize)]
struct OptionsResponse {
    routes: Vec<&'static str>,
    boroughs: Vec<&'static str>,
    columns: Vec<ColumnInfo>,
}

/// Stations response (one projected view)
#[derive(Serialize)]
struct StationsResponse {
    columns: Vec<ColumnInfo>,
    rows: Vec<Vec<String>>,
    total: usize,
    matched: usize,
    placeholder: Option<&'static str>,
}

#[derive(Serialize)]
struct ProfileResponse {
    line: String,
    points: Vec<ProfilePoint>,
}

/// Query string of GET /api/stations. Lists are comma separated;
/// `columns=all` selects every column.
#[derive(Debug, Default, Deserialize)]
struct StationsQuery {
    q: Option<String>,
    routes: Option<String>,
    boroughs: Option<String>,
    sort: Option<String>,
    dir: Option<String>,
    columns: Option<String>,
    #[serde(rename = "match")]
    matching: Option<String>,
}

fn split_list(value: &Option<String>) -> Vec<&str> {
    value
        .as_deref()
        .map(|v| v.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

impl StationsQuery {
    fn criteria(&self, default_matching: RouteMatching) -> Result<FilterCriteria, String> {
        let route_matching = match self.matching.as_deref() {
            Some(mode) => mode.parse()?,
            None => default_matching,
        };

        let direction: SortDirection = match self.dir.as_deref() {
            Some(dir) => dir.parse()?,
            None => SortDirection::Ascending,
        };

        let sort = match self.sort.as_deref() {
            Some(key) => Some(SortOrder {
                column: key.parse()?,
                direction,
            }),
            None => None,
        };

        Ok(FilterCriteria::new()
            .with_query(self.q.clone().unwrap_or_default())
            .with_routes(split_list(&self.routes))
            .with_boroughs(split_list(&self.boroughs))
            .with_route_matching(route_matching)
            .with_sort(sort))
    }

    fn column_set(&self, default: &ColumnSet) -> Result<ColumnSet, String> {
        let keys = split_list(&self.columns);
        match keys.as_slice() {
            [] => return Ok(default.clone()),
            ["all"] => return Ok(ColumnSet::all()),
            _ => {}
        }
        let columns = keys
            .into_iter()
            .map(str::parse)
            .collect::<Result<Vec<Column>, String>>()?;
        Ok(ColumnSet::from_columns(columns))
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/meta - Dataset size and version
async fn get_meta(State(state): State<AppState>) -> impl IntoResponse {
    let dataset = &state.dataset;
    let meta = MetaResponse {
        stations: dataset.len(),
        lines: dataset.line_order.len(),
        fingerprint: dataset.fingerprint.clone(),
        loaded_at: dataset.loaded_at.to_rfc3339(),
    };

    (etag(dataset), Json(ApiResponse::ok(meta)))
}

/// GET /api/options - Route codes, borough names, columns
async fn get_options() -> impl IntoResponse {
    let options = OptionsResponse {
        routes: ROUTE_CODES.to_vec(),
        boroughs: borough_names().collect(),
        columns: Column::ALL.iter().copied().map(ColumnInfo::from).collect(),
    };

    Json(ApiResponse::ok(options))
}

/// GET /api/stations - Filtered, sorted and projected view
async fn get_stations(
    State(state): State<AppState>,
    Query(query): Query<StationsQuery>,
) -> Response {
    let criteria = match query.criteria(state.route_matching) {
        Ok(criteria) => criteria,
        Err(e) => return bad_request(e),
    };
    let columns = match query.column_set(&state.columns) {
        Ok(columns) => columns,
        Err(e) => return bad_request(e),
    };

    let dataset = &state.dataset;
    let rows = view(&dataset.stations, &criteria);
    let table = project(&rows, &columns);

    let response = StationsResponse {
        columns: table.columns.iter().copied().map(ColumnInfo::from).collect(),
        matched: rows.len(),
        total: dataset.len(),
        rows: table.rows,
        placeholder: table.placeholder,
    };

    (etag(dataset), Json(ApiResponse::ok(response))).into_response()
}

/// GET /api/lines - Line identifiers in file order
async fn get_lines(State(state): State<AppState>) -> impl IntoResponse {
    let lines: Vec<String> = state.dataset.line_order.lines().map(String::from).collect();
    Json(ApiResponse::ok(lines))
}

/// GET /api/lines/:line/income - Income along one line
async fn get_line_income(
    State(state): State<AppState>,
    Path(line): Path<String>,
) -> Response {
    let dataset = &state.dataset;

    match income_profile(&dataset.stations, &dataset.line_order, &line) {
        Some(points) => {
            let response = ProfileResponse { line, points };
            (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, format!("Unknown line: {}", line)),
    }
}

fn etag(dataset: &Dataset) -> [(header::HeaderName, String); 1] {
    [(header::ETAG, format!("\"{}\"", dataset.fingerprint))]
}

fn app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/meta", get(get_meta))
        .route("/options", get(get_options))
        .route("/stations", get(get_stations))
        .route("/lines", get(get_lines))
        .route("/lines/:line/income", get(get_line_income))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    logging::init("subway_explorer=info,subway_server=info");
    let args = Args::parse();

    let mut config = Config::load_or_default(args.config.as_deref())?;
    if let Some(path) = args.stations {
        config.stations_path = path;
    }
    if let Some(path) = args.line_order {
        config.line_order_path = Some(path);
    }
    if let Some(mode) = args.route_matching {
        config.route_matching = mode;
    }
    if let Some(listen) = args.listen {
        config.listen = listen;
    }

    let dataset = Dataset::load(&config.stations_path, config.line_order_path.as_ref())?;

    let state = AppState {
        dataset: Arc::new(dataset),
        route_matching: config.route_matching,
        columns: config.column_set(),
    };

    let listener = tokio::net::TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("Failed to bind to {}", config.listen))?;

    info!(address = %config.listen, "🚀 server running");

    axum::serve(listener, app(state))
        .await
        .context("Server stopped unexpectedly")?;

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
