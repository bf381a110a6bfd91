// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;

use subway_explorer::{
    income_profile, logging, project, view, Column, ColumnSet, Config, Dataset, FilterCriteria,
    RouteMatching, SortDirection, SortOrder, TableView, DEFAULT_PROFILE_LINE,
};

/// NYC subway station explorer: income, ridership and amenities per stop.
#[derive(Parser)]
#[command(name = "subway-explorer", about = "NYC subway station explorer")]
struct Args {
    /// JSON config file. Flags below override its values.
    #[arg(long, env = "SUBWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Station dataset (JSON array)
    #[arg(long, env = "SUBWAY_STATIONS")]
    stations: Option<PathBuf>,

    /// Line order file (JSON object of line -> station ids)
    #[arg(long, env = "SUBWAY_LINE_ORDER")]
    line_order: Option<PathBuf>,

    /// Route filter matching: substring (default) or token
    #[arg(long, env = "SUBWAY_ROUTE_MATCHING")]
    route_matching: Option<RouteMatching>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive table (default)
    Browse,
    /// Print the filtered, sorted table and exit
    View(ViewArgs),
    /// Median household income at each stop of a line, in travel order
    Profile {
        /// Line identifier, e.g. N or 7
        #[arg(default_value = DEFAULT_PROFILE_LINE)]
        line: String,
    },
}

#[derive(ClapArgs)]
struct ViewArgs {
    /// Free-text search over every field
    #[arg(short, long, default_value = "")]
    search: String,

    /// Route codes to keep (comma separated)
    #[arg(short = 'r', long = "route", value_delimiter = ',')]
    routes: Vec<String>,

    /// Borough names to keep (comma separated)
    #[arg(short = 'b', long = "borough", value_delimiter = ',')]
    boroughs: Vec<String>,

    /// Column key to sort by
    #[arg(long)]
    sort: Option<Column>,

    /// Sort descending
    #[arg(long, requires = "sort")]
    desc: bool,

    /// Column keys to show (comma separated)
    #[arg(long, value_delimiter = ',')]
    columns: Vec<Column>,

    /// Write CSV instead of an aligned table
    #[arg(long)]
    csv: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let interactive = matches!(args.command, None | Some(Command::Browse));
    // Keep the terminal UI clean unless RUST_LOG asks for more
    logging::init(if interactive {
        "subway_explorer=warn"
    } else {
        "subway_explorer=info"
    });

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

    let dataset = Dataset::load(&config.stations_path, config.line_order_path.as_ref())?;

    match args.command {
        None | Some(Command::Browse) => run_ui_mode(dataset, &config),
        Some(Command::View(view_args)) => run_view(&dataset, &config, view_args),
        Some(Command::Profile { line }) => run_profile(&dataset, &line),
    }
}

fn run_view(dataset: &Dataset, config: &Config, args: ViewArgs) -> Result<()> {
    let sort = args.sort.map(|column| SortOrder {
        column,
        direction: if args.desc {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        },
    });

    let criteria = FilterCriteria::new()
        .with_query(args.search)
        .with_routes(args.routes)
        .with_boroughs(args.boroughs)
        .with_route_matching(config.route_matching)
        .with_sort(sort);

    let columns = if args.columns.is_empty() {
        config.column_set()
    } else {
        ColumnSet::from_columns(args.columns)
    };

    let rows = view(&dataset.stations, &criteria);
    info!(matched = rows.len(), total = dataset.len(), "view computed");
    let table = project(&rows, &columns);

    let stdout = io::stdout();
    if args.csv {
        write_csv(stdout.lock(), &table)
    } else {
        write_text(stdout.lock(), &table)
    }
}

fn write_csv<W: Write>(out: W, table: &TableView) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(table.columns.iter().map(|c| c.key()))?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_text<W: Write>(mut out: W, table: &TableView) -> Result<()> {
    let headers = table.headers();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &table.rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    writeln!(out, "{}", line(headers.clone()))?;
    writeln!(out, "{}", "─".repeat(widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1)))?;

    match table.placeholder {
        Some(placeholder) => writeln!(out, "{}", placeholder)?,
        None => {
            for row in &table.rows {
                writeln!(out, "{}", line(row.iter().map(String::as_str).collect()))?;
            }
        }
    }

    Ok(())
}

fn run_profile(dataset: &Dataset, line: &str) -> Result<()> {
    let Some(points) = income_profile(&dataset.stations, &dataset.line_order, line) else {
        let known: Vec<&str> = dataset.line_order.lines().collect();
        bail!("Unknown line: {} (known lines: {})", line, known.join(", "));
    };

    let mut out = io::stdout().lock();
    writeln!(out, "Line {} - 2022 Median Household Income", line)?;
    writeln!(out, "{:<32}  {:>12}  {}", "Station", "Income", "Census Tract")?;
    for point in &points {
        writeln!(
            out,
            "{:<32}  {:>12}  {}",
            point.station,
            format!("${}", subway_explorer::format_grouped(point.income)),
            point.tract
        )?;
    }
    writeln!(out, "Source: U.S. Census 2022 ACS 5-year estimates")?;

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(dataset: Dataset, config: &Config) -> Result<()> {
    let criteria = FilterCriteria::new().with_route_matching(config.route_matching);
    let mut app = ui::App::new(dataset.stations, criteria, config.column_set());
    ui::run_ui(&mut app)
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_dataset: Dataset, _config: &Config) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or print a table: subway-explorer view --search <text>");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use subway_explorer::StationRecord;

    fn table(columns: ColumnSet, query: &str) -> TableView {
        let stations: Vec<StationRecord> = serde_json::from_value(json!([
            { "station_id": 1, "stop_name": "Court Sq", "borough": "Q",
              "daytime_routes": "G", "median_household_income": 98000 },
            { "station_id": 2, "stop_name": "Bowling Green", "borough": "M",
              "daytime_routes": "4 5", "median_household_income": null }
        ]))
        .unwrap();
        let criteria = FilterCriteria::new().with_query(query);
        project(&view(&stations, &criteria), &columns)
    }

    #[test]
    fn test_write_text_aligns_columns() {
        let mut out = Vec::new();
        write_text(&mut out, &table(ColumnSet::default(), "")).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Stop Name      Borough    Lines");
        assert_eq!(lines[2], "Court Sq       Queens     G");
        assert_eq!(lines[3], "Bowling Green  Manhattan  4 5");
    }

    #[test]
    fn test_write_text_placeholder() {
        let mut out = Vec::new();
        write_text(&mut out, &table(ColumnSet::default(), "nowhere")).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().nth(2), Some("Nothing found"));
    }

    #[test]
    fn test_write_csv_uses_column_keys() {
        let columns = ColumnSet::from_columns([Column::StopName, Column::Income]);
        let mut out = Vec::new();
        write_csv(&mut out, &table(columns, "")).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(
            text,
            "stop_name,median_household_income\nCourt Sq,\"$98,000\"\nBowling Green,N/A\n"
        );
    }

    #[test]
    fn test_args_parse_view() {
        let args = Args::try_parse_from([
            "subway-explorer",
            "view",
            "--route",
            "A,C",
            "--sort",
            "median_household_income",
            "--desc",
            "--columns",
            "stop_name,borough",
        ])
        .unwrap();

        match args.command {
            Some(Command::View(v)) => {
                assert_eq!(v.routes, vec!["A", "C"]);
                assert_eq!(v.sort, Some(Column::Income));
                assert!(v.desc);
                assert_eq!(v.columns, vec![Column::StopName, Column::Borough]);
            }
            _ => panic!("expected view command"),
        }
    }

    #[test]
    fn test_args_reject_unknown_column() {
        assert!(Args::try_parse_from(["subway-explorer", "view", "--sort", "lines"]).is_err());
    }
}
