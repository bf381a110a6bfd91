use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;
use subway_explorer::{
    borough_names, project, view_indices, Column, ColumnSet, FilterCriteria, Measure,
    RouteMatching, SortDirection, StationRecord, ROUTE_CODES,
};
use tracing::debug;

const PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
}

/// Multi-select popups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerKind {
    Routes,
    Boroughs,
    Columns,
}

impl PickerKind {
    pub fn title(&self) -> &str {
        match self {
            PickerKind::Routes => " Filter by Lines ",
            PickerKind::Boroughs => " Filter by Borough ",
            PickerKind::Columns => " Columns to Display ",
        }
    }

    pub fn option_count(&self) -> usize {
        match self {
            PickerKind::Routes => ROUTE_CODES.len(),
            PickerKind::Boroughs => borough_names().count(),
            PickerKind::Columns => Column::ALL.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Picker {
    pub kind: PickerKind,
    pub cursor: usize,
}

pub struct App {
    pub stations: Vec<StationRecord>,
    pub criteria: FilterCriteria,
    pub columns: ColumnSet,
    /// Positions into `stations`, in display order
    pub visible: Vec<usize>,
    pub state: TableState,
    pub input_mode: InputMode,
    pub picker: Option<Picker>,
    pub show_detail: bool,
}

impl App {
    pub fn new(stations: Vec<StationRecord>, criteria: FilterCriteria, columns: ColumnSet) -> Self {
        let mut app = Self {
            stations,
            criteria,
            columns,
            visible: Vec::new(),
            state: TableState::default(),
            input_mode: InputMode::Normal,
            picker: None,
            show_detail: false,
        };
        app.refresh();
        app
    }

    /// Replace the criteria and recompute the view
    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
        self.refresh();
    }

    fn refresh(&mut self) {
        self.visible = view_indices(&self.stations, &self.criteria);
        debug!(matched = self.visible.len(), "view refreshed");

        // Reset selection to first row
        if self.visible.is_empty() {
            self.state.select(None);
        } else {
            self.state.select(Some(0));
        }
    }

    pub fn selected_station(&self) -> Option<&StationRecord> {
        self.state
            .selected()
            .and_then(|i| self.visible.get(i))
            .map(|&idx| &self.stations[idx])
    }

    pub fn visible_rows(&self) -> Vec<&StationRecord> {
        self.visible.iter().map(|&i| &self.stations[i]).collect()
    }

    /// Header click on the n-th visible column (0-based)
    pub fn sort_by_visible(&mut self, n: usize) {
        let column = self.columns.iter().nth(n);
        if let Some(column) = column {
            let criteria = self.criteria.clone().sorted_by(column);
            self.set_criteria(criteria);
        }
    }

    pub fn push_search(&mut self, c: char) {
        let mut query = self.criteria.query.clone();
        query.push(c);
        let criteria = self.criteria.clone().with_query(query);
        self.set_criteria(criteria);
    }

    pub fn pop_search(&mut self) {
        let mut query = self.criteria.query.clone();
        query.pop();
        let criteria = self.criteria.clone().with_query(query);
        self.set_criteria(criteria);
    }

    pub fn clear_filters(&mut self) {
        // Nothing to clear; keep the selection where it is
        if self.criteria.is_unfiltered() {
            return;
        }
        let criteria = self.criteria.clone().cleared();
        self.set_criteria(criteria);
    }

    pub fn toggle_route_matching(&mut self) {
        let mode = match self.criteria.route_matching {
            RouteMatching::Substring => RouteMatching::Token,
            RouteMatching::Token => RouteMatching::Substring,
        };
        let criteria = self.criteria.clone().with_route_matching(mode);
        self.set_criteria(criteria);
    }

    pub fn open_picker(&mut self, kind: PickerKind) {
        self.picker = Some(Picker { kind, cursor: 0 });
    }

    pub fn picker_move(&mut self, down: bool) {
        if let Some(picker) = self.picker.as_mut() {
            let len = picker.kind.option_count();
            picker.cursor = if down {
                (picker.cursor + 1) % len
            } else {
                (picker.cursor + len - 1) % len
            };
        }
    }

    /// Flip the option under the picker cursor
    pub fn picker_toggle(&mut self) {
        let Some(picker) = self.picker else {
            return;
        };

        match picker.kind {
            PickerKind::Routes => {
                let route = ROUTE_CODES[picker.cursor];
                let criteria = self.criteria.clone().toggle_route(route);
                self.set_criteria(criteria);
            }
            PickerKind::Boroughs => {
                if let Some(borough) = borough_names().nth(picker.cursor) {
                    let criteria = self.criteria.clone().toggle_borough(borough);
                    self.set_criteria(criteria);
                }
            }
            PickerKind::Columns => {
                // Projection only, the view itself is unchanged
                self.columns = self.columns.toggled(Column::ALL[picker.cursor]);
            }
        }
    }

    /// Label and checked state of every option in a picker
    pub fn picker_options(&self, kind: PickerKind) -> Vec<(String, bool)> {
        match kind {
            PickerKind::Routes => ROUTE_CODES
                .iter()
                .map(|r| (r.to_string(), self.criteria.routes.contains(*r)))
                .collect(),
            PickerKind::Boroughs => borough_names()
                .map(|b| (b.to_string(), self.criteria.boroughs.contains(b)))
                .collect(),
            PickerKind::Columns => Column::ALL
                .iter()
                .map(|c| (c.label().to_string(), self.columns.contains(*c)))
                .collect(),
        }
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn next(&mut self) {
        let len = self.visible.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.visible.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) => len - 1,
            Some(i) => i - 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.visible.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => (i + PAGE_SIZE).min(len - 1),
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        if self.visible.is_empty() {
            return;
        }
        let i = self.state.selected().map(|i| i.saturating_sub(PAGE_SIZE)).unwrap_or(0);
        self.state.select(Some(i));
    }

    /// Apply one key press. Returns false when the app should exit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if self.picker.is_some() {
            match key.code {
                KeyCode::Esc | KeyCode::Char('q') => self.picker = None,
                KeyCode::Down | KeyCode::Char('j') => self.picker_move(true),
                KeyCode::Up | KeyCode::Char('k') => self.picker_move(false),
                KeyCode::Char(' ') | KeyCode::Enter => self.picker_toggle(),
                _ => {}
            }
            return true;
        }

        if self.input_mode == InputMode::Search {
            match key.code {
                KeyCode::Enter => self.input_mode = InputMode::Normal,
                KeyCode::Esc => {
                    let criteria = self.criteria.clone().with_query("");
                    self.set_criteria(criteria);
                    self.input_mode = InputMode::Normal;
                }
                KeyCode::Backspace => self.pop_search(),
                KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                    self.push_search(c)
                }
                _ => {}
            }
            return true;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return false,
            KeyCode::Char('/') => self.input_mode = InputMode::Search,
            KeyCode::Char('r') => self.open_picker(PickerKind::Routes),
            KeyCode::Char('b') => self.open_picker(PickerKind::Boroughs),
            KeyCode::Char('c') => self.open_picker(PickerKind::Columns),
            KeyCode::Char('m') => self.toggle_route_matching(),
            KeyCode::Char('x') => self.clear_filters(),
            KeyCode::Char(d @ '1'..='9') => {
                let n = d as usize - '1' as usize;
                self.sort_by_visible(n);
            }
            KeyCode::Enter => self.toggle_detail(),
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.previous(),
            KeyCode::PageDown => self.page_down(),
            KeyCode::PageUp => self.page_up(),
            KeyCode::Home => {
                if !self.visible.is_empty() {
                    self.state.select(Some(0));
                }
            }
            KeyCode::End => {
                if !self.visible.is_empty() {
                    self.state.select(Some(self.visible.len() - 1));
                }
            }
            _ => {}
        }
        true
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res.map_err(Into::into)
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if !app.handle_key(key) {
                return Ok(());
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with criteria
            Constraint::Min(0),    // Table
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.show_detail {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);

        render_table(f, content_chunks[0], app);
        render_detail_panel(f, content_chunks[1], app);
    } else {
        render_table(f, chunks[1], app);
    }

    render_status_bar(f, chunks[2], app);

    if let Some(picker) = app.picker {
        render_picker(f, picker, app);
    }
}

fn join_or_all(values: &std::collections::BTreeSet<String>) -> String {
    if values.is_empty() {
        "all".to_string()
    } else {
        values.iter().cloned().collect::<Vec<_>>().join(",")
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let searching = app.input_mode == InputMode::Search;
    let search_style = if searching {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };

    let mut spans = vec![
        Span::styled(
            "NYC Subway Stations",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("{}/{}", app.visible.len(), app.stations.len()),
            Style::default().fg(Color::White),
        ),
        Span::raw("  |  Search: "),
        Span::styled(
            format!("{}{}", app.criteria.query, if searching { "▏" } else { "" }),
            search_style,
        ),
        Span::raw("  |  Lines: "),
        Span::styled(join_or_all(&app.criteria.routes), Style::default().fg(Color::Green)),
    ];
    if app.criteria.route_matching == RouteMatching::Token {
        spans.push(Span::styled(" (exact)", Style::default().fg(Color::DarkGray)));
    }
    spans.push(Span::raw("  |  Borough: "));
    spans.push(Span::styled(
        join_or_all(&app.criteria.boroughs),
        Style::default().fg(Color::Green),
    ));

    let header = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn column_width(column: Column) -> Constraint {
    match column {
        Column::StopName => Constraint::Min(24),
        Column::Borough => Constraint::Length(14),
        Column::Routes => Constraint::Length(20),
        Column::Income | Column::WeekdayRidership | Column::WeekendRidership => Constraint::Length(12),
        Column::Accessible | Column::Police | Column::Bathroom => Constraint::Length(10),
    }
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = app.visible_rows();
    let table_view = project(&rows, &app.columns);

    let header_cells = table_view.columns.iter().enumerate().map(|(i, column)| {
        let marker = match app.criteria.sort {
            Some(sort) if sort.column == *column => match sort.direction {
                SortDirection::Ascending => "▲",
                SortDirection::Descending => "▼",
            },
            _ => "",
        };
        let label = if i < 9 {
            format!("{} {}{}", i + 1, column.label(), marker)
        } else {
            format!("{}{}", column.label(), marker)
        };
        Cell::from(label).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let body: Vec<Row> = match table_view.placeholder {
        Some(placeholder) => vec![Row::new(vec![Cell::from(placeholder)
            .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD))])],
        None => table_view
            .rows
            .iter()
            .map(|cells| {
                let styled = cells.iter().zip(table_view.columns.iter()).map(|(text, column)| {
                    let style = if text == subway_explorer::NOT_AVAILABLE {
                        Style::default().fg(Color::DarkGray)
                    } else if column.is_numeric() {
                        Style::default().fg(Color::Green)
                    } else {
                        Style::default()
                    };
                    Cell::from(text.clone()).style(style)
                });
                Row::new(styled).height(1)
            })
            .collect(),
    };

    let widths: Vec<Constraint> = table_view.columns.iter().map(|c| column_width(*c)).collect();

    let table = Table::new(body, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(" Stations "),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
    let total = app.visible.len();

    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));

    let status_spans = vec![
        Span::styled(format!(" Row: {}/{} ", selected, total), Style::default().fg(Color::Cyan)),
        Span::raw(" | "),
        key("/"),
        Span::raw(" Search | "),
        key("r"),
        Span::raw(" Lines | "),
        key("b"),
        Span::raw(" Borough | "),
        key("c"),
        Span::raw(" Columns | "),
        key("1-9"),
        Span::raw(" Sort | "),
        key("x"),
        Span::raw(" Clear | "),
        key("Enter"),
        Span::raw(" Details | "),
        Span::styled("q", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn measure_text(measure: &Option<Measure>) -> String {
    match measure {
        Some(Measure::Number(n)) => subway_explorer::format_grouped(*n),
        Some(Measure::Text(raw)) => raw.clone(),
        None => subway_explorer::NOT_AVAILABLE.to_string(),
    }
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Station Details ");

    let station = match app.selected_station() {
        Some(s) => s,
        None => {
            f.render_widget(Paragraph::new("No station selected").block(block), area);
            return;
        }
    };

    let label = |text: &'static str| {
        Span::styled(text, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
    };
    let yes_no = |v: bool| if v { "Yes" } else { "No" };

    let content = vec![
        Line::from(""),
        Line::from(vec![label("  Stop: "), Span::raw(station.stop_name.clone())]),
        Line::from(vec![label("  Station ID: "), Span::raw(station.station_id.to_string())]),
        Line::from(vec![label("  Borough: "), Span::raw(station.borough_name().to_string())]),
        Line::from(vec![label("  Lines: "), Span::raw(station.daytime_routes.clone())]),
        Line::from(vec![label("  Census Tract: "), Span::raw(station.tract.clone())]),
        Line::from(""),
        Line::from("  ─────────────────────────────────────"),
        Line::from(""),
        Line::from(vec![
            label("  Median Household Income: "),
            Span::styled(
                measure_text(&station.median_household_income),
                Style::default().fg(Color::Green),
            ),
        ]),
        Line::from(vec![
            label("  Avg Weekday Ridership: "),
            Span::raw(measure_text(&station.weekday_ridership)),
        ]),
        Line::from(vec![
            label("  Avg Weekend Ridership: "),
            Span::raw(measure_text(&station.weekend_ridership)),
        ]),
        Line::from(""),
        Line::from(vec![label("  ADA Accessible: "), Span::raw(yes_no(station.ada_accessible))]),
        Line::from(vec![label("  Police Station: "), Span::raw(yes_no(station.police_station))]),
        Line::from(vec![label("  Restroom: "), Span::raw(yes_no(station.bathroom))]),
        Line::from(""),
        Line::from(vec![Span::styled(
            "  Press Enter to close",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )]),
    ];

    f.render_widget(Paragraph::new(content).block(block), area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn render_picker(f: &mut Frame, picker: Picker, app: &App) {
    let options = app.picker_options(picker.kind);
    let area = centered_rect(36, options.len() as u16 + 4, f.size());

    let items: Vec<ListItem> = options
        .into_iter()
        .map(|(label, checked)| {
            let mark = if checked { "[x] " } else { "[ ] " };
            let style = if checked {
                Style::default().fg(Color::Green)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(vec![Span::styled(mark, style), Span::raw(label)]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title(picker.kind.title()),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));

    let mut state = ListState::default();
    state.select(Some(picker.cursor));

    f.render_widget(Clear, area);
    f.render_stateful_widget(list, area, &mut state);
}

// ============================================================================
// TESTS
// ============================================================================
