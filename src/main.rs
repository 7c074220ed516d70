use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols;
use ratatui::widgets::{Axis, Block, Borders, Chart, Clear, Dataset, GraphType, Paragraph};

use parlay_terminal::analysis_fetch::{AnalysisResult, BetType, Recommendation};
use parlay_terminal::analysis_worker::spawn_analysis_worker;
use parlay_terminal::config::{ApiConfig, history_limit_from_env, viewport_from_env};
use parlay_terminal::distribution::DistributionCurve;
use parlay_terminal::state::{
    AppState, Delta, FormField, ProviderCommand, apply_delta, format_line,
};

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
}

impl App {
    fn new(cmd_tx: Option<mpsc::Sender<ProviderCommand>>) -> Self {
        Self {
            state: AppState::with_settings(viewport_from_env(), history_limit_from_env()),
            should_quit: false,
            cmd_tx,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl {
            match key.code {
                KeyCode::Char('c') | KeyCode::Char('q') => self.should_quit = true,
                KeyCode::Char('l') => {
                    self.state.clear_result();
                    self.state.push_log("[INFO] Result cleared");
                }
                KeyCode::Char('r') => self.send(ProviderCommand::ClearCache),
                _ => {}
            }
            return;
        }

        if self.state.help_overlay {
            if matches!(key.code, KeyCode::Esc | KeyCode::F(1) | KeyCode::Char('?')) {
                self.state.help_overlay = false;
            }
            return;
        }

        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::F(1) => self.state.help_overlay = true,
            KeyCode::Tab | KeyCode::Down if self.state.focus != FormField::History => {
                self.state.focus_next()
            }
            KeyCode::BackTab | KeyCode::Up if self.state.focus != FormField::History => {
                self.state.focus_prev()
            }
            KeyCode::Tab => self.state.focus_next(),
            KeyCode::BackTab => self.state.focus_prev(),
            KeyCode::Down => self.state.select_history_next(),
            KeyCode::Up => self.state.select_history_prev(),
            KeyCode::Enter => {
                if self.state.focus == FormField::History {
                    let idx = self.state.history_selected;
                    if self.state.recall_history(idx) {
                        self.state.push_log("[INFO] Form filled from history");
                    }
                } else {
                    self.analyze();
                }
            }
            KeyCode::Backspace => self.state.backspace(),
            KeyCode::Left | KeyCode::Right => {
                let forward = key.code == KeyCode::Right;
                match self.state.focus {
                    FormField::Stat => self.state.cycle_stat(forward),
                    FormField::Direction => self.state.toggle_bet(),
                    _ => {}
                }
            }
            KeyCode::Char(c) => match self.state.focus {
                FormField::Player | FormField::Line => self.state.input_char(c),
                FormField::Direction => match c {
                    'o' | 'O' => self.state.set_bet(BetType::Over),
                    'u' | 'U' => self.state.set_bet(BetType::Under),
                    ' ' => self.state.toggle_bet(),
                    '?' => self.state.help_overlay = true,
                    _ => {}
                },
                FormField::Stat => match c {
                    ' ' => self.state.cycle_stat(true),
                    '?' => self.state.help_overlay = true,
                    _ => {}
                },
                FormField::History => match c {
                    'j' => self.state.select_history_next(),
                    'k' => self.state.select_history_prev(),
                    '?' => self.state.help_overlay = true,
                    _ => {}
                },
            },
            _ => {}
        }
    }

    fn analyze(&mut self) {
        if self.state.loading {
            return;
        }
        let Some(req) = self.state.submit() else {
            return;
        };
        self.send(ProviderCommand::Analyze(req));
    }

    fn send(&mut self, cmd: ProviderCommand) {
        let Some(tx) = &self.cmd_tx else {
            self.state.push_log("[INFO] Analysis worker unavailable");
            return;
        };
        if tx.send(cmd).is_err() {
            self.state.push_log("[WARN] Analysis worker stopped");
            self.state.error = Some("Unable to connect to server. Please try again.".to_string());
        }
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let config = ApiConfig::from_env();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    spawn_analysis_worker(tx, cmd_rx, config);

    let mut app = App::new(Some(cmd_tx));
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.on_key(key);
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(5),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .style(Style::default().fg(Color::LightRed))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(40), Constraint::Min(30)])
        .split(chunks[1]);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(12), Constraint::Min(1)])
        .split(columns[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(10), Constraint::Min(1)])
        .split(columns[1]);

    render_form(frame, left[0], &app.state);
    render_history(frame, left[1], &app.state);
    render_result(frame, right[0], &app.state);
    render_distribution(frame, right[1], &app.state);

    let console = Paragraph::new(console_text(&app.state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(footer_text(&app.state))
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[3]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let status = if state.loading { "ANALYZING..." } else { "READY" };
    format!("  PARLAY ANALYZER | {status}\n  Real stats. Real probabilities.")
}

fn footer_text(state: &AppState) -> String {
    match state.focus {
        FormField::History => {
            "Tab Field | j/k/↑/↓ Select | Enter Recall | Ctrl-L Clear | F1 Help | Esc Quit"
                .to_string()
        }
        FormField::Stat | FormField::Direction => {
            "Tab Field | ←/→ Change | Enter Analyze | Ctrl-L Clear | F1 Help | Esc Quit"
                .to_string()
        }
        _ => "Tab Field | Type to edit | Enter Analyze | Ctrl-L Clear | F1 Help | Esc Quit"
            .to_string(),
    }
}

fn field_style(state: &AppState, field: FormField) -> Style {
    let base = if state.focus == field {
        Style::default().fg(Color::White).bg(Color::DarkGray)
    } else {
        Style::default()
    };
    if state.loading {
        base.add_modifier(Modifier::DIM)
    } else {
        base
    }
}

fn render_form(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().title("Leg").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height == 0 {
        return;
    }

    let cursor = |field: FormField| if state.focus == field { "_" } else { "" };
    let player = if state.player.is_empty() && state.focus != FormField::Player {
        "LeBron James".to_string()
    } else {
        format!("{}{}", state.player, cursor(FormField::Player))
    };
    let line = if state.line.is_empty() && state.focus != FormField::Line {
        "25.5".to_string()
    } else {
        format!("{}{}", state.line, cursor(FormField::Line))
    };
    let (over, under) = match state.bet_type {
        BetType::Over => ("[OVER]", " UNDER "),
        BetType::Under => (" OVER ", "[UNDER]"),
    };
    let button = if state.loading {
        "ANALYZING..."
    } else if state.can_submit() {
        "Enter: ANALYZE"
    } else {
        "fill player and line"
    };

    let rows: Vec<(FormField, String)> = vec![
        (FormField::Player, format!("Player     {player}")),
        (
            FormField::Stat,
            format!("Stat       ◀ {} ▶", state.stat_type.label()),
        ),
        (FormField::Line, format!("Line       {line}")),
        (FormField::Direction, format!("Direction  {over} {under}")),
    ];

    let mut y = inner.y;
    for (field, text) in rows {
        if y >= inner.y + inner.height {
            return;
        }
        let row = Rect {
            x: inner.x,
            y,
            width: inner.width,
            height: 1,
        };
        frame.render_widget(Paragraph::new(text).style(field_style(state, field)), row);
        y += 2;
    }

    if y < inner.y + inner.height {
        let row = Rect {
            x: inner.x,
            y,
            width: inner.width,
            height: 1,
        };
        let style = Style::default()
            .fg(Color::LightRed)
            .add_modifier(Modifier::BOLD);
        frame.render_widget(Paragraph::new(button).style(style), row);
        y += 1;
    }

    if let Some(err) = state.error.as_ref()
        && y < inner.y + inner.height
    {
        let row = Rect {
            x: inner.x,
            y,
            width: inner.width,
            height: inner.y + inner.height - y,
        };
        frame.render_widget(
            Paragraph::new(err.as_str()).style(Style::default().fg(Color::Red)),
            row,
        );
    }
}

fn render_history(frame: &mut Frame, area: Rect, state: &AppState) {
    let title = if state.focus == FormField::History {
        "Recent *"
    } else {
        "Recent"
    };
    let text = if state.history.is_empty() {
        "No analyses yet".to_string()
    } else {
        state
            .history
            .iter()
            .enumerate()
            .map(|(idx, h)| {
                let prefix = if state.focus == FormField::History && idx == state.history_selected
                {
                    "> "
                } else {
                    "  "
                };
                format!(
                    "{prefix}{} {} {} {} {:.0}% {}{}",
                    h.analyzed_at.format("%H:%M"),
                    h.request.player,
                    h.request.bet_type.label().chars().next().unwrap_or('?'),
                    format_line(h.request.line),
                    h.probability * 100.0,
                    h.recommendation,
                    if h.cached { " *" } else { "" }
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    let history = Paragraph::new(text)
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(history, area);
}

fn recommendation_color(result: &AnalysisResult) -> Color {
    match result.recommendation_kind() {
        Recommendation::Hit => Color::Green,
        Recommendation::Miss => Color::Red,
        Recommendation::Other(_) => Color::Yellow,
    }
}

fn render_result(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().title("Analysis").borders(Borders::ALL);
    let Some(result) = state.result.as_ref() else {
        let msg = if state.loading {
            "Analyzing..."
        } else {
            "Enter a leg and press Enter"
        };
        let empty = Paragraph::new(msg)
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                format!("{:.1}%", result.probability_pct()),
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  hit probability  "),
            Span::styled(
                format!(" {} ", result.recommendation),
                Style::default()
                    .fg(recommendation_color(result))
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(format!(
            "{} {} {} {}   edge {:+.1}%",
            result.player,
            result.bet_type.to_uppercase(),
            format_line(result.line),
            result.stat_type,
            result.edge * 100.0
        )),
        Line::from(format!(
            "Season {}   Last 10 {}   StdDev ±{}",
            result.season_avg,
            result.recent_avg,
            result
                .season_std
                .map(|sd| format!("{sd:.1}"))
                .unwrap_or_else(|| "-".to_string())
        )),
    ];
    if let Some(adj) = result.adjusted_avg {
        lines.push(Line::from(format!("Adjusted avg {adj}")));
    }
    if let Some((lo, hi)) = result.confidence_80 {
        lines.push(Line::from(format!("80% confidence  {lo} ━━━━━━━━ {hi}")));
    }
    if let Some(usage) = result.usage.as_ref() {
        lines.push(Line::from(format!(
            "Usage {}/{} remaining",
            usage.remaining, usage.total_limit
        )));
    }
    if state.result_cached {
        lines.push(Line::styled(
            "(cached result)",
            Style::default().fg(Color::DarkGray),
        ));
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_distribution(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(curve) = state.curve.as_ref() else {
        let empty = Paragraph::new("No distribution")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().title("Distribution").borders(Borders::ALL));
        frame.render_widget(empty, area);
        return;
    };

    let (points, marker, y_bounds) = chart_series(curve);
    let title = if curve.line_marker_visible() {
        "Distribution".to_string()
    } else {
        "Distribution (line off chart)".to_string()
    };

    let datasets = vec![
        Dataset::default()
            .name("density")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::LightBlue))
            .data(&points),
        Dataset::default()
            .name("line")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::LightRed))
            .data(&marker),
    ];

    let x_axis = Axis::default()
        .bounds([0.0, curve.viewport.width])
        .labels(vec![
            Span::raw(format!("{:.1}", curve.min_x)),
            Span::raw(format!("{:.1}", curve.mean)),
            Span::raw(format!("{:.1}", curve.max_x)),
        ]);
    let y_axis = Axis::default().bounds(y_bounds);

    let chart = Chart::new(datasets)
        .block(Block::default().title(title).borders(Borders::ALL))
        .x_axis(x_axis)
        .y_axis(y_axis);
    frame.render_widget(chart, area);
}

/// Flip pixel rows so density grows upward, and fit the y axis to the path.
fn chart_series(curve: &DistributionCurve) -> (Vec<(f64, f64)>, Vec<(f64, f64)>, [f64; 2]) {
    let height = curve.viewport.height;
    let points: Vec<(f64, f64)> = curve.path.iter().map(|p| (p.x, height - p.y)).collect();
    let (lo, hi) = points
        .iter()
        .fold((0.0_f64, height), |(lo, hi), (_, y)| (lo.min(*y), hi.max(*y)));
    let marker = vec![(curve.line_marker_x, lo), (curve.line_marker_x, hi)];
    (points, marker, [lo, hi])
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No messages yet".to_string();
    }
    state
        .logs
        .iter()
        .rev()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Parlay Analyzer - Help",
        "",
        "Form:",
        "  Tab / Shift-Tab   Next / previous field",
        "  ←/→               Change stat or direction",
        "  o / u             Over / under (direction field)",
        "  Enter             Analyze",
        "",
        "Recent:",
        "  j/k or ↑/↓        Select",
        "  Enter             Refill the form",
        "",
        "Global:",
        "  Ctrl-L            Clear result",
        "  Ctrl-R            Clear cached analyses",
        "  F1                Toggle help",
        "  Esc / Ctrl-C      Quit",
        "",
        "Educational tool. Not financial advice.",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
