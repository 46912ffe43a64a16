use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton, MouseEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Terminal;

use crate::board::{Pos, TokenKind};
use crate::engine::{BoardConfig, BoardEvent, Engine, EnginePhase, SwapOutcome};

pub fn run_tui(config: BoardConfig) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    stdout.execute(EnableMouseCapture)?;
    let _guard = TermGuard;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut engine = Engine::new(config).map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    let mut cursor = Pos::new(0, 0);
    let mut selected: Option<Pos> = None;
    let mut status = String::new();
    let mut last_tick = Instant::now();
    // Animation pacing lives here: the engine only advances when we step it.
    let tick_rate = Duration::from_millis(180);
    let autodemo = std::env::var("DROPMATCH_TUI_AUTODEMO").is_ok();
    let mut demo_step = 0usize;

    let mut last_inner_board = Rect::default();
    let res = loop {
        terminal.draw(|f| {
            last_inner_board = ui(f, &engine, cursor, selected, &status);
        })?;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('q') => break Ok(()),
                    KeyCode::Esc => {
                        if selected.is_some() {
                            selected = None;
                        } else {
                            break Ok(());
                        }
                    }
                    KeyCode::Char('h') | KeyCode::Left => {
                        if cursor.col > 0 {
                            cursor.col -= 1;
                        }
                    }
                    KeyCode::Char('l') | KeyCode::Right => {
                        if cursor.col + 1 < engine.grid().cols() {
                            cursor.col += 1;
                        }
                    }
                    KeyCode::Char('k') | KeyCode::Up => {
                        if cursor.row > 0 {
                            cursor.row -= 1;
                        }
                    }
                    KeyCode::Char('j') | KeyCode::Down => {
                        if cursor.row + 1 < engine.grid().rows() {
                            cursor.row += 1;
                        }
                    }
                    KeyCode::Enter | KeyCode::Char(' ') => {
                        activate(&mut engine, cursor, &mut selected, &mut status);
                    }
                    KeyCode::Char('n') => {
                        if let Ok(e) = Engine::new(config) {
                            engine = e;
                            selected = None;
                            status.clear();
                        }
                    }
                    _ => {}
                },
                Event::Mouse(m) => {
                    if let MouseEventKind::Down(MouseButton::Left) = m.kind {
                        if let Some(p) = pos_to_cell(
                            m.column,
                            m.row,
                            last_inner_board,
                            engine.grid().cols() as u16,
                            engine.grid().rows() as u16,
                        ) {
                            cursor = p;
                            activate(&mut engine, cursor, &mut selected, &mut status);
                        }
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
            if engine.phase() != EnginePhase::Idle {
                for ev in engine.step() {
                    match ev {
                        BoardEvent::GroupMatched { combo, cells, .. } => {
                            status = format!("Combo {}! ({} drops)", combo, cells.len());
                        }
                        BoardEvent::CascadeSettled { combos } => {
                            status = format!("Cascade settled: {} combo(s)", combos);
                        }
                        BoardEvent::TokenMoved { .. } | BoardEvent::TokenSpawned { .. } => {}
                    }
                }
            } else if autodemo {
                // scripted session for smoke testing, then exit
                match demo_step {
                    0 => {
                        demo_swap(&mut engine, &mut status);
                    }
                    1..=3 => { /* pause frames */ }
                    _ => break Ok(()),
                }
                demo_step += 1;
            }
        }
    };

    terminal.show_cursor()?;
    res
}

fn activate(engine: &mut Engine, cursor: Pos, selected: &mut Option<Pos>, status: &mut String) {
    if engine.phase() != EnginePhase::Idle {
        return;
    }
    match *selected {
        None => {
            *selected = Some(cursor);
        }
        Some(s) if s == cursor => {
            *selected = None;
        }
        Some(s) if s.is_adjacent(cursor) => {
            *selected = None;
            match engine.request_swap(s, cursor) {
                Ok(SwapOutcome::Accepted { .. }) => status.clear(),
                Ok(SwapOutcome::Rejected) => *status = "No match - snapped back".into(),
                Err(e) => *status = e.to_string(),
            }
        }
        Some(_) => {
            *selected = Some(cursor);
        }
    }
}

/// Finds the first adjacent pair whose swap is accepted and performs it.
fn demo_swap(engine: &mut Engine, status: &mut String) {
    for r in 0..engine.grid().rows() {
        for c in 0..engine.grid().cols() {
            let a = Pos::new(r, c);
            for b in [Pos::new(r, c + 1), Pos::new(r + 1, c)] {
                if !engine.grid().contains(b) {
                    continue;
                }
                if let Ok(SwapOutcome::Accepted { .. }) = engine.request_swap(a, b) {
                    *status = format!("Demo swap {} <-> {}", a, b);
                    return;
                }
            }
        }
    }
    *status = "Demo: no legal swap found".into();
}

fn ui(f: &mut ratatui::Frame, engine: &Engine, cursor: Pos, selected: Option<Pos>, status: &str) -> Rect {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(f.size());

    // Header
    let header_text = match engine.phase() {
        EnginePhase::Idle => {
            "Arrows/HJKL move • Enter/Space select & swap • mouse click • n new • q quit".to_string()
        }
        _ => format!("Resolving cascade… combos: {}", engine.combo_count()),
    };
    let header = Paragraph::new(header_text)
        .style(Style::default().fg(Color::Cyan))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Drop Match"));
    f.render_widget(header, root[0]);

    // Board area
    let area = centered_grid_area(root[1], engine.grid().cols() as u16, engine.grid().rows() as u16);
    let inner = inner_area(area);
    draw_board(f, engine, area, cursor, selected);

    let footer = Paragraph::new(format!(
        "Size: {}x{}  Kinds: {}  Combos: {}  {}",
        engine.grid().rows(),
        engine.grid().cols(),
        engine.config().palette,
        engine.combo_count(),
        status
    ))
    .style(Style::default().fg(Color::DarkGray))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, root[2]);
    inner
}

fn centered_grid_area(parent: Rect, cols: u16, rows: u16) -> Rect {
    let cell_w = 2; // one glyph + one space
    let cell_h = 1;
    let grid_w = cols * cell_w;
    let grid_h = rows * cell_h;
    let x = parent.x.saturating_add((parent.width.saturating_sub(grid_w)) / 2);
    let y = parent.y.saturating_add((parent.height.saturating_sub(grid_h)) / 2);
    Rect { x, y, width: grid_w.min(parent.width), height: grid_h.min(parent.height) }
}

fn draw_board(f: &mut ratatui::Frame, engine: &Engine, area: Rect, cursor: Pos, selected: Option<Pos>) {
    let grid = engine.grid();
    let mut lines: Vec<Line> = Vec::with_capacity(grid.rows());
    for r in 0..grid.rows() {
        let mut spans: Vec<Span> = Vec::with_capacity(grid.cols() * 2);
        for c in 0..grid.cols() {
            let p = Pos::new(r, c);
            let (ch, mut style) = match grid.get(p) {
                Some(t) => (t.kind().glyph(), Style::default().fg(kind_color(t.kind()))),
                // cleared cell mid-cascade
                None => ('·', Style::default().fg(Color::DarkGray)),
            };
            if selected == Some(p) {
                style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
            }
            if cursor == p {
                style = style.add_modifier(Modifier::REVERSED);
            }
            spans.push(Span::styled(format!("{} ", ch), style));
        }
        lines.push(Line::from(spans));
    }

    let board_block = Block::default().borders(Borders::ALL).title("Board");
    let para = Paragraph::new(lines).block(board_block);
    f.render_widget(para, area);
}

fn kind_color(kind: TokenKind) -> Color {
    match kind.0 {
        0 => Color::Red,
        1 => Color::Blue,
        2 => Color::Green,
        3 => Color::Yellow,
        4 => Color::Magenta,
        5 => Color::LightRed,
        6 => Color::Cyan,
        _ => Color::White,
    }
}

fn inner_area(area: Rect) -> Rect {
    // Match Block::inner() for Borders::ALL: shrink by 1 on each side
    Rect {
        x: area.x.saturating_add(1),
        y: area.y.saturating_add(1),
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    }
}

fn pos_to_cell(mx: u16, my: u16, inner: Rect, cols: u16, rows: u16) -> Option<Pos> {
    if mx < inner.x || my < inner.y {
        return None;
    }
    let rel_x = mx - inner.x;
    let rel_y = my - inner.y;
    let cell_w = 2u16; // must match centered_grid_area and rendering width
    let cx = rel_x / cell_w;
    let cy = rel_y / 1u16;
    if cx < cols && cy < rows {
        Some(Pos::new(cy as usize, cx as usize))
    } else {
        None
    }
}

struct TermGuard;
impl Drop for TermGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut stdout = std::io::stdout();
        let _ = stdout.execute(DisableMouseCapture);
        let _ = stdout.execute(LeaveAlternateScreen);
    }
}
