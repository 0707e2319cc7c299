//! Layout and drawing: board, falling piece, status line, key help, pause and game-over overlays,
//! line-clear flash.

use crate::board::{HEIGHT, Phase, Simulation, WIDTH};
use crate::shape::{PieceSource, Tetromino};
use crate::theme::{Theme, shade};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::time::Instant;
use tachyonfx::{Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx};

/// Terminal columns per board cell; two keeps squares roughly square.
const CELL_WIDTH: u16 = 2;
const SIDEBAR_WIDTH: u16 = 27;
/// Duration of the line-clear flash in ms.
const CLEAR_FLASH_MS: u32 = 250;

/// Board with border.
const BOARD_OUTER_W: u16 = WIDTH as u16 * CELL_WIDTH + 2;
const BOARD_OUTER_H: u16 = HEIGHT as u16 + 2;

/// Line-clear flash state, kept by the app between frames.
#[derive(Default)]
pub struct Flash {
    effect: Option<Effect>,
    last_process: Option<Instant>,
}

impl Flash {
    /// Start a new flash over the board.
    pub fn trigger(&mut self) {
        self.effect = Some(fx::fade_from(
            Color::White,
            Color::White,
            (CLEAR_FLASH_MS, Interpolation::Linear),
        ));
        self.last_process = None;
    }

    pub fn is_active(&self) -> bool {
        self.effect.as_ref().is_some_and(|e| !e.done())
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, now: Instant) {
        let delta = self
            .last_process
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or(std::time::Duration::ZERO);
        let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
        self.last_process = Some(now);
        if let Some(effect) = &mut self.effect {
            frame.render_effect(effect, area, TfxDuration::from_millis(delta_ms));
            if effect.done() {
                self.effect = None;
            }
        }
    }
}

/// Board + sidebar centred in `area`; returns (board outer rect, status rect, sidebar rect).
fn layout(area: Rect) -> (Rect, Rect, Rect) {
    let total_w = BOARD_OUTER_W + SIDEBAR_WIDTH;
    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(BOARD_OUTER_H + 1),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(BOARD_OUTER_W),
            Constraint::Length(SIDEBAR_WIDTH),
        ])
        .split(vert[1]);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(BOARD_OUTER_H), Constraint::Length(1)])
        .split(cols[0]);
    (rows[0], rows[1], cols[1])
}

/// Draw the whole game screen.
pub fn draw<S: PieceSource>(
    frame: &mut Frame,
    sim: &Simulation<S>,
    theme: &Theme,
    flash: &mut Flash,
    now: Instant,
) {
    let area = frame.area();
    let (board_outer, status_area, sidebar_area) = layout(area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg()))
        .title(Span::styled(
            " Blockfall ",
            Style::default().fg(theme.title).bold(),
        ));
    let board_inner = block.inner(board_outer);
    block.render(board_outer, frame.buffer_mut());

    draw_board(frame, sim, theme, board_inner);
    draw_status(frame, sim, theme, status_area);
    draw_sidebar(frame, theme, sidebar_area);

    if flash.is_active() {
        flash.render(frame, board_inner, now);
    }
    match sim.phase() {
        Phase::GameOver => draw_game_over(frame, sim, theme, board_outer),
        Phase::Running if sim.is_paused() => draw_pause_overlay(frame, theme, board_outer),
        _ => {}
    }
}

/// Screen position of board cell (x, y); row 0 is drawn at the bottom.
fn cell_origin(inner: Rect, x: usize, y: usize) -> (u16, u16) {
    (
        inner.x + x as u16 * CELL_WIDTH,
        inner.y + (HEIGHT - 1 - y) as u16,
    )
}

fn draw_board<S: PieceSource>(frame: &mut Frame, sim: &Simulation<S>, theme: &Theme, inner: Rect) {
    for (x, y, kind) in sim.grid().cells() {
        draw_square(frame, theme, inner, x, y, kind);
    }
    if let Some((kind, cells)) = sim.falling_cells() {
        for (x, y) in cells {
            // try_move only commits on-board cells.
            if let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) {
                draw_square(frame, theme, inner, x, y, kind);
            }
        }
    }
}

/// One square: solid body with a darker right edge. Empty cells are plain background.
fn draw_square(frame: &mut Frame, theme: &Theme, inner: Rect, x: usize, y: usize, kind: Tetromino) {
    let (rx, ry) = cell_origin(inner, x, y);
    if rx + 1 >= inner.x + inner.width || ry >= inner.y + inner.height {
        return;
    }
    let buf = frame.buffer_mut();
    let bg = theme.bg();
    if kind.is_empty() {
        buf[(rx, ry)].set_symbol(" ").set_style(Style::default().bg(bg));
        buf[(rx + 1, ry)].set_symbol(" ").set_style(Style::default().bg(bg));
        return;
    }
    let color = theme.piece_color(kind);
    buf[(rx, ry)]
        .set_symbol("█")
        .set_style(Style::default().fg(shade(color, 1.2)).bg(bg));
    buf[(rx + 1, ry)]
        .set_symbol("▌")
        .set_style(Style::default().fg(color).bg(shade(color, 0.6)));
}

fn draw_status<S: PieceSource>(frame: &mut Frame, sim: &Simulation<S>, theme: &Theme, area: Rect) {
    let text = format!(" {}", sim.status());
    Paragraph::new(Line::from(Span::styled(text, Style::default().fg(theme.main_fg))))
        .render(area, frame.buffer_mut());
}

fn draw_sidebar(frame: &mut Frame, theme: &Theme, area: Rect) {
    let key = Style::default().fg(theme.title);
    let desc = Style::default().fg(theme.inactive_fg);
    let bindings = [
        ("←/→ h/l", "move"),
        ("↑ k", "rotate left"),
        ("↓ j", "rotate right"),
        ("space", "drop"),
        ("d", "one line down"),
        ("p", "pause"),
        ("r", "restart"),
        ("q/esc", "quit"),
    ];
    let mut lines = vec![Line::from(Span::styled("Keys", key.bold())), Line::from("")];
    lines.extend(bindings.iter().map(|(k, d)| {
        Line::from(vec![
            Span::styled(format!(" {k:<9}"), key),
            Span::styled(*d, desc),
        ])
    }));
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line));
    Paragraph::new(lines)
        .block(block)
        .render(area, frame.buffer_mut());
}

fn popup(area: Rect, w: u16, h: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(w) / 2,
        y: area.y + area.height.saturating_sub(h) / 2,
        width: w.min(area.width),
        height: h.min(area.height),
    }
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P resume  Q quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg())),
        )
        .style(Style::default().bg(theme.bg()))
        .render(popup(area, 20, 6), frame.buffer_mut());
}

fn draw_game_over<S: PieceSource>(
    frame: &mut Frame,
    sim: &Simulation<S>,
    theme: &Theme,
    area: Rect,
) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Game Over ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Score: {} ", sim.score()),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " R restart  Q quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg())),
        )
        .style(Style::default().bg(theme.bg()))
        .render(popup(area, 20, 8), frame.buffer_mut());
}
