//! Board simulation: grid, active piece state machine, collision, locking, line clear.

use crate::shape::{Piece, PieceSource, RandomSource, Tetromino};
use log::{debug, info};
use std::fmt;

/// Board width in cells.
pub const WIDTH: usize = 10;
/// Board height in cells. Row 0 is the bottom row.
pub const HEIGHT: usize = 22;

/// Fixed-size grid of cells; `Tetromino::Empty` means unoccupied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    /// rows[y][x]; rows[0] is the bottom.
    rows: [[Tetromino; WIDTH]; HEIGHT],
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

impl Grid {
    pub const fn new() -> Self {
        Self {
            rows: [[Tetromino::Empty; WIDTH]; HEIGHT],
        }
    }

    #[inline]
    pub fn contains(x: i32, y: i32) -> bool {
        (0..WIDTH as i32).contains(&x) && (0..HEIGHT as i32).contains(&y)
    }

    /// Cell at (x, y); `None` outside the board.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Option<Tetromino> {
        Self::contains(x, y).then(|| self.rows[y as usize][x as usize])
    }

    #[inline]
    pub fn set(&mut self, x: i32, y: i32, kind: Tetromino) {
        if Self::contains(x, y) {
            self.rows[y as usize][x as usize] = kind;
        }
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Row y, bottom-up index.
    #[cfg(test)]
    pub fn row(&self, y: usize) -> &[Tetromino; WIDTH] {
        &self.rows[y]
    }

    pub fn is_row_full(&self, y: usize) -> bool {
        self.rows[y].iter().all(|c| !c.is_empty())
    }

    /// True if every cell of `piece` pivoted at (x, y) is on the board and unoccupied.
    pub fn fits(&self, piece: &Piece, x: i32, y: i32) -> bool {
        piece
            .cells_at(x, y)
            .iter()
            .all(|&(cx, cy)| self.get(cx, cy) == Some(Tetromino::Empty))
    }

    /// Single top-down pass: each full row is removed and everything above it shifts down one
    /// row, the top row becoming empty. Returns the number of rows removed.
    ///
    /// A row is examined once. Compaction only ever moves already-examined rows into the
    /// current index, so the row now sitting there is not re-checked in the same call.
    pub fn remove_full_lines(&mut self) -> usize {
        let mut removed = 0;
        for y in (0..HEIGHT).rev() {
            if !self.is_row_full(y) {
                continue;
            }
            removed += 1;
            for k in y..HEIGHT - 1 {
                self.rows[k] = self.rows[k + 1];
            }
            self.rows[HEIGHT - 1] = [Tetromino::Empty; WIDTH];
        }
        removed
    }

    /// Iterate (x, y, kind) over every cell, bottom row first.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, Tetromino)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(y, row)| row.iter().enumerate().map(move |(x, &kind)| (x, y, kind)))
    }
}

/// Lifecycle of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    GameOver,
}

/// Notifications for the collaborators around the simulation (renderer, audio, scheduler).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Started,
    Paused,
    Resumed,
    /// The committed piece or the grid changed.
    Redraw,
    LinesCleared(usize),
    GameOver { score: u32 },
}

/// Status line text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Paused,
    Score(u32),
    GameOver(u32),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Paused => write!(f, "Paused"),
            Self::Score(n) => write!(f, "Score: {n}"),
            Self::GameOver(n) => write!(f, "Game over! Score: {n}"),
        }
    }
}

/// The board, the falling piece and game progress.
///
/// All mutation goes through [`Simulation::try_move`]; every player command and every
/// gravity step is a single call on this type. The simulation keeps no clock: an outside
/// scheduler calls [`Simulation::tick`] at a fixed period.
#[derive(Debug)]
pub struct Simulation<S = RandomSource> {
    grid: Grid,
    piece: Piece,
    x: i32,
    y: i32,
    phase: Phase,
    paused: bool,
    /// Set when a clear emptied the piece; the next tick spawns instead of falling.
    falling_finished: bool,
    score: u32,
    source: S,
    signals: Vec<Signal>,
}

impl<S: PieceSource> Simulation<S> {
    pub fn new(source: S) -> Self {
        Self {
            grid: Grid::new(),
            piece: Piece::EMPTY,
            x: 0,
            y: 0,
            phase: Phase::Idle,
            paused: false,
            falling_finished: false,
            score: 0,
            source,
            signals: Vec::new(),
        }
    }

    /// Reset the board and score and spawn the first piece. Also restarts a finished game.
    pub fn start(&mut self) {
        self.grid.clear();
        self.piece = Piece::EMPTY;
        self.paused = false;
        self.falling_finished = false;
        self.score = 0;
        self.phase = Phase::Running;
        info!("game started");
        self.signals.push(Signal::Started);
        self.new_piece();
    }

    /// One scheduler period.
    pub fn tick(&mut self) {
        if self.phase != Phase::Running || self.paused {
            return;
        }
        if self.falling_finished {
            self.falling_finished = false;
            self.new_piece();
        } else {
            self.one_line_down();
        }
    }

    /// Commit `candidate` at (new_x, new_y) if every cell is on the board and free.
    /// Returns false and leaves the state untouched otherwise.
    pub fn try_move(&mut self, candidate: Piece, new_x: i32, new_y: i32) -> bool {
        if self.phase != Phase::Running || candidate.kind().is_empty() {
            return false;
        }
        if !self.grid.fits(&candidate, new_x, new_y) {
            return false;
        }
        self.piece = candidate;
        self.x = new_x;
        self.y = new_y;
        self.signals.push(Signal::Redraw);
        true
    }

    pub fn move_left(&mut self) -> bool {
        self.try_move(self.piece, self.x - 1, self.y)
    }

    pub fn move_right(&mut self) -> bool {
        self.try_move(self.piece, self.x + 1, self.y)
    }

    pub fn rotate_left(&mut self) -> bool {
        self.try_move(self.piece.rotated_left(), self.x, self.y)
    }

    pub fn rotate_right(&mut self) -> bool {
        self.try_move(self.piece.rotated_right(), self.x, self.y)
    }

    /// Gravity step: fall one row, or lock in place if blocked.
    pub fn one_line_down(&mut self) {
        if !self.has_live_piece() || self.paused {
            return;
        }
        if !self.try_move(self.piece, self.x, self.y - 1) {
            self.piece_dropped();
        }
    }

    /// Hard drop: descend row by row to the lowest reachable position, then lock.
    pub fn drop_down(&mut self) {
        if !self.has_live_piece() || self.paused {
            return;
        }
        let mut new_y = self.y;
        while new_y > 0 {
            if !self.try_move(self.piece, self.x, new_y - 1) {
                break;
            }
            new_y -= 1;
        }
        self.piece_dropped();
    }

    pub fn toggle_pause(&mut self) {
        if self.phase != Phase::Running {
            return;
        }
        self.paused = !self.paused;
        debug!("paused = {}", self.paused);
        self.signals
            .push(if self.paused { Signal::Paused } else { Signal::Resumed });
        self.signals.push(Signal::Redraw);
    }

    fn has_live_piece(&self) -> bool {
        self.phase == Phase::Running && !self.piece.kind().is_empty()
    }

    /// Lock the active piece into the grid, clear lines and, unless a clear asked for a one-tick
    /// pause, spawn the next piece.
    fn piece_dropped(&mut self) {
        let kind = self.piece.kind();
        for (cx, cy) in self.piece.cells_at(self.x, self.y) {
            self.grid.set(cx, cy, kind);
        }
        debug!("locked {} at ({}, {})", kind.as_char(), self.x, self.y);
        self.signals.push(Signal::Redraw);

        self.remove_full_lines();

        if !self.falling_finished {
            self.new_piece();
        }
    }

    fn remove_full_lines(&mut self) {
        let removed = self.grid.remove_full_lines();
        if removed == 0 {
            return;
        }
        self.score += removed as u32;
        self.falling_finished = true;
        self.piece = Piece::EMPTY;
        debug!("cleared {removed} line(s), score {}", self.score);
        self.signals.push(Signal::LinesCleared(removed));
    }

    /// Spawn a random piece at the top centre; if it does not fit the game is over.
    fn new_piece(&mut self) {
        let piece = Piece::new(self.source.next_kind());
        let x = WIDTH as i32 / 2 + 1;
        let y = HEIGHT as i32 - 1 + piece.min_y();

        if !self.try_move(piece, x, y) {
            self.piece = Piece::EMPTY;
            self.phase = Phase::GameOver;
            info!(
                "top out spawning {}: game over with score {}",
                piece.kind().as_char(),
                self.score
            );
            self.signals.push(Signal::GameOver { score: self.score });
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Falling piece kind and its absolute cells, or `None` when there is no piece.
    pub fn falling_cells(&self) -> Option<(Tetromino, [(i32, i32); 4])> {
        let kind = self.piece.kind();
        (!kind.is_empty()).then(|| (kind, self.piece.cells_at(self.x, self.y)))
    }

    pub fn piece(&self) -> Piece {
        self.piece
    }

    #[cfg(test)]
    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[cfg(test)]
    pub fn is_falling_finished(&self) -> bool {
        self.falling_finished
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn status(&self) -> Status {
        match (self.phase, self.paused) {
            (Phase::GameOver, _) => Status::GameOver(self.score),
            (_, true) => Status::Paused,
            _ => Status::Score(self.score),
        }
    }

    /// Take the signals raised since the last call.
    pub fn drain_signals(&mut self) -> Vec<Signal> {
        std::mem::take(&mut self.signals)
    }
}
