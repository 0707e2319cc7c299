//! Piece geometry: tetromino kinds, canonical offsets, rotation, random kind source.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// (x, y) offset of one square relative to the piece pivot. x grows right, y grows up.
pub type Offset = (i32, i32);

/// Tetromino kinds. `Empty` doubles as the unoccupied grid cell and the "no piece" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tetromino {
    #[default]
    Empty,
    Z,
    S,
    I,
    T,
    O,
    L,
    J,
}

impl Tetromino {
    /// Number of kinds including `Empty`.
    pub const COUNT: usize = 8;

    /// The seven kinds that can be dealt as a falling piece.
    pub const PLAYABLE: [Self; 7] = [Self::Z, Self::S, Self::I, Self::T, Self::O, Self::L, Self::J];

    /// Stable table index (colour table, offset table). Independent of declaration order.
    pub const fn index(self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Z => 1,
            Self::S => 2,
            Self::I => 3,
            Self::T => 4,
            Self::O => 5,
            Self::L => 6,
            Self::J => 7,
        }
    }

    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Empty),
            1 => Some(Self::Z),
            2 => Some(Self::S),
            3 => Some(Self::I),
            4 => Some(Self::T),
            5 => Some(Self::O),
            6 => Some(Self::L),
            7 => Some(Self::J),
            _ => None,
        }
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Canonical 4 offsets for this kind.
    pub const fn offsets(self) -> [Offset; 4] {
        match self {
            Self::Empty => [(0, 0), (0, 0), (0, 0), (0, 0)],
            Self::Z => [(0, -1), (0, 0), (-1, 0), (-1, 1)],
            Self::S => [(0, -1), (0, 0), (1, 0), (1, 1)],
            Self::I => [(0, -1), (0, 0), (0, 1), (0, 2)],
            Self::T => [(-1, 0), (0, 0), (1, 0), (0, 1)],
            Self::O => [(0, 0), (1, 0), (0, 1), (1, 1)],
            Self::L => [(-1, -1), (0, -1), (0, 0), (0, 1)],
            Self::J => [(1, -1), (0, -1), (0, 0), (0, 1)],
        }
    }

    /// Single-letter name used in logs.
    pub const fn as_char(self) -> char {
        match self {
            Self::Empty => '.',
            Self::Z => 'Z',
            Self::S => 'S',
            Self::I => 'I',
            Self::T => 'T',
            Self::O => 'O',
            Self::L => 'L',
            Self::J => 'J',
        }
    }
}

/// A kind plus its current (possibly rotated) offsets.
///
/// Pieces are values: rotation returns a new piece so a candidate can be
/// tested against the board before it replaces the committed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    kind: Tetromino,
    offsets: [Offset; 4],
}

impl Default for Piece {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Piece {
    /// The inert "no active piece" value.
    pub const EMPTY: Self = Self::new(Tetromino::Empty);

    pub const fn new(kind: Tetromino) -> Self {
        Self {
            kind,
            offsets: kind.offsets(),
        }
    }

    #[inline]
    pub fn kind(&self) -> Tetromino {
        self.kind
    }

    #[cfg(test)]
    pub fn offsets(&self) -> &[Offset; 4] {
        &self.offsets
    }

    #[cfg(test)]
    pub fn min_x(&self) -> i32 {
        self.offsets.iter().map(|&(x, _)| x).min().unwrap_or(0)
    }

    pub fn min_y(&self) -> i32 {
        self.offsets.iter().map(|&(_, y)| y).min().unwrap_or(0)
    }

    /// Absolute grid cells when the pivot sits at (x, y). Offsets grow up, grid rows grow up
    /// from the bottom, and the piece-local y axis is flipped: row = y - dy.
    pub fn cells_at(&self, x: i32, y: i32) -> [(i32, i32); 4] {
        self.offsets.map(|(dx, dy)| (x + dx, y - dy))
    }

    /// (x, y) -> (y, -x). The square is returned as is.
    #[must_use]
    pub fn rotated_left(&self) -> Self {
        if self.kind == Tetromino::O {
            return *self;
        }
        Self {
            kind: self.kind,
            offsets: self.offsets.map(|(x, y)| (y, -x)),
        }
    }

    /// (x, y) -> (-y, x). The square is returned as is.
    #[must_use]
    pub fn rotated_right(&self) -> Self {
        if self.kind == Tetromino::O {
            return *self;
        }
        Self {
            kind: self.kind,
            offsets: self.offsets.map(|(x, y)| (-y, x)),
        }
    }
}

/// Supplies the kind of each newly spawned piece.
pub trait PieceSource {
    /// Next kind; never `Tetromino::Empty`.
    fn next_kind(&mut self) -> Tetromino;
}

/// Uniform draw over the seven playable kinds.
#[derive(Debug, Clone)]
pub struct RandomSource<R = StdRng> {
    rng: R,
}

impl RandomSource {
    /// Seeded from the OS entropy source.
    pub fn from_os_rng() -> Self {
        Self::new(StdRng::from_os_rng())
    }

    /// Deterministic sequence for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RandomSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> PieceSource for RandomSource<R> {
    fn next_kind(&mut self) -> Tetromino {
        // Index 0 is Empty; draw from the playable range only.
        let i = self.rng.random_range(1..Tetromino::COUNT);
        Tetromino::from_index(i).unwrap_or(Tetromino::PLAYABLE[0])
    }
}
