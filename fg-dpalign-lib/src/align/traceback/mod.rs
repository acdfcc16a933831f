use std::{collections::TryReserveError, fmt};

use crate::{
    align::{
        aligners::variant::{OptimalCell, Variant},
        scoring::GAP_CODE,
    },
    errors::{AlignError, Result},
};

// Traceback moves, stored in the low bits of each cell
pub const TB_DIAGONAL: u8 = 0b0000;
pub const TB_UP: u8 = 0b0001; // 1
pub const TB_LEFT: u8 = 0b0010; // 2
pub const TB_STOP: u8 = 0b0011; // 3
pub const TB_DIRECTION_MASK: u8 = 0b0111;

// Affine fills only: set when the gap track at a cell extends the run of the previous cell
// rather than opening a new one
pub const TB_UP_EXTENDS: u8 = 0b0001_0000;
pub const TB_LEFT_EXTENDS: u8 = 0b0010_0000;

/// Where the best score of a cell came from.  `Up` consumes a symbol of the first sequence
/// against a gap, `Left` a symbol of the second.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Diagonal,
    Up,
    Left,
    Stop,
}

impl Direction {
    /// Decodes the direction bits of a traceback cell, `None` for an invalid code.
    #[inline]
    pub fn from_code(code: u8) -> Option<Self> {
        match code & TB_DIRECTION_MASK {
            TB_DIAGONAL => Some(Self::Diagonal),
            TB_UP => Some(Self::Up),
            TB_LEFT => Some(Self::Left),
            TB_STOP => Some(Self::Stop),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Diagonal => TB_DIAGONAL,
            Self::Up => TB_UP,
            Self::Left => TB_LEFT,
            Self::Stop => TB_STOP,
        }
    }

    fn as_char(code: u8) -> char {
        match Self::from_code(code) {
            Some(Self::Diagonal) => '\\',
            Some(Self::Up) => '|',
            Some(Self::Left) => '-',
            Some(Self::Stop) => '*',
            None => '?',
        }
    }
}

/// Replaces the direction bits of `code`, keeping its gap-extension flags.
#[inline(always)]
pub fn with_direction(code: u8, direction: u8) -> u8 {
    (code & !TB_DIRECTION_MASK) | direction
}

/// One byte per dynamic-programming cell, `rows x cols`, stored row-major.
#[derive(Default, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Traceback {
    rows: usize,
    cols: usize,
    matrix: Vec<u8>,
}

impl Traceback {
    /// Allocates a traceback with every cell set to [`TB_STOP`], failing rather than aborting
    /// when the memory cannot be reserved.
    pub fn try_new(rows: usize, cols: usize) -> std::result::Result<Self, TryReserveError> {
        let len = rows.saturating_mul(cols);
        let mut matrix = Vec::new();
        matrix.try_reserve_exact(len)?;
        matrix.resize(len, TB_STOP);
        Ok(Traceback { rows, cols, matrix })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline(always)]
    pub fn set(&mut self, i: usize, j: usize, v: u8) {
        debug_assert!(i < self.rows);
        debug_assert!(j < self.cols);
        self.matrix[i * self.cols + j] = v;
    }

    #[inline(always)]
    pub fn get(&self, i: usize, j: usize) -> u8 {
        debug_assert!(i < self.rows);
        debug_assert!(j < self.cols);
        self.matrix[i * self.cols + j]
    }
}

/// Draws the direction of every cell, one row per line.
impl fmt::Display for Traceback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.matrix.chunks(self.cols.max(1)) {
            let line: String = row.iter().map(|&code| Direction::as_char(code)).collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// The path found by walking back from an optimal cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracedPath {
    pub score: i32,
    /// Aligned byte codes of the first sequence, [`GAP_CODE`] for gaps.
    pub first: Vec<u8>,
    /// Aligned byte codes of the second sequence, [`GAP_CODE`] for gaps.
    pub second: Vec<u8>,
    /// The (row, col) cell the walk stopped at, i.e. the 0-based start in each sequence.
    pub start: [usize; 2],
    /// The (row, col) cell the walk began at, i.e. the 0-based exclusive end in each sequence.
    pub end: [usize; 2],
    /// Gaps inserted into the first and the second aligned sequence.
    pub insertions: [usize; 2],
}

impl TracedPath {
    pub fn len(&self) -> usize {
        self.first.len()
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_empty()
    }
}

/// Which of the three score tracks the walk is following.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Track {
    Best,
    Vertical,
    Horizontal,
}

/// Walks back from `cell` until the variant says the path is complete or a stop code is found.
///
/// In the best-score track the direction bits are followed.  A gap direction switches to the
/// matching gap track, which keeps consuming gaps for as long as the extension flag of each
/// cell is set, so affine gap runs are reproduced exactly.
pub fn trace<V: Variant>(
    variant: &V,
    traceback: &Traceback,
    first: &[u8],
    second: &[u8],
    cell: OptimalCell,
) -> Result<TracedPath> {
    let (mut row, mut col) = (cell.row, cell.col);
    let mut aligned_first = Vec::with_capacity(row + col);
    let mut aligned_second = Vec::with_capacity(row + col);
    let mut insertions = [0, 0];
    let mut track = Track::Best;

    while !variant.is_traceback_done(row, col) {
        let code = traceback.get(row, col);
        let invalid = move || AlignError::InvalidDirection { code, row, col };
        if track == Track::Best {
            match Direction::from_code(code) {
                Some(Direction::Stop) => break,
                Some(Direction::Diagonal) => {
                    if row == 0 || col == 0 {
                        return Err(invalid());
                    }
                    row -= 1;
                    col -= 1;
                    aligned_first.push(first[row]);
                    aligned_second.push(second[col]);
                    continue;
                }
                Some(Direction::Up) => track = Track::Vertical,
                Some(Direction::Left) => track = Track::Horizontal,
                None => return Err(invalid()),
            }
        }
        if track == Track::Vertical {
            if row == 0 {
                return Err(invalid());
            }
            row -= 1;
            aligned_first.push(first[row]);
            aligned_second.push(GAP_CODE);
            insertions[1] += 1;
            if code & TB_UP_EXTENDS == 0 {
                track = Track::Best;
            }
        } else {
            if col == 0 {
                return Err(invalid());
            }
            col -= 1;
            aligned_first.push(GAP_CODE);
            aligned_second.push(second[col]);
            insertions[0] += 1;
            if code & TB_LEFT_EXTENDS == 0 {
                track = Track::Best;
            }
        }
    }

    aligned_first.reverse();
    aligned_second.reverse();
    Ok(TracedPath {
        score: cell.score,
        first: aligned_first,
        second: aligned_second,
        start: [row, col],
        end: [cell.row, cell.col],
        insertions,
    })
}
