use std::fmt::Debug;

use crate::align::{scoring::GapCosts, traceback::TracedPath};

/// The boundary of the dynamic-programming matrix a cell lies on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Edge {
    /// Row 0: a prefix of the second sequence aligned to nothing.
    Top,
    /// Column 0: a prefix of the first sequence aligned to nothing.
    Left,
}

/// A cell the traceback starts from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OptimalCell {
    pub row: usize,
    pub col: usize,
    pub score: i32,
}

impl OptimalCell {
    #[inline]
    fn sweep_order(&self) -> (usize, usize) {
        (self.col, self.row)
    }
}

/// The best positive-scoring cells offered during a fill.
///
/// Cells are ordered by their position in the second sequence, then in the first: the order in
/// which a sweep along the second sequence, with the first sequence in the inner loop, meets
/// them.  A tie keeps the earliest cell in that order unless every tied cell is kept.
#[derive(Clone, Debug)]
pub struct OptimalCells {
    score: i32,
    cells: Vec<OptimalCell>,
    keep_ties: bool,
}

impl OptimalCells {
    /// With `keep_ties`, every cell tied for the best score is kept, otherwise the earliest one.
    pub fn new(keep_ties: bool) -> Self {
        OptimalCells {
            score: 0,
            cells: Vec::new(),
            keep_ties,
        }
    }

    #[inline]
    pub fn offer(&mut self, row: usize, col: usize, score: i32) {
        let cell = OptimalCell { row, col, score };
        if score > self.score {
            self.score = score;
            self.cells.clear();
            self.cells.push(cell);
        } else if score == self.score && score > 0 {
            if self.keep_ties {
                self.cells.push(cell);
            } else if self
                .cells
                .first()
                .map_or(true, |best| cell.sweep_order() < best.sweep_order())
            {
                self.cells.clear();
                self.cells.push(cell);
            }
        }
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn into_cells(mut self) -> Vec<OptimalCell> {
        self.cells.sort_by_key(OptimalCell::sweep_order);
        self.cells
    }
}

/// The hooks that distinguish one alignment variant from another.  The fill loop and the
/// traceback walk are shared; an aligner is generic over its variant so each hook is inlined
/// into the loop.
pub trait Variant: Copy + Debug + Default + Send + Sync + 'static {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    /// The score of the boundary cell `k` steps along row 0 or column 0.
    fn boundary_score(&self, gaps: &GapCosts, k: usize) -> i32;

    /// The traceback code stored in the boundary cells of `edge`.
    fn boundary_code(&self, edge: Edge) -> u8;

    /// Called with the best score and traceback code of every interior cell; returns the score
    /// and code to store.  Optimal-cell candidates are offered to `optimal`.
    fn on_cell(
        &self,
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
        score: i32,
        code: u8,
        optimal: &mut OptimalCells,
    ) -> (i32, u8);

    /// The cells to trace back from, given the score of the bottom-right cell.
    fn optimal_cells(
        &self,
        rows: usize,
        cols: usize,
        last_score: i32,
        optimal: OptimalCells,
    ) -> Vec<OptimalCell>;

    /// True when the walk back has reached the start of the alignment.
    fn is_traceback_done(&self, row: usize, col: usize) -> bool;

    /// The offsets of the first and second sequence that line the alignment up.
    fn offsets(&self, path: &TracedPath) -> [usize; 2] {
        let [first_start, second_start] = path.start;
        [
            second_start.saturating_sub(first_start),
            first_start.saturating_sub(second_start),
        ]
    }
}
