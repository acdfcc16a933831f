use crate::align::{
    scoring::GapCosts,
    traceback::{with_direction, TB_STOP},
};

use super::variant::{Edge, OptimalCell, OptimalCells, Variant};

/// Smith-Waterman: the best-scoring pair of sub-sequences.  Scores never drop below zero and a
/// cell whose score falls to zero starts a new alignment.
///
/// Only one of several equally good alignments is returned unless
/// [`Options::all_optimal`](super::Options) is set.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Local;

impl Variant for Local {
    const NAME: &'static str = "Smith-Waterman";
    const DESCRIPTION: &'static str =
        "Local alignment of the best-scoring sub-sequences with simple or affine gap costs";

    #[inline]
    fn boundary_score(&self, _gaps: &GapCosts, _k: usize) -> i32 {
        0
    }

    #[inline]
    fn boundary_code(&self, _edge: Edge) -> u8 {
        TB_STOP
    }

    #[inline(always)]
    fn on_cell(
        &self,
        row: usize,
        col: usize,
        _rows: usize,
        _cols: usize,
        score: i32,
        code: u8,
        optimal: &mut OptimalCells,
    ) -> (i32, u8) {
        if score <= 0 {
            (0, with_direction(code, TB_STOP))
        } else {
            optimal.offer(row, col, score);
            (score, code)
        }
    }

    fn optimal_cells(
        &self,
        _rows: usize,
        _cols: usize,
        _last_score: i32,
        optimal: OptimalCells,
    ) -> Vec<OptimalCell> {
        optimal.into_cells()
    }

    #[inline]
    fn is_traceback_done(&self, _row: usize, _col: usize) -> bool {
        false
    }
}
