use crate::align::{
    scoring::GapCosts,
    traceback::{TB_LEFT, TB_UP},
};

use super::variant::{Edge, OptimalCell, OptimalCells, Variant};

/// Overlap (semi-global) alignment: either sequence may overhang the other at the start and at
/// the end without penalty, so the alignment runs from the top or left edge to the bottom or
/// right edge.
///
/// Several end cells on the bottom or right edge can tie for the best score.  Only the first,
/// ordered along the second sequence, is traced unless [`Options::all_optimal`](super::Options)
/// is set, in which case every tied cell yields an alignment.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Overlap;

impl Variant for Overlap {
    const NAME: &'static str = "Pairwise Overlap";
    const DESCRIPTION: &'static str =
        "Overlap alignment with free end gaps and simple or affine gap costs";

    #[inline]
    fn boundary_score(&self, _gaps: &GapCosts, _k: usize) -> i32 {
        0
    }

    #[inline]
    fn boundary_code(&self, edge: Edge) -> u8 {
        match edge {
            Edge::Top => TB_LEFT,
            Edge::Left => TB_UP,
        }
    }

    #[inline(always)]
    fn on_cell(
        &self,
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
        score: i32,
        code: u8,
        optimal: &mut OptimalCells,
    ) -> (i32, u8) {
        if row == rows - 1 || col == cols - 1 {
            optimal.offer(row, col, score);
        }
        (score, code)
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
    fn is_traceback_done(&self, row: usize, col: usize) -> bool {
        row == 0 || col == 0
    }
}
