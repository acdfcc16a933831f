use crate::align::{
    scoring::{GapCosts, GAP_CODE},
    traceback::{TracedPath, TB_LEFT, TB_UP},
};

use super::variant::{Edge, OptimalCell, OptimalCells, Variant};

/// Needleman-Wunsch: both sequences are aligned end to end, so leading gaps are charged like
/// any other gap and the optimum is always the bottom-right cell.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Global;

impl Variant for Global {
    const NAME: &'static str = "Needleman-Wunsch";
    const DESCRIPTION: &'static str =
        "Global alignment of two whole sequences with simple or affine gap costs";

    #[inline]
    fn boundary_score(&self, gaps: &GapCosts, k: usize) -> i32 {
        gaps.run_cost(k)
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
        _row: usize,
        _col: usize,
        _rows: usize,
        _cols: usize,
        score: i32,
        code: u8,
        _optimal: &mut OptimalCells,
    ) -> (i32, u8) {
        (score, code)
    }

    fn optimal_cells(
        &self,
        rows: usize,
        cols: usize,
        last_score: i32,
        _optimal: OptimalCells,
    ) -> Vec<OptimalCell> {
        vec![OptimalCell {
            row: rows - 1,
            col: cols - 1,
            score: last_score,
        }]
    }

    #[inline]
    fn is_traceback_done(&self, row: usize, col: usize) -> bool {
        row == 0 && col == 0
    }

    /// The number of leading gaps in each aligned sequence.
    fn offsets(&self, path: &TracedPath) -> [usize; 2] {
        let leading_gaps = |codes: &[u8]| codes.iter().take_while(|&&code| code == GAP_CODE).count();
        [leading_gaps(&path.first), leading_gaps(&path.second)]
    }
}
