use log::{debug, log_enabled, trace, Level};

use crate::{
    align::{
        scoring::{GapCosts, SimilarityMatrix},
        traceback::{
            self, TracedPath, Traceback, TB_DIAGONAL, TB_LEFT, TB_LEFT_EXTENDS, TB_UP,
            TB_UP_EXTENDS,
        },
    },
    errors::{AlignError, Result},
};

use super::{
    constants::MIN_SCORE,
    variant::{Edge, OptimalCell, OptimalCells, Variant},
};

/// Estimated bytes of working memory needed to align sequences of the given lengths.  The
/// estimate covers the direction matrix plus the score rows and never overflows.
pub fn estimated_bytes(first_len: usize, second_len: usize, gaps: &GapCosts) -> u128 {
    (first_len as u128 + 1) * (second_len as u128 + 1) * gaps.bytes_per_cell()
}

/// True when every score, and every candidate score, of a fill over sequences of the given
/// lengths stays strictly between [`MIN_SCORE`] and its negation.  A path crosses at most
/// `first_len + second_len` cells and each step adds at most one score or gap cost.
pub fn fits_score_range(
    first_len: usize,
    second_len: usize,
    matrix: &SimilarityMatrix,
    gaps: &GapCosts,
) -> bool {
    let step = u128::from(matrix.max_abs_score().max(gaps.max_abs_cost()));
    let steps = first_len as u128 + second_len as u128 + 2;
    steps * step < u128::from(MIN_SCORE.unsigned_abs())
}

/// Allocates a score row, failing rather than aborting when memory is short.
fn try_row(len: usize, value: i32) -> std::result::Result<Vec<i32>, std::collections::TryReserveError> {
    let mut row = Vec::new();
    row.try_reserve_exact(len)?;
    row.resize(len, value);
    Ok(row)
}

/// The state of a single alignment call: the encoded sequences, the gap costs and the
/// direction matrix.  Rows index the first sequence and columns the second.
pub(crate) struct Context<'a, V: Variant> {
    variant: V,
    matrix: &'a SimilarityMatrix,
    gaps: GapCosts,
    first: Vec<u8>,
    second: Vec<u8>,
    rows: usize,
    cols: usize,
    traceback: Traceback,
    keep_ties: bool,
}

impl<'a, V: Variant> Context<'a, V> {
    /// Sizes and allocates the direction matrix.  Fails before allocating anything with
    /// [`AlignError::ScoreOverflow`] when the scores could leave the `i32` range, and with
    /// [`AlignError::OutOfMemory`] when the estimate exceeds `max_bytes` or the address space.
    pub fn new(
        variant: V,
        matrix: &'a SimilarityMatrix,
        gaps: GapCosts,
        first: Vec<u8>,
        second: Vec<u8>,
        max_bytes: Option<u64>,
        keep_ties: bool,
    ) -> Result<Self> {
        if !fits_score_range(first.len(), second.len(), matrix, &gaps) {
            return Err(AlignError::ScoreOverflow {
                first_len: first.len(),
                second_len: second.len(),
                max_step: matrix.max_abs_score().max(gaps.max_abs_cost()),
            });
        }
        let estimate = estimated_bytes(first.len(), second.len(), &gaps);
        let out_of_memory = || AlignError::OutOfMemory {
            first_len: first.len(),
            second_len: second.len(),
            estimated_bytes: estimate,
        };
        debug!(
            "{} alignment of {}x{} symbols needs an estimated {} bytes",
            V::NAME,
            first.len(),
            second.len(),
            estimate
        );
        let over_ceiling = max_bytes.map_or(false, |max| estimate > u128::from(max));
        if over_ceiling || estimate > isize::MAX as u128 {
            return Err(out_of_memory());
        }

        let rows = first.len() + 1;
        let cols = second.len() + 1;
        let traceback = Traceback::try_new(rows, cols).map_err(|_| out_of_memory())?;
        Ok(Context {
            variant,
            matrix,
            gaps,
            first,
            second,
            rows,
            cols,
            traceback,
            keep_ties,
        })
    }

    fn out_of_memory(&self) -> AlignError {
        AlignError::OutOfMemory {
            first_len: self.first.len(),
            second_len: self.second.len(),
            estimated_bytes: estimated_bytes(self.first.len(), self.second.len(), &self.gaps),
        }
    }

    /// Fills the direction matrix and returns the cells to trace back from.
    pub fn fill(&mut self) -> Result<Vec<OptimalCell>> {
        let cells = match self.gaps {
            GapCosts::Simple(gap) => self.fill_simple(gap)?,
            GapCosts::Affine { open, extend } => self.fill_affine(open, extend)?,
        };
        if log_enabled!(Level::Trace) {
            trace!("{} direction matrix:\n{}", V::NAME, self.traceback);
        }
        Ok(cells)
    }

    /// Initializes row 0 of the scores and the direction matrix.
    fn init_top_row(&mut self) -> Result<Vec<i32>> {
        let mut best = try_row(self.cols, 0).map_err(|_| self.out_of_memory())?;
        let code = self.variant.boundary_code(Edge::Top);
        for (col, score) in best.iter_mut().enumerate() {
            *score = self.variant.boundary_score(&self.gaps, col);
            self.traceback.set(0, col, code);
        }
        Ok(best)
    }

    /// Single gap cost: one rolling row of scores.  Ties prefer diagonal, then left (a gap in
    /// the first sequence), then up.
    fn fill_simple(&mut self, gap: i32) -> Result<Vec<OptimalCell>> {
        let (rows, cols) = (self.rows, self.cols);
        let variant = self.variant;
        let matrix = self.matrix;
        let left_code = variant.boundary_code(Edge::Left);
        let mut best = self.init_top_row()?;
        let mut optimal = OptimalCells::new(self.keep_ties);

        for row in 1..rows {
            let a = self.first[row - 1];
            let mut diagonal = best[0];
            best[0] = variant.boundary_score(&self.gaps, row);
            self.traceback.set(row, 0, left_code);

            for col in 1..cols {
                let diag = diagonal + matrix.score_codes(a, self.second[col - 1]);
                let up = best[col] + gap;
                let left = best[col - 1] + gap;
                diagonal = best[col];

                let (score, code) = if diag >= up && diag >= left {
                    (diag, TB_DIAGONAL)
                } else if left >= up {
                    (left, TB_LEFT)
                } else {
                    (up, TB_UP)
                };
                let (score, code) =
                    variant.on_cell(row, col, rows, cols, score, code, &mut optimal);
                best[col] = score;
                self.traceback.set(row, col, code);
            }
        }

        Ok(variant.optimal_cells(rows, cols, best[cols - 1], optimal))
    }

    /// Affine gap costs, after Gotoh: a rolling row of best scores, a rolling row of the
    /// vertical gap track and a single value for the horizontal gap track.  Extending a gap wins
    /// ties with opening one; ties between tracks prefer diagonal, then up (a gap in the second
    /// sequence), then left.  Between the two gap kinds this is the reverse of the simple fill.
    fn fill_affine(&mut self, open: i32, extend: i32) -> Result<Vec<OptimalCell>> {
        let (rows, cols) = (self.rows, self.cols);
        let variant = self.variant;
        let matrix = self.matrix;
        let left_code = variant.boundary_code(Edge::Left);
        let mut best = self.init_top_row()?;
        let mut vertical = try_row(cols, MIN_SCORE).map_err(|_| self.out_of_memory())?;
        let mut optimal = OptimalCells::new(self.keep_ties);

        for row in 1..rows {
            let a = self.first[row - 1];
            let mut diagonal = best[0];
            let mut horizontal = MIN_SCORE;
            best[0] = variant.boundary_score(&self.gaps, row);
            self.traceback.set(row, 0, left_code);

            for col in 1..cols {
                let mut flags = 0;

                let extend_up = vertical[col] + extend;
                let open_up = best[col] + open;
                let up = if extend_up >= open_up {
                    flags |= TB_UP_EXTENDS;
                    extend_up
                } else {
                    open_up
                };
                vertical[col] = up;

                let extend_left = horizontal + extend;
                let open_left = best[col - 1] + open;
                horizontal = if extend_left >= open_left {
                    flags |= TB_LEFT_EXTENDS;
                    extend_left
                } else {
                    open_left
                };

                let diag = diagonal + matrix.score_codes(a, self.second[col - 1]);
                diagonal = best[col];

                let (score, direction) = if diag >= up && diag >= horizontal {
                    (diag, TB_DIAGONAL)
                } else if up >= horizontal {
                    (up, TB_UP)
                } else {
                    (horizontal, TB_LEFT)
                };
                let (score, code) =
                    variant.on_cell(row, col, rows, cols, score, direction | flags, &mut optimal);
                best[col] = score;
                self.traceback.set(row, col, code);
            }
        }

        Ok(variant.optimal_cells(rows, cols, best[cols - 1], optimal))
    }

    /// Walks back from one optimal cell.
    pub fn trace(&self, cell: OptimalCell) -> Result<TracedPath> {
        traceback::trace(&self.variant, &self.traceback, &self.first, &self.second, cell)
    }

    pub fn variant(&self) -> &V {
        &self.variant
    }
}
