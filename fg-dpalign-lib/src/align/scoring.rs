use bio::alignment::pairwise::MatchFunc;
use bit_set::BitSet;
use itertools::Itertools;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    align::{
        aligners::constants::{
            AFFINE_BYTES_PER_CELL, DEFAULT_MATCH_SCORE, DEFAULT_MISMATCH_SCORE, MIN_SCORE,
            SIMPLE_BYTES_PER_CELL,
        },
        sequence::{Alphabet, GAP_SYMBOL},
    },
    errors::{AlignError, Result},
};

/// Byte code reserved for a gap in an encoded, aligned sequence.
pub const GAP_CODE: u8 = u8::MAX;

/// The largest number of symbols a matrix may hold, as codes `0..MAX_SYMBOLS` must not collide
/// with [`GAP_CODE`].
pub const MAX_SYMBOLS: usize = GAP_CODE as usize;

/// Marks a symbol with no code in [`SimilarityMatrix::codes`].
const NO_CODE: u8 = u8::MAX;

/// A square table of substitution scores over an ordered list of symbols.
///
/// The position of a symbol in the list is its byte code: sequences are encoded once per
/// alignment so that the fill loop scores two codes with a single index into `scores`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimilarityMatrix {
    alphabet: Alphabet,
    symbols: Vec<u8>,
    /// Row-major `symbols.len() x symbols.len()` scores.
    scores: Vec<i32>,
    /// Symbol to byte code, [`NO_CODE`] when absent.
    codes: [u8; 256],
    covered: BitSet,
}

impl SimilarityMatrix {
    /// Builds a matrix from an explicit table, where `rows[i][j]` scores `symbols[i]` against
    /// `symbols[j]`.
    ///
    /// # Arguments
    ///
    /// * `alphabet` - the alphabet the matrix is meant for
    /// * `symbols` - the distinct symbols, in table order
    /// * `rows` - the square score table
    pub fn new(alphabet: Alphabet, symbols: &[u8], rows: &[Vec<i32>]) -> Result<Self> {
        if symbols.is_empty() {
            return Err(AlignError::InvalidMatrix("no symbols given".to_string()));
        }
        if symbols.len() > MAX_SYMBOLS {
            return Err(AlignError::InvalidMatrix(format!(
                "{} symbols given, at most {MAX_SYMBOLS} are supported",
                symbols.len()
            )));
        }
        if let Some(symbol) = symbols.iter().duplicates().next() {
            return Err(AlignError::InvalidMatrix(format!(
                "symbol '{}' is listed more than once",
                char::from(*symbol)
            )));
        }
        if symbols.contains(&GAP_SYMBOL) {
            return Err(AlignError::InvalidMatrix(
                "the gap symbol cannot be scored".to_string(),
            ));
        }
        if rows.len() != symbols.len() || rows.iter().any(|row| row.len() != symbols.len()) {
            return Err(AlignError::InvalidMatrix(format!(
                "expected a {n}x{n} table for {n} symbols",
                n = symbols.len()
            )));
        }
        let scores = rows.iter().flatten().copied().collect_vec();
        Ok(Self::from_parts(alphabet, symbols.to_vec(), scores))
    }

    /// Builds a matrix over every symbol of `alphabet` that scores `match_score` on the diagonal
    /// and `mismatch_score` everywhere else.
    pub fn diagonal(match_score: i32, mismatch_score: i32, alphabet: Alphabet) -> Self {
        let symbols = alphabet.symbols().to_vec();
        let n = symbols.len();
        let scores = (0..n)
            .cartesian_product(0..n)
            .map(|(i, j)| if i == j { match_score } else { mismatch_score })
            .collect_vec();
        Self::from_parts(alphabet, symbols, scores)
    }

    fn from_parts(alphabet: Alphabet, symbols: Vec<u8>, scores: Vec<i32>) -> Self {
        let mut codes = [NO_CODE; 256];
        for (code, &symbol) in symbols.iter().enumerate() {
            codes[symbol as usize] = code as u8;
        }
        let covered = symbols.iter().map(|&symbol| symbol as usize).collect();
        Self {
            alphabet,
            symbols,
            scores,
            codes,
            covered,
        }
    }

    pub fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    /// The scored symbols, in byte-code order.
    pub fn symbols(&self) -> &[u8] {
        &self.symbols
    }

    /// The score of aligning symbol `a` against symbol `b`, `None` if either is not covered.
    pub fn score(&self, a: u8, b: u8) -> Option<i32> {
        match (self.code_of(a), self.code_of(b)) {
            (Some(a), Some(b)) => Some(self.score_codes(a, b)),
            _ => None,
        }
    }

    /// The score of aligning two byte codes.  Both codes must come from
    /// [`Self::to_byte_code`].
    #[inline(always)]
    pub fn score_codes(&self, a: u8, b: u8) -> i32 {
        self.scores[a as usize * self.symbols.len() + b as usize]
    }

    /// The largest magnitude of any score in the table.
    pub fn max_abs_score(&self) -> u32 {
        self.scores
            .iter()
            .map(|score| score.unsigned_abs())
            .max()
            .unwrap_or(0)
    }

    #[inline]
    fn code_of(&self, symbol: u8) -> Option<u8> {
        match self.codes[symbol as usize] {
            NO_CODE => None,
            code => Some(code),
        }
    }

    /// True if every symbol of `sequence` has a score in this matrix.
    pub fn covers_sequence(&self, sequence: &[u8]) -> bool {
        self.first_uncovered(sequence).is_none()
    }

    /// The position and value of the first symbol in `sequence` without a score.
    pub fn first_uncovered(&self, sequence: &[u8]) -> Option<(usize, u8)> {
        sequence
            .iter()
            .position(|&symbol| !self.covered.contains(symbol as usize))
            .map(|position| (position, sequence[position]))
    }

    /// Encodes symbols as byte codes, `None` if a symbol is not covered.
    pub fn to_byte_code(&self, sequence: &[u8]) -> Option<Vec<u8>> {
        sequence
            .iter()
            .map(|&symbol| self.code_of(symbol))
            .collect()
    }

    /// Decodes byte codes back to symbols; [`GAP_CODE`] decodes to the gap symbol.  `None` if a
    /// code is out of range.
    pub fn from_byte_code(&self, codes: &[u8]) -> Option<Vec<u8>> {
        codes
            .iter()
            .map(|&code| match code {
                GAP_CODE => Some(GAP_SYMBOL),
                code => self.symbols.get(code as usize).copied(),
            })
            .collect()
    }
}

impl Default for SimilarityMatrix {
    /// A +2/-2 diagonal matrix over the protein symbols, which also cover DNA and RNA.
    fn default() -> Self {
        Self::diagonal(DEFAULT_MATCH_SCORE, DEFAULT_MISMATCH_SCORE, Alphabet::Protein)
    }
}

/// Lets a similarity matrix score raw symbols for the rust-bio aligners.  Uncovered symbols
/// score [`MIN_SCORE`].
impl MatchFunc for SimilarityMatrix {
    #[inline]
    fn score(&self, a: u8, b: u8) -> i32 {
        SimilarityMatrix::score(self, a, b).unwrap_or(MIN_SCORE)
    }
}

/// Gap costs, added to the score for every gap.  Costs are normally negative.
///
/// A run of `k` gaps costs `k * gap` with [`GapCosts::Simple`] and
/// `open + (k - 1) * extend` with [`GapCosts::Affine`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GapCosts {
    Simple(i32),
    Affine { open: i32, extend: i32 },
}

impl GapCosts {
    /// The cost of the first gap of a run.
    pub fn open(&self) -> i32 {
        match *self {
            Self::Simple(gap) => gap,
            Self::Affine { open, .. } => open,
        }
    }

    /// The cost of every gap after the first in a run.
    pub fn extend(&self) -> i32 {
        match *self {
            Self::Simple(gap) => gap,
            Self::Affine { extend, .. } => extend,
        }
    }

    pub fn is_affine(&self) -> bool {
        matches!(self, Self::Affine { .. })
    }

    /// The cost of a run of `len` consecutive gaps.
    pub fn run_cost(&self, len: usize) -> i32 {
        if len == 0 {
            return 0;
        }
        let extensions = i32::try_from(len - 1).unwrap_or(i32::MAX);
        self.open()
            .saturating_add(extensions.saturating_mul(self.extend()))
    }

    /// The larger magnitude of the open and extend costs.
    pub fn max_abs_cost(&self) -> u32 {
        self.open().unsigned_abs().max(self.extend().unsigned_abs())
    }

    /// Bytes of working memory needed per dynamic-programming cell.
    pub(crate) fn bytes_per_cell(&self) -> u128 {
        if self.is_affine() {
            AFFINE_BYTES_PER_CELL
        } else {
            SIMPLE_BYTES_PER_CELL
        }
    }

    /// Logs a warning for positive costs, which reward gaps instead of penalizing them.
    pub(crate) fn warn_if_positive(&self) {
        match *self {
            Self::Simple(gap) if gap > 0 => {
                warn!("Gap cost {gap} is positive; gaps will be rewarded");
            }
            Self::Affine { open, extend } if open > 0 || extend > 0 => {
                warn!("Gap costs (open {open}, extend {extend}) are positive; gaps will be rewarded");
            }
            _ => (),
        }
    }
}
