use std::fmt;

use thiserror::Error;

use crate::align::{aligners::BuilderError, sequence::Alphabet};

/// Bytes in a gibibyte, used when reporting memory estimates.
const BYTES_PER_GIB: f64 = 1_073_741_824.0;

/// Identifies which of the two input sequences an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceIndex {
    First,
    Second,
}

impl fmt::Display for SequenceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => write!(f, "first"),
            Self::Second => write!(f, "second"),
        }
    }
}

/// Errors raised while configuring or running an aligner.
///
/// Argument errors are raised before any dynamic-programming memory is allocated.
#[derive(Debug, Error)]
pub enum AlignError {
    /// The two sequences do not share an alphabet.
    #[error("cannot align a {first} sequence against a {second} sequence")]
    AlphabetMismatch { first: Alphabet, second: Alphabet },

    /// A sequence contains a symbol that the similarity matrix has no score for.
    #[error(
        "symbol '{}' at position {position} of the {sequence} sequence is not covered by the similarity matrix",
        symbol_char(.symbol)
    )]
    UncoveredSymbol {
        sequence: SequenceIndex,
        position: usize,
        symbol: u8,
    },

    /// A sequence was built from a symbol outside of its alphabet.
    #[error("symbol '{}' at position {position} is not a valid {alphabet} symbol", symbol_char(.symbol))]
    InvalidSymbol {
        alphabet: Alphabet,
        position: usize,
        symbol: u8,
    },

    /// A pairwise aligner was handed something other than a pair of sequences.
    #[error("pairwise alignment requires exactly 2 sequences, found {0}")]
    WrongSequenceCount(usize),

    /// A similarity matrix could not be built.
    #[error("invalid similarity matrix: {0}")]
    InvalidMatrix(String),

    /// The aligner options could not be built.
    #[error("invalid aligner options: {0}")]
    InvalidOptions(#[from] BuilderError),

    /// The dynamic-programming matrix for the two sequences does not fit in memory.
    #[error(
        "not enough memory to align sequences of length {first_len} and {second_len}: \
         an estimated {estimated_bytes} bytes ({:.3} GiB) are required",
        gibibytes(.estimated_bytes)
    )]
    OutOfMemory {
        first_len: usize,
        second_len: usize,
        estimated_bytes: u128,
    },

    /// The scores or gap costs are too large for sequences of these lengths: a full-length
    /// alignment could overflow the score range.
    #[error(
        "cannot align sequences of length {first_len} and {second_len} with scores or gap costs \
         of magnitude {max_step}: alignment scores could overflow"
    )]
    ScoreOverflow {
        first_len: usize,
        second_len: usize,
        max_step: u32,
    },

    /// The traceback reached a cell holding an unknown direction code.
    #[error("invalid traceback direction code {code:#04x} at row {row}, column {col}")]
    InvalidDirection { code: u8, row: usize, col: usize },

    /// A traced byte code has no symbol in the similarity matrix.
    #[error("byte code {code} does not map to a symbol of the similarity matrix")]
    InvalidByteCode { code: u8 },
}

fn gibibytes(bytes: &u128) -> f64 {
    *bytes as f64 / BYTES_PER_GIB
}

fn symbol_char(symbol: &u8) -> char {
    char::from(*symbol)
}

pub type Result<T> = std::result::Result<T, AlignError>;
