use anyhow::{anyhow, Error};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

/// Value to use as a 'negative infinity' score. Should be close to `i32::MIN`,
/// but avoid underflow when used with reasonable scoring parameters or even
/// adding two negative infinities. Use ~ `0.4 * i32::MIN`
pub const MIN_SCORE: i32 = -858_993_459;

pub const DEFAULT_MATCH_SCORE: i32 = 2;
pub const DEFAULT_MISMATCH_SCORE: i32 = -2;
pub const DEFAULT_GAP_OPEN: i32 = -8;
pub const DEFAULT_GAP_EXTEND: i32 = -1;

/// Working memory per cell with a single gap cost: one direction byte plus one score.
pub const SIMPLE_BYTES_PER_CELL: u128 = 5;
/// Working memory per cell with affine gaps: one direction byte plus three scores.
pub const AFFINE_BYTES_PER_CELL: u128 = 13;

/// The operation a single column of a pairwise alignment performs.  The first sequence is the
/// query and the second the reference.
#[derive(Eq, PartialEq, Debug, Copy, Clone, Hash, Serialize, Deserialize)]
pub enum AlignmentOperation {
    Match, // Consumes one first and one second symbol
    Subst, // Consumes one first and one second symbol
    Del,   // Consumes a single second symbol
    Ins,   // Consumes a single first symbol
}

impl AlignmentOperation {
    pub fn as_str(&self) -> &'static str {
        match *self {
            AlignmentOperation::Match => "=",
            AlignmentOperation::Subst => "X",
            AlignmentOperation::Del => "D",
            AlignmentOperation::Ins => "I",
        }
    }

    pub fn length_on_first(&self) -> usize {
        match *self {
            AlignmentOperation::Match | AlignmentOperation::Subst | AlignmentOperation::Ins => 1,
            AlignmentOperation::Del => 0,
        }
    }

    pub fn length_on_second(&self) -> usize {
        match *self {
            AlignmentOperation::Match | AlignmentOperation::Subst | AlignmentOperation::Del => 1,
            AlignmentOperation::Ins => 0,
        }
    }
}

/// The alignment variants.  Global aligns both sequences end to end, local aligns the best
/// pair of sub-sequences, and overlap lets either sequence overhang the other at both ends
/// without penalty.
///
/// The default alignment mode is Global.
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone, Hash, Serialize, Deserialize)]
pub enum AlignmentMode {
    /// Needleman-Wunsch.
    #[default]
    Global,
    /// Smith-Waterman.
    Local,
    /// Semi-global alignment with free leading and trailing overhangs.
    Overlap,
}

impl Display for AlignmentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Local => write!(f, "local"),
            Self::Overlap => write!(f, "overlap"),
        }
    }
}

impl FromStr for AlignmentMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "global" | "needleman-wunsch" | "nw" => Ok(AlignmentMode::Global),
            "local" | "smith-waterman" | "sw" => Ok(AlignmentMode::Local),
            "overlap" | "semi-global" | "semi_global" | "semiglobal" => Ok(AlignmentMode::Overlap),
            _ => Err(anyhow!("Invalid alignment mode: {}", s)),
        }
    }
}
