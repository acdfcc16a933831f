use std::{fmt, ops::Range};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    align::{
        aligners::{constants::AlignmentOperation, variant::Variant},
        consensus::{consensus, ConsensusResolver},
        scoring::{SimilarityMatrix, GAP_CODE},
        sequence::{Sequence, GAP_SYMBOL},
        traceback::TracedPath,
    },
    errors::{AlignError, Result},
};

/// One optimal pairwise alignment.  The first sequence plays the role of the query and the
/// second that of the reference.
#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
pub struct AlignmentResult {
    /// The first sequence with gaps inserted.
    pub first: Sequence,

    /// The second sequence with gaps inserted, the same length as `first`.
    pub second: Sequence,

    /// One symbol per alignment column.
    pub consensus: Sequence,

    pub score: i32,

    /// How far the first sequence is shifted to line the alignment up.  For a global alignment
    /// this is its number of leading gaps.
    pub first_offset: usize,

    /// How far the second sequence is shifted to line the alignment up.
    pub second_offset: usize,

    /// Start position of the alignment in the first and second sequence (0-based)
    pub start_offsets: [usize; 2],

    /// Position of the last aligned symbol of the first and second sequence (0-based
    /// inclusive), `None` when the alignment holds no symbol of that sequence
    pub end_offsets: [Option<usize>; 2],

    /// Number of gaps inserted into the first and second sequence
    pub insertions: [usize; 2],
}

impl AlignmentResult {
    /// Number of alignment columns.
    pub fn len(&self) -> usize {
        self.first.len()
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_empty()
    }

    /// The half-open ranges of the first and second sequence covered by the alignment.
    pub fn spans(&self) -> [Range<usize>; 2] {
        let span = |start: usize, end: Option<usize>| start..end.map_or(start, |end| end + 1);
        [
            span(self.start_offsets[0], self.end_offsets[0]),
            span(self.start_offsets[1], self.end_offsets[1]),
        ]
    }

    /// The operation of every alignment column.
    pub fn operations(&self) -> Vec<AlignmentOperation> {
        self.first
            .symbols()
            .iter()
            .zip(self.second.symbols())
            .map(|(&a, &b)| match (a, b) {
                (GAP_SYMBOL, _) => AlignmentOperation::Del,
                (_, GAP_SYMBOL) => AlignmentOperation::Ins,
                (a, b) if a == b => AlignmentOperation::Match,
                _ => AlignmentOperation::Subst,
            })
            .collect()
    }

    /// Run-length encoded operations using `=`, `X`, `I` and `D`.
    pub fn cigar(&self) -> String {
        self.operations()
            .into_iter()
            .dedup_with_count()
            .map(|(len, op)| format!("{len}{}", op.as_str()))
            .join("")
    }
}

impl fmt::Display for AlignmentResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [first_span, second_span] = self.spans();
        write!(
            f,
            "first-span: {first_span:?} second-span: {second_span:?} offsets: {},{} score: {} cigar: {} aln-len: {}",
            self.first_offset,
            self.second_offset,
            self.score,
            self.cigar(),
            self.len()
        )
    }
}

/// The last position of a sequence consumed between traceback cells `start` and `end`.
fn last_position(start: usize, end: usize) -> Option<usize> {
    (end > start).then(|| end - 1)
}

/// Builds the result for one traced path, or `None` for an empty path.
pub(crate) fn collate<V: Variant>(
    variant: &V,
    matrix: &SimilarityMatrix,
    resolver: &dyn ConsensusResolver,
    first: &Sequence,
    second: &Sequence,
    path: &TracedPath,
) -> Result<Option<AlignmentResult>> {
    if path.is_empty() {
        return Ok(None);
    }
    let decode = |codes: &[u8]| {
        matrix.from_byte_code(codes).ok_or_else(|| AlignError::InvalidByteCode {
            code: codes
                .iter()
                .copied()
                .find(|&code| code != GAP_CODE && code as usize >= matrix.symbols().len())
                .unwrap_or(GAP_CODE),
        })
    };
    let alphabet = *first.alphabet();
    let aligned_first = decode(&path.first)?;
    let aligned_second = decode(&path.second)?;
    let consensus = consensus(resolver, alphabet, &aligned_first, &aligned_second);
    let [first_offset, second_offset] = variant.offsets(path);

    Ok(Some(AlignmentResult {
        first: Sequence::from_parts(
            first.id().clone(),
            first.display_id().clone(),
            alphabet,
            aligned_first,
        ),
        second: Sequence::from_parts(
            second.id().clone(),
            second.display_id().clone(),
            alphabet,
            aligned_second,
        ),
        consensus: Sequence::from_parts(String::new(), String::new(), alphabet, consensus),
        score: path.score,
        first_offset,
        second_offset,
        start_offsets: path.start,
        end_offsets: [
            last_position(path.start[0], path.end[0]),
            last_position(path.start[1], path.end[1]),
        ],
        insertions: path.insertions,
    }))
}
