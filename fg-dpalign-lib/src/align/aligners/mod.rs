pub mod constants;
pub(crate) mod engine;
pub mod global;
pub mod local;
pub mod overlap;
pub mod variant;

use std::{fmt, sync::Arc};

pub use constants::AlignmentMode;
pub use engine::{estimated_bytes, fits_score_range};
pub use global::Global;
pub use local::Local;
pub use overlap::Overlap;
pub use variant::Variant;

use derive_builder::Builder;
use derive_getters::Getters;
use log::debug;

use crate::{
    align::{
        aligners::{
            constants::{DEFAULT_GAP_EXTEND, DEFAULT_GAP_OPEN},
            engine::Context,
        },
        alignment::{collate, AlignmentResult},
        consensus::{ConsensusResolver, SimpleConsensusResolver},
        scoring::{GapCosts, SimilarityMatrix},
        sequence::Sequence,
    },
    errors::{AlignError, Result, SequenceIndex},
};

/// Settings shared by every call of an aligner.  The matrix and gap costs are used by the
/// `*_pair` and `*_all` methods; the explicit methods take their own.
#[derive(Clone, Debug, Builder, Getters)]
#[builder(name = "Builder", build_fn(name = "build_options"))]
pub struct Options {
    #[builder(default)]
    similarity_matrix: SimilarityMatrix,
    /// The cost of the first gap of a run, also the single gap cost of simple alignments.
    #[builder(default = "DEFAULT_GAP_OPEN")]
    gap_open: i32,
    #[builder(default = "DEFAULT_GAP_EXTEND")]
    gap_extend: i32,
    /// Report every cell tied for the best local or overlap score.  Off by default, in which
    /// case only the tied cell that ends earliest in the second sequence is traced.
    #[builder(default = "false")]
    all_optimal: bool,
    /// Refuse to align when the estimated working memory exceeds this many bytes.
    #[builder(default, setter(strip_option))]
    max_matrix_bytes: Option<u64>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            similarity_matrix: SimilarityMatrix::default(),
            gap_open: DEFAULT_GAP_OPEN,
            gap_extend: DEFAULT_GAP_EXTEND,
            all_optimal: false,
            max_matrix_bytes: None,
        }
    }
}

impl Builder {
    pub fn build_aligner<V: Variant>(&self, variant: V) -> Result<Aligner<V>> {
        Ok(Aligner::with_options(variant, self.build_options()?))
    }

    pub fn build_any(&self, mode: AlignmentMode) -> Result<AnyAligner> {
        Ok(AnyAligner::new(mode, self.build_options()?))
    }
}

/// A pairwise aligner for the variant `V`.
///
/// The aligner holds no per-call state: every call sizes, fills and frees its own matrix, so a
/// single aligner can be shared between threads.
#[derive(Clone)]
pub struct Aligner<V: Variant> {
    variant: V,
    options: Options,
    resolver: Arc<dyn ConsensusResolver>,
}

impl<V: Variant> Default for Aligner<V> {
    fn default() -> Self {
        Self::new(V::default())
    }
}

impl<V: Variant> fmt::Debug for Aligner<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aligner")
            .field("variant", &V::NAME)
            .field("options", &self.options)
            .finish()
    }
}

impl<V: Variant> Aligner<V> {
    pub fn new(variant: V) -> Self {
        Self::with_options(variant, Options::default())
    }

    pub fn with_options(variant: V, options: Options) -> Self {
        Aligner {
            variant,
            options,
            resolver: Arc::new(SimpleConsensusResolver),
        }
    }

    /// Replaces the resolver that builds consensus sequences.
    #[must_use]
    pub fn with_consensus_resolver(mut self, resolver: impl ConsensusResolver + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    pub fn name(&self) -> &'static str {
        V::NAME
    }

    pub fn description(&self) -> &'static str {
        V::DESCRIPTION
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Aligns two sequences with a single cost per gap.
    ///
    /// # Arguments
    ///
    /// * `matrix` - scores for every pair of symbols; must cover both sequences
    /// * `gap_cost` - the cost of every gap (should not be positive)
    /// * `first` - the first sequence, indexed by the rows of the matrix
    /// * `second` - the second sequence, with the same alphabet as `first`
    pub fn align_simple(
        &self,
        matrix: &SimilarityMatrix,
        gap_cost: i32,
        first: &Sequence,
        second: &Sequence,
    ) -> Result<Vec<AlignmentResult>> {
        self.run(matrix, GapCosts::Simple(gap_cost), first, second)
    }

    /// Aligns two sequences with affine gap costs: a run of `k` gaps costs
    /// `gap_open + (k - 1) * gap_extend`.
    ///
    /// # Arguments
    ///
    /// * `matrix` - scores for every pair of symbols; must cover both sequences
    /// * `gap_open` - the cost of the first gap of a run (should not be positive)
    /// * `gap_extend` - the cost of each further gap of a run (should not be positive)
    /// * `first` - the first sequence, indexed by the rows of the matrix
    /// * `second` - the second sequence, with the same alphabet as `first`
    pub fn align(
        &self,
        matrix: &SimilarityMatrix,
        gap_open: i32,
        gap_extend: i32,
        first: &Sequence,
        second: &Sequence,
    ) -> Result<Vec<AlignmentResult>> {
        let gaps = GapCosts::Affine {
            open: gap_open,
            extend: gap_extend,
        };
        self.run(matrix, gaps, first, second)
    }

    /// [`Self::align_simple`] with the configured matrix, using the gap-open cost for every gap.
    pub fn align_simple_pair(
        &self,
        first: &Sequence,
        second: &Sequence,
    ) -> Result<Vec<AlignmentResult>> {
        self.align_simple(
            &self.options.similarity_matrix,
            self.options.gap_open,
            first,
            second,
        )
    }

    /// [`Self::align`] with the configured matrix and gap costs.
    pub fn align_pair(&self, first: &Sequence, second: &Sequence) -> Result<Vec<AlignmentResult>> {
        self.align(
            &self.options.similarity_matrix,
            self.options.gap_open,
            self.options.gap_extend,
            first,
            second,
        )
    }

    /// [`Self::align_simple_pair`] for a slice that must hold exactly two sequences.
    pub fn align_simple_all(&self, sequences: &[Sequence]) -> Result<Vec<AlignmentResult>> {
        let (first, second) = as_pair(sequences)?;
        self.align_simple_pair(first, second)
    }

    /// [`Self::align_pair`] for a slice that must hold exactly two sequences.
    pub fn align_all(&self, sequences: &[Sequence]) -> Result<Vec<AlignmentResult>> {
        let (first, second) = as_pair(sequences)?;
        self.align_pair(first, second)
    }

    fn run(
        &self,
        matrix: &SimilarityMatrix,
        gaps: GapCosts,
        first: &Sequence,
        second: &Sequence,
    ) -> Result<Vec<AlignmentResult>> {
        if first.alphabet() != second.alphabet() {
            return Err(AlignError::AlphabetMismatch {
                first: *first.alphabet(),
                second: *second.alphabet(),
            });
        }
        gaps.warn_if_positive();
        let first_codes = encode(matrix, first, SequenceIndex::First)?;
        let second_codes = encode(matrix, second, SequenceIndex::Second)?;
        debug!(
            "{}: aligning '{}' ({} symbols) against '{}' ({} symbols) with {:?}",
            V::NAME,
            first.display_id(),
            first.len(),
            second.display_id(),
            second.len(),
            gaps
        );

        let mut context = Context::new(
            self.variant,
            matrix,
            gaps,
            first_codes,
            second_codes,
            self.options.max_matrix_bytes,
            self.options.all_optimal,
        )?;
        let cells = context.fill()?;
        let mut results = Vec::with_capacity(cells.len());
        for cell in cells {
            let path = context.trace(cell)?;
            let result = collate(
                context.variant(),
                matrix,
                self.resolver.as_ref(),
                first,
                second,
                &path,
            )?;
            results.extend(result);
        }
        Ok(results)
    }
}

fn as_pair(sequences: &[Sequence]) -> Result<(&Sequence, &Sequence)> {
    match sequences {
        [first, second] => Ok((first, second)),
        _ => Err(AlignError::WrongSequenceCount(sequences.len())),
    }
}

/// Encodes a sequence with the matrix, reporting the first symbol it does not cover.
fn encode(matrix: &SimilarityMatrix, sequence: &Sequence, index: SequenceIndex) -> Result<Vec<u8>> {
    matrix.to_byte_code(sequence.symbols()).ok_or_else(|| {
        let (position, symbol) = matrix
            .first_uncovered(sequence.symbols())
            .unwrap_or_default();
        AlignError::UncoveredSymbol {
            sequence: index,
            position,
            symbol,
        }
    })
}

/// An aligner whose variant is chosen at run time.  The variant is resolved once per call and
/// the fill itself runs on the monomorphized [`Aligner`].
#[derive(Clone, Debug)]
pub enum AnyAligner {
    Global(Aligner<Global>),
    Local(Aligner<Local>),
    Overlap(Aligner<Overlap>),
}

impl AnyAligner {
    pub fn new(mode: AlignmentMode, options: Options) -> Self {
        match mode {
            AlignmentMode::Global => Self::Global(Aligner::with_options(Global, options)),
            AlignmentMode::Local => Self::Local(Aligner::with_options(Local, options)),
            AlignmentMode::Overlap => Self::Overlap(Aligner::with_options(Overlap, options)),
        }
    }

    pub fn mode(&self) -> AlignmentMode {
        match self {
            Self::Global(_) => AlignmentMode::Global,
            Self::Local(_) => AlignmentMode::Local,
            Self::Overlap(_) => AlignmentMode::Overlap,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Global(aligner) => aligner.name(),
            Self::Local(aligner) => aligner.name(),
            Self::Overlap(aligner) => aligner.name(),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Global(aligner) => aligner.description(),
            Self::Local(aligner) => aligner.description(),
            Self::Overlap(aligner) => aligner.description(),
        }
    }

    pub fn align_simple(
        &self,
        matrix: &SimilarityMatrix,
        gap_cost: i32,
        first: &Sequence,
        second: &Sequence,
    ) -> Result<Vec<AlignmentResult>> {
        match self {
            Self::Global(aligner) => aligner.align_simple(matrix, gap_cost, first, second),
            Self::Local(aligner) => aligner.align_simple(matrix, gap_cost, first, second),
            Self::Overlap(aligner) => aligner.align_simple(matrix, gap_cost, first, second),
        }
    }

    pub fn align(
        &self,
        matrix: &SimilarityMatrix,
        gap_open: i32,
        gap_extend: i32,
        first: &Sequence,
        second: &Sequence,
    ) -> Result<Vec<AlignmentResult>> {
        match self {
            Self::Global(aligner) => aligner.align(matrix, gap_open, gap_extend, first, second),
            Self::Local(aligner) => aligner.align(matrix, gap_open, gap_extend, first, second),
            Self::Overlap(aligner) => aligner.align(matrix, gap_open, gap_extend, first, second),
        }
    }

    pub fn align_pair(&self, first: &Sequence, second: &Sequence) -> Result<Vec<AlignmentResult>> {
        match self {
            Self::Global(aligner) => aligner.align_pair(first, second),
            Self::Local(aligner) => aligner.align_pair(first, second),
            Self::Overlap(aligner) => aligner.align_pair(first, second),
        }
    }

    pub fn align_simple_pair(
        &self,
        first: &Sequence,
        second: &Sequence,
    ) -> Result<Vec<AlignmentResult>> {
        match self {
            Self::Global(aligner) => aligner.align_simple_pair(first, second),
            Self::Local(aligner) => aligner.align_simple_pair(first, second),
            Self::Overlap(aligner) => aligner.align_simple_pair(first, second),
        }
    }

    pub fn align_all(&self, sequences: &[Sequence]) -> Result<Vec<AlignmentResult>> {
        match self {
            Self::Global(aligner) => aligner.align_all(sequences),
            Self::Local(aligner) => aligner.align_all(sequences),
            Self::Overlap(aligner) => aligner.align_all(sequences),
        }
    }

    pub fn align_simple_all(&self, sequences: &[Sequence]) -> Result<Vec<AlignmentResult>> {
        match self {
            Self::Global(aligner) => aligner.align_simple_all(sequences),
            Self::Local(aligner) => aligner.align_simple_all(sequences),
            Self::Overlap(aligner) => aligner.align_simple_all(sequences),
        }
    }
}

// Tests
#[cfg(test)]
pub mod tests {
    use std::str::FromStr;

    use bio::alignment::pairwise::Aligner as BioAligner;
    use itertools::Itertools;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use rstest::rstest;

    use crate::{
        align::{
            alignment::AlignmentResult,
            consensus::ConsensusResolver,
            scoring::{GapCosts, SimilarityMatrix},
            sequence::{Alphabet, Sequence, GAP_SYMBOL},
        },
        errors::{AlignError, SequenceIndex},
    };

    use super::{
        estimated_bytes, Aligner, AlignmentMode, AnyAligner, Builder, Global, Local, Overlap,
        Variant,
    };

    /// Upper-cases and remove display-related characters from a string.
    fn s(bases: &str) -> Vec<u8> {
        bases
            .chars()
            .filter(|base| *base != '-' && *base != ' ' && *base != '_')
            .map(|base| base.to_ascii_uppercase() as u8)
            .collect_vec()
    }

    fn dna(bases: &str) -> Sequence {
        Sequence::new(Alphabet::Dna, s(bases)).unwrap()
    }

    fn protein(residues: &str) -> Sequence {
        Sequence::new(Alphabet::Protein, s(residues)).unwrap()
    }

    fn unit_matrix() -> SimilarityMatrix {
        SimilarityMatrix::diagonal(1, -1, Alphabet::Dna)
    }

    fn assert_alignment(
        alignment: &AlignmentResult,
        first: &str,
        second: &str,
        score: i32,
        start_offsets: [usize; 2],
        end_offsets: [Option<usize>; 2],
    ) {
        assert_eq!(alignment.first.to_string(), first, "first {alignment}");
        assert_eq!(alignment.second.to_string(), second, "second {alignment}");
        assert_eq!(alignment.score, score, "score {alignment}");
        assert_eq!(alignment.start_offsets, start_offsets, "start {alignment}");
        assert_eq!(alignment.end_offsets, end_offsets, "end {alignment}");
    }

    fn single(results: Vec<AlignmentResult>) -> AlignmentResult {
        assert_eq!(results.len(), 1, "{results:?}");
        results.into_iter().next().unwrap()
    }

    /// The reported score of the first result, zero if no alignment was produced.
    fn score_of(results: &[AlignmentResult]) -> i32 {
        results.first().map_or(0, |aln| aln.score)
    }

    /// Scores an alignment column by column.
    fn rescore(aln: &AlignmentResult, matrix: &SimilarityMatrix, gaps: GapCosts) -> i32 {
        let mut score = 0;
        let mut run = (false, false);
        for (&a, &b) in aln.first.symbols().iter().zip(aln.second.symbols()) {
            let gap_in = (a == GAP_SYMBOL, b == GAP_SYMBOL);
            score += match gap_in {
                (true, _) if run.0 => gaps.extend(),
                (_, true) if run.1 => gaps.extend(),
                (true, _) | (_, true) => gaps.open(),
                _ => matrix.score(a, b).unwrap(),
            };
            run = gap_in;
        }
        score
    }

    /// Full-matrix alignment score with a single gap cost.
    fn oracle_score(
        mode: AlignmentMode,
        first: &[u8],
        second: &[u8],
        matrix: &SimilarityMatrix,
        gap: i32,
    ) -> i32 {
        let (n, m) = (first.len(), second.len());
        let mut dp = vec![vec![0i32; m + 1]; n + 1];
        let global = mode == AlignmentMode::Global;
        for i in 0..=n {
            for j in 0..=m {
                dp[i][j] = if i == 0 || j == 0 {
                    if global {
                        gap * (i + j) as i32
                    } else {
                        0
                    }
                } else {
                    let best = (dp[i - 1][j - 1] + matrix.score(first[i - 1], second[j - 1]).unwrap())
                        .max(dp[i - 1][j] + gap)
                        .max(dp[i][j - 1] + gap);
                    if mode == AlignmentMode::Local {
                        best.max(0)
                    } else {
                        best
                    }
                };
            }
        }
        match mode {
            AlignmentMode::Global => dp[n][m],
            AlignmentMode::Local => dp.iter().flatten().copied().max().unwrap_or(0),
            AlignmentMode::Overlap => {
                let last_row = dp[n].iter().copied();
                let last_col = dp.iter().map(|row| row[m]);
                last_row.chain(last_col).max().unwrap_or(0).max(0)
            }
        }
    }

    fn random_dna(rng: &mut StdRng, min_len: usize, max_len: usize) -> Sequence {
        let len = rng.gen_range(min_len..=max_len);
        let bases = (0..len).map(|_| b"ACGT"[rng.gen_range(0..4)]).collect_vec();
        Sequence::new(Alphabet::Dna, bases).unwrap()
    }

    /// Checks the aligned sequences against the inputs and the offsets.
    fn assert_consistent(aln: &AlignmentResult, first: &Sequence, second: &Sequence) {
        assert_eq!(aln.first.len(), aln.second.len(), "{aln}");
        assert_eq!(aln.consensus.len(), aln.first.len(), "{aln}");
        for (&a, &b) in aln.first.symbols().iter().zip(aln.second.symbols()) {
            assert!(a != GAP_SYMBOL || b != GAP_SYMBOL, "{aln}");
            assert!(a == GAP_SYMBOL || first.alphabet().contains(a), "{aln}");
            assert!(b == GAP_SYMBOL || second.alphabet().contains(b), "{aln}");
        }
        let [first_span, second_span] = aln.spans();
        assert_eq!(aln.first.ungapped(), first.symbols()[first_span].to_vec(), "{aln}");
        assert_eq!(aln.second.ungapped(), second.symbols()[second_span].to_vec(), "{aln}");
        for (end, span) in aln.end_offsets.iter().zip(aln.spans()) {
            assert_eq!(*end, (!span.is_empty()).then(|| span.end - 1), "{aln}");
        }
        let gaps = |seq: &Sequence| seq.symbols().iter().filter(|&&sym| sym == GAP_SYMBOL).count();
        assert_eq!(aln.insertions, [gaps(&aln.first), gaps(&aln.second)], "{aln}");
    }

    /// The textbook example: +1 match, -1 mismatch, -1 per gap scores 0.
    #[rstest]
    fn test_gattaca_global_simple() {
        let matrix = SimilarityMatrix::diagonal(1, -1, Alphabet::Protein);
        let first = protein("GATTACA");
        let second = protein("GCATGCU");
        let aligner = Aligner::new(Global);
        let aln = single(aligner.align_simple(&matrix, -1, &first, &second).unwrap());
        assert_alignment(&aln, "G-ATTACA", "GCA-TGCU", 0, [0, 0], [Some(6), Some(6)]);
        assert_eq!(aln.consensus.to_string(), "GXAXTXCX");
        assert_eq!((aln.first_offset, aln.second_offset), (0, 0));
        assert_eq!(aln.insertions, [1, 1]);
        assert_eq!(aln.cigar(), "1=1D1=1I1=1X1=1X");

        let affine = single(aligner.align(&matrix, -1, -1, &first, &second).unwrap());
        assert_eq!(affine, aln);
    }

    /// Between a gap in either sequence the simple fill prefers consuming the second sequence
    /// and the affine fill prefers consuming the first.
    #[rstest]
    #[case("A", "C", 1, -3, -2, ("A-", "-C"), ("-A", "C-"))]
    #[case("ATATA", "ATAGA", 2, -3, 6, ("ATAT-A", "ATA-GA"), ("ATA-TA", "ATAG-A"))]
    fn test_gap_tie_breaks_differ_between_simple_and_affine(
        #[case] first: &str,
        #[case] second: &str,
        #[case] match_score: i32,
        #[case] mismatch_score: i32,
        #[case] score: i32,
        #[case] simple: (&str, &str),
        #[case] affine: (&str, &str),
    ) {
        let matrix = SimilarityMatrix::diagonal(match_score, mismatch_score, Alphabet::Dna);
        let (first, second) = (dna(first), dna(second));
        let aligner = Aligner::new(Global);
        let end = [Some(first.len() - 1), Some(second.len() - 1)];

        let aln = single(aligner.align_simple(&matrix, -1, &first, &second).unwrap());
        assert_alignment(&aln, simple.0, simple.1, score, [0, 0], end);
        let aln = single(aligner.align(&matrix, -1, -1, &first, &second).unwrap());
        assert_alignment(&aln, affine.0, affine.1, score, [0, 0], end);
    }

    /// Tied optima are ordered by where they end in the second sequence, then in the first.
    #[rstest]
    fn test_local_ties_follow_the_second_sequence() {
        let first = dna("GGTTAA");
        let second = dna("AACCTT");

        let aln = single(
            Aligner::new(Local)
                .align_simple(&unit_matrix(), -1, &first, &second)
                .unwrap(),
        );
        assert_alignment(&aln, "AA", "AA", 2, [4, 0], [Some(5), Some(1)]);

        let aligner = Builder::default().all_optimal(true).build_aligner(Local).unwrap();
        for results in [
            aligner.align_simple(&unit_matrix(), -1, &first, &second).unwrap(),
            aligner.align(&unit_matrix(), -2, -1, &first, &second).unwrap(),
        ] {
            assert_eq!(results.len(), 2);
            assert_alignment(&results[0], "AA", "AA", 2, [4, 0], [Some(5), Some(1)]);
            assert_alignment(&results[1], "TT", "TT", 2, [2, 4], [Some(3), Some(5)]);
        }
    }

    /// Identical sequences, all matches
    #[rstest]
    fn test_identical() {
        let aligner = Aligner::new(Global);
        let seq = dna("ACGTAACC");
        let aln = single(aligner.align_pair(&seq, &seq).unwrap());
        assert_alignment(&aln, "ACGTAACC", "ACGTAACC", 16, [0, 0], [Some(7), Some(7)]);
        assert_eq!(aln.cigar(), "8=");
        assert_eq!(aln.consensus.to_string(), "ACGTAACC");
    }

    #[rstest]
    fn test_self_alignment_all_variants() {
        let seq = dna("TTGACCATGACGTTAGC");
        let matrix = SimilarityMatrix::diagonal(3, -2, Alphabet::Dna);
        for mode in [AlignmentMode::Global, AlignmentMode::Local, AlignmentMode::Overlap] {
            let aligner = AnyAligner::new(mode, super::Options::default());
            for results in [
                aligner.align_simple(&matrix, -4, &seq, &seq).unwrap(),
                aligner.align(&matrix, -6, -1, &seq, &seq).unwrap(),
            ] {
                let aln = single(results);
                assert_eq!(aln.score, 3 * seq.len() as i32, "{mode} {aln}");
                assert_eq!(aln.insertions, [0, 0], "{mode} {aln}");
                assert_eq!(aln.first, seq, "{mode} {aln}");
            }
        }
    }

    /// Identical sequences, except one small insertion, with the default affine costs
    #[rstest]
    fn test_small_insertion() {
        let aligner = Aligner::new(Global);
        let aln = single(aligner.align_pair(&dna("AACCGGTT"), &dna("AACCGTT")).unwrap());
        assert_alignment(&aln, "AACCGGTT", "AACC-GTT", 14 - 8, [0, 0], [Some(7), Some(6)]);
        assert_eq!(aln.cigar(), "4=1I3=");
        assert_eq!(aln.insertions, [0, 1]);
        assert_eq!((aln.first_offset, aln.second_offset), (0, 0));
    }

    /// A long gap costs one open plus extensions, so the affine alignment keeps it in one run
    #[rstest]
    fn test_affine_keeps_gap_runs_together() {
        let aligner = Aligner::new(Global);
        let matrix = SimilarityMatrix::diagonal(2, -2, Alphabet::Dna);
        let first = dna("ACGTACGTTTTTGGCCAAGT");
        let second = dna("ACGTACGTGGCCAAGT");
        let aln = single(aligner.align(&matrix, -8, -1, &first, &second).unwrap());
        assert_eq!(aln.score, 16 * 2 - 8 - 3);
        assert_eq!(aln.insertions, [0, 4]);
        assert_eq!(rescore(&aln, &matrix, GapCosts::Affine { open: -8, extend: -1 }), aln.score);
        assert_eq!(aln.cigar().matches('I').count(), 1, "{aln}");
    }

    #[rstest]
    fn test_leading_gaps_set_global_offsets() {
        let aligner = Aligner::new(Global);
        let aln = single(
            aligner
                .align_simple(&unit_matrix(), -1, &dna("GGACGT"), &dna("ACGT"))
                .unwrap(),
        );
        assert_alignment(&aln, "GGACGT", "--ACGT", 2, [0, 0], [Some(5), Some(3)]);
        assert_eq!((aln.first_offset, aln.second_offset), (0, 2));
    }

    #[rstest]
    fn test_local() {
        let aligner = Aligner::new(Local);
        let aln = single(
            aligner
                .align_pair(&dna("TTTACGTACGTTT"), &dna("GGACGTACGGG"))
                .unwrap(),
        );
        assert_alignment(&aln, "ACGTACG", "ACGTACG", 14, [3, 2], [Some(9), Some(8)]);
        assert_eq!((aln.first_offset, aln.second_offset), (0, 1));
    }

    #[rstest]
    fn test_local_without_positive_cells_is_empty() {
        let aligner = Aligner::new(Local);
        let results = aligner
            .align_simple(&unit_matrix(), -1, &dna("AAAA"), &dna("CCCC"))
            .unwrap();
        assert!(results.is_empty());
    }

    #[rstest]
    fn test_local_all_optimal() {
        let first = dna("ACGTTTTTACGT");
        let second = dna("ACGT");

        let aligner = Aligner::new(Local);
        let aln = single(aligner.align_simple(&unit_matrix(), -1, &first, &second).unwrap());
        assert_alignment(&aln, "ACGT", "ACGT", 4, [0, 0], [Some(3), Some(3)]);

        let aligner = Builder::default().all_optimal(true).build_aligner(Local).unwrap();
        let results = aligner.align_simple(&unit_matrix(), -1, &first, &second).unwrap();
        assert_eq!(results.len(), 2);
        assert_alignment(&results[0], "ACGT", "ACGT", 4, [0, 0], [Some(3), Some(3)]);
        assert_alignment(&results[1], "ACGT", "ACGT", 4, [8, 0], [Some(11), Some(3)]);
        assert_eq!((results[1].first_offset, results[1].second_offset), (0, 8));
    }

    #[rstest]
    fn test_overlap() {
        let aligner = Aligner::new(Overlap);
        let aln = single(aligner.align_pair(&dna("AAAACCCGGG"), &dna("CCCGGGTTTT")).unwrap());
        assert_alignment(&aln, "CCCGGG", "CCCGGG", 12, [4, 0], [Some(9), Some(5)]);
        assert_eq!((aln.first_offset, aln.second_offset), (0, 4));
    }

    #[rstest]
    fn test_overlap_contained_sequence() {
        let aligner = Aligner::new(Overlap);
        let aln = single(
            aligner
                .align_simple(&unit_matrix(), -1, &dna("TTACGTT"), &dna("ACG"))
                .unwrap(),
        );
        assert_alignment(&aln, "ACG", "ACG", 3, [2, 0], [Some(4), Some(2)]);
    }

    #[rstest]
    fn test_global_with_empty_sequences() {
        let aligner = Aligner::new(Global);
        let aln = single(
            aligner
                .align_simple(&unit_matrix(), -1, &dna(""), &dna("ACG"))
                .unwrap(),
        );
        assert_alignment(&aln, "---", "ACG", -3, [0, 0], [None, Some(2)]);
        assert_eq!(aln.first_offset, 3);

        let aln = single(aligner.align(&unit_matrix(), -5, -1, &dna("ACG"), &dna("")).unwrap());
        assert_alignment(&aln, "ACG", "---", -7, [0, 0], [Some(2), None]);

        let results = aligner
            .align_simple(&unit_matrix(), -1, &dna(""), &dna(""))
            .unwrap();
        assert!(results.is_empty());
    }

    #[rstest]
    fn test_positive_gap_cost_still_aligns() {
        let aligner = Aligner::new(Global);
        let aln = single(
            aligner
                .align_simple(&unit_matrix(), 1, &dna("AC"), &dna("AC"))
                .unwrap(),
        );
        assert_eq!(aln.score, 4);
        assert_eq!(aln.insertions, [2, 2]);
    }

    #[rstest]
    fn test_alphabet_mismatch() {
        let aligner = Aligner::new(Global);
        let rna = Sequence::new(Alphabet::Rna, "ACGU").unwrap();
        let result = aligner.align_simple_pair(&dna("ACGT"), &rna);
        assert!(matches!(
            result,
            Err(AlignError::AlphabetMismatch {
                first: Alphabet::Dna,
                second: Alphabet::Rna
            })
        ));
    }

    #[rstest]
    fn test_uncovered_symbol() {
        let matrix = SimilarityMatrix::new(
            Alphabet::Dna,
            b"ACGT",
            &[
                vec![1, -1, -1, -1],
                vec![-1, 1, -1, -1],
                vec![-1, -1, 1, -1],
                vec![-1, -1, -1, 1],
            ],
        )
        .unwrap();
        let aligner = Aligner::new(Local);
        let result = aligner.align(&matrix, -2, -1, &dna("ACGT"), &dna("ACNT"));
        assert!(matches!(
            result,
            Err(AlignError::UncoveredSymbol {
                sequence: SequenceIndex::Second,
                position: 2,
                symbol: b'N'
            })
        ));
    }

    #[rstest]
    fn test_wrong_sequence_count() {
        let aligner = Aligner::new(Global);
        let result = aligner.align_all(&[dna("ACGT")]);
        assert!(matches!(result, Err(AlignError::WrongSequenceCount(1))));
        let result = aligner.align_simple_all(&[dna("A"), dna("C"), dna("G")]);
        assert!(matches!(result, Err(AlignError::WrongSequenceCount(3))));

        let aln = single(aligner.align_all(&[dna("ACGT"), dna("ACGT")]).unwrap());
        assert_eq!(aln.score, 8);
    }

    #[rstest]
    fn test_huge_gap_costs_are_rejected() {
        let aligner = Aligner::new(Global);
        let seq = dna("ACG");
        let gap = -1_500_000_000;
        for result in [
            aligner.align_simple(&unit_matrix(), gap, &seq, &seq),
            aligner.align(&unit_matrix(), gap, gap, &seq, &seq),
        ] {
            assert!(matches!(
                result,
                Err(AlignError::ScoreOverflow {
                    first_len: 3,
                    second_len: 3,
                    max_step: 1_500_000_000
                })
            ));
        }
        let aln = single(aligner.align_simple(&unit_matrix(), -100_000, &seq, &seq).unwrap());
        assert_eq!(aln.score, 3);
    }

    #[rstest]
    #[case(GapCosts::Simple(-1))]
    #[case(GapCosts::Affine { open: -2, extend: -1 })]
    fn test_memory_ceiling(#[case] gaps: GapCosts) {
        let first = dna("ACGTACGTACGTACGTACGT");
        let second = dna("ACGTACGTACGT");
        let aligner = Builder::default()
            .max_matrix_bytes(1_000)
            .build_aligner(Global)
            .unwrap();
        let result = match gaps {
            GapCosts::Simple(gap) => aligner.align_simple(&unit_matrix(), gap, &first, &second),
            GapCosts::Affine { open, extend } => {
                aligner.align(&unit_matrix(), open, extend, &first, &second)
            }
        };
        let rows = (first.len() + 1) as u128;
        let cols = (second.len() + 1) as u128;
        let score_rows = if gaps.is_affine() { 2 } else { 1 };
        let required = rows * cols + score_rows * 4 * cols;
        match result {
            Err(AlignError::OutOfMemory {
                first_len,
                second_len,
                estimated_bytes,
            }) => {
                assert_eq!((first_len, second_len), (20, 12));
                assert!(estimated_bytes >= required);
                assert!(estimated_bytes > 1_000);
            }
            other => panic!("expected an out of memory error, found {other:?}"),
        }

        let roomy = Builder::default()
            .max_matrix_bytes(estimated_bytes(20, 12, &gaps) as u64)
            .build_aligner(Global)
            .unwrap();
        assert!(roomy.align_simple(&unit_matrix(), -1, &first, &second).is_ok());
    }

    /// Keeps agreeing symbols and uses the second sequence's symbol elsewhere.
    struct PreferSecond;

    impl ConsensusResolver for PreferSecond {
        fn resolve(&self, _alphabet: Alphabet, first: u8, second: u8) -> u8 {
            if second == GAP_SYMBOL {
                first
            } else {
                second
            }
        }
    }

    #[rstest]
    fn test_custom_consensus_resolver() {
        let first = dna("ACTTGA");
        let second = dna("AGTGA");
        let aln = single(
            Aligner::new(Global)
                .align_simple(&unit_matrix(), -1, &first, &second)
                .unwrap(),
        );
        assert_eq!(aln.first.to_string(), "ACTTGA");
        assert_eq!(aln.second.to_string(), "A-GTGA");
        assert_eq!(aln.consensus.to_string(), "ANNTGA");

        let aligner = Aligner::new(Global).with_consensus_resolver(PreferSecond);
        let aln = single(aligner.align_simple(&unit_matrix(), -1, &first, &second).unwrap());
        assert_eq!(aln.consensus.to_string(), "ACGTGA");
    }

    #[rstest]
    fn test_any_aligner_forwards_configured_calls() {
        let any = Builder::default()
            .gap_open(-1)
            .similarity_matrix(unit_matrix())
            .build_any(AlignmentMode::Local)
            .unwrap();
        let (first, second) = (dna("TTACGTT"), dna("GGACGGG"));
        let aln = single(any.align_simple_pair(&first, &second).unwrap());
        assert_alignment(&aln, "ACG", "ACG", 3, [2, 2], [Some(4), Some(4)]);
        let pair = [first.clone(), second.clone()];
        assert_eq!(single(any.align_simple_all(&pair).unwrap()), aln);
        assert_eq!(
            single(any.align_all(&pair).unwrap()),
            single(any.align_pair(&first, &second).unwrap())
        );
        assert!(matches!(
            any.align_all(&[first]),
            Err(AlignError::WrongSequenceCount(1))
        ));
    }

    #[rstest]
    fn test_names_and_modes() {
        assert_eq!(Aligner::new(Global).name(), Global::NAME);
        assert_eq!(Aligner::new(Local).name(), "Smith-Waterman");
        let any = Builder::default()
            .build_any(AlignmentMode::from_str("overlap").unwrap())
            .unwrap();
        assert_eq!(any.mode(), AlignmentMode::Overlap);
        assert_eq!(any.name(), Overlap::NAME);
        assert_eq!(any.description(), Overlap::DESCRIPTION);
    }

    #[rstest]
    fn test_options_defaults() {
        let aligner = Builder::default().build_aligner(Global).unwrap();
        let options = aligner.options();
        assert_eq!(*options.gap_open(), -8);
        assert_eq!(*options.gap_extend(), -1);
        assert!(!*options.all_optimal());
        assert_eq!(*options.max_matrix_bytes(), None);
        assert_eq!(options.similarity_matrix(), &SimilarityMatrix::default());
    }

    #[rstest]
    fn test_aligner_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Aligner<Global>>();
        assert_send_sync::<AnyAligner>();

        let aligner = Aligner::new(Local);
        let first = dna("TTTACGTACGTTT");
        let second = dna("GGACGTACGGG");
        std::thread::scope(|scope| {
            let handles = (0..4)
                .map(|_| scope.spawn(|| aligner.align_pair(&first, &second).unwrap()))
                .collect_vec();
            for handle in handles {
                assert_eq!(score_of(&handle.join().unwrap()), 14);
            }
        });
    }

    /// Simple-gap scores against the full-matrix oracle, with every traced alignment checked
    /// against its inputs and re-scored.
    #[rstest]
    #[case(AlignmentMode::Global)]
    #[case(AlignmentMode::Local)]
    #[case(AlignmentMode::Overlap)]
    fn test_simple_scores_match_oracle(#[case] mode: AlignmentMode) {
        let mut rng = StdRng::seed_from_u64(13);
        let matrix = SimilarityMatrix::diagonal(2, -3, Alphabet::Dna);
        let aligner = AnyAligner::new(mode, super::Options::default());
        for _ in 0..200 {
            let first = random_dna(&mut rng, 0, 20);
            let second = random_dna(&mut rng, 0, 20);
            let gap = -rng.gen_range(1..=4);
            let results = aligner.align_simple(&matrix, gap, &first, &second).unwrap();
            let expected = oracle_score(mode, first.symbols(), second.symbols(), &matrix, gap);
            assert_eq!(score_of(&results), expected, "{mode} {first} {second} {gap}");
            for aln in &results {
                assert_consistent(aln, &first, &second);
                assert_eq!(rescore(aln, &matrix, GapCosts::Simple(gap)), aln.score, "{aln}");
            }
            if mode == AlignmentMode::Global && !(first.is_empty() && second.is_empty()) {
                let aln = &results[0];
                assert_eq!(aln.first.ungapped(), first.symbols().clone());
                assert_eq!(aln.second.ungapped(), second.symbols().clone());
            }
        }
    }

    /// Affine scores against rust-bio, which charges `open + k * extend` for `k` gaps.
    #[rstest]
    #[case(AlignmentMode::Global)]
    #[case(AlignmentMode::Local)]
    fn test_affine_scores_match_rust_bio(#[case] mode: AlignmentMode) {
        let mut rng = StdRng::seed_from_u64(7);
        let matrix = SimilarityMatrix::diagonal(2, -2, Alphabet::Dna);
        let aligner = AnyAligner::new(mode, super::Options::default());
        for _ in 0..200 {
            let first = random_dna(&mut rng, 1, 20);
            let second = random_dna(&mut rng, 1, 20);
            let extend = -rng.gen_range(1..=2);
            let open = extend - rng.gen_range(0..=6);
            let results = aligner.align(&matrix, open, extend, &first, &second).unwrap();

            let mut bio = BioAligner::new(open - extend, extend, matrix.clone());
            let expected = match mode {
                AlignmentMode::Global => bio.global(first.symbols(), second.symbols()).score,
                _ => bio.local(first.symbols(), second.symbols()).score,
            };
            assert_eq!(score_of(&results), expected, "{mode} {first} {second} {open} {extend}");
            for aln in &results {
                assert_consistent(aln, &first, &second);
                let gaps = GapCosts::Affine { open, extend };
                assert_eq!(rescore(aln, &matrix, gaps), aln.score, "{aln}");
            }
        }
    }

    #[rstest]
    fn test_affine_overlap_is_consistent() {
        let mut rng = StdRng::seed_from_u64(99);
        let matrix = SimilarityMatrix::diagonal(2, -2, Alphabet::Dna);
        let aligner = Builder::default().all_optimal(true).build_aligner(Overlap).unwrap();
        for _ in 0..100 {
            let first = random_dna(&mut rng, 0, 20);
            let second = random_dna(&mut rng, 0, 20);
            let results = aligner.align(&matrix, -5, -1, &first, &second).unwrap();
            for aln in &results {
                assert_consistent(aln, &first, &second);
                let [first_span, second_span] = aln.spans();
                let at_bottom_or_right =
                    first_span.end == first.len() || second_span.end == second.len();
                let at_top_or_left = aln.start_offsets[0] == 0 || aln.start_offsets[1] == 0;
                assert!(at_bottom_or_right && at_top_or_left, "{aln}");
                let gaps = GapCosts::Affine {
                    open: -5,
                    extend: -1,
                };
                assert_eq!(rescore(aln, &matrix, gaps), aln.score, "{aln}");
                assert_eq!(aln.score, results[0].score);
            }
        }
    }

    /// With equal open and extend costs the affine recurrence scores like the simple one.
    #[rstest]
    #[case(AlignmentMode::Global)]
    #[case(AlignmentMode::Local)]
    #[case(AlignmentMode::Overlap)]
    fn test_affine_with_equal_costs_matches_simple(#[case] mode: AlignmentMode) {
        let mut rng = StdRng::seed_from_u64(3);
        let matrix = SimilarityMatrix::diagonal(1, -1, Alphabet::Dna);
        let aligner = AnyAligner::new(mode, super::Options::default());
        for _ in 0..100 {
            let first = random_dna(&mut rng, 0, 20);
            let second = random_dna(&mut rng, 0, 20);
            let gap = -rng.gen_range(1..=3);
            let simple = aligner.align_simple(&matrix, gap, &first, &second).unwrap();
            let affine = aligner.align(&matrix, gap, gap, &first, &second).unwrap();
            assert_eq!(score_of(&simple), score_of(&affine), "{mode} {first} {second}");
        }
    }

    /// A local alignment scores at least zero and at least the global score of any pair of
    /// sub-sequences.
    #[rstest]
    fn test_local_dominates_global_of_substrings() {
        let mut rng = StdRng::seed_from_u64(21);
        let matrix = SimilarityMatrix::diagonal(1, -1, Alphabet::Dna);
        let local = Aligner::new(Local);
        let global = Aligner::new(Global);
        for _ in 0..50 {
            let first = random_dna(&mut rng, 0, 16);
            let second = random_dna(&mut rng, 0, 16);
            let local_score = score_of(&local.align_simple(&matrix, -1, &first, &second).unwrap());
            assert!(local_score >= 0);
            for _ in 0..10 {
                let sub = |seq: &Sequence, rng: &mut StdRng| {
                    let start = rng.gen_range(0..=seq.len());
                    let end = rng.gen_range(start..=seq.len());
                    Sequence::new(Alphabet::Dna, seq.symbols()[start..end].to_vec()).unwrap()
                };
                let first_sub = sub(&first, &mut rng);
                let second_sub = sub(&second, &mut rng);
                let global_score = score_of(
                    &global
                        .align_simple(&matrix, -1, &first_sub, &second_sub)
                        .unwrap(),
                );
                assert!(local_score >= global_score, "{first} {second}");
            }
        }
    }
}
