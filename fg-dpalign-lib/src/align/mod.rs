pub mod aligners;
pub mod alignment;
pub mod consensus;
pub mod scoring;
pub mod sequence;
pub mod traceback;

pub use aligners::{AlignmentMode, Aligner, AnyAligner, Builder, Global, Local, Options, Overlap};
pub use alignment::AlignmentResult;
pub use consensus::{ConsensusResolver, SimpleConsensusResolver};
pub use scoring::{GapCosts, SimilarityMatrix};
pub use sequence::{Alphabet, Sequence};
