use crate::align::sequence::Alphabet;

/// Chooses the consensus symbol for one column of a pairwise alignment.
///
/// Either symbol may be the gap symbol.
pub trait ConsensusResolver: Send + Sync {
    fn resolve(&self, alphabet: Alphabet, first: u8, second: u8) -> u8;
}

/// Keeps symbols both sequences agree on and emits the alphabet's ambiguity symbol
/// (`N` or `X`) everywhere else.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SimpleConsensusResolver;

impl ConsensusResolver for SimpleConsensusResolver {
    #[inline]
    fn resolve(&self, alphabet: Alphabet, first: u8, second: u8) -> u8 {
        if first == second {
            first
        } else {
            alphabet.ambiguity_symbol()
        }
    }
}

/// Builds the consensus of two aligned, equal-length symbol arrays.
pub fn consensus(
    resolver: &dyn ConsensusResolver,
    alphabet: Alphabet,
    first: &[u8],
    second: &[u8],
) -> Vec<u8> {
    debug_assert_eq!(first.len(), second.len());
    first
        .iter()
        .zip(second)
        .map(|(&a, &b)| resolver.resolve(alphabet, a, b))
        .collect()
}
