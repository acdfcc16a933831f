use std::fmt;

use bit_set::BitSet;
use derive_getters::Getters;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::errors::{AlignError, Result};

/// The symbol used to display a gap in an aligned sequence.
pub const GAP_SYMBOL: u8 = b'-';

/// IUPAC nucleotide codes, including ambiguity codes.
const DNA_SYMBOLS: &[u8] = b"ACGTRYKMSWBDHVN";
const RNA_SYMBOLS: &[u8] = b"ACGURYKMSWBDHVN";
/// The twenty standard amino acids, the ambiguity codes B, Z, J and X, selenocysteine (U),
/// pyrrolysine (O) and the stop symbol.
const PROTEIN_SYMBOLS: &[u8] = b"ACDEFGHIKLMNPQRSTVWYBZJXUO*";

lazy_static! {
    static ref DNA_SET: BitSet = symbol_set(DNA_SYMBOLS);
    static ref RNA_SET: BitSet = symbol_set(RNA_SYMBOLS);
    static ref PROTEIN_SET: BitSet = symbol_set(PROTEIN_SYMBOLS);
}

fn symbol_set(symbols: &[u8]) -> BitSet {
    symbols.iter().map(|&symbol| symbol as usize).collect()
}

/// The alphabet a sequence is written in.  Two sequences may only be aligned when they share an
/// alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Alphabet {
    Dna,
    Rna,
    Protein,
}

impl Alphabet {
    /// The upper-case symbols of the alphabet, excluding the gap symbol.
    pub fn symbols(self) -> &'static [u8] {
        match self {
            Self::Dna => DNA_SYMBOLS,
            Self::Rna => RNA_SYMBOLS,
            Self::Protein => PROTEIN_SYMBOLS,
        }
    }

    /// True if `symbol` belongs to the alphabet.  The gap symbol does not.
    #[inline]
    pub fn contains(self, symbol: u8) -> bool {
        let set: &BitSet = match self {
            Self::Dna => &DNA_SET,
            Self::Rna => &RNA_SET,
            Self::Protein => &PROTEIN_SET,
        };
        set.contains(symbol as usize)
    }

    pub fn is_nucleotide(self) -> bool {
        matches!(self, Self::Dna | Self::Rna)
    }

    /// The symbol meaning "any symbol": `N` for nucleotides, `X` for amino acids.
    pub fn ambiguity_symbol(self) -> u8 {
        if self.is_nucleotide() {
            b'N'
        } else {
            b'X'
        }
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dna => write!(f, "DNA"),
            Self::Rna => write!(f, "RNA"),
            Self::Protein => write!(f, "protein"),
        }
    }
}

/// A named sequence of symbols from a single alphabet.  Aligned sequences may also contain
/// [`GAP_SYMBOL`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Getters, Serialize, Deserialize)]
pub struct Sequence {
    /// Identifier of the sequence, empty when unnamed.
    id: String,
    /// Human readable identifier, defaults to `id`.
    display_id: String,
    alphabet: Alphabet,
    symbols: Vec<u8>,
}

impl Sequence {
    /// Builds an unnamed sequence, checking that every symbol belongs to `alphabet` or is a gap.
    pub fn new(alphabet: Alphabet, symbols: impl Into<Vec<u8>>) -> Result<Self> {
        let symbols = symbols.into();
        if let Some((position, &symbol)) = symbols
            .iter()
            .enumerate()
            .find(|(_, symbol)| **symbol != GAP_SYMBOL && !alphabet.contains(**symbol))
        {
            return Err(AlignError::InvalidSymbol {
                alphabet,
                position,
                symbol,
            });
        }
        Ok(Self::from_parts(String::new(), String::new(), alphabet, symbols))
    }

    /// Builds a sequence without validating its symbols.
    pub(crate) fn from_parts(
        id: String,
        display_id: String,
        alphabet: Alphabet,
        symbols: Vec<u8>,
    ) -> Self {
        Self {
            id,
            display_id,
            alphabet,
            symbols,
        }
    }

    /// Sets the identifier, and the display identifier too if it has not been set.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        if self.display_id.is_empty() {
            self.display_id = self.id.clone();
        }
        self
    }

    #[must_use]
    pub fn with_display_id(mut self, display_id: impl Into<String>) -> Self {
        self.display_id = display_id.into();
        self
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// The symbols with all gaps removed.
    pub fn ungapped(&self) -> Vec<u8> {
        self.symbols
            .iter()
            .copied()
            .filter(|&symbol| symbol != GAP_SYMBOL)
            .collect()
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.symbols))
    }
}
