//! Sequence alphabets

use serde::{Deserialize, Serialize};

/// Sequence alphabet type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlphabetType {
    Dna,
    Rna,
    Protein,
    Generic,
}

const DNA_LETTERS: &[u8] = b"ACGTN";
const RNA_LETTERS: &[u8] = b"ACGUN";
const PROTEIN_LETTERS: &[u8] = b"ACDEFGHIKLMNPQRSTVWYBZX*";

impl AlphabetType {
    /// Upper-case letters accepted by the alphabet
    pub fn letters(&self) -> &'static [u8] {
        match self {
            AlphabetType::Dna => DNA_LETTERS,
            AlphabetType::Rna => RNA_LETTERS,
            AlphabetType::Protein => PROTEIN_LETTERS,
            AlphabetType::Generic => b"ABCDEFGHIJKLMNOPQRSTUVWXYZ*-",
        }
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            AlphabetType::Dna => "DNA",
            AlphabetType::Rna => "RNA",
            AlphabetType::Protein => "Protein",
            AlphabetType::Generic => "Generic",
        }
    }

    /// Check every symbol (case-insensitively) against the alphabet
    pub fn is_valid_sequence(&self, symbols: &[u8]) -> bool {
        let letters = self.letters();
        symbols
            .iter()
            .all(|c| letters.contains(&c.to_ascii_uppercase()))
    }

    /// Guess the narrowest alphabet that accepts all symbols.
    ///
    /// Nucleotide alphabets win ties, so an empty or all-`N` sequence is DNA.
    pub fn detect(symbols: &[u8]) -> Self {
        [AlphabetType::Dna, AlphabetType::Rna, AlphabetType::Protein]
            .into_iter()
            .find(|alphabet| alphabet.is_valid_sequence(symbols))
            .unwrap_or(AlphabetType::Generic)
    }

    /// Whether the alphabet describes nucleotides
    pub fn is_nucleotide(&self) -> bool {
        matches!(self, AlphabetType::Dna | AlphabetType::Rna)
    }
}
