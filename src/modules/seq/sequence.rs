//! Core sequence type
//!
//! A [`Sequence`] is an identifier, an optional free-text description and the
//! raw symbols. Symbols are always stored unwrapped; line wrapping is applied
//! only when writing FASTA.

use std::fmt;
use std::ops::{Index, Range};

use thiserror::Error;

use super::alphabet::AlphabetType;
use crate::engines::compute::string_ops;
use crate::engines::EngineError;

/// Error type for sequence operations
#[derive(Error, Debug)]
pub enum SequenceError {
    #[error("Invalid sequence: {0}")]
    InvalidSequence(String),

    #[error("Index out of bounds: {0}")]
    IndexOutOfBounds(String),

    #[error("Operation not supported: {0}")]
    UnsupportedOperation(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl From<std::io::Error> for SequenceError {
    fn from(e: std::io::Error) -> Self {
        SequenceError::Engine(EngineError::Io(e))
    }
}

/// Result type for sequence operations
pub type SequenceResult<T> = Result<T, SequenceError>;

/// A named biological sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    id: String,
    description: Option<String>,
    symbols: Vec<u8>,
}

impl Sequence {
    /// Create a new sequence from raw bytes
    pub fn new(id: &str, symbols: &[u8]) -> Self {
        Self::from_vec(id.to_string(), symbols.to_vec())
    }

    /// Create a new sequence taking ownership of its parts
    pub fn from_vec(id: String, symbols: Vec<u8>) -> Self {
        Self {
            id,
            description: None,
            symbols,
        }
    }

    /// Set the sequence description
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Replace the sequence identifier
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    /// Record the file the sequence was read from in its id (`{id} from={file}`)
    pub fn annotate_provenance(&mut self, file_name: &str) {
        self.id = format!("{} from={}", self.id, file_name);
    }

    /// Get the identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the description (if any)
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Header line content without the leading `>`
    pub fn header(&self) -> String {
        match &self.description {
            Some(desc) => format!("{} {}", self.id, desc),
            None => self.id.clone(),
        }
    }

    /// Get the sequence length
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Check if the sequence is empty
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Get the sequence as bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.symbols
    }

    /// Consume the sequence, returning its symbols
    pub fn into_bytes(self) -> Vec<u8> {
        self.symbols
    }

    /// Get the sequence as a string
    pub fn as_string(&self) -> String {
        String::from_utf8_lossy(&self.symbols).to_string()
    }

    /// Detect the alphabet of the symbols
    pub fn alphabet(&self) -> AlphabetType {
        AlphabetType::detect(&self.symbols)
    }

    /// Get a subsequence from 0-based half-open coordinates.
    ///
    /// The id and description are kept unchanged.
    pub fn subsequence(&self, start: usize, end: usize) -> SequenceResult<Self> {
        if start > end || end > self.len() {
            return Err(SequenceError::IndexOutOfBounds(format!(
                "Invalid range {}..{} for sequence {} of length {}",
                start,
                end,
                self.id,
                self.len()
            )));
        }

        Ok(Self {
            id: self.id.clone(),
            description: self.description.clone(),
            symbols: self.symbols[start..end].to_vec(),
        })
    }

    /// Get the reverse complement; symbols outside A/C/G/T map to themselves
    pub fn reverse_complement(&self) -> Self {
        Self {
            id: self.id.clone(),
            description: self.description.clone(),
            symbols: string_ops::reverse_complement(&self.symbols),
        }
    }

    /// Translate with the standard genetic code.
    ///
    /// Translation stops at the first stop codon when `to_stop` is set, and an
    /// incomplete trailing codon is dropped.
    pub fn translate(&self, to_stop: bool) -> SequenceResult<Self> {
        if !self.alphabet().is_nucleotide() {
            return Err(SequenceError::UnsupportedOperation(format!(
                "Translation is not supported for {} sequence {}",
                self.alphabet().name(),
                self.id
            )));
        }

        Ok(Self {
            id: self.id.clone(),
            description: self.description.clone(),
            symbols: string_ops::translate(&self.symbols, to_stop),
        })
    }

    /// Find all occurrences of a literal pattern (0-based start positions)
    pub fn find_all(&self, pattern: &[u8]) -> Vec<usize> {
        if pattern.is_empty() || pattern.len() > self.len() {
            return Vec::new();
        }

        self.symbols
            .windows(pattern.len())
            .enumerate()
            .filter(|(_, window)| *window == pattern)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Single-line FASTA representation (`>header\nSYMBOLS`)
impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, ">{}\n{}", self.header(), String::from_utf8_lossy(&self.symbols))
    }
}

impl Index<usize> for Sequence {
    type Output = u8;

    fn index(&self, index: usize) -> &Self::Output {
        &self.symbols[index]
    }
}

impl Index<Range<usize>> for Sequence {
    type Output = [u8];

    fn index(&self, range: Range<usize>) -> &Self::Output {
        &self.symbols[range]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sequence_creation() {
        let seq = Sequence::new("seq1", b"ACGTACGT").with_description("Test sequence");

        assert_eq!(seq.id(), "seq1");
        assert_eq!(seq.description(), Some("Test sequence"));
        assert_eq!(seq.len(), 8);
        assert_eq!(seq.header(), "seq1 Test sequence");
        assert_eq!(seq.alphabet(), AlphabetType::Dna);
        assert_eq!(seq[0], b'A');
        assert_eq!(&seq[2..4], b"GT");
    }

    #[test]
    fn test_subsequence() {
        let seq = Sequence::new("chr1", b"ACGTACGTAC");

        let sub = seq.subsequence(2, 6).unwrap();
        assert_eq!(sub.as_bytes(), b"GTAC");
        assert_eq!(sub.id(), "chr1");

        assert_eq!(seq.subsequence(4, 4).unwrap().len(), 0);
        assert!(matches!(seq.subsequence(5, 11), Err(SequenceError::IndexOutOfBounds(_))));
        assert!(matches!(seq.subsequence(6, 5), Err(SequenceError::IndexOutOfBounds(_))));
    }

    #[test]
    fn test_reverse_complement_keeps_case() {
        let seq = Sequence::new("s", b"AAcgNt");
        assert_eq!(seq.reverse_complement().as_bytes(), b"aNcgTT");
    }

    #[test]
    fn test_translate() {
        let cds = Sequence::new("tx1", b"ATGAAATTTTGAGGG");
        assert_eq!(cds.translate(true).unwrap().as_bytes(), b"MKF");
        assert_eq!(cds.translate(false).unwrap().as_bytes(), b"MKF*G");

        let protein = Sequence::new("p", b"MKFLLW");
        assert!(matches!(protein.translate(true), Err(SequenceError::UnsupportedOperation(_))));
    }

    #[test]
    fn test_provenance_and_display() {
        let mut seq = Sequence::new("gene1", b"ACGT");
        seq.annotate_provenance("/data/genome.fa");
        assert_eq!(seq.id(), "gene1 from=/data/genome.fa");
        assert_eq!(seq.to_string(), ">gene1 from=/data/genome.fa\nACGT");
    }

    #[test]
    fn test_find_all() {
        let seq = Sequence::new("s", b"ACGTACGTAC");
        assert_eq!(seq.find_all(b"AC"), vec![0, 4, 8]);
        assert!(seq.find_all(b"").is_empty());
    }

    proptest! {
        #[test]
        fn prop_double_reverse_complement(symbols in "[ACGTNacgtnRYKM]{0,300}") {
            let seq = Sequence::new("s", symbols.as_bytes());
            prop_assert_eq!(seq.reverse_complement().reverse_complement(), seq);
        }
    }
}
