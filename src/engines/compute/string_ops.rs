//! Symbol-level operations on nucleotide sequences
//!
//! Complementing, reversing and translating raw byte sequences. These are the
//! primitives behind [`Sequence`](crate::modules::seq::Sequence) and the
//! extraction engine.

/// Stop codon symbol produced by [`translate`]
pub const STOP_SYMBOL: u8 = b'*';

/// Unknown amino acid, for codons containing ambiguous bases
pub const UNKNOWN_AMINO_ACID: u8 = b'X';

// Standard genetic code, indexed by (first, second, third) base in TCAG order.
const STANDARD_CODE: &[u8; 64] =
    b"FFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG";

/// Complement a single nucleotide, preserving case.
///
/// A pairs with T, C pairs with G; every other symbol, including `N`, maps
/// to itself.
#[inline]
pub fn complement_base(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'T' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        b'a' => b't',
        b't' => b'a',
        b'c' => b'g',
        b'g' => b'c',
        _ => base,
    }
}

/// Reverse a sequence in-place
pub fn reverse_in_place(sequence: &mut [u8]) {
    sequence.reverse();
}

/// Complement a sequence in-place
pub fn complement_in_place(sequence: &mut [u8]) {
    for base in sequence.iter_mut() {
        *base = complement_base(*base);
    }
}

/// Reverse-complement a sequence in-place
pub fn reverse_complement_in_place(sequence: &mut [u8]) {
    complement_in_place(sequence);
    reverse_in_place(sequence);
}

/// Reverse-complement a sequence, returning a new vector
pub fn reverse_complement(sequence: &[u8]) -> Vec<u8> {
    sequence.iter().rev().map(|&b| complement_base(b)).collect()
}

fn base_index(base: u8) -> Option<usize> {
    match base {
        b'T' | b't' | b'U' | b'u' => Some(0),
        b'C' | b'c' => Some(1),
        b'A' | b'a' => Some(2),
        b'G' | b'g' => Some(3),
        _ => None,
    }
}

/// Translate one codon with the standard genetic code
pub fn translate_codon(codon: &[u8]) -> u8 {
    if codon.len() != 3 {
        return UNKNOWN_AMINO_ACID;
    }
    match (base_index(codon[0]), base_index(codon[1]), base_index(codon[2])) {
        (Some(a), Some(b), Some(c)) => STANDARD_CODE[a * 16 + b * 4 + c],
        _ => UNKNOWN_AMINO_ACID,
    }
}

/// Translate a coding sequence into amino acids.
///
/// Trailing bases that do not form a full codon are dropped. With `to_stop`,
/// translation ends before the first stop codon; otherwise stops are emitted
/// as `*`.
pub fn translate(sequence: &[u8], to_stop: bool) -> Vec<u8> {
    let mut protein = Vec::with_capacity(sequence.len() / 3);

    for codon in sequence.chunks_exact(3) {
        let aa = translate_codon(codon);
        if to_stop && aa == STOP_SYMBOL {
            break;
        }
        protein.push(aa);
    }

    protein
}

/// Transcribe DNA to RNA (T -> U)
pub fn transcribe(dna: &[u8]) -> Vec<u8> {
    dna.iter()
        .map(|&base| match base {
            b'T' => b'U',
            b't' => b'u',
            _ => base,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_complement_preserves_case_and_unknowns() {
        let mut seq = b"ACGTacgtNnRY-".to_vec();
        complement_in_place(&mut seq);
        assert_eq!(seq, b"TGCAtgcaNnRY-");
    }

    #[test]
    fn test_reverse_complement() {
        assert_eq!(reverse_complement(b"AACGTT"), b"AACGTT");
        assert_eq!(reverse_complement(b"ATGCn"), b"nGCAT");
        assert_eq!(reverse_complement(b""), b"");

        let mut seq = b"GATTACA".to_vec();
        reverse_complement_in_place(&mut seq);
        assert_eq!(seq, b"TGTAATC");
    }

    #[test]
    fn test_translate_codon() {
        assert_eq!(translate_codon(b"ATG"), b'M');
        assert_eq!(translate_codon(b"atg"), b'M');
        assert_eq!(translate_codon(b"TGG"), b'W');
        assert_eq!(translate_codon(b"TAA"), STOP_SYMBOL);
        assert_eq!(translate_codon(b"TAG"), STOP_SYMBOL);
        assert_eq!(translate_codon(b"TGA"), STOP_SYMBOL);
        assert_eq!(translate_codon(b"GGN"), UNKNOWN_AMINO_ACID);
        assert_eq!(translate_codon(b"AUG"), b'M');
    }

    #[test]
    fn test_translate_stops_and_drops_partial_codon() {
        assert_eq!(translate(b"ATGGCCTAAGGG", true), b"MA");
        assert_eq!(translate(b"ATGGCCTAAGGG", false), b"MA*G");
        assert_eq!(translate(b"ATGGCCGA", true), b"MA");
        assert_eq!(translate(b"AT", true), b"");
    }

    #[test]
    fn test_transcription() {
        assert_eq!(transcribe(b"ACGt"), b"ACGu");
    }

    proptest! {
        #[test]
        fn prop_reverse_complement_is_involution(seq in "[ACGTNacgtn]{0,200}") {
            let once = reverse_complement(seq.as_bytes());
            let twice = reverse_complement(&once);
            prop_assert_eq!(twice, seq.as_bytes().to_vec());
        }
    }
}
