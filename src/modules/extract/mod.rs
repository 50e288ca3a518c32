//! Sequence extraction
//!
//! Combines a [`ReferenceGenome`](crate::modules::io::fasta::ReferenceGenome)
//! with feature hierarchies, plain feature records or BED intervals to build
//! output sequences in transcription orientation.

pub mod features;
pub mod transcript;
pub mod window;

use crate::engines::EngineError;
use crate::modules::lookup::LookupReport;
use crate::modules::seq::{Sequence, SequenceResult};

pub use features::extract_features;
pub use transcript::{cdna, cds, extract_transcripts, protein, SequenceKind};
pub use window::{extract_bed, extract_region, extract_window};

/// Extracted records plus every id or chromosome that could not be found
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub records: Vec<Sequence>,
    pub report: LookupReport,
}

impl Extraction {
    fn miss(&mut self, id: &str) {
        if !self.report.missing.iter().any(|m| m == id) {
            log::warn!("{} not found in reference", id);
            self.report.missing.push(id.to_string());
        }
    }

    fn finish(mut self) -> Self {
        self.report.missing.sort();
        log::debug!("Extracted {} sequences", self.records.len());
        self
    }
}

/// Bytes of a 1-based closed feature interval
pub(crate) fn feature_slice<'a>(chrom: &'a Sequence, start: u64, end: u64) -> SequenceResult<&'a [u8]> {
    let len = chrom.len() as u64;
    if start == 0 || start > end || end > len {
        return Err(EngineError::OutOfRange(format!(
            "{}:{}-{} exceeds {} (length {})",
            chrom.id(),
            start,
            end,
            chrom.id(),
            len
        ))
        .into());
    }
    Ok(&chrom.as_bytes()[(start - 1) as usize..end as usize])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::seq::SequenceError;

    #[test]
    fn test_feature_slice_is_one_based() {
        let chrom = Sequence::new("c", b"ACGTACGT");
        assert_eq!(feature_slice(&chrom, 1, 4).unwrap(), b"ACGT");
        assert_eq!(feature_slice(&chrom, 8, 8).unwrap(), b"T");
        assert!(matches!(
            feature_slice(&chrom, 5, 9),
            Err(SequenceError::Engine(EngineError::OutOfRange(_)))
        ));
    }

    #[test]
    fn test_misses_are_recorded_once_and_sorted() {
        let mut extraction = Extraction::default();
        extraction.miss("ChrB");
        extraction.miss("ChrA");
        extraction.miss("ChrB");
        assert_eq!(extraction.finish().report.missing, vec!["ChrA", "ChrB"]);
    }
}
