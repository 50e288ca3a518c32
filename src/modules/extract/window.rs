//! Interval and flank-window extraction

use crate::engines::compute::string_ops;
use crate::engines::{EngineError, EngineResult};
use crate::modules::extract::Extraction;
use crate::modules::io::bed::{clamp_window, display_id, BedInterval, FlankSpec};
use crate::modules::io::fasta::ReferenceGenome;
use crate::modules::io::feature::Strand;
use crate::modules::seq::{Sequence, SequenceResult};

fn oriented(chrom: &Sequence, start: u64, end: u64, strand: Strand) -> Vec<u8> {
    let bytes = &chrom.as_bytes()[start as usize..end as usize];
    if strand.is_reverse() {
        string_ops::reverse_complement(bytes)
    } else {
        bytes.to_vec()
    }
}

/// Sequences for the flank windows of one interval.
///
/// Windows are clamped to the chromosome; a window with no overlap fails with
/// `OutOfRange`. Ids are `chrom:start-end(strand)` with the 1-based start of
/// the clamped window, or the BED name when `use_name` is set.
pub fn extract_window(
    interval: &BedInterval,
    chrom: &Sequence,
    flank: &FlankSpec,
    use_name: bool,
) -> SequenceResult<Vec<Sequence>> {
    let mut records = Vec::new();
    for (start, end) in flank.windows(interval) {
        let (start, end) = clamp_window(&interval.chrom, start, end, chrom.len() as u64)?;
        let id = if use_name {
            interval.name.clone()
        } else {
            display_id(&interval.chrom, start, end, interval.strand)
        };
        records.push(Sequence::from_vec(id, oriented(chrom, start, end, interval.strand)));
    }
    Ok(records)
}

/// Extract every interval of a BED stream
pub fn extract_bed<I>(
    intervals: I,
    genome: &ReferenceGenome,
    flank: &FlankSpec,
    use_name: bool,
) -> SequenceResult<Extraction>
where
    I: IntoIterator<Item = EngineResult<BedInterval>>,
{
    let mut extraction = Extraction::default();
    for interval in intervals {
        let interval = interval?;
        match genome.get(&interval.chrom) {
            Some(chrom) => extraction
                .records
                .extend(extract_window(&interval, chrom, flank, use_name)?),
            None => extraction.miss(&interval.chrom),
        }
    }
    Ok(extraction.finish())
}

/// One sub-sequence from 1-based closed coordinates, or `None` when the
/// chromosome is absent. The end is clamped to the chromosome length.
pub fn extract_region(
    genome: &ReferenceGenome,
    chrom: &str,
    start: u64,
    end: u64,
    strand: Strand,
) -> SequenceResult<Option<Sequence>> {
    if start == 0 || start > end {
        return Err(EngineError::InvalidInput(format!(
            "region {}:{}-{} is not a valid 1-based interval",
            chrom, start, end
        ))
        .into());
    }
    let Some(sequence) = genome.get(chrom) else {
        log::warn!("{} not found in reference", chrom);
        return Ok(None);
    };

    let (from, to) = clamp_window(chrom, start as i64 - 1, end as i64, sequence.len() as u64)?;
    let id = format!("{}:{}-{}({})", chrom, start, end, strand);
    Ok(Some(Sequence::from_vec(id, oriented(sequence, from, to, strand))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::io::bed::read_bed;
    use crate::modules::seq::SequenceError;

    fn genome() -> ReferenceGenome {
        let chrom: Vec<u8> = b"ACGT".iter().copied().cycle().take(3000).collect();
        ReferenceGenome::from_records([Sequence::from_vec("Chr1".to_string(), chrom), Sequence::new("Chr2", b"AACCGGTT")])
    }

    #[test]
    fn test_upstream_flank_and_extension() {
        let genome = genome();
        let chrom = genome.get("Chr1").unwrap();
        let interval = BedInterval::new("Chr1", 1000, 2000, "peak", Strand::Forward).unwrap();

        let flank = FlankSpec::new().with_upstream(50).with_extension(false);
        let records = extract_window(&interval, chrom, &flank, false).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id(), "Chr1:951-1000(+)");
        assert_eq!(records[0].len(), 50);

        let flank = flank.with_extension(true);
        let records = extract_window(&interval, chrom, &flank, true).unwrap();
        assert_eq!(records[0].id(), "peak");
        assert_eq!(records[0].len(), 1050);
    }

    #[test]
    fn test_reverse_window_and_clamping() {
        let genome = genome();
        let chrom = genome.get("Chr2").unwrap();
        let interval = BedInterval::new("Chr2", 2, 6, "x", Strand::Reverse).unwrap();

        let records = extract_window(&interval, chrom, &FlankSpec::new().with_both(10), false).unwrap();
        assert_eq!(records[0].id(), "Chr2:1-8(-)");
        assert_eq!(records[0].as_bytes(), b"AACCGGTT");

        let records = extract_window(&interval, chrom, &FlankSpec::new(), false).unwrap();
        assert_eq!(records[0].as_bytes(), b"CCGG");
    }

    #[test]
    fn test_window_outside_chromosome() {
        let genome = genome();
        let chrom = genome.get("Chr2").unwrap();
        let interval = BedInterval::new("Chr2", 0, 4, "x", Strand::Forward).unwrap();
        let flank = FlankSpec::new().with_upstream(5).with_extension(false);

        match extract_window(&interval, chrom, &flank, false) {
            Err(SequenceError::Engine(EngineError::OutOfRange(_))) => {}
            other => panic!("Expected OutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_bed_collects_missing_chromosomes() {
        let bed = "Chr1\t0\t4\ta\t0\t+\nChrUn\t0\t4\tb\t0\t+\nChr2\t0\t2\tc\t0\t-\n";
        let extraction = extract_bed(read_bed(bed.as_bytes()), &genome(), &FlankSpec::new(), true).unwrap();

        let ids: Vec<&str> = extraction.records.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(extraction.records[1].as_bytes(), b"TT");
        assert_eq!(extraction.report.missing, vec!["ChrUn"]);
    }

    #[test]
    fn test_extract_region() {
        let genome = genome();
        let region = extract_region(&genome, "Chr2", 3, 6, Strand::Reverse).unwrap().unwrap();
        assert_eq!(region.id(), "Chr2:3-6(-)");
        assert_eq!(region.as_bytes(), b"CCGG");

        assert!(extract_region(&genome, "ChrZ", 1, 2, Strand::Forward).unwrap().is_none());
        assert!(extract_region(&genome, "Chr2", 0, 2, Strand::Forward).is_err());
        assert!(extract_region(&genome, "Chr2", 20, 30, Strand::Forward).is_err());
    }
}
