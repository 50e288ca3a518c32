//! Sequences of every feature of one type

use crate::engines::compute::string_ops;
use crate::engines::EngineResult;
use crate::modules::extract::{feature_slice, Extraction};
use crate::modules::io::fasta::ReferenceGenome;
use crate::modules::io::feature::FeatureRecord;
use crate::modules::lookup::IdFilter;
use crate::modules::seq::{Sequence, SequenceResult};

/// Identifier used for a feature: `ID`, then `transcript_id`, then `gene_id`
pub fn feature_name(record: &FeatureRecord) -> String {
    record
        .id()
        .or_else(|| record.transcript_id())
        .or_else(|| record.gene_id())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}:{}-{}", record.chrom, record.start, record.end))
}

/// Extract features of `feature_type`, reverse-complementing `-` strand ones.
///
/// With a filter, only matching features are kept and unmatched ids end up in
/// the report together with missing chromosomes.
pub fn extract_features<I>(
    records: I,
    genome: &ReferenceGenome,
    feature_type: &str,
    mut filter: Option<&mut IdFilter>,
) -> SequenceResult<Extraction>
where
    I: IntoIterator<Item = EngineResult<FeatureRecord>>,
{
    let mut extraction = Extraction::default();

    for record in records {
        let record = record?;
        if record.feature_type != feature_type {
            continue;
        }
        let name = feature_name(&record);
        if let Some(filter) = filter.as_deref_mut() {
            if !filter.check(&name) {
                continue;
            }
        }
        let Some(chrom) = genome.get(&record.chrom) else {
            extraction.miss(&record.chrom);
            continue;
        };

        let bytes = feature_slice(chrom, record.start, record.end)?;
        let symbols = if record.strand.is_reverse() {
            string_ops::reverse_complement(bytes)
        } else {
            bytes.to_vec()
        };
        extraction.records.push(Sequence::from_vec(name, symbols));
    }

    if let Some(filter) = filter {
        extraction.report.merge(filter.report());
    }
    Ok(extraction.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::io::gff::read_gff;
    use crate::modules::lookup::MatchMode;

    const GFF: &str = "\
Chr1\t.\tgene\t1\t4\t.\t+\t.\tID=Potri.001G000100
Chr1\t.\tmRNA\t1\t4\t.\t+\t.\tID=Potri.001G000100.1;Parent=Potri.001G000100
Chr1\t.\tgene\t5\t8\t.\t-\t.\tID=Potri.001G000200
";

    fn genome() -> ReferenceGenome {
        ReferenceGenome::from_records([Sequence::new("Chr1", b"ACGTAACC")])
    }

    #[test]
    fn test_extract_genes() {
        let extraction = extract_features(read_gff(GFF.as_bytes()), &genome(), "gene", None).unwrap();
        assert_eq!(extraction.records.len(), 2);
        assert_eq!(extraction.records[0].as_bytes(), b"ACGT");
        assert_eq!(extraction.records[1].as_bytes(), b"GGTT");
        assert!(extraction.report.is_empty());
    }

    #[test]
    fn test_extract_with_contain_filter() {
        let mut filter = IdFilter::new(["G000200", "G999"], MatchMode::Contain);
        let extraction =
            extract_features(read_gff(GFF.as_bytes()), &genome(), "gene", Some(&mut filter)).unwrap();
        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.records[0].id(), "Potri.001G000200");
        assert_eq!(extraction.report.missing, vec!["G999"]);
    }

    #[test]
    fn test_feature_name_fallbacks() {
        let records: Vec<FeatureRecord> = crate::modules::io::gtf::read_gtf(
            "c\t.\texon\t1\t2\t.\t+\t.\tgene_id \"g\"; transcript_id \"t\";\nc\t.\tgene\t1\t2\t.\t+\t.\tgene_id \"g\";\n"
                .as_bytes(),
        )
        .collect::<EngineResult<_>>()
        .unwrap();
        assert_eq!(feature_name(&records[0]), "t");
        assert_eq!(feature_name(&records[1]), "g");
    }
}
