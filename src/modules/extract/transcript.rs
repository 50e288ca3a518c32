//! Spliced transcript sequences: cDNA, CDS and protein

use serde::{Deserialize, Serialize};

use crate::engines::compute::string_ops;
use crate::modules::annotation::hierarchy::{FeatureHierarchy, NodeId};
use crate::modules::extract::{feature_slice, Extraction};
use crate::modules::io::fasta::ReferenceGenome;
use crate::modules::io::feature::FeatureRecord;
use crate::modules::seq::{Sequence, SequenceResult};

/// What to build from each transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequenceKind {
    Cdna,
    Cds,
    Protein,
}

/// Join segments in transcription order.
///
/// Segments arrive ascending by start. On `-` each one is reverse-complemented
/// and they are joined in reverse order.
fn splice(chrom: &Sequence, segments: &[&FeatureRecord], reverse: bool) -> SequenceResult<Vec<u8>> {
    let total = segments.iter().map(|s| s.length() as usize).sum();
    let mut out = Vec::with_capacity(total);

    if reverse {
        for segment in segments.iter().rev() {
            out.extend(string_ops::reverse_complement(feature_slice(chrom, segment.start, segment.end)?));
        }
    } else {
        for segment in segments {
            out.extend_from_slice(feature_slice(chrom, segment.start, segment.end)?);
        }
    }
    Ok(out)
}

/// Spliced exons of a transcript; a transcript without exons counts as one exon
pub fn cdna(tree: &FeatureHierarchy, transcript: NodeId, chrom: &Sequence) -> SequenceResult<Sequence> {
    let node = tree.node(transcript);
    let mut exons = tree.segments(transcript, "exon");
    if exons.is_empty() {
        exons.push(&node.record);
    }
    let symbols = splice(chrom, &exons, node.record.strand.is_reverse())?;
    Ok(Sequence::from_vec(node.name(), symbols))
}

/// Spliced CDS segments, or `None` for a non-coding transcript
pub fn cds(tree: &FeatureHierarchy, transcript: NodeId, chrom: &Sequence) -> SequenceResult<Option<Sequence>> {
    let node = tree.node(transcript);
    let segments = tree.segments(transcript, "CDS");
    if segments.is_empty() {
        return Ok(None);
    }
    let symbols = splice(chrom, &segments, node.record.strand.is_reverse())?;
    Ok(Some(Sequence::from_vec(node.name(), symbols)))
}

/// CDS translated with the standard code up to the first stop codon
pub fn protein(tree: &FeatureHierarchy, transcript: NodeId, chrom: &Sequence) -> SequenceResult<Option<Sequence>> {
    Ok(cds(tree, transcript, chrom)?.map(|coding| {
        let peptide = string_ops::translate(coding.as_bytes(), true);
        Sequence::from_vec(coding.id().to_string(), peptide)
    }))
}

/// Build one sequence per transcript of every kept gene.
///
/// Transcripts on chromosomes absent from the reference are skipped and
/// reported; so are the ids the hierarchy's filter never matched.
pub fn extract_transcripts(
    tree: &FeatureHierarchy,
    genome: &ReferenceGenome,
    kind: SequenceKind,
) -> SequenceResult<Extraction> {
    let mut extraction = Extraction {
        records: Vec::new(),
        report: tree.report().clone(),
    };

    for (_, gene) in tree.genes() {
        for transcript in tree.transcripts(gene) {
            let chrom_name = &tree.node(transcript).record.chrom;
            let Some(chrom) = genome.get(chrom_name) else {
                extraction.miss(chrom_name);
                continue;
            };

            let record = match kind {
                SequenceKind::Cdna => Some(cdna(tree, transcript, chrom)?),
                SequenceKind::Cds => cds(tree, transcript, chrom)?,
                SequenceKind::Protein => protein(tree, transcript, chrom)?,
            };
            match record {
                Some(record) => extraction.records.push(record),
                None => log::debug!("{} has no CDS", tree.node(transcript).name()),
            }
        }
    }
    Ok(extraction.finish())
}
