//! I/O module
//!
//! Readers and writers for the sequence and annotation formats: FASTA,
//! GFF, GTF and BED.

pub mod bed;
pub mod fasta;
pub mod feature;
pub mod gff;
pub mod gtf;

/// Convenience re-exports
pub use bed::{BedInterval, BedParser, FlankSpec};
pub use fasta::{read_fasta, write_fasta, FastaReader, FastaWriter, ReferenceGenome};
pub use feature::{AttributeDecoder, Attributes, FeatureParser, FeatureRecord, Strand};
pub use gff::{read_gff, read_gff_path, GffDecoder};
pub use gtf::{gtf_to_bed, read_gtf, read_gtf_path, GtfDecoder};
