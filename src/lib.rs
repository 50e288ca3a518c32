//! Genomic-data engine
//!
//! Streaming FASTA, GFF, GTF and BED parsers, gene/transcript hierarchies and
//! the extraction of cDNA, CDS, protein and flanking sequences from a
//! reference genome. Large per-site tables are processed through a bounded
//! worker pool.
//!
//! The crate logs through the `log` facade and never installs a logger.

pub mod engines;
pub mod modules;

pub use engines::{EngineError, EngineResult};
pub use modules::seq::{Sequence, SequenceError, SequenceResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
