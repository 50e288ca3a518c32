//! Analyses built on the parsers: genotype statistics, circRNA alternative
//! cyclization and motif search

pub mod circ;
pub mod genotype;
pub mod motif;

pub use circ::{alternative_sites, circ_types_from_fasta, AlternativeSite};
pub use genotype::{
    consistency_bins, parallel_stat_mhm, stat_mhm, CallCounts, Consistency, GenotypeTable, SampleConsistency, SiteStats,
};
pub use motif::{MotifFinder, MotifHit};
