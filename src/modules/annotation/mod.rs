//! Annotation module
//!
//! Feature hierarchy assembly for GFF and GTF sources, and the
//! hierarchy-preserving GFF sort.

pub mod hierarchy;
pub mod sort;

pub use hierarchy::{assemble_gff, assemble_gtf, AssemblerOptions, FeatureHierarchy, FeatureNode, NodeId};
pub use sort::{sort_gff, sort_gff_lines};
