//! Domain modules
//!
//! Sequence records, file formats, annotation hierarchies, extraction and
//! the table-level analyses.

pub mod analysis;
pub mod annotation;
pub mod extract;
pub mod info;
pub mod io;
pub mod lookup;
pub mod seq;
