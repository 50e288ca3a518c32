//! Compute primitives for sequence and identifier handling

pub mod natsort;
pub mod string_ops;

pub use natsort::{natural_cmp, natural_sort};
pub use string_ops::{complement_base, reverse_complement, translate};
