//! Sequence module
//!
//! This module provides the sequence record type and alphabets.

pub mod alphabet;
pub mod sequence;

/// Convenience re-exports
pub use alphabet::AlphabetType;
pub use sequence::{Sequence, SequenceError, SequenceResult};
