//! Engine layer
//!
//! Low-level building blocks shared by the annotation and sequence modules:
//! buffered I/O and the task dispatcher (`core`), symbol-level algorithms
//! (`compute`) and the record parsers for every supported file format (`storage`).

pub mod core;
pub mod compute;
pub mod storage;

use thiserror::Error;

/// Error type for engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Structurally invalid input, e.g. sequence data before any FASTA header
    #[error("Malformed input at line {line}: {msg}")]
    MalformedInput { line: usize, msg: String },

    /// A tabular line with the wrong number of columns
    #[error("Malformed record at line {line}: expected at least {expected} tab-separated fields, found {found}")]
    MalformedRecord {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// Non-numeric coordinate, or start after end
    #[error("Invalid coordinate at line {line}: {msg}")]
    InvalidCoordinate { line: usize, msg: String },

    /// Requested interval lies completely outside the available sequence
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// A Parent or transcript reference without a matching record
    #[error("Unresolved reference: {child} refers to missing {parent}")]
    UnresolvedReference { child: String, parent: String },

    #[error("Invalid input data: {0}")]
    InvalidInput(String),

    /// A dispatched task panicked before producing a result
    #[error("Worker failed: {0}")]
    WorkerFailed(String),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
