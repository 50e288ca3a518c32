//! Regular-expression motif search

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::engines::{EngineError, EngineResult};
use crate::modules::seq::{Sequence, SequenceResult};

/// Column header of the hit table
pub const MOTIF_HEADER: &str = "# Seq_id\tStart\tEnd\tMotif";

/// One motif occurrence, 1-based and inclusive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotifHit {
    pub seq_id: String,
    pub start: usize,
    pub end: usize,
    pub motif: String,
}

impl MotifHit {
    pub fn to_line(&self) -> String {
        format!("{}\t{}\t{}\t{}", self.seq_id, self.start, self.end, self.motif)
    }
}

/// Hits of a whole scan plus the records that had none
#[derive(Debug, Clone, Default)]
pub struct MotifScan {
    pub hits: Vec<MotifHit>,
    pub not_found: Vec<String>,
}

impl MotifScan {
    /// One `"{pattern} not found in {id}"` line per record without a hit
    pub fn not_found_message(&self, pattern: &str) -> String {
        self.not_found
            .iter()
            .map(|id| format!("{} not found in {}\n", pattern, id))
            .collect()
    }
}

/// Compiled motif pattern
#[derive(Debug, Clone)]
pub struct MotifFinder {
    regex: Regex,
}

impl MotifFinder {
    /// Compile a motif; the pattern may be a regular expression
    pub fn new(pattern: &str) -> EngineResult<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| EngineError::InvalidInput(format!("invalid motif '{}': {}", pattern, e)))?;
        Ok(Self { regex })
    }

    /// The pattern text
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Non-overlapping hits in one record
    pub fn find(&self, record: &Sequence) -> Vec<MotifHit> {
        let text = String::from_utf8_lossy(record.as_bytes());
        self.regex
            .find_iter(&text)
            .map(|m| MotifHit {
                seq_id: record.id().to_string(),
                start: m.start() + 1,
                end: m.end(),
                motif: m.as_str().to_string(),
            })
            .collect()
    }

    /// Search every record of a stream
    pub fn scan<I>(&self, records: I) -> SequenceResult<MotifScan>
    where
        I: IntoIterator<Item = SequenceResult<Sequence>>,
    {
        let mut scan = MotifScan::default();
        for record in records {
            let record = record?;
            let hits = self.find(&record);
            if hits.is_empty() {
                scan.not_found.push(record.id().to_string());
            } else {
                scan.hits.extend(hits);
            }
        }
        if !scan.not_found.is_empty() {
            log::info!("{} records without {}", scan.not_found.len(), self.pattern());
        }
        Ok(scan)
    }
}
