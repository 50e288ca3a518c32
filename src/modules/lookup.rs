//! Identifier filters with batched "not found" reporting
//!
//! ID-filtered extraction routinely asks for identifiers that a file does not
//! contain. Misses are never errors: the filter remembers which requested ids
//! were seen and produces a single [`LookupReport`] at the end of the run.

use std::collections::HashSet;
use std::io::Read;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::engines::core::io::FastReader;
use crate::engines::EngineResult;

/// How a requested id is compared with a candidate id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchMode {
    /// Ids must be identical
    #[default]
    Exact,
    /// Either id may contain the other
    Contain,
}

/// Set of requested identifiers
#[derive(Debug, Clone, Default)]
pub struct IdFilter {
    ids: IndexSet<String>,
    mode: MatchMode,
    found: HashSet<String>,
}

impl IdFilter {
    /// Create a filter from requested ids
    pub fn new<I, S>(ids: I, mode: MatchMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
            mode,
            found: HashSet::new(),
        }
    }

    /// Read one id per line; surrounding whitespace and blank lines are ignored
    pub fn from_reader<R: Read>(reader: R, mode: MatchMode) -> EngineResult<Self> {
        let mut ids = Vec::new();
        for line in FastReader::new(reader).lines() {
            let (_, line) = line?;
            let id = line.trim();
            if !id.is_empty() {
                ids.push(id.to_string());
            }
        }
        Ok(Self::new(ids, mode))
    }

    /// Matching mode
    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Number of requested ids
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if no ids were requested
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Test a candidate id without recording it
    pub fn matches(&self, candidate: &str) -> bool {
        match self.mode {
            MatchMode::Exact => self.ids.contains(candidate),
            MatchMode::Contain => self
                .ids
                .iter()
                .any(|id| candidate.contains(id.as_str()) || id.contains(candidate)),
        }
    }

    /// Test a candidate id and record every requested id it satisfies
    pub fn check(&mut self, candidate: &str) -> bool {
        match self.mode {
            MatchMode::Exact => {
                if self.ids.contains(candidate) {
                    self.found.insert(candidate.to_string());
                    true
                } else {
                    false
                }
            }
            MatchMode::Contain => {
                let hits: Vec<String> = self
                    .ids
                    .iter()
                    .filter(|id| candidate.contains(id.as_str()) || id.contains(candidate))
                    .cloned()
                    .collect();
                let matched = !hits.is_empty();
                self.found.extend(hits);
                matched
            }
        }
    }

    /// Requested ids never satisfied by [`check`](Self::check)
    pub fn report(&self) -> LookupReport {
        let mut missing: Vec<String> = self
            .ids
            .iter()
            .filter(|id| !self.found.contains(id.as_str()))
            .cloned()
            .collect();
        missing.sort();
        LookupReport { missing }
    }
}

/// Requested identifiers that matched nothing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupReport {
    /// Missing ids in sorted order
    pub missing: Vec<String>,
}

impl LookupReport {
    /// Check if every id was found
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty()
    }

    /// Diagnostic text with one `"{id} not found"` line per miss
    pub fn message(&self) -> String {
        self.missing
            .iter()
            .map(|id| format!("{} not found\n", id))
            .collect()
    }

    /// Emit the diagnostic once through the logger
    pub fn log(&self) {
        if !self.is_empty() {
            log::warn!("{} requested ids not found:\n{}", self.missing.len(), self.message().trim_end());
        }
    }

    /// Merge the misses of another report
    pub fn merge(&mut self, other: LookupReport) {
        self.missing.extend(other.missing);
        self.missing.sort();
        self.missing.dedup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_reports_misses_once() {
        let mut filter = IdFilter::new(["geneB", "geneA", "geneZ"], MatchMode::Exact);

        assert!(filter.check("geneA"));
        assert!(!filter.check("geneA.1"));
        assert!(filter.check("geneB"));
        assert!(filter.check("geneA"));

        let report = filter.report();
        assert_eq!(report.missing, vec!["geneZ".to_string()]);
        assert_eq!(report.message(), "geneZ not found\n");
    }

    #[test]
    fn test_contain_match_is_symmetric() {
        let mut filter = IdFilter::new(["Potri.001G000100", "Potri.002"], MatchMode::Contain);

        assert!(filter.check("Potri.001G000100.1"));
        assert!(filter.check("Potri"));
        let report = filter.report();
        assert!(report.is_empty());
    }

    #[test]
    fn test_from_reader_ignores_blank_lines() {
        let filter = IdFilter::from_reader("  id1 \n\nid2\n".as_bytes(), MatchMode::Exact).unwrap();
        assert_eq!(filter.len(), 2);
        assert!(filter.matches("id1"));
        assert!(!filter.matches("id3"));
    }

    #[test]
    fn test_merge_reports() {
        let mut a = LookupReport { missing: vec!["b".to_string()] };
        a.merge(LookupReport { missing: vec!["a".to_string(), "b".to_string()] });
        assert_eq!(a.missing, vec!["a".to_string(), "b".to_string()]);
    }
}
