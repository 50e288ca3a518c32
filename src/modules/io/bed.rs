//! BED intervals and flank-window arithmetic
//!
//! BED coordinates are 0-based and half-open. Annotation records are 1-based
//! and closed; [`FeatureRecord::zero_based`](crate::modules::io::feature::FeatureRecord::zero_based)
//! is the only conversion point into this module.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engines::storage::formats::{parse_coordinate, split_fields, LineParser, RecordReader};
use crate::engines::{EngineError, EngineResult};
use crate::modules::io::feature::Strand;

/// Minimum number of columns needed for stranded extraction
pub const BED_MIN_FIELDS: usize = 6;

/// A 0-based half-open interval with name and strand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedInterval {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub name: String,
    /// Score or frame column, kept verbatim
    pub score: String,
    pub strand: Strand,
}

impl BedInterval {
    /// Create an interval; `end` must be greater than `start`
    pub fn new(chrom: &str, start: u64, end: u64, name: &str, strand: Strand) -> EngineResult<Self> {
        if end <= start {
            return Err(EngineError::InvalidInput(format!(
                "BED interval {}:{}-{} is empty",
                chrom, start, end
            )));
        }
        Ok(Self {
            chrom: chrom.to_string(),
            start,
            end,
            name: name.to_string(),
            score: ".".to_string(),
            strand,
        })
    }

    /// Interval length
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Always false: `end > start` holds for every interval
    pub fn is_empty(&self) -> bool {
        false
    }

    /// `chrom:start-end(strand)` with 1-based inclusive display coordinates
    pub fn display_id(&self) -> String {
        display_id(&self.chrom, self.start, self.end, self.strand)
    }

    /// BED6 line
    pub fn to_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.chrom, self.start, self.end, self.name, self.score, self.strand
        )
    }
}

/// Format a 0-based half-open window as `chrom:start+1-end(strand)`
pub fn display_id(chrom: &str, start: u64, end: u64, strand: Strand) -> String {
    format!("{}:{}-{}({})", chrom, start + 1, end, strand)
}

/// BED line parser requiring at least six columns
#[derive(Debug, Clone, Copy, Default)]
pub struct BedParser;

impl LineParser for BedParser {
    type Record = BedInterval;

    fn parse_line(&self, line: &str, line_no: usize) -> EngineResult<BedInterval> {
        let fields = split_fields(line, BED_MIN_FIELDS, line_no)?;
        let start = parse_coordinate(fields[1], "start", line_no)?;
        let end = parse_coordinate(fields[2], "end", line_no)?;
        if end <= start {
            return Err(EngineError::InvalidCoordinate {
                line: line_no,
                msg: format!("end {} must be greater than start {}", end, start),
            });
        }
        let strand = fields[5]
            .parse::<Strand>()
            .map_err(|msg| EngineError::MalformedInput { line: line_no, msg })?;

        Ok(BedInterval {
            chrom: fields[0].to_string(),
            start,
            end,
            name: fields[3].to_string(),
            score: fields[4].to_string(),
            strand,
        })
    }

    fn is_skippable(&self, line: &str) -> bool {
        line.trim().is_empty() || line.starts_with('#') || line.starts_with("track") || line.starts_with("browser")
    }

    fn format_name(&self) -> &str {
        "BED"
    }
}

/// Streaming BED reader
pub type BedReader<R> = RecordReader<R, BedParser>;

/// Read BED intervals from any byte source
pub fn read_bed<R: Read>(reader: R) -> BedReader<R> {
    RecordReader::new(reader, BedParser)
}

/// Open a BED file
pub fn read_bed_path<P: AsRef<Path>>(path: P) -> EngineResult<BedReader<File>> {
    RecordReader::from_path(path, BedParser)
}

/// Flank lengths around an interval
///
/// Upstream and downstream follow the interval's strand: on `-` the upstream
/// flank lies after `end` in genomic coordinates. A non-zero `both` overrides
/// `upstream` and `downstream`. With `extension` the flanks extend the
/// interval; without it only the flanks themselves are returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlankSpec {
    pub upstream: u64,
    pub downstream: u64,
    pub both: u64,
    pub extension: bool,
}

impl Default for FlankSpec {
    fn default() -> Self {
        Self {
            upstream: 0,
            downstream: 0,
            both: 0,
            extension: true,
        }
    }
}

impl FlankSpec {
    /// No flanks: the interval itself
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_upstream(mut self, length: u64) -> Self {
        self.upstream = length;
        self
    }

    pub fn with_downstream(mut self, length: u64) -> Self {
        self.downstream = length;
        self
    }

    pub fn with_both(mut self, length: u64) -> Self {
        self.both = length;
        self
    }

    pub fn with_extension(mut self, extension: bool) -> Self {
        self.extension = extension;
        self
    }

    /// Effective (upstream, downstream) lengths after `both` precedence
    pub fn lengths(&self) -> (u64, u64) {
        if self.both > 0 {
            (self.both, self.both)
        } else {
            (self.upstream, self.downstream)
        }
    }

    /// Unclamped windows: a single window with extension (or without flanks),
    /// otherwise one per non-zero flank, upstream flank first.
    pub fn windows(&self, interval: &BedInterval) -> Vec<(i64, i64)> {
        let (up, down) = self.lengths();
        let (left, right) = if interval.strand.is_reverse() { (down, up) } else { (up, down) };
        let (start, end) = (interval.start as i64, interval.end as i64);
        let (left, right) = (left as i64, right as i64);

        if left == 0 && right == 0 {
            return vec![(start, end)];
        }
        if self.extension {
            return vec![(start - left, end + right)];
        }

        let left_flank = (left > 0).then_some((start - left, start));
        let right_flank = (right > 0).then_some((end, end + right));
        let ordered = if interval.strand.is_reverse() {
            [right_flank, left_flank]
        } else {
            [left_flank, right_flank]
        };
        ordered.into_iter().flatten().collect()
    }
}

/// Clamp a window to `[0, chrom_len)`; a window with no overlap is an error
pub fn clamp_window(chrom: &str, start: i64, end: i64, chrom_len: u64) -> EngineResult<(u64, u64)> {
    let len = chrom_len as i64;
    if end <= 0 || start >= len || end <= start {
        return Err(EngineError::OutOfRange(format!(
            "window {}:{}-{} lies outside the chromosome (length {})",
            chrom, start, end, chrom_len
        )));
    }
    Ok((start.max(0) as u64, end.min(len) as u64))
}
