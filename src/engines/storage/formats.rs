//! Line-oriented record parsing shared by the tab-separated formats
//!
//! GFF, GTF and BED are all one-record-per-line, tab-separated formats with
//! `#` comments. A [`LineParser`] knows how to turn one line into one record;
//! [`RecordReader`] drives any parser over a byte source, skipping comments
//! and blank lines and stopping at the first error.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use crate::engines::core::io::{FastReader, Lines};
use crate::engines::{EngineError, EngineResult};

/// Parses single lines of a tab-separated format into records
pub trait LineParser {
    /// The record type produced for each data line
    type Record;

    /// Parse one data line. `line_no` is 1-based and used for error reports.
    fn parse_line(&self, line: &str, line_no: usize) -> EngineResult<Self::Record>;

    /// Lines that carry no record (blank lines and `#` comments by default)
    fn is_skippable(&self, line: &str) -> bool {
        line.trim().is_empty() || line.starts_with('#')
    }

    /// Lines that end the record section of the file
    fn is_terminator(&self, _line: &str) -> bool {
        false
    }

    /// Get the format name
    fn format_name(&self) -> &str;
}

/// Split a line on tabs, requiring at least `min_fields` columns
pub fn split_fields(line: &str, min_fields: usize, line_no: usize) -> EngineResult<Vec<&str>> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < min_fields {
        return Err(EngineError::MalformedRecord {
            line: line_no,
            expected: min_fields,
            found: fields.len(),
        });
    }
    Ok(fields)
}

/// Parse an integer coordinate column
pub fn parse_coordinate(field: &str, name: &str, line_no: usize) -> EngineResult<u64> {
    field.trim().parse::<u64>().map_err(|_| EngineError::InvalidCoordinate {
        line: line_no,
        msg: format!("{} '{}' is not a non-negative integer", name, field),
    })
}

/// Parse a column where `.` stands for a missing value
pub fn parse_optional<T: FromStr>(field: &str, name: &str, line_no: usize) -> EngineResult<Option<T>> {
    let field = field.trim();
    if field == "." || field.is_empty() {
        return Ok(None);
    }
    field.parse::<T>().map(Some).map_err(|_| EngineError::MalformedInput {
        line: line_no,
        msg: format!("invalid {} '{}'", name, field),
    })
}

/// Streaming reader yielding one record per data line
pub struct RecordReader<R: Read, P: LineParser> {
    lines: Lines<R>,
    parser: P,
    finished: bool,
    records: usize,
}

impl<P: LineParser> RecordReader<File, P> {
    /// Open a file with the given parser
    pub fn from_path<Q: AsRef<Path>>(path: Q, parser: P) -> EngineResult<Self> {
        let reader = FastReader::open(path, None)?;
        Ok(Self::from_fast_reader(reader, parser))
    }
}

impl<R: Read, P: LineParser> RecordReader<R, P> {
    /// Read records from an arbitrary byte source
    pub fn new(inner: R, parser: P) -> Self {
        Self::from_fast_reader(FastReader::new(inner), parser)
    }

    fn from_fast_reader(reader: FastReader<R>, parser: P) -> Self {
        Self {
            lines: reader.lines(),
            parser,
            finished: false,
            records: 0,
        }
    }

    /// Number of records yielded so far
    pub fn records_read(&self) -> usize {
        self.records
    }
}

impl<R: Read, P: LineParser> Iterator for RecordReader<R, P> {
    type Item = EngineResult<P::Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        for line in self.lines.by_ref() {
            let (line_no, line) = match line {
                Ok(numbered) => numbered,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e.into()));
                }
            };

            if self.parser.is_terminator(&line) {
                break;
            }
            if self.parser.is_skippable(&line) {
                continue;
            }

            let result = self.parser.parse_line(&line, line_no);
            match &result {
                Ok(_) => self.records += 1,
                Err(_) => self.finished = true,
            }
            return Some(result);
        }

        self.finished = true;
        log::debug!("Parsed {} {} records", self.records, self.parser.format_name());
        None
    }
}
