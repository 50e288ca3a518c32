//! FASTA format I/O
//!
//! [`FastaReader`] lazily yields one [`Sequence`] per `>` header, concatenating
//! all wrapped symbol lines. [`FastaWriter`] re-wraps symbols at a fixed width
//! (or writes one line per sequence). [`ReferenceGenome`] loads a whole
//! multi-FASTA reference indexed by chromosome name.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use indexmap::IndexMap;

use crate::engines::core::io::{FastReader, FastWriter, Lines, MappedFile};
use crate::engines::EngineError;
use crate::modules::lookup::IdFilter;
use crate::modules::seq::{Sequence, SequenceResult};

/// Streaming multi-FASTA parser
pub struct FastaReader<R: Read> {
    lines: Lines<R>,
    raw_header: bool,
    pending: Option<(String, Option<String>)>,
    symbols: Vec<u8>,
    finished: bool,
}

impl FastaReader<File> {
    /// Open a FASTA file
    pub fn from_path<P: AsRef<Path>>(path: P) -> SequenceResult<Self> {
        let reader = FastReader::open(path, None)?;
        Ok(Self::from_fast_reader(reader))
    }
}

impl<R: Read> FastaReader<R> {
    /// Parse FASTA from an arbitrary byte source
    pub fn new(inner: R) -> Self {
        Self::from_fast_reader(FastReader::new(inner))
    }

    fn from_fast_reader(reader: FastReader<R>) -> Self {
        Self {
            lines: reader.lines(),
            raw_header: false,
            pending: None,
            symbols: Vec::new(),
            finished: false,
        }
    }

    /// Keep the whole header: id up to the first space, the rest as description.
    ///
    /// By default only the text before the first whitespace is kept, as the id.
    pub fn with_raw_header(mut self, raw_header: bool) -> Self {
        self.raw_header = raw_header;
        self
    }

    fn parse_header(&self, header: &str) -> (String, Option<String>) {
        if self.raw_header {
            match header.split_once(' ') {
                Some((id, desc)) => (id.to_string(), Some(desc.to_string())),
                None => (header.to_string(), None),
            }
        } else {
            let id = header.split_whitespace().next().unwrap_or("");
            (id.to_string(), None)
        }
    }

    fn take_record(&mut self, next: Option<(String, Option<String>)>) -> Option<Sequence> {
        let (id, description) = std::mem::replace(&mut self.pending, next)?;
        let symbols = std::mem::take(&mut self.symbols);
        let record = Sequence::from_vec(id, symbols);
        Some(match description {
            Some(desc) => record.with_description(&desc),
            None => record,
        })
    }
}

impl<R: Read> Iterator for FastaReader<R> {
    type Item = SequenceResult<Sequence>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        while let Some(line) = self.lines.next() {
            let (line_no, line) = match line {
                Ok(numbered) => numbered,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e.into()));
                }
            };

            if let Some(header) = line.strip_prefix('>') {
                let parsed = self.parse_header(header.trim_end());
                if let Some(record) = self.take_record(Some(parsed)) {
                    return Some(Ok(record));
                }
                continue;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if self.pending.is_none() {
                self.finished = true;
                return Some(Err(EngineError::MalformedInput {
                    line: line_no,
                    msg: "sequence data before the first '>' header".to_string(),
                }
                .into()));
            }
            self.symbols.extend_from_slice(trimmed.as_bytes());
        }

        self.finished = true;
        self.take_record(None).map(Ok)
    }
}

/// FASTA format writer
#[derive(Debug, Clone)]
pub struct FastaWriter {
    /// Symbols per line; 0 writes each sequence on one line
    line_width: usize,
}

impl FastaWriter {
    /// Create a new FASTA writer with the default line width of 60
    pub fn new() -> Self {
        Self { line_width: 60 }
    }

    /// Create a new FASTA writer with the specified line width
    pub fn with_line_width(line_width: usize) -> Self {
        Self { line_width }
    }

    /// Write one record
    pub fn write_record<W: Write>(&self, out: &mut W, record: &Sequence) -> std::io::Result<()> {
        writeln!(out, ">{}", record.header())?;

        let symbols = record.as_bytes();
        if self.line_width == 0 {
            out.write_all(symbols)?;
            out.write_all(b"\n")?;
        } else {
            for chunk in symbols.chunks(self.line_width) {
                out.write_all(chunk)?;
                out.write_all(b"\n")?;
            }
        }
        Ok(())
    }

    /// Write all records
    pub fn write_all<W: Write>(&self, out: &mut W, records: &[Sequence]) -> std::io::Result<()> {
        for record in records {
            self.write_record(out, record)?;
        }
        Ok(())
    }

    /// Render records as a FASTA string
    pub fn to_string(&self, records: &[Sequence]) -> String {
        let mut buffer = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_all(&mut buffer, records);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl Default for FastaWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Read all sequences from a FASTA file
pub fn read_fasta<P: AsRef<Path>>(path: P) -> SequenceResult<Vec<Sequence>> {
    FastaReader::from_path(path)?.collect()
}

/// Read all sequences from a FASTA string
pub fn read_fasta_string(content: &str) -> SequenceResult<Vec<Sequence>> {
    FastaReader::new(content.as_bytes()).collect()
}

/// Write sequences to a FASTA file with 60 symbols per line
pub fn write_fasta<P: AsRef<Path>>(records: &[Sequence], path: P) -> SequenceResult<()> {
    let mut writer = FastWriter::create(path, None)?;
    FastaWriter::new().write_all(&mut writer, records)?;
    writer.flush()?;
    Ok(())
}

/// Re-wrap every record of a FASTA stream to a new line width.
///
/// Returns the number of records written.
pub fn convert_line_width<R: Read, W: Write>(input: R, out: &mut W, line_width: usize) -> SequenceResult<usize> {
    let writer = FastaWriter::with_line_width(line_width);
    let mut count = 0;
    for record in FastaReader::new(input).with_raw_header(true) {
        writer.write_record(out, &record?)?;
        count += 1;
    }
    Ok(count)
}

/// Select records whose id passes the filter.
///
/// Selected records get a `from={source_name}` provenance suffix on their id.
/// Misses accumulate in the filter's report.
pub fn select_by_id<R: Read>(
    reader: FastaReader<R>,
    filter: &mut IdFilter,
    source_name: &str,
) -> SequenceResult<Vec<Sequence>> {
    let mut selected = Vec::new();
    for record in reader {
        let mut record = record?;
        if filter.check(record.id()) {
            record.annotate_provenance(source_name);
            selected.push(record);
        }
    }
    Ok(selected)
}

/// Chromosome-indexed reference sequences
#[derive(Debug, Clone, Default)]
pub struct ReferenceGenome {
    chroms: IndexMap<String, Sequence>,
}

impl ReferenceGenome {
    /// Build from already parsed records; later duplicates replace earlier ones
    pub fn from_records<I: IntoIterator<Item = Sequence>>(records: I) -> Self {
        let mut chroms = IndexMap::new();
        for record in records {
            if let Some(old) = chroms.insert(record.id().to_string(), record) {
                log::warn!("Duplicate reference sequence {} replaced", old.id());
            }
        }
        Self { chroms }
    }

    /// Load a reference from any byte source
    pub fn from_reader<R: Read>(reader: R) -> SequenceResult<Self> {
        let records = FastaReader::new(reader).collect::<SequenceResult<Vec<_>>>()?;
        Ok(Self::from_records(records))
    }

    /// Load a reference file through a memory mapping
    pub fn from_path<P: AsRef<Path>>(path: P) -> SequenceResult<Self> {
        let mapped = MappedFile::open(path.as_ref())?;
        let genome = Self::from_reader(mapped.as_slice())?;
        log::info!(
            "Loaded {} reference sequences from {}",
            genome.len(),
            path.as_ref().display()
        );
        Ok(genome)
    }

    /// Look up a chromosome
    pub fn get(&self, chrom: &str) -> Option<&Sequence> {
        self.chroms.get(chrom)
    }

    /// Number of chromosomes
    pub fn len(&self) -> usize {
        self.chroms.len()
    }

    /// Check if the reference is empty
    pub fn is_empty(&self) -> bool {
        self.chroms.is_empty()
    }

    /// Chromosome names in file order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.chroms.keys().map(|k| k.as_str())
    }
}
