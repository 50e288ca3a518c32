//! GTF attribute grammar (`key "value";`) and GTF to BED conversion

use std::fs::File;
use std::io::Read;
use std::path::Path;

use indexmap::IndexMap;

use crate::engines::storage::formats::RecordReader;
use crate::engines::{EngineError, EngineResult};
use crate::modules::io::bed::BedInterval;
use crate::modules::io::feature::{insert_attribute, AttributeDecoder, Attributes, FeatureParser, FeatureRecord};

/// Decoder for quoted `key "value";` attributes
#[derive(Debug, Clone, Copy, Default)]
pub struct GtfDecoder;

/// Streaming GTF reader
pub type GtfReader<R> = RecordReader<R, FeatureParser<GtfDecoder>>;

impl AttributeDecoder for GtfDecoder {
    fn decode(&self, column: &str, line_no: usize) -> EngineResult<Attributes> {
        let mut attributes = Attributes::new();
        let column = column.trim();
        if column == "." || column.is_empty() {
            return Ok(attributes);
        }

        for part in split_unquoted(column) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (key, value) = part.split_once(char::is_whitespace).ok_or_else(|| {
                EngineError::MalformedInput {
                    line: line_no,
                    msg: format!("GTF attribute '{}' has no value", part),
                }
            })?;
            let value = value.trim();
            // Unquoted values occur in the wild (e.g. `level 2`)
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            insert_attribute(&mut attributes, key, value);
        }
        Ok(attributes)
    }

    fn encode(&self, attributes: &Attributes) -> String {
        attributes
            .iter()
            .map(|(k, v)| format!("{} \"{}\";", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn format_name(&self) -> &str {
        "GTF"
    }
}

/// Split on `;` outside double quotes
fn split_unquoted(column: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in column.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                parts.push(&column[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&column[start..]);
    parts
}

/// Read GTF records from any byte source
pub fn read_gtf<R: Read>(reader: R) -> GtfReader<R> {
    RecordReader::new(reader, FeatureParser::new(GtfDecoder))
}

/// Open a GTF file
pub fn read_gtf_path<P: AsRef<Path>>(path: P) -> EngineResult<GtfReader<File>> {
    RecordReader::from_path(path, FeatureParser::new(GtfDecoder))
}

/// One BED6 interval per transcript, spanning every record carrying its
/// `transcript_id`, in first-seen order.
///
/// GTF start is 1-based closed, so the BED start is `start - 1`; the end is
/// unchanged. Records without a `transcript_id` (gene lines) are ignored.
pub fn gtf_to_bed<I>(records: I) -> EngineResult<Vec<BedInterval>>
where
    I: IntoIterator<Item = EngineResult<FeatureRecord>>,
{
    let mut spans: IndexMap<String, BedInterval> = IndexMap::new();

    for record in records {
        let record = record?;
        let Some(transcript_id) = record.transcript_id() else {
            continue;
        };
        let (start, end) = record.zero_based();

        match spans.get_mut(transcript_id) {
            Some(span) => {
                if span.chrom != record.chrom {
                    return Err(EngineError::InvalidInput(format!(
                        "transcript {} spans chromosomes {} and {}",
                        transcript_id, span.chrom, record.chrom
                    )));
                }
                span.start = span.start.min(start);
                span.end = span.end.max(end);
            }
            None => {
                let span = BedInterval::new(&record.chrom, start, end, transcript_id, record.strand)?;
                spans.insert(transcript_id.to_string(), span);
            }
        }
    }

    log::debug!("Converted {} GTF transcripts to BED", spans.len());
    Ok(spans.into_values().collect())
}
