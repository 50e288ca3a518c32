//! Nine-column annotation records
//!
//! GFF and GTF share the same first eight columns and differ only in the
//! grammar of column 9. Each grammar is an [`AttributeDecoder`]; a
//! [`FeatureParser`] combines one decoder with the shared column handling, so
//! everything downstream of parsing sees the same [`FeatureRecord`] shape.
//!
//! Coordinates are 1-based and closed, exactly as written in the file.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::engines::storage::formats::{parse_coordinate, parse_optional, split_fields, LineParser};
use crate::engines::{EngineError, EngineResult};

/// Ordered attribute map of column 9
pub type Attributes = IndexMap<String, String>;

/// Strand of a genomic feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Strand {
    Forward,
    Reverse,
    #[default]
    Unknown,
}

impl Strand {
    /// Column symbol (`+`, `-` or `.`)
    pub fn symbol(&self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
            Strand::Unknown => '.',
        }
    }

    /// Whether sequences on this strand must be reverse-complemented
    pub fn is_reverse(&self) -> bool {
        matches!(self, Strand::Reverse)
    }
}

impl FromStr for Strand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "+" => Ok(Strand::Forward),
            "-" => Ok(Strand::Reverse),
            "." | "?" => Ok(Strand::Unknown),
            other => Err(format!("invalid strand '{}'", other)),
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// One annotation line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub chrom: String,
    pub source: String,
    pub feature_type: String,
    /// 1-based, inclusive
    pub start: u64,
    /// 1-based, inclusive; never smaller than `start`
    pub end: u64,
    pub score: Option<f64>,
    pub strand: Strand,
    pub phase: Option<u8>,
    pub attributes: Attributes,
}

impl FeatureRecord {
    /// Get an attribute value
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(|s| s.as_str())
    }

    /// GFF `ID` attribute
    pub fn id(&self) -> Option<&str> {
        self.attribute("ID")
    }

    /// GFF `Parent` ids; a comma-separated list means several parents
    pub fn parents(&self) -> Vec<&str> {
        self.attribute("Parent")
            .map(|p| p.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }

    /// GTF `gene_id` attribute
    pub fn gene_id(&self) -> Option<&str> {
        self.attribute("gene_id")
    }

    /// GTF `transcript_id` attribute
    pub fn transcript_id(&self) -> Option<&str> {
        self.attribute("transcript_id")
    }

    /// Feature length in bases
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Convert to 0-based half-open coordinates `[start - 1, end)`
    pub fn zero_based(&self) -> (u64, u64) {
        (self.start - 1, self.end)
    }

    /// Render the record as a tab-separated line using the given attribute grammar
    pub fn to_line<D: AttributeDecoder>(&self, decoder: &D) -> String {
        let score = self.score.map(|s| s.to_string()).unwrap_or_else(|| ".".to_string());
        let phase = self.phase.map(|p| p.to_string()).unwrap_or_else(|| ".".to_string());
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.chrom,
            self.source,
            self.feature_type,
            self.start,
            self.end,
            score,
            self.strand,
            phase,
            decoder.encode(&self.attributes)
        )
    }
}

/// Column-9 grammar of an annotation format
pub trait AttributeDecoder {
    /// Decode the attribute column into an ordered map
    fn decode(&self, column: &str, line_no: usize) -> EngineResult<Attributes>;

    /// Encode an attribute map back into column-9 text
    fn encode(&self, attributes: &Attributes) -> String;

    /// Get the format name
    fn format_name(&self) -> &str;
}

/// Store a key, joining repeated keys with commas
pub(crate) fn insert_attribute(attributes: &mut Attributes, key: &str, value: &str) {
    match attributes.get_mut(key) {
        Some(existing) => {
            existing.push(',');
            existing.push_str(value);
        }
        None => {
            attributes.insert(key.to_string(), value.to_string());
        }
    }
}

/// Nine-column line parser parameterized by attribute grammar
#[derive(Debug, Clone, Default)]
pub struct FeatureParser<D: AttributeDecoder> {
    decoder: D,
}

impl<D: AttributeDecoder> FeatureParser<D> {
    /// Create a parser for one attribute grammar
    pub fn new(decoder: D) -> Self {
        Self { decoder }
    }

    /// The attribute grammar in use
    pub fn decoder(&self) -> &D {
        &self.decoder
    }
}

impl<D: AttributeDecoder> LineParser for FeatureParser<D> {
    type Record = FeatureRecord;

    fn parse_line(&self, line: &str, line_no: usize) -> EngineResult<FeatureRecord> {
        let fields = split_fields(line, 9, line_no)?;

        let start = parse_coordinate(fields[3], "start", line_no)?;
        let end = parse_coordinate(fields[4], "end", line_no)?;
        if start == 0 {
            return Err(EngineError::InvalidCoordinate {
                line: line_no,
                msg: "start must be at least 1 in 1-based coordinates".to_string(),
            });
        }
        if start > end {
            return Err(EngineError::InvalidCoordinate {
                line: line_no,
                msg: format!("start {} is greater than end {}", start, end),
            });
        }

        let strand = fields[6]
            .parse::<Strand>()
            .map_err(|msg| EngineError::MalformedInput { line: line_no, msg })?;
        let phase: Option<u8> = parse_optional(fields[7], "phase", line_no)?;
        if let Some(p) = phase {
            if p > 2 {
                return Err(EngineError::MalformedInput {
                    line: line_no,
                    msg: format!("phase {} is not 0, 1 or 2", p),
                });
            }
        }

        Ok(FeatureRecord {
            chrom: fields[0].to_string(),
            source: fields[1].to_string(),
            feature_type: fields[2].to_string(),
            start,
            end,
            score: parse_optional(fields[5], "score", line_no)?,
            strand,
            phase,
            attributes: self.decoder.decode(fields[8], line_no)?,
        })
    }

    fn is_terminator(&self, line: &str) -> bool {
        // GFF3 may append the reference sequences after a ##FASTA directive.
        line.starts_with("##FASTA")
    }

    fn format_name(&self) -> &str {
        self.decoder.format_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::io::gff::GffDecoder;

    fn parser() -> FeatureParser<GffDecoder> {
        FeatureParser::new(GffDecoder)
    }

    #[test]
    fn test_parse_columns() {
        let line = "Chr01\tphytozome\tCDS\t100\t200\t0.5\t-\t2\tID=cds1;Parent=mRNA1";
        let record = parser().parse_line(line, 1).unwrap();

        assert_eq!(record.chrom, "Chr01");
        assert_eq!(record.source, "phytozome");
        assert_eq!(record.feature_type, "CDS");
        assert_eq!((record.start, record.end), (100, 200));
        assert_eq!(record.score, Some(0.5));
        assert_eq!(record.strand, Strand::Reverse);
        assert_eq!(record.phase, Some(2));
        assert_eq!(record.length(), 101);
        assert_eq!(record.zero_based(), (99, 200));
    }

    #[test]
    fn test_too_few_columns() {
        let err = parser().parse_line("Chr01\tsrc\tgene\t1\t10", 12).unwrap_err();
        assert!(matches!(err, EngineError::MalformedRecord { line: 12, expected: 9, found: 5 }));
    }

    #[test]
    fn test_invalid_coordinates() {
        let err = parser().parse_line("Chr01\t.\tgene\tabc\t10\t.\t+\t.\tID=g", 3).unwrap_err();
        assert!(matches!(err, EngineError::InvalidCoordinate { line: 3, .. }));

        let err = parser().parse_line("Chr01\t.\tgene\t20\t10\t.\t+\t.\tID=g", 4).unwrap_err();
        assert!(matches!(err, EngineError::InvalidCoordinate { line: 4, .. }));
    }

    #[test]
    fn test_invalid_strand_and_phase() {
        assert!(parser().parse_line("c\t.\tgene\t1\t10\t.\t*\t.\tID=g", 1).is_err());
        assert!(parser().parse_line("c\t.\tCDS\t1\t10\t.\t+\t3\tID=g", 1).is_err());
    }

    #[test]
    fn test_to_line_round_trip() {
        let line = "Chr01\tsrc\tmRNA\t5\t50\t.\t+\t.\tID=m1;Parent=g1";
        let record = parser().parse_line(line, 1).unwrap();
        assert_eq!(record.to_line(&GffDecoder), line);
    }
}
