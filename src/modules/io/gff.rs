//! GFF3 attribute grammar (`key=value;key=value`)

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::engines::storage::formats::RecordReader;
use crate::engines::{EngineError, EngineResult};
use crate::modules::io::feature::{insert_attribute, AttributeDecoder, Attributes, FeatureParser};

/// Decoder for `key=value` attributes with percent-escaped values
#[derive(Debug, Clone, Copy, Default)]
pub struct GffDecoder;

// Keys whose commas separate values rather than belong to one
const MULTI_VALUE_KEYS: &[&str] = &["Parent", "Alias", "Note", "Dbxref", "Ontology_term"];

/// Streaming GFF reader
pub type GffReader<R> = RecordReader<R, FeatureParser<GffDecoder>>;

impl AttributeDecoder for GffDecoder {
    fn decode(&self, column: &str, line_no: usize) -> EngineResult<Attributes> {
        let mut attributes = Attributes::new();
        let column = column.trim();
        if column == "." || column.is_empty() {
            return Ok(attributes);
        }

        for pair in column.split(';') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').ok_or_else(|| EngineError::MalformedInput {
                line: line_no,
                msg: format!("GFF attribute '{}' has no '='", pair),
            })?;
            insert_attribute(&mut attributes, key.trim(), &percent_decode(value.trim()));
        }
        Ok(attributes)
    }

    fn encode(&self, attributes: &Attributes) -> String {
        attributes
            .iter()
            .map(|(k, v)| format!("{}={}", k, percent_encode(v, MULTI_VALUE_KEYS.contains(&k.as_str()))))
            .collect::<Vec<_>>()
            .join(";")
    }

    fn format_name(&self) -> &str {
        "GFF"
    }
}

/// Decode `%XX` escapes; malformed escapes are kept literally
fn percent_decode(value: &str) -> String {
    if !value.contains('%') {
        return value.to_string();
    }

    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Escape the characters GFF3 reserves in attribute values
fn percent_encode(value: &str, keep_commas: bool) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        let reserved = matches!(c, ';' | '=' | '&' | '%' | '\t') || c.is_control() || (c == ',' && !keep_commas);
        if reserved {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{:02X}", byte));
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Read GFF records from any byte source
pub fn read_gff<R: Read>(reader: R) -> GffReader<R> {
    RecordReader::new(reader, FeatureParser::new(GffDecoder))
}

/// Open a GFF file
pub fn read_gff_path<P: AsRef<Path>>(path: P) -> EngineResult<GffReader<File>> {
    RecordReader::from_path(path, FeatureParser::new(GffDecoder))
}
