//! CircRNA alternative cyclization sites
//!
//! A circRNA named `Chr01:100|900` shares its 3' site class `Chr01:100|x` with
//! every circRNA starting at 100, and its 5' site class `Chr01:x|900` with
//! every circRNA ending at 900 (per strand). Sites shared by enough circRNAs
//! are alternative cyclization sites.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::Read;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::engines::compute::natsort::natural_cmp;
use crate::engines::{EngineError, EngineResult};
use crate::modules::io::bed::BedInterval;
use crate::modules::io::fasta::FastaReader;
use crate::modules::io::feature::Strand;
use crate::modules::seq::SequenceResult;

/// Label for circRNAs missing from the type map
pub const UNCLASSIFIED: &str = "unclassified";

/// Which end of the circRNA is shared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SiteEnd {
    /// Same start, varying end (`Chr:start|x`)
    ThreePrime,
    /// Same end, varying start (`Chr:x|end`)
    FivePrime,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SiteKey {
    chrom: String,
    position: u64,
    end: SiteEnd,
    strand: Strand,
}

/// One alternative cyclization site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativeSite {
    pub chrom: String,
    /// The shared coordinate
    pub position: u64,
    pub end: SiteEnd,
    pub strand: Strand,
    /// Number of circRNAs sharing the site
    pub count: usize,
    /// Distinct circRNA types in first-seen order, when types were supplied
    pub types: Option<Vec<String>>,
}

impl AlternativeSite {
    /// Site name such as `Chr01:100|x`
    pub fn name(&self) -> String {
        match self.end {
            SiteEnd::ThreePrime => format!("{}:{}|x", self.chrom, self.position),
            SiteEnd::FivePrime => format!("{}:x|{}", self.chrom, self.position),
        }
    }

    /// `name\tstrand\tcount[\ttypes]`, types joined by commas
    pub fn to_line(&self) -> String {
        let mut line = format!("{}\t{}\t{}", self.name(), self.strand, self.count);
        if let Some(types) = &self.types {
            line.push('\t');
            line.push_str(&types.join(","));
        }
        line
    }
}

/// Split a circRNA id `Chr:start|end`
pub fn parse_circ_id(id: &str) -> EngineResult<(&str, u64, u64)> {
    let invalid = || EngineError::InvalidInput(format!("circRNA id '{}' is not in Chr:start|end form", id));
    let (chrom, range) = id.rsplit_once(':').ok_or_else(invalid)?;
    let (start, end) = range.split_once('|').ok_or_else(invalid)?;
    let start = start.trim().parse::<u64>().map_err(|_| invalid())?;
    let end = end.trim().parse::<u64>().map_err(|_| invalid())?;
    Ok((chrom, start, end))
}

/// Read circRNA types from FASTA headers of the form `>circ_id type=exonic`
pub fn circ_types_from_fasta<R: Read>(reader: R) -> SequenceResult<HashMap<String, String>> {
    let mut types = HashMap::new();
    for record in FastaReader::new(reader).with_raw_header(true) {
        let record = record?;
        let label = record.description().and_then(|desc| {
            desc.split_whitespace()
                .find_map(|token| token.strip_prefix("type="))
                .or_else(|| desc.split_whitespace().next())
        });
        if let Some(label) = label {
            types.insert(record.id().to_string(), label.to_string());
        }
    }
    Ok(types)
}

/// Count alternative 3' and 5' sites and keep those shared by at least `min_count` circRNAs.
///
/// Output is in natural chromosome order, then by position.
pub fn alternative_sites<I>(
    circs: I,
    types: Option<&HashMap<String, String>>,
    min_count: usize,
) -> EngineResult<Vec<AlternativeSite>>
where
    I: IntoIterator<Item = EngineResult<BedInterval>>,
{
    let mut counts: IndexMap<SiteKey, (usize, Vec<String>)> = IndexMap::new();

    for circ in circs {
        let circ = circ?;
        let (chrom, start, end) = parse_circ_id(&circ.name)?;
        let label = types.map(|t| t.get(&circ.name).map(String::as_str).unwrap_or(UNCLASSIFIED));

        for (position, site_end) in [(start, SiteEnd::ThreePrime), (end, SiteEnd::FivePrime)] {
            let key = SiteKey {
                chrom: chrom.to_string(),
                position,
                end: site_end,
                strand: circ.strand,
            };
            let entry = counts.entry(key).or_insert_with(|| (0, Vec::new()));
            entry.0 += 1;
            if let Some(label) = label {
                if !entry.1.iter().any(|l| l == label) {
                    entry.1.push(label.to_string());
                }
            }
        }
    }

    let mut sites: Vec<AlternativeSite> = counts
        .into_iter()
        .filter(|(_, (count, _))| *count >= min_count)
        .map(|(key, (count, labels))| AlternativeSite {
            chrom: key.chrom,
            position: key.position,
            end: key.end,
            strand: key.strand,
            count,
            types: types.map(|_| labels),
        })
        .collect();

    sites.sort_by(site_cmp);
    log::debug!("{} alternative cyclization sites with at least {} circRNAs", sites.len(), min_count);
    Ok(sites)
}

fn site_cmp(a: &AlternativeSite, b: &AlternativeSite) -> Ordering {
    natural_cmp(&a.chrom, &b.chrom)
        .then(a.position.cmp(&b.position))
        .then_with(|| a.name().cmp(&b.name()))
        .then_with(|| a.strand.symbol().cmp(&b.strand.symbol()))
}
