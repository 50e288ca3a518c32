//! Genotype tables, per-site MissRate / HetRate / MAF statistics and
//! per-sample genotype consistency between tables
//!
//! A GT table is tab-separated with a header row. The first four columns are
//! site id, chromosome, position and reference allele; every further column is
//! one sample. Empty cells and `NA` are missing calls.

use std::collections::HashMap;
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::engines::compute::natsort::natural_cmp;
use crate::engines::core::io::FastReader;
use crate::engines::core::parallel::{calculate_chunk_size, chunk_rows, TaskManager};
use crate::engines::storage::formats::{parse_coordinate, split_fields};
use crate::engines::{EngineError, EngineResult};

const MISSING: &[&str] = &["", "NA", "NaN", "nan", "N/A"];

// Unordered two-base calls counted as heterozygous
const HETEROZYGOUS: &[&str] = &["AT", "TA", "AG", "GA", "AC", "CA", "GC", "CG", "GT", "TG", "CT", "TC"];

const ALLELE_SYMBOLS: &[u8] = b"AGCTDI";

/// Column header of the statistics table
pub const MHM_HEADER: &str = "MissRate(%)\tHetRate(%)\tMAF";

/// Column header of [`GenotypeTable::compare`] rows
pub const CONSISTENCY_HEADER: &str = "DatabaseSample\tTestSample\tIdenticalCount\tNaCount\tTotalCount\tGS(%)";

/// Column header of [`GenotypeTable::self_compare`] rows
pub const SAMPLE_CONSISTENCY_HEADER: &str = "SampleName\tIdenticalCount\tNaCount\tTotalCount\tGS(%)";

/// One site (row) of a GT table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenotypeSite {
    pub id: String,
    pub chrom: String,
    pub pos: u64,
    pub reference: String,
    /// One call per sample; `None` when missing
    pub calls: Vec<Option<String>>,
}

/// A parsed GT table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenotypeTable {
    /// Names of the four leading columns
    pub site_columns: Vec<String>,
    pub samples: Vec<String>,
    pub sites: Vec<GenotypeSite>,
}

impl GenotypeTable {
    /// Parse a tab-separated GT table with a header row
    pub fn from_reader<R: Read>(reader: R) -> EngineResult<Self> {
        let mut table = GenotypeTable::default();
        let mut header_seen = false;

        for line in FastReader::new(reader).lines() {
            let (line_no, line) = line?;
            if line.trim().is_empty() {
                continue;
            }

            if !header_seen {
                let fields = split_fields(&line, 4, line_no)?;
                table.site_columns = fields[..4].iter().map(|s| s.to_string()).collect();
                table.samples = fields[4..].iter().map(|s| s.to_string()).collect();
                header_seen = true;
                continue;
            }

            let fields = split_fields(&line, 4, line_no)?;
            if fields.len() > 4 + table.samples.len() {
                return Err(EngineError::MalformedInput {
                    line: line_no,
                    msg: format!(
                        "{} genotype columns for {} samples",
                        fields.len() - 4,
                        table.samples.len()
                    ),
                });
            }

            // Trailing empty cells may have been trimmed by the producer.
            let mut calls: Vec<Option<String>> = fields[4..].iter().map(|call| parse_call(call)).collect();
            calls.resize(table.samples.len(), None);

            table.sites.push(GenotypeSite {
                id: fields[0].to_string(),
                chrom: fields[1].to_string(),
                pos: parse_coordinate(fields[2], "position", line_no)?,
                reference: fields[3].to_string(),
                calls,
            });
        }

        log::debug!(
            "Parsed GT table with {} sites and {} samples",
            table.sites.len(),
            table.samples.len()
        );
        Ok(table)
    }

    /// Number of samples
    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    /// Order sites by natural chromosome order, then position
    pub fn sort_sites(&mut self) {
        self.sites
            .sort_by(|a, b| natural_cmp(&a.chrom, &b.chrom).then(a.pos.cmp(&b.pos)));
    }

    /// Normalize every call with [`sort_allele`]
    pub fn sort_alleles(&mut self) {
        for site in &mut self.sites {
            for call in site.calls.iter_mut().flatten() {
                *call = sort_allele(call);
            }
        }
    }
}

impl GenotypeTable {
    /// Genotype consistency of every sample of `self` against every sample
    /// of `test`, over the sites both tables share (matched by site id).
    ///
    /// Rows are ordered by test sample (natural order), then by descending
    /// GS. Calls are compared as stored; run [`GenotypeTable::sort_alleles`]
    /// on both tables first to ignore allele order.
    pub fn compare(&self, test: &GenotypeTable) -> Vec<Consistency> {
        let test_rows: HashMap<&str, &GenotypeSite> = test.sites.iter().map(|s| (s.id.as_str(), s)).collect();
        let shared: Vec<(&GenotypeSite, &GenotypeSite)> = self
            .sites
            .iter()
            .filter_map(|site| test_rows.get(site.id.as_str()).map(|other| (site, *other)))
            .collect();
        log::debug!("{} sites shared by both GT tables", shared.len());

        let mut rows = Vec::with_capacity(self.samples.len() * test.samples.len());
        for (i, database_sample) in self.samples.iter().enumerate() {
            for (j, test_sample) in test.samples.iter().enumerate() {
                let counts = CallCounts::tally(shared.iter().map(|(a, b)| (&a.calls[i], &b.calls[j])));
                rows.push(Consistency {
                    database_sample: database_sample.clone(),
                    test_sample: test_sample.clone(),
                    counts,
                });
            }
        }

        rows.sort_by(|a, b| {
            natural_cmp(&a.test_sample, &b.test_sample)
                .then(b.counts.gs().total_cmp(&a.counts.gs()))
                .then_with(|| natural_cmp(&a.database_sample, &b.database_sample))
        });
        rows
    }

    /// Per-sample consistency between two batches of the same samples.
    ///
    /// Both tables must list the same site ids in the same order, and every
    /// sample of `self` must be present in `other`.
    pub fn self_compare(&self, other: &GenotypeTable) -> EngineResult<Vec<SampleConsistency>> {
        let same_sites = self.sites.len() == other.sites.len()
            && self.sites.iter().zip(&other.sites).all(|(a, b)| a.id == b.id);
        if !same_sites {
            return Err(EngineError::InvalidInput(
                "the two GT tables to be compared have different sites".to_string(),
            ));
        }

        let mut rows = Vec::with_capacity(self.samples.len());
        for (i, sample) in self.samples.iter().enumerate() {
            let j = other.samples.iter().position(|s| s == sample).ok_or_else(|| {
                EngineError::InvalidInput(format!("sample {} is missing from the second GT table", sample))
            })?;
            let pairs = self.sites.iter().zip(&other.sites).map(|(a, b)| (&a.calls[i], &b.calls[j]));
            let counts = CallCounts::tally(pairs);
            rows.push(SampleConsistency {
                sample: sample.clone(),
                counts,
            });
        }

        rows.sort_by(|a, b| natural_cmp(&a.sample, &b.sample));
        Ok(rows)
    }
}

/// Call agreement between two genotype columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallCounts {
    /// Sites where both calls are present and equal
    pub identical: usize,
    /// Sites where either call is missing
    pub missing: usize,
    /// Sites where both calls are present
    pub total: usize,
}

impl CallCounts {
    fn tally<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a Option<String>, &'a Option<String>)>,
    {
        let mut counts = CallCounts::default();
        for pair in pairs {
            match pair {
                (Some(a), Some(b)) => {
                    counts.total += 1;
                    if a == b {
                        counts.identical += 1;
                    }
                }
                _ => counts.missing += 1,
            }
        }
        counts
    }

    /// Genotype similarity in percent; 0 when no site has both calls
    pub fn gs(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.identical as f64 / self.total as f64 * 100.0
        }
    }

    fn columns(&self) -> String {
        format!("{}\t{}\t{}\t{:.2}", self.identical, self.missing, self.total, self.gs())
    }
}

/// One database sample against one test sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consistency {
    pub database_sample: String,
    pub test_sample: String,
    pub counts: CallCounts,
}

impl Consistency {
    pub fn to_line(&self) -> String {
        format!("{}\t{}\t{}", self.database_sample, self.test_sample, self.counts.columns())
    }
}

/// One sample across two batches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleConsistency {
    pub sample: String,
    pub counts: CallCounts,
}

impl SampleConsistency {
    pub fn to_line(&self) -> String {
        format!("{}\t{}", self.sample, self.counts.columns())
    }
}

/// Count GS values in the ten bins `(0, 10]` .. `(90, 100]`; 0 falls in the first
pub fn consistency_bins<I: IntoIterator<Item = f64>>(values: I) -> [usize; 10] {
    let mut bins = [0usize; 10];
    for gs in values {
        let index = (gs / 10.0).ceil() as usize;
        bins[index.saturating_sub(1).min(9)] += 1;
    }
    bins
}

/// Render bin counts as `(lo, hi]\tcount` lines
pub fn format_bins(bins: &[usize; 10]) -> String {
    bins.iter()
        .enumerate()
        .map(|(i, count)| format!("({}, {}]\t{}\n", i * 10, (i + 1) * 10, count))
        .collect()
}

fn parse_call(call: &str) -> Option<String> {
    let call = call.trim();
    (!MISSING.contains(&call)).then(|| call.to_string())
}

/// Put the alleles of a call in a canonical order.
///
/// `G/A` becomes `A/G` and `TC` becomes `CT`; insertion and deletion calls
/// without a separator are left untouched.
pub fn sort_allele(call: &str) -> String {
    if call.contains('/') {
        let mut alleles: Vec<&str> = call.split('/').collect();
        alleles.sort_unstable();
        alleles.join("/")
    } else if call.contains("ins") || call.contains("del") {
        call.to_string()
    } else {
        let mut bases: Vec<char> = call.chars().collect();
        bases.sort_unstable();
        bases.into_iter().collect()
    }
}

fn is_homozygous(call: &str) -> bool {
    !HETEROZYGOUS.contains(&call) && !call.contains('/')
}

fn allele_symbol(allele: &str) -> Option<u8> {
    if allele.contains("ins") {
        Some(b'I')
    } else if allele.contains("del") {
        Some(b'D')
    } else {
        allele.bytes().next()
    }
}

/// Append the allele symbols of one call
fn push_alleles(call: &str, out: &mut Vec<u8>) {
    if let Some((left, right)) = call.split_once('/') {
        out.extend(allele_symbol(left));
        out.extend(allele_symbol(right));
    } else if call.contains("ins") {
        out.extend_from_slice(b"II");
    } else if call.contains("del") {
        out.extend_from_slice(b"DD");
    } else {
        out.extend_from_slice(call.as_bytes());
    }
}

/// Statistics of one site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteStats {
    pub id: String,
    pub chrom: String,
    pub pos: u64,
    pub reference: String,
    /// Percentage of samples without a call
    pub miss_rate: f64,
    /// Percentage of called samples that are heterozygous
    pub het_rate: f64,
    /// Second highest frequency among A, G, C, T, deletion and insertion alleles
    pub maf: f64,
}

impl SiteStats {
    /// Compute the statistics of one site
    pub fn from_site(site: &GenotypeSite) -> Self {
        let total = site.calls.len();
        let called: Vec<&str> = site.calls.iter().flatten().map(|c| c.as_str()).collect();

        let miss_rate = if total == 0 {
            0.0
        } else {
            (total - called.len()) as f64 / total as f64 * 100.0
        };

        let het_rate = if called.is_empty() {
            0.0
        } else {
            let hom = called.iter().filter(|c| is_homozygous(c)).count();
            (1.0 - hom as f64 / called.len() as f64) * 100.0
        };

        let mut alleles = Vec::new();
        for call in &called {
            push_alleles(call, &mut alleles);
        }
        let maf = if alleles.is_empty() {
            0.0
        } else {
            let mut freqs: Vec<f64> = ALLELE_SYMBOLS
                .iter()
                .map(|symbol| alleles.iter().filter(|a| *a == symbol).count() as f64 / alleles.len() as f64)
                .collect();
            freqs.sort_by(|a, b| b.total_cmp(a));
            freqs[1]
        };

        Self {
            id: site.id.clone(),
            chrom: site.chrom.clone(),
            pos: site.pos,
            reference: site.reference.clone(),
            miss_rate,
            het_rate,
            maf,
        }
    }

    /// Tab-separated output row
    pub fn to_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{:.2}\t{:.2}\t{:.4}",
            self.id, self.chrom, self.pos, self.reference, self.miss_rate, self.het_rate, self.maf
        )
    }
}

/// Per-chunk computation handed to the dispatcher
pub fn stat_mhm(sites: Vec<GenotypeSite>) -> Vec<SiteStats> {
    sites.iter().map(SiteStats::from_site).collect()
}

/// Compute site statistics in chunks across the worker pool.
///
/// Results are merged and sorted naturally by site id, so the output does not
/// depend on the number of workers.
pub fn parallel_stat_mhm(
    table: GenotypeTable,
    manager: &TaskManager,
    min_chunk_size: Option<usize>,
) -> EngineResult<Vec<SiteStats>> {
    let chunk_size = calculate_chunk_size(table.sites.len(), manager.num_workers(), min_chunk_size);
    let chunks = chunk_rows(table.sites, chunk_size);
    log::info!("Computing MHM statistics over {} chunks", chunks.len());

    let handles = manager.parallel_run_func(stat_mhm, chunks);
    let mut stats = Vec::new();
    for handle in handles {
        stats.extend(handle.get()?);
    }

    stats.sort_by(|a, b| natural_cmp(&a.id, &b.id));
    Ok(stats)
}

/// Render statistics with a header row built from the table's site columns
pub fn format_stats(site_columns: &[String], stats: &[SiteStats]) -> String {
    let mut out = String::new();
    out.push_str(&site_columns.join("\t"));
    out.push('\t');
    out.push_str(MHM_HEADER);
    out.push('\n');
    for row in stats {
        out.push_str(&row.to_line());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    const TABLE: &str = "\
ID\tChrom\tPos\tRef\tS1\tS2\tS3\tS4
snp10\tChr10\t500\tA\tAA\tAG\t\tGG
snp2\tChr2\t100\tC\tCC\tCC\tNA\tC/T
snp1\tChr1\t50\tT\tTT\tTinsA/T\tdel\tTT
";

    #[test]
    fn test_parse_table() {
        let table = GenotypeTable::from_reader(TABLE.as_bytes()).unwrap();
        assert_eq!(table.samples, vec!["S1", "S2", "S3", "S4"]);
        assert_eq!(table.sites.len(), 3);
        assert_eq!(table.sites[0].calls[2], None);
        assert_eq!(table.sites[1].calls[2], None);
        assert_eq!(table.sites[2].pos, 50);
    }

    #[test]
    fn test_short_rows_are_padded_and_long_rows_rejected() {
        let table = GenotypeTable::from_reader("ID\tC\tP\tR\tS1\tS2\nx\tc\t1\tA\tAA\n".as_bytes()).unwrap();
        assert_eq!(table.sites[0].calls, vec![Some("AA".to_string()), None]);

        let err = GenotypeTable::from_reader("ID\tC\tP\tR\tS1\nx\tc\t1\tA\tAA\tTT\n".as_bytes()).unwrap_err();
        assert!(matches!(err, EngineError::MalformedInput { line: 2, .. }));
    }

    #[test]
    fn test_sort_allele() {
        assert_eq!(sort_allele("GA"), "AG");
        assert_eq!(sort_allele("T/C"), "C/T");
        assert_eq!(sort_allele("del"), "del");
        assert_eq!(sort_allele("TinsA"), "TinsA");
    }

    #[test]
    fn test_site_statistics() {
        let table = GenotypeTable::from_reader(TABLE.as_bytes()).unwrap();

        let snp10 = SiteStats::from_site(&table.sites[0]);
        assert!((snp10.miss_rate - 25.0).abs() < 1e-9);
        assert!((snp10.het_rate - 100.0 / 3.0).abs() < 1e-9);
        // AA AG GG: three A, three G
        assert!((snp10.maf - 0.5).abs() < 1e-9);

        let snp2 = SiteStats::from_site(&table.sites[1]);
        assert!((snp2.het_rate - 100.0 / 3.0).abs() < 1e-9);
        // CC CC C/T: five C, one T
        assert!((snp2.maf - 1.0 / 6.0).abs() < 1e-9);

        let snp1 = SiteStats::from_site(&table.sites[2]);
        assert_eq!(snp1.miss_rate, 0.0);
        // TT, I T, DD, TT
        assert!((snp1.maf - 0.25).abs() < 1e-9);
        assert_eq!(snp1.to_line(), "snp1\tChr1\t50\tT\t0.00\t25.00\t0.2500");
    }

    #[test]
    fn test_all_missing_site() {
        let site = GenotypeSite {
            id: "s".to_string(),
            chrom: "c".to_string(),
            pos: 1,
            reference: "A".to_string(),
            calls: vec![None, None],
        };
        let stats = SiteStats::from_site(&site);
        assert_eq!((stats.miss_rate, stats.het_rate, stats.maf), (100.0, 0.0, 0.0));
    }

    #[test]
    fn test_sort_sites_naturally() {
        let mut table = GenotypeTable::from_reader(TABLE.as_bytes()).unwrap();
        table.sort_sites();
        let chroms: Vec<&str> = table.sites.iter().map(|s| s.chrom.as_str()).collect();
        assert_eq!(chroms, vec!["Chr1", "Chr2", "Chr10"]);
    }

    fn random_table(rows: usize, samples: usize) -> GenotypeTable {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let calls = ["AA", "AG", "GG", "CC", "CT", "TT", "A/G", "del", ""];
        let mut text = String::from("ID\tChrom\tPos\tRef");
        for s in 0..samples {
            text.push_str(&format!("\tS{}", s));
        }
        text.push('\n');
        for row in 0..rows {
            text.push_str(&format!("site{}\tChr{}\t{}\tA", row, rng.gen_range(1..12), row * 10 + 1));
            for _ in 0..samples {
                text.push('\t');
                text.push_str(calls.choose(&mut rng).copied().unwrap_or(""));
            }
            text.push('\n');
        }
        GenotypeTable::from_reader(text.as_bytes()).unwrap()
    }

    #[test]
    fn test_parallel_result_independent_of_workers() {
        let table = random_table(500, 12);
        let single = parallel_stat_mhm(table.clone(), &TaskManager::with_workers(1).unwrap(), None).unwrap();
        let multi = parallel_stat_mhm(table.clone(), &TaskManager::with_workers(4).unwrap(), Some(7)).unwrap();

        assert_eq!(single.len(), 500);
        assert_eq!(single, multi);
        assert_eq!(single[0].id, "site0");
        assert_eq!(single[2].id, "site2");
        assert_eq!(single[10].id, "site10");
        let mut direct = stat_mhm(table.sites);
        direct.sort_by(|a, b| natural_cmp(&a.id, &b.id));
        assert_eq!(single, direct);
    }

    #[test]
    fn test_format_stats() {
        let table = GenotypeTable::from_reader(TABLE.as_bytes()).unwrap();
        let stats = stat_mhm(table.sites.clone());
        let text = format_stats(&table.site_columns, &stats);
        assert!(text.starts_with("ID\tChrom\tPos\tRef\tMissRate(%)\tHetRate(%)\tMAF\n"));
        assert_eq!(text.lines().count(), 4);
    }

    const DATABASE: &str = "\
ID\tChrom\tPos\tRef\tD1\tD2
s1\tc\t1\tA\tAA\tGG
s2\tc\t2\tA\tAG\tAA
s3\tc\t3\tA\tCC\tNA
";

    #[test]
    fn test_compare_over_shared_sites() {
        let database = GenotypeTable::from_reader(DATABASE.as_bytes()).unwrap();
        let test = GenotypeTable::from_reader(
            "ID\tChrom\tPos\tRef\tT1\ns3\tc\t3\tA\tCC\ns2\tc\t2\tA\tAG\ns4\tc\t4\tA\tTT\n".as_bytes(),
        )
        .unwrap();

        let lines: Vec<String> = database.compare(&test).iter().map(|r| r.to_line()).collect();
        assert_eq!(lines, vec!["D1\tT1\t2\t0\t2\t100.00", "D2\tT1\t0\t1\t1\t0.00"]);
    }

    #[test]
    fn test_compare_orders_by_test_sample_then_gs() {
        let database = GenotypeTable::from_reader(DATABASE.as_bytes()).unwrap();
        let rows = database.compare(&database);
        let pairs: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.database_sample.as_str(), r.test_sample.as_str()))
            .collect();
        assert_eq!(pairs, vec![("D1", "D1"), ("D2", "D1"), ("D2", "D2"), ("D1", "D2")]);
        assert_eq!(rows[0].counts.gs(), 100.0);
    }

    #[test]
    fn test_self_compare_and_bins() {
        let first = GenotypeTable::from_reader(DATABASE.as_bytes()).unwrap();
        let second = GenotypeTable::from_reader(
            "ID\tChrom\tPos\tRef\tD2\tD1\ns1\tc\t1\tA\tGA\tAA\ns2\tc\t2\tA\tAA\tAG\ns3\tc\t3\tA\tTT\tCT\n".as_bytes(),
        )
        .unwrap();

        let rows = first.self_compare(&second).unwrap();
        let lines: Vec<String> = rows.iter().map(|r| r.to_line()).collect();
        assert_eq!(lines, vec!["D1\t2\t0\t3\t66.67", "D2\t1\t1\t2\t50.00"]);

        let bins = consistency_bins(rows.iter().map(|r| r.counts.gs()));
        assert_eq!(bins, [0, 0, 0, 0, 1, 0, 1, 0, 0, 0]);
        assert_eq!(consistency_bins([0.0, 100.0]), [1, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
        assert!(format_bins(&bins).starts_with("(0, 10]\t0\n(10, 20]\t0\n"));
    }

    #[test]
    fn test_self_compare_requires_same_sites() {
        let first = GenotypeTable::from_reader(DATABASE.as_bytes()).unwrap();
        let mut shuffled = first.clone();
        shuffled.sites.reverse();
        assert!(matches!(first.self_compare(&shuffled), Err(EngineError::InvalidInput(_))));

        let mut renamed = first.clone();
        renamed.samples[1] = "D9".to_string();
        assert!(matches!(first.self_compare(&renamed), Err(EngineError::InvalidInput(_))));
    }
}
