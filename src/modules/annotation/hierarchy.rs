//! Gene → transcript → segment trees
//!
//! All records of one annotation source are buffered into an arena of
//! [`FeatureNode`]s. Parent and child links are indices into that arena, so a
//! shared exon (`Parent=tx1,tx2`) is stored once and listed under every parent.
//!
//! GFF records are linked through `ID`/`Parent`. GTF has no parent scheme:
//! records are grouped by `gene_id` and `transcript_id`, and gene or transcript
//! nodes missing from the file are synthesized from the span of their members.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::engines::{EngineError, EngineResult};
use crate::modules::io::feature::{Attributes, FeatureRecord};
use crate::modules::lookup::{IdFilter, LookupReport};

/// Position of a node in the arena
pub type NodeId = usize;

/// Feature types that sit below a transcript
pub const SEGMENT_TYPES: &[&str] = &[
    "exon",
    "CDS",
    "five_prime_UTR",
    "three_prime_UTR",
    "5UTR",
    "3UTR",
    "UTR",
    "start_codon",
    "stop_codon",
    "intron",
];

/// Check if a feature type is an exon-level segment
pub fn is_segment_type(feature_type: &str) -> bool {
    SEGMENT_TYPES.contains(&feature_type)
}

/// Assembly settings
#[derive(Debug, Clone)]
pub struct AssemblerOptions {
    /// Restrict the genes kept; a gene is kept when its id or one of its
    /// transcript ids matches
    pub id_filter: Option<IdFilter>,
    /// Fail on references without a target instead of logging them
    pub strict_references: bool,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            id_filter: None,
            strict_references: true,
        }
    }
}

impl AssemblerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id_filter(mut self, filter: IdFilter) -> Self {
        self.id_filter = Some(filter);
        self
    }

    pub fn with_strict_references(mut self, strict: bool) -> Self {
        self.strict_references = strict;
        self
    }
}

/// One record in the arena
#[derive(Debug, Clone)]
pub struct FeatureNode {
    pub record: FeatureRecord,
    /// `ID` for GFF, `gene_id` or `transcript_id` for GTF groups
    pub key: Option<String>,
    children: Vec<NodeId>,
    parents: Vec<NodeId>,
    synthetic: bool,
}

impl FeatureNode {
    fn new(record: FeatureRecord, key: Option<String>) -> Self {
        Self {
            record,
            key,
            children: Vec::new(),
            parents: Vec::new(),
            synthetic: false,
        }
    }

    /// Child indices, ascending by start
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Parent indices in reference order
    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    /// Whether the node was built from its members rather than read from the file
    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    /// Display name: key if present, otherwise the location
    pub fn name(&self) -> String {
        match &self.key {
            Some(key) => key.clone(),
            None => format!(
                "{}:{}:{}-{}",
                self.record.feature_type, self.record.chrom, self.record.start, self.record.end
            ),
        }
    }
}

/// Assembled feature trees of one annotation source
#[derive(Debug, Clone, Default)]
pub struct FeatureHierarchy {
    nodes: Vec<FeatureNode>,
    index: HashMap<String, NodeId>,
    genes: IndexMap<String, NodeId>,
    report: LookupReport,
}

impl FeatureHierarchy {
    /// Number of nodes, synthesized ones included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if nothing was assembled
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get a node
    pub fn node(&self, id: NodeId) -> &FeatureNode {
        &self.nodes[id]
    }

    /// Look up a node by key
    pub fn find(&self, key: &str) -> Option<NodeId> {
        self.index.get(key).copied()
    }

    /// Kept top-level genes in input order
    pub fn genes(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.genes.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Top-level gene by id
    pub fn gene(&self, id: &str) -> Option<NodeId> {
        self.genes.get(id).copied()
    }

    /// Every node without a resolved parent, in input order
    pub fn top_level(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).filter(|&i| self.nodes[i].parents.is_empty())
    }

    /// Every node, in arena order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &FeatureNode)> {
        self.nodes.iter().enumerate()
    }

    /// Ids requested by the filter that matched no gene or transcript
    pub fn report(&self) -> &LookupReport {
        &self.report
    }

    /// Transcript-level children of a gene.
    ///
    /// A gene whose only children are segments acts as its own transcript.
    pub fn transcripts(&self, gene: NodeId) -> Vec<NodeId> {
        let node = &self.nodes[gene];
        let transcripts: Vec<NodeId> = node
            .children
            .iter()
            .copied()
            .filter(|&c| !is_segment_type(&self.nodes[c].record.feature_type))
            .collect();
        if transcripts.is_empty() && !node.children.is_empty() {
            vec![gene]
        } else {
            transcripts
        }
    }

    /// Children of the given type, ascending by start
    pub fn segments(&self, parent: NodeId, feature_type: &str) -> Vec<&FeatureRecord> {
        self.nodes[parent]
            .children
            .iter()
            .map(|&c| &self.nodes[c].record)
            .filter(|r| r.feature_type == feature_type)
            .collect()
    }

    /// Node followed by its descendants, depth-first, each node at most once
    pub fn depth_first(&self, root: NodeId) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        self.visit(root, &mut seen, &mut order);
        order
    }

    pub(crate) fn visit(&self, id: NodeId, seen: &mut HashSet<NodeId>, order: &mut Vec<NodeId>) {
        if !seen.insert(id) {
            return;
        }
        order.push(id);
        for &child in &self.nodes[id].children {
            self.visit(child, seen, order);
        }
    }

    fn push(&mut self, node: FeatureNode) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        id
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        if !self.nodes[parent].children.contains(&child) {
            self.nodes[parent].children.push(child);
            self.nodes[child].parents.push(parent);
        }
    }

    fn sort_children(&mut self) {
        for i in 0..self.nodes.len() {
            let mut children = std::mem::take(&mut self.nodes[i].children);
            children.sort_by_key(|&c| (self.nodes[c].record.start, self.nodes[c].record.end, c));
            self.nodes[i].children = children;
        }
    }

    /// Register top-level genes and apply the id filter
    fn collect_genes(&mut self, filter: Option<IdFilter>) {
        let roots: Vec<NodeId> = self.top_level().collect();
        let mut filter = filter;

        for root in roots {
            let Some(key) = self.nodes[root].key.clone() else {
                continue;
            };
            let keep = match filter.as_mut() {
                None => true,
                Some(filter) => {
                    // Every matching transcript id must be recorded, so no short-circuit.
                    let mut keep = filter.check(&key);
                    for child in self.nodes[root].children.clone() {
                        if let Some(child_key) = &self.nodes[child].key {
                            keep |= filter.check(child_key);
                        }
                    }
                    keep
                }
            };
            if keep {
                self.genes.entry(key).or_insert(root);
            }
        }

        if let Some(filter) = filter {
            self.report = filter.report();
            self.report.log();
        }
    }
}

fn unresolved(strict: bool, child: &str, parent: &str) -> EngineResult<()> {
    if strict {
        return Err(EngineError::UnresolvedReference {
            child: child.to_string(),
            parent: parent.to_string(),
        });
    }
    log::warn!("{} refers to missing parent {}; left unattached", child, parent);
    Ok(())
}

fn self_parent(strict: bool, child: &str) -> EngineResult<()> {
    if strict {
        return Err(EngineError::InvalidInput(format!("{} lists itself as its Parent", child)));
    }
    log::warn!("{} lists itself as its Parent; link ignored", child);
    Ok(())
}

/// Assemble GFF records through their `ID` and `Parent` attributes
pub fn assemble_gff<I>(records: I, options: AssemblerOptions) -> EngineResult<FeatureHierarchy>
where
    I: IntoIterator<Item = EngineResult<FeatureRecord>>,
{
    let mut tree = FeatureHierarchy::default();

    for record in records {
        let record = record?;
        let key = record.id().map(str::to_string);
        let id = tree.push(FeatureNode::new(record, key.clone()));
        if let Some(key) = key {
            // Multi-line features (CDS split over exons) repeat their ID.
            tree.index.entry(key).or_insert(id);
        }
    }

    for child in 0..tree.nodes.len() {
        let parents: Vec<String> = tree.nodes[child]
            .record
            .parents()
            .into_iter()
            .map(str::to_string)
            .collect();
        for parent in parents {
            match tree.index.get(&parent).copied() {
                Some(p) if p == child => self_parent(options.strict_references, &tree.nodes[child].name())?,
                Some(p) => tree.link(p, child),
                None => unresolved(options.strict_references, &tree.nodes[child].name(), &parent)?,
            }
        }
    }

    tree.sort_children();
    tree.collect_genes(options.id_filter);
    log::info!("Assembled {} GFF features into {} genes", tree.len(), tree.genes.len());
    Ok(tree)
}

/// Assemble GTF records by `gene_id` and `transcript_id`
pub fn assemble_gtf<I>(records: I, options: AssemblerOptions) -> EngineResult<FeatureHierarchy>
where
    I: IntoIterator<Item = EngineResult<FeatureRecord>>,
{
    let mut tree = FeatureHierarchy::default();
    let mut genes: HashMap<String, NodeId> = HashMap::new();
    let mut transcripts: HashMap<String, NodeId> = HashMap::new();
    let mut members: Vec<(NodeId, String, Option<String>)> = Vec::new();

    for record in records {
        let record = record?;
        let gene_id = record.gene_id().map(str::to_string);
        let transcript_id = record.transcript_id().map(str::to_string);

        let Some(gene_id) = gene_id else {
            let child = transcript_id.unwrap_or_else(|| record.feature_type.clone());
            unresolved(options.strict_references, &child, "gene_id")?;
            continue;
        };

        let feature_type = record.feature_type.clone();
        match (feature_type.as_str(), transcript_id) {
            ("gene", _) => {
                let id = tree.push(FeatureNode::new(record, Some(gene_id.clone())));
                genes.entry(gene_id).or_insert(id);
            }
            ("transcript" | "mRNA", Some(transcript_id)) => {
                let id = tree.push(FeatureNode::new(record, Some(transcript_id.clone())));
                transcripts.entry(transcript_id.clone()).or_insert(id);
                members.push((id, gene_id, None));
            }
            (_, transcript_id) => {
                let id = tree.push(FeatureNode::new(record, None));
                members.push((id, gene_id, transcript_id));
            }
        }
    }

    for (member, gene_id, transcript_id) in members {
        let parent = match transcript_id {
            Some(transcript_id) => {
                let transcript = match transcripts.get(&transcript_id) {
                    Some(&t) => t,
                    None => {
                        let t = synthesize(&mut tree, member, "transcript", &transcript_id, Some(&gene_id));
                        transcripts.insert(transcript_id, t);
                        // A new transcript still needs its gene.
                        let g = gene_node(&mut tree, &mut genes, t, &gene_id);
                        tree.link(g, t);
                        t
                    }
                };
                extend_span(&mut tree, transcript, member);
                transcript
            }
            None => gene_node(&mut tree, &mut genes, member, &gene_id),
        };
        if parent != member {
            tree.link(parent, member);
        }
    }

    // Synthetic genes cover every transcript under them.
    for gene in genes.values().copied() {
        if tree.nodes[gene].synthetic {
            for t in tree.nodes[gene].children.clone() {
                extend_span(&mut tree, gene, t);
            }
        }
    }

    for (key, &id) in genes.iter().chain(transcripts.iter()) {
        tree.index.entry(key.clone()).or_insert(id);
    }

    tree.sort_children();
    tree.collect_genes(options.id_filter);
    log::info!("Assembled {} GTF features into {} genes", tree.len(), tree.genes.len());
    Ok(tree)
}

fn gene_node(
    tree: &mut FeatureHierarchy,
    genes: &mut HashMap<String, NodeId>,
    member: NodeId,
    gene_id: &str,
) -> NodeId {
    if let Some(&g) = genes.get(gene_id) {
        return g;
    }
    let g = synthesize(tree, member, "gene", gene_id, None);
    genes.insert(gene_id.to_string(), g);
    g
}

fn synthesize(
    tree: &mut FeatureHierarchy,
    template: NodeId,
    feature_type: &str,
    key: &str,
    gene_id: Option<&str>,
) -> NodeId {
    let base = &tree.nodes[template].record;
    let mut attributes = Attributes::new();
    attributes.insert("gene_id".to_string(), gene_id.unwrap_or(key).to_string());
    if gene_id.is_some() {
        attributes.insert("transcript_id".to_string(), key.to_string());
    }
    let record = FeatureRecord {
        chrom: base.chrom.clone(),
        source: base.source.clone(),
        feature_type: feature_type.to_string(),
        start: base.start,
        end: base.end,
        score: None,
        strand: base.strand,
        phase: None,
        attributes,
    };
    let mut node = FeatureNode::new(record, Some(key.to_string()));
    node.synthetic = true;
    tree.push(node)
}

fn extend_span(tree: &mut FeatureHierarchy, target: NodeId, member: NodeId) {
    if !tree.nodes[target].synthetic {
        return;
    }
    let (start, end) = (tree.nodes[member].record.start, tree.nodes[member].record.end);
    let record = &mut tree.nodes[target].record;
    record.start = record.start.min(start);
    record.end = record.end.max(end);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::io::gff::read_gff;
    use crate::modules::io::gtf::read_gtf;
    use crate::modules::lookup::MatchMode;

    const GFF: &str = "\
Chr1\t.\tgene\t100\t900\t.\t+\t.\tID=geneA
Chr1\t.\tgene\t100\t950\t.\t+\t.\tID=geneB
Chr1\t.\tmRNA\t100\t900\t.\t+\t.\tID=txA;Parent=geneA
Chr1\t.\texon\t500\t900\t.\t+\t.\tID=exon2;Parent=txA
Chr1\t.\texon\t100\t200\t.\t+\t.\tID=exon1;Parent=txA
Chr1\t.\tshared_region\t300\t400\t.\t+\t.\tID=shared;Parent=geneA,geneB
";

    fn gff(options: AssemblerOptions) -> EngineResult<FeatureHierarchy> {
        assemble_gff(read_gff(GFF.as_bytes()), options)
    }

    #[test]
    fn test_multi_parent_attaches_under_every_parent() {
        let tree = gff(AssemblerOptions::new()).unwrap();
        let shared = tree.find("shared").unwrap();

        for gene in ["geneA", "geneB"] {
            let g = tree.gene(gene).unwrap();
            assert!(tree.node(g).children().contains(&shared), "missing under {}", gene);
        }
        assert_eq!(tree.node(shared).parents().len(), 2);
        assert_eq!(tree.len(), 6);
    }

    #[test]
    fn test_children_sorted_by_start() {
        let tree = gff(AssemblerOptions::new()).unwrap();
        let tx = tree.find("txA").unwrap();
        let starts: Vec<u64> = tree.segments(tx, "exon").iter().map(|r| r.start).collect();
        assert_eq!(starts, vec![100, 500]);
    }

    #[test]
    fn test_transcripts_of_gene() {
        let tree = gff(AssemblerOptions::new()).unwrap();
        let gene = tree.gene("geneA").unwrap();
        let names: Vec<String> = tree.transcripts(gene).iter().map(|&t| tree.node(t).name()).collect();
        assert_eq!(names, vec!["txA", "shared"]);
    }

    #[test]
    fn test_unresolved_parent() {
        let data = "Chr1\t.\texon\t1\t10\t.\t+\t.\tID=e1;Parent=ghost\n";
        let err = assemble_gff(read_gff(data.as_bytes()), AssemblerOptions::new()).unwrap_err();
        match err {
            EngineError::UnresolvedReference { child, parent } => {
                assert_eq!(child, "e1");
                assert_eq!(parent, "ghost");
            }
            other => panic!("Expected UnresolvedReference, got {:?}", other),
        }

        let lenient = AssemblerOptions::new().with_strict_references(false);
        let tree = assemble_gff(read_gff(data.as_bytes()), lenient).unwrap();
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_self_parent_is_not_a_missing_reference() {
        let data = "Chr1\t.\tgene\t1\t10\t.\t+\t.\tID=g1;Parent=g1\n";
        let err = assemble_gff(read_gff(data.as_bytes()), AssemblerOptions::new()).unwrap_err();
        match err {
            EngineError::InvalidInput(msg) => assert_eq!(msg, "g1 lists itself as its Parent"),
            other => panic!("Expected InvalidInput, got {:?}", other),
        }

        let lenient = AssemblerOptions::new().with_strict_references(false);
        let tree = assemble_gff(read_gff(data.as_bytes()), lenient).unwrap();
        assert!(tree.node(0).parents().is_empty());
        assert_eq!(tree.top_level().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_id_filter_reports_misses_once() {
        let filter = IdFilter::new(["txA", "nothing", "nothing"], MatchMode::Exact);
        let tree = gff(AssemblerOptions::new().with_id_filter(filter)).unwrap();

        let genes: Vec<&str> = tree.genes().map(|(k, _)| k).collect();
        assert_eq!(genes, vec!["geneA"]);
        assert_eq!(tree.report().missing, vec!["nothing".to_string()]);
    }

    #[test]
    fn test_cyclic_parents_terminate() {
        let data = "c\t.\tgene\t1\t10\t.\t+\t.\tID=a;Parent=b\nc\t.\tgene\t1\t10\t.\t+\t.\tID=b;Parent=a\n";
        let tree = assemble_gff(read_gff(data.as_bytes()), AssemblerOptions::new()).unwrap();
        assert_eq!(tree.depth_first(0), vec![0, 1]);
        assert_eq!(tree.genes().count(), 0);
    }

    #[test]
    fn test_gtf_grouping_and_synthesis() {
        let data = "\
Chr2\ts\texon\t300\t400\t.\t-\t.\tgene_id \"G1\"; transcript_id \"T1\";
Chr2\ts\texon\t100\t200\t.\t-\t.\tgene_id \"G1\"; transcript_id \"T1\";
Chr2\ts\tCDS\t150\t200\t.\t-\t0\tgene_id \"G1\"; transcript_id \"T1\";
Chr2\ts\texon\t120\t200\t.\t-\t.\tgene_id \"G1\"; transcript_id \"T2\";
";
        let tree = assemble_gtf(read_gtf(data.as_bytes()), AssemblerOptions::new()).unwrap();
        let gene = tree.gene("G1").unwrap();
        assert!(tree.node(gene).is_synthetic());
        assert_eq!((tree.node(gene).record.start, tree.node(gene).record.end), (100, 400));

        let transcripts = tree.transcripts(gene);
        assert_eq!(transcripts.len(), 2);
        let t1 = tree.find("T1").unwrap();
        assert_eq!(tree.node(t1).record.transcript_id(), Some("T1"));
        assert_eq!(tree.segments(t1, "exon").len(), 2);
        assert_eq!(tree.segments(t1, "CDS").len(), 1);
        assert_eq!(tree.segments(t1, "exon")[0].start, 100);
    }

    #[test]
    fn test_gtf_explicit_lines_are_reused() {
        let data = "\
Chr1\ts\tgene\t1\t100\t.\t+\t.\tgene_id \"G\";
Chr1\ts\ttranscript\t1\t100\t.\t+\t.\tgene_id \"G\"; transcript_id \"T\";
Chr1\ts\texon\t1\t50\t.\t+\t.\tgene_id \"G\"; transcript_id \"T\";
";
        let tree = assemble_gtf(read_gtf(data.as_bytes()), AssemblerOptions::new()).unwrap();
        assert_eq!(tree.len(), 3);
        assert!(!tree.node(tree.gene("G").unwrap()).is_synthetic());
        assert_eq!(tree.segments(tree.find("T").unwrap(), "exon").len(), 1);
    }

    #[test]
    fn test_gtf_missing_gene_id() {
        let data = "Chr1\ts\texon\t1\t50\t.\t+\t.\ttranscript_id \"T\";\n";
        assert!(matches!(
            assemble_gtf(read_gtf(data.as_bytes()), AssemblerOptions::new()),
            Err(EngineError::UnresolvedReference { .. })
        ));
    }
}
