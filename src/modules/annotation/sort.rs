//! Position sort for GFF files that keeps children under their parents

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::engines::compute::natsort::natural_cmp;
use crate::engines::EngineResult;
use crate::modules::annotation::hierarchy::{assemble_gff, AssemblerOptions, FeatureHierarchy, NodeId};
use crate::modules::io::feature::FeatureRecord;
use crate::modules::io::gff::GffDecoder;

fn position_cmp(a: &FeatureRecord, b: &FeatureRecord) -> Ordering {
    natural_cmp(&a.chrom, &b.chrom).then(a.start.cmp(&b.start))
}

/// Linearize a hierarchy: top-level features by natural chromosome order and
/// start, each followed depth-first by its descendants.
///
/// A child shared by several parents is emitted once, under the first parent
/// reached.
pub fn sorted_order(tree: &FeatureHierarchy) -> Vec<NodeId> {
    let mut roots: Vec<NodeId> = tree.top_level().collect();
    // Stable, so equal positions keep input order.
    roots.sort_by(|&a, &b| position_cmp(&tree.node(a).record, &tree.node(b).record));

    let mut seen = HashSet::new();
    let mut order = Vec::with_capacity(tree.len());
    for root in roots {
        tree.visit(root, &mut seen, &mut order);
    }

    // Nodes reachable only through a parent cycle.
    let mut rest: Vec<NodeId> = (0..tree.len()).filter(|i| !seen.contains(i)).collect();
    rest.sort_by(|&a, &b| position_cmp(&tree.node(a).record, &tree.node(b).record));
    for node in rest {
        tree.visit(node, &mut seen, &mut order);
    }
    order
}

/// Re-sort GFF records; references without a target are kept as top-level features
pub fn sort_gff<I>(records: I) -> EngineResult<Vec<FeatureRecord>>
where
    I: IntoIterator<Item = EngineResult<FeatureRecord>>,
{
    let tree = assemble_gff(records, AssemblerOptions::new().with_strict_references(false))?;
    Ok(sorted_order(&tree)
        .into_iter()
        .map(|id| tree.node(id).record.clone())
        .collect())
}

/// Re-sort GFF records into GFF lines
pub fn sort_gff_lines<I>(records: I) -> EngineResult<Vec<String>>
where
    I: IntoIterator<Item = EngineResult<FeatureRecord>>,
{
    Ok(sort_gff(records)?
        .iter()
        .map(|record| record.to_line(&GffDecoder))
        .collect())
}
