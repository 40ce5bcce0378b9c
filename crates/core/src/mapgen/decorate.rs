//! Annotation pass run after repairs. Adds tags and meta only; node types
//! and topology are left untouched.

use std::collections::BTreeMap;

use crate::act::ActSpecification;
use crate::rules::RuleSet;
use crate::types::{MapGraph, NodeId, NodeType};

use super::seed::node_seed;

pub(super) fn decorate(
    graph: &mut MapGraph,
    act: &ActSpecification,
    rules: &RuleSet,
    decorations_seed: u64,
) {
    let mut out_degree: BTreeMap<NodeId, usize> = BTreeMap::new();
    let mut in_degree: BTreeMap<NodeId, usize> = BTreeMap::new();
    for edge in &graph.edges {
        *out_degree.entry(edge.from).or_default() += 1;
        *in_degree.entry(edge.to).or_default() += 1;
    }

    for node in &mut graph.nodes {
        let mut tags = Vec::new();
        if node.row == 0 {
            tags.push("start");
        }
        if node.node_type == NodeType::Boss {
            tags.push("boss");
        }
        if node.row == act.pre_boss_row() {
            tags.push("pre_boss");
        }
        if node.path_indices.len() > 1 {
            tags.push("junction");
        }
        if out_degree.get(&node.id).is_some_and(|&degree| degree > 1) {
            tags.push("fork");
        }
        if in_degree.get(&node.id).is_some_and(|&degree| degree > 1) {
            tags.push("merge");
        }
        node.tags.extend(tags.into_iter().map(str::to_string));

        if let Some(band) = rules.band_for_row(node.row) {
            node.meta.insert("band".to_string(), band.name.clone());
        }
        node.meta.insert("paths".to_string(), node.path_indices.len().to_string());
        node.meta.insert(
            "encounter_seed".to_string(),
            format!("{:016x}", node_seed(decorations_seed, node.id)),
        );
    }
}
