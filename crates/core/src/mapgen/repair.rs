//! Repair selection: maps the first actionable violation to the most
//! specific fix, or to a generic retype when nothing specific applies.

use tracing::debug;

use crate::act::ActSpecification;
use crate::audit::{AuditReport, Violation};
use crate::rng::RandomStream;
use crate::rules::RuleSet;
use crate::types::{MapGraph, Node, NodeId, NodeType};

use super::model::Diagnostics;
use super::typing::{FIXED_TAG, eligible_types, sample_type};

pub(super) const LOCKED_TAG: &str = "locked";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Repair {
    /// Topology is broken; weave and type a fresh graph.
    Regenerate,
    PlacePort { node: NodeId },
    PlaceTreasure { node: NodeId },
    /// Retype the node a violation is pinned to.
    Retype { node: NodeId },
    /// Retype a random node when no violation points anywhere useful.
    Generic { node: NodeId },
}

/// Nodes the repair loop may change: not pinned by typing, not placed by an
/// earlier repair, and never the boss.
pub(super) fn is_retypeable(node: &Node) -> bool {
    node.node_type != NodeType::Boss && !node.has_tag(FIXED_TAG) && !node.has_tag(LOCKED_TAG)
}

/// Picks the first repair that actually changes the map. A violation whose
/// suspects all keep their type under a retype is skipped, so the loop never
/// repeats a retype that leaves the graph as it was.
pub(super) fn choose_repair(
    graph: &MapGraph,
    report: &AuditReport,
    act: &ActSpecification,
    rules: &RuleSet,
    rng: &mut RandomStream,
) -> Repair {
    for violation in &report.violations {
        let repair = match *violation {
            Violation::NoStartNodes
            | Violation::BossUnreachable { .. }
            | Violation::BossCount { .. }
            | Violation::BossOffLastRow { .. }
            | Violation::PreBossMissingBossEdge { .. }
            | Violation::ForeignBossFeeder { .. } => Some(Repair::Regenerate),
            Violation::MissingPreBossPort { row } => {
                let candidates: Vec<NodeId> = graph
                    .nodes_in_row(row)
                    .filter(|node| node.node_type != NodeType::Boss && !node.has_tag(LOCKED_TAG))
                    .map(|node| node.id)
                    .collect();
                Some(rng.choose(&candidates).map_or(Repair::Regenerate, |&node| Repair::PlacePort {
                    node,
                }))
            }
            Violation::PreBossNotPort { node, .. } => Some(Repair::PlacePort { node }),
            Violation::MissingMidActTreasure { min_row, max_row } => {
                let candidates: Vec<NodeId> = graph
                    .nodes
                    .iter()
                    .filter(|node| (min_row..=max_row).contains(&node.row))
                    .filter(|node| node.row != act.pre_boss_row() && is_retypeable(node))
                    .map(|node| node.id)
                    .collect();
                Some(
                    rng.choose(&candidates)
                        .map_or(Repair::Regenerate, |&node| Repair::PlaceTreasure { node }),
                )
            }
            _ => violation
                .suspects()
                .into_iter()
                .find(|&node| can_retype(graph, node, act, rules))
                .map(|node| Repair::Retype { node }),
        };
        if let Some(repair) = repair {
            return repair;
        }
    }

    let retypeable: Vec<NodeId> = graph
        .nodes
        .iter()
        .map(|node| node.id)
        .filter(|&node| can_retype(graph, node, act, rules))
        .collect();
    match rng.choose(&retypeable) {
        Some(&node) => Repair::Generic { node },
        None => Repair::Regenerate,
    }
}

/// A retype of `id` would leave it with a different type.
fn can_retype(graph: &MapGraph, id: NodeId, act: &ActSpecification, rules: &RuleSet) -> bool {
    let Some(node) = graph.node(id) else {
        return false;
    };
    if !is_retypeable(node) {
        return false;
    }
    let eligible = eligible_types(graph, id, act, rules, |_| true);
    if eligible.is_empty() {
        return rules.spacing.fallback_type != node.node_type;
    }
    eligible.iter().any(|&kind| kind != node.node_type)
}

/// Applies every repair except `Regenerate`, which the generator owns.
/// Returns whether the graph changed.
pub(super) fn apply_repair(
    graph: &mut MapGraph,
    repair: Repair,
    act: &ActSpecification,
    rules: &RuleSet,
    rng: &mut RandomStream,
    diagnostics: &mut Diagnostics,
) -> bool {
    match repair {
        Repair::Regenerate => false,
        Repair::PlacePort { node } => place_locked(graph, node, NodeType::Port),
        Repair::PlaceTreasure { node } => place_locked(graph, node, NodeType::Treasure),
        Repair::Retype { node } | Repair::Generic { node } => {
            retype(graph, node, act, rules, rng, diagnostics)
        }
    }
}

fn place_locked(graph: &mut MapGraph, id: NodeId, node_type: NodeType) -> bool {
    let Some(node) = graph.node_mut(id) else {
        return false;
    };
    let changed = node.node_type != node_type;
    node.node_type = node_type;
    node.tags.insert(LOCKED_TAG.to_string());
    changed
}

/// Weighted re-draw that avoids the current type whenever anything else is
/// eligible, or the fallback type when nothing is.
fn retype(
    graph: &mut MapGraph,
    id: NodeId,
    act: &ActSpecification,
    rules: &RuleSet,
    rng: &mut RandomStream,
    diagnostics: &mut Diagnostics,
) -> bool {
    let Some(node) = graph.node(id) else {
        return false;
    };
    let (row, current) = (node.row, node.node_type);

    let mut eligible = eligible_types(graph, id, act, rules, |_| true);
    if eligible.len() > 1 {
        eligible.retain(|&kind| kind != current);
    }
    let next = sample_type(rules, row, &eligible, rng, diagnostics)
        .unwrap_or(rules.spacing.fallback_type);
    debug!(node = %id, from = %current, to = %next, "repair retype");
    graph.set_node_type(id, next);
    next != current
}
