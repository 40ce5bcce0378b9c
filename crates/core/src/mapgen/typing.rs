//! Node typing: fixed rows first, then weighted sampling for the rest with
//! whole-graph re-validation on every attempt.

use std::collections::BTreeSet;

use tracing::debug;

use crate::act::ActSpecification;
use crate::audit::{self, is_uniform_fixed_row};
use crate::rng::RandomStream;
use crate::rules::RuleSet;
use crate::types::{MapGraph, Node, NodeId, NodeType};

use super::model::Diagnostics;

pub(super) const FIXED_TAG: &str = "fixed";

/// Types phase 2 may pick. Boss, Port, Treasure and Event only come from
/// fixed rows, repairs, or unknown resolution.
pub(super) const DYNAMIC_TYPES: [NodeType; 4] =
    [NodeType::Battle, NodeType::Elite, NodeType::Shop, NodeType::Unknown];

pub(super) fn assign_types(
    graph: &mut MapGraph,
    act: &ActSpecification,
    rules: &RuleSet,
    rng: &mut RandomStream,
    diagnostics: &mut Diagnostics,
) {
    let mut typed = assign_fixed_types(graph, act, rules);
    assign_remaining_types(graph, act, rules, rng, &mut typed, diagnostics);
}

/// Phase 1. Returns the ids placed so phase 2 skips them.
pub(super) fn assign_fixed_types(
    graph: &mut MapGraph,
    act: &ActSpecification,
    rules: &RuleSet,
) -> BTreeSet<NodeId> {
    let mut typed = BTreeSet::new();

    for id in row_ids(graph, 0) {
        pin(graph, id, NodeType::Battle, &mut typed);
    }

    let boss = ensure_boss(graph, act);
    pin(graph, boss, NodeType::Boss, &mut typed);
    for id in row_ids(graph, act.pre_boss_row()) {
        if graph.edge_between(id, boss).is_none() {
            let paths: Vec<u8> = graph
                .node(id)
                .map(|node| node.path_indices.iter().copied().collect())
                .unwrap_or_default();
            graph.connect(id, boss, paths.first().copied());
            for &path in paths.iter().skip(1) {
                graph.connect(id, boss, Some(path));
            }
            debug!(node = %id, "synthesized missing pre-boss edge");
        }
        pin(graph, id, NodeType::Port, &mut typed);
    }

    for id in row_ids(graph, rules.treasure_row(act.rows)) {
        pin(graph, id, NodeType::Treasure, &mut typed);
    }

    typed
}

/// Boss node at the boss column of the last row, created when an
/// incomplete weave never reached it.
fn ensure_boss(graph: &mut MapGraph, act: &ActSpecification) -> NodeId {
    let id = graph.node_id_at(act.boss_row(), act.boss_column());
    if graph.node(id).is_none() {
        graph.insert_node(Node::placeholder(id, act.boss_row(), act.boss_column()));
    }
    id
}

fn pin(graph: &mut MapGraph, id: NodeId, node_type: NodeType, typed: &mut BTreeSet<NodeId>) {
    if let Some(node) = graph.node_mut(id) {
        node.node_type = node_type;
        node.tags.insert(FIXED_TAG.to_string());
    }
    typed.insert(id);
}

fn row_ids(graph: &MapGraph, row: usize) -> Vec<NodeId> {
    graph.nodes_in_row(row).map(|node| node.id).collect()
}

/// Phase 2, row-major. An attempt stands only if it adds no violation that
/// was absent before it; otherwise the node is rolled back and re-drawn.
fn assign_remaining_types(
    graph: &mut MapGraph,
    act: &ActSpecification,
    rules: &RuleSet,
    rng: &mut RandomStream,
    typed: &mut BTreeSet<NodeId>,
    diagnostics: &mut Diagnostics,
) {
    let pending: Vec<NodeId> =
        graph.nodes.iter().map(|node| node.id).filter(|id| !typed.contains(id)).collect();

    for id in pending {
        let Some(previous) = graph.node_type(id) else {
            continue;
        };
        let baseline = audit::validate(graph, rules, act).violation_set();
        let mut placed = false;

        for attempt in 0..rules.spacing.max_reroll_attempts {
            let eligible = eligible_types(graph, id, act, rules, |other| typed.contains(&other));
            let Some(row) = graph.node(id).map(|node| node.row) else {
                break;
            };
            let Some(candidate) = sample_type(rules, row, &eligible, rng, diagnostics) else {
                break;
            };

            graph.set_node_type(id, candidate);
            let introduced = audit::validate(graph, rules, act)
                .violations
                .into_iter()
                .any(|violation| !baseline.contains(&violation));
            if !introduced {
                placed = true;
                break;
            }
            graph.set_node_type(id, previous);
            debug!(node = %id, %candidate, attempt, "typing attempt rejected");
        }

        if !placed {
            let fallback = rules.spacing.fallback_type;
            graph.set_node_type(id, fallback);
            diagnostics.warn(format!(
                "node {id} fell back to {fallback} after {} re-roll attempts",
                rules.spacing.max_reroll_attempts
            ));
        }
        typed.insert(id);
    }
}

/// Dynamic types `id` may take given its row and its typed neighbours.
pub(super) fn eligible_types(
    graph: &MapGraph,
    id: NodeId,
    act: &ActSpecification,
    rules: &RuleSet,
    is_typed: impl Fn(NodeId) -> bool,
) -> Vec<NodeType> {
    DYNAMIC_TYPES
        .into_iter()
        .filter(|&candidate| type_allowed(graph, id, candidate, act, rules, &is_typed))
        .collect()
}

/// Row bans plus adjacency against neighbours that already carry a type.
pub(super) fn type_allowed(
    graph: &MapGraph,
    id: NodeId,
    candidate: NodeType,
    act: &ActSpecification,
    rules: &RuleSet,
    is_typed: &impl Fn(NodeId) -> bool,
) -> bool {
    let Some(node) = graph.node(id) else {
        return false;
    };
    if candidate == NodeType::Elite && node.row < rules.elite_unlock_row(act.rows) {
        return false;
    }
    if candidate == NodeType::Port
        && rules.bans_port_before_pre_boss(act)
        && node.row + 1 == act.pre_boss_row()
    {
        return false;
    }

    let typed_as = |other: NodeId| is_typed(other) && graph.node_type(other) == Some(candidate);
    let parents = graph.parents(id);
    if rules.structure.no_consecutive.contains(&candidate) {
        if parents.iter().any(|&parent| typed_as(parent)) {
            return false;
        }
        if graph.children(id).into_iter().any(typed_as) {
            return false;
        }
    }

    if rules.distinct_siblings(act) && !is_uniform_fixed_row(node.row, rules, act) {
        for parent in parents {
            if graph.children(parent).into_iter().any(|sibling| sibling != id && typed_as(sibling)) {
                return false;
            }
        }
    }
    true
}

/// Draws from the row band's odds restricted to `eligible`. Falls back to a
/// uniform pick, with a warning, when the band is missing or gives every
/// eligible type zero weight.
pub(super) fn sample_type(
    rules: &RuleSet,
    row: usize,
    eligible: &[NodeType],
    rng: &mut RandomStream,
    diagnostics: &mut Diagnostics,
) -> Option<NodeType> {
    if eligible.is_empty() {
        return None;
    }
    let Some(band) = rules.band_for_row(row) else {
        diagnostics.warn(format!("no row band covers row {row}; sampling uniformly"));
        return rng.choose(eligible).copied();
    };

    let weighted: Vec<(NodeType, u64)> = eligible
        .iter()
        .filter_map(|kind| band.odds.get(kind).map(|&weight| (*kind, u64::from(weight))))
        .filter(|&(_, weight)| weight > 0)
        .collect();
    let total: u64 = weighted.iter().map(|&(_, weight)| weight).sum();
    if total == 0 {
        let names: Vec<&str> = eligible.iter().map(|kind| kind.as_str()).collect();
        diagnostics.warn(format!(
            "band '{}' has no odds for eligible types [{}]; sampling uniformly",
            band.name,
            names.join(", ")
        ));
        return rng.choose(eligible).copied();
    }

    let mut roll = rng.range_u64(0, total);
    for (kind, weight) in weighted {
        if roll < weight {
            return Some(kind);
        }
        roll -= weight;
    }
    None
}
