//! Rule audit over a whole map graph.
//!
//! `validate` is stateless and never short-circuits: every check runs and
//! every failure is reported as a `Violation`. A violation is data, not an
//! error; callers decide what an invalid map means for them.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::act::ActSpecification;
use crate::rules::RuleSet;
use crate::types::{MapGraph, NodeId, NodeType};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Violation {
    NoStartNodes,
    BossUnreachable { start: NodeId },
    MissingPreBossPort { row: usize },
    MissingMidActTreasure { min_row: usize, max_row: usize },
    BossCount { found: usize },
    BossOffLastRow { node: NodeId, row: usize },
    SpacingTooClose { node_type: NodeType, earlier: NodeId, later: NodeId, gap: usize, required: usize },
    EliteTooEarly { node: NodeId, row: usize, unlock_row: usize },
    PreBossNotPort { node: NodeId, node_type: NodeType },
    PreBossMissingBossEdge { node: NodeId },
    ForeignBossFeeder { node: NodeId, row: usize },
    ConsecutiveType { from: NodeId, to: NodeId, node_type: NodeType },
    MatchingSiblings { parent: NodeId, first: NodeId, second: NodeId, node_type: NodeType },
    PortBeforePreBoss { node: NodeId, row: usize },
}

impl Violation {
    /// Node the violation is pinned to, when there is a single culprit.
    pub fn culprit(&self) -> Option<NodeId> {
        match *self {
            Violation::SpacingTooClose { later, .. } => Some(later),
            Violation::EliteTooEarly { node, .. }
            | Violation::PreBossNotPort { node, .. }
            | Violation::PortBeforePreBoss { node, .. } => Some(node),
            Violation::ConsecutiveType { to, .. } => Some(to),
            Violation::MatchingSiblings { second, .. } => Some(second),
            _ => None,
        }
    }

    /// Every node a retype could fix the violation through, culprit first.
    pub fn suspects(&self) -> Vec<NodeId> {
        match *self {
            Violation::SpacingTooClose { earlier, later, .. } => vec![later, earlier],
            Violation::ConsecutiveType { from, to, .. } => vec![to, from],
            Violation::MatchingSiblings { first, second, .. } => vec![second, first],
            _ => self.culprit().into_iter().collect(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoStartNodes => write!(f, "connectivity: no nodes on row 0"),
            Self::BossUnreachable { start } => {
                write!(f, "connectivity: boss is not reachable from start node {start}")
            }
            Self::MissingPreBossPort { row } => {
                write!(f, "pre-boss port: no Port on row {row}")
            }
            Self::MissingMidActTreasure { min_row, max_row } => {
                write!(f, "mid-act treasure: no Treasure between rows {min_row} and {max_row}")
            }
            Self::BossCount { found } => write!(f, "boss count: expected exactly 1, found {found}"),
            Self::BossOffLastRow { node, row } => {
                write!(f, "boss count: boss {node} sits on row {row} instead of the last row")
            }
            Self::SpacingTooClose { node_type, earlier, later, gap, required } => write!(
                f,
                "spacing: {node_type} {later} is {gap} rows after {node_type} {earlier}, minimum is {required}"
            ),
            Self::EliteTooEarly { node, row, unlock_row } => {
                write!(f, "elite unlock: Elite {node} on row {row}, elites unlock at row {unlock_row}")
            }
            Self::PreBossNotPort { node, node_type } => {
                write!(f, "boss feed: pre-boss node {node} is {node_type}, expected Port")
            }
            Self::PreBossMissingBossEdge { node } => {
                write!(f, "boss feed: pre-boss node {node} has no edge to the boss")
            }
            Self::ForeignBossFeeder { node, row } => {
                write!(f, "boss feed: node {node} on row {row} feeds the boss")
            }
            Self::ConsecutiveType { from, to, node_type } => {
                write!(f, "adjacency: {node_type} {from} leads straight into {node_type} {to}")
            }
            Self::MatchingSiblings { parent, first, second, node_type } => write!(
                f,
                "adjacency: children {first} and {second} of {parent} are both {node_type}"
            ),
            Self::PortBeforePreBoss { node, row } => {
                write!(f, "structure: Port {node} on banned row {row}")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub is_valid: bool,
    pub violations: Vec<Violation>,
}

impl AuditReport {
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        Self { is_valid: violations.is_empty(), violations }
    }

    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }

    pub fn violation_set(&self) -> BTreeSet<Violation> {
        self.violations.iter().cloned().collect()
    }
}

pub fn validate(graph: &MapGraph, rules: &RuleSet, act: &ActSpecification) -> AuditReport {
    let children = graph.child_lists();
    let mut violations = Vec::new();
    check_connectivity(graph, &children, &mut violations);
    check_pre_boss_port_exists(graph, act, &mut violations);
    check_mid_act_treasure(graph, rules, act, &mut violations);
    check_single_boss(graph, act, &mut violations);
    check_spacing(graph, &children, rules, &mut violations);
    check_elite_unlock(graph, rules, act, &mut violations);
    check_boss_feed(graph, &children, act, &mut violations);
    check_adjacency(graph, &children, rules, act, &mut violations);
    check_structural_bans(graph, rules, act, &mut violations);
    AuditReport::from_violations(violations)
}

type ChildLists = BTreeMap<NodeId, Vec<NodeId>>;

fn children_of(children: &ChildLists, id: NodeId) -> &[NodeId] {
    children.get(&id).map_or(&[], Vec::as_slice)
}

fn check_connectivity(graph: &MapGraph, children: &ChildLists, violations: &mut Vec<Violation>) {
    let starts: Vec<NodeId> = graph.nodes_in_row(0).map(|node| node.id).collect();
    if starts.is_empty() {
        violations.push(Violation::NoStartNodes);
        return;
    }
    let bosses: BTreeSet<NodeId> = graph.bosses().map(|node| node.id).collect();
    for start in starts {
        let mut seen = BTreeSet::from([start]);
        let mut open = VecDeque::from([start]);
        let mut reached_boss = bosses.contains(&start);
        while let Some(current) = open.pop_front() {
            if reached_boss {
                break;
            }
            for &next in children_of(children, current) {
                if bosses.contains(&next) {
                    reached_boss = true;
                }
                if seen.insert(next) {
                    open.push_back(next);
                }
            }
        }
        if !reached_boss {
            violations.push(Violation::BossUnreachable { start });
        }
    }
}

fn check_pre_boss_port_exists(
    graph: &MapGraph,
    act: &ActSpecification,
    violations: &mut Vec<Violation>,
) {
    let row = act.pre_boss_row();
    if !graph.nodes_in_row(row).any(|node| node.node_type == NodeType::Port) {
        violations.push(Violation::MissingPreBossPort { row });
    }
}

fn check_mid_act_treasure(
    graph: &MapGraph,
    rules: &RuleSet,
    act: &ActSpecification,
    violations: &mut Vec<Violation>,
) {
    let (min_row, max_row) = rules.treasure_window(act.rows);
    let found = graph.nodes.iter().any(|node| {
        node.node_type == NodeType::Treasure && (min_row..=max_row).contains(&node.row)
    });
    if !found {
        violations.push(Violation::MissingMidActTreasure { min_row, max_row });
    }
}

fn check_single_boss(graph: &MapGraph, act: &ActSpecification, violations: &mut Vec<Violation>) {
    let found = graph.bosses().count();
    if found != 1 {
        violations.push(Violation::BossCount { found });
    }
    for boss in graph.bosses().filter(|boss| boss.row != act.boss_row()) {
        violations.push(Violation::BossOffLastRow { node: boss.id, row: boss.row });
    }
}

/// Same-typed spaced nodes joined by a directed route must be `required`
/// rows apart. The check is per route: two nodes no single walk can visit
/// are never compared, however close their rows are.
fn check_spacing(
    graph: &MapGraph,
    children: &ChildLists,
    rules: &RuleSet,
    violations: &mut Vec<Violation>,
) {
    for node in &graph.nodes {
        let Some(required) = rules.min_gap(node.node_type) else {
            continue;
        };
        if required <= 1 {
            continue;
        }

        let mut seen = BTreeSet::from([node.id]);
        let mut open = VecDeque::from([node.id]);
        while let Some(current) = open.pop_front() {
            for &child in children_of(children, current) {
                let Some(child_node) = graph.node(child) else {
                    continue;
                };
                let gap = child_node.row.saturating_sub(node.row);
                if gap >= required || !seen.insert(child) {
                    continue;
                }
                if child_node.node_type == node.node_type {
                    violations.push(Violation::SpacingTooClose {
                        node_type: node.node_type,
                        earlier: node.id,
                        later: child,
                        gap,
                        required,
                    });
                }
                open.push_back(child);
            }
        }
    }
}

fn check_elite_unlock(
    graph: &MapGraph,
    rules: &RuleSet,
    act: &ActSpecification,
    violations: &mut Vec<Violation>,
) {
    let unlock_row = rules.elite_unlock_row(act.rows);
    for node in &graph.nodes {
        if node.node_type == NodeType::Elite && node.row < unlock_row {
            violations.push(Violation::EliteTooEarly { node: node.id, row: node.row, unlock_row });
        }
    }
}

fn check_boss_feed(
    graph: &MapGraph,
    children: &ChildLists,
    act: &ActSpecification,
    violations: &mut Vec<Violation>,
) {
    let pre_boss_row = act.pre_boss_row();
    let bosses: BTreeSet<NodeId> = graph.bosses().map(|node| node.id).collect();

    for node in graph.nodes_in_row(pre_boss_row) {
        if node.node_type != NodeType::Port {
            violations.push(Violation::PreBossNotPort { node: node.id, node_type: node.node_type });
        }
        if !children_of(children, node.id).iter().any(|child| bosses.contains(child)) {
            violations.push(Violation::PreBossMissingBossEdge { node: node.id });
        }
    }

    for edge in graph.edges.iter().filter(|edge| bosses.contains(&edge.to)) {
        if let Some(feeder) = graph.node(edge.from)
            && feeder.row != pre_boss_row
        {
            violations.push(Violation::ForeignBossFeeder { node: feeder.id, row: feeder.row });
        }
    }
}

fn check_adjacency(
    graph: &MapGraph,
    children: &ChildLists,
    rules: &RuleSet,
    act: &ActSpecification,
    violations: &mut Vec<Violation>,
) {
    for edge in &graph.edges {
        let (Some(from), Some(to)) = (graph.node_type(edge.from), graph.node_type(edge.to)) else {
            continue;
        };
        if from == to && rules.structure.no_consecutive.contains(&from) {
            violations.push(Violation::ConsecutiveType {
                from: edge.from,
                to: edge.to,
                node_type: from,
            });
        }
    }

    if !rules.distinct_siblings(act) {
        return;
    }
    for parent in &graph.nodes {
        let siblings = children_of(children, parent.id);
        for (index, &first) in siblings.iter().enumerate() {
            for &second in &siblings[index + 1..] {
                let (Some(a), Some(b)) = (graph.node(first), graph.node(second)) else {
                    continue;
                };
                if a.node_type == b.node_type && !is_uniform_fixed_row(a.row, rules, act) {
                    let (first, second) = if first < second { (first, second) } else { (second, first) };
                    violations.push(Violation::MatchingSiblings {
                        parent: parent.id,
                        first,
                        second,
                        node_type: a.node_type,
                    });
                }
            }
        }
    }
}

fn check_structural_bans(
    graph: &MapGraph,
    rules: &RuleSet,
    act: &ActSpecification,
    violations: &mut Vec<Violation>,
) {
    if !rules.bans_port_before_pre_boss(act) {
        return;
    }
    let banned_row = act.pre_boss_row().saturating_sub(1);
    for node in graph.nodes_in_row(banned_row) {
        if node.node_type == NodeType::Port {
            violations.push(Violation::PortBeforePreBoss { node: node.id, row: banned_row });
        }
    }
}

/// Rows whose every node is pinned to one type by the fixed assignment.
pub fn is_uniform_fixed_row(row: usize, rules: &RuleSet, act: &ActSpecification) -> bool {
    row == 0 || row == rules.treasure_row(act.rows) || row == act.pre_boss_row() || row == act.boss_row()
}
