//! Skeleton weaving: grows `PATH_COUNT` non-crossing paths from row 0 into
//! the single boss column, backtracking on dead ends.

use std::collections::BTreeSet;

use tracing::{debug, error};

use crate::act::{ActSpecification, PATH_COUNT};
use crate::rng::RandomStream;
use crate::types::{EdgeId, MapGraph, NodeId};

pub(super) const MAX_TOTAL_RESTARTS: u32 = 500;

pub(super) struct WeaveOutcome {
    pub(super) graph: MapGraph,
    pub(super) completed_paths: usize,
    pub(super) restarts: u32,
}

impl WeaveOutcome {
    pub(super) fn is_complete(&self) -> bool {
        self.completed_paths == PATH_COUNT
    }
}

/// One committed edge, as a column move out of `row`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Step {
    row: usize,
    from: usize,
    to: usize,
}

impl Step {
    fn crosses(self, other: Step) -> bool {
        self.row == other.row
            && ((self.from < other.from && self.to > other.to)
                || (self.from > other.from && self.to < other.to))
    }
}

/// Choice made when leaving `row`, with the untried candidates in order.
struct Decision {
    row: usize,
    alternatives: Vec<usize>,
}

pub(super) fn weave_skeleton(act: &ActSpecification, rng: &mut RandomStream) -> WeaveOutcome {
    let mut graph = MapGraph::lattice(act.rows, act.columns);
    let mut used_nodes: BTreeSet<NodeId> = BTreeSet::new();
    let mut used_edges: BTreeSet<EdgeId> = BTreeSet::new();
    let mut steps: Vec<Step> = Vec::new();
    let mut start_columns: Vec<usize> = Vec::new();
    let distinct_starts = act.distinct_start_paths();
    let mut restarts = 0_u32;
    let mut completed_paths = 0_usize;

    'paths: for path_index in 0..PATH_COUNT {
        loop {
            let must_differ = path_index < distinct_starts;
            let Some(start) = pick_start_column(act, rng, &start_columns, must_differ) else {
                error!(path_index, "no free start column left for path");
                break 'paths;
            };

            if let Some(columns) = grow_path(act, rng, start, &steps) {
                commit_path(
                    &mut graph,
                    path_index as u8,
                    &columns,
                    &mut used_nodes,
                    &mut used_edges,
                    &mut steps,
                );
                start_columns.push(start);
                completed_paths += 1;
                continue 'paths;
            }

            restarts += 1;
            if restarts >= MAX_TOTAL_RESTARTS {
                error!(
                    restarts,
                    completed_paths, "skeleton weaving exhausted its restart budget"
                );
                break 'paths;
            }
            debug!(path_index, start, restarts, "path attempt failed; restarting");
        }
    }

    graph.retain_used(&used_nodes, &used_edges);
    debug!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        restarts,
        "skeleton woven"
    );
    WeaveOutcome { graph, completed_paths, restarts }
}

fn pick_start_column(
    act: &ActSpecification,
    rng: &mut RandomStream,
    taken: &[usize],
    must_differ: bool,
) -> Option<usize> {
    let free: Vec<usize> =
        (0..act.columns).filter(|col| !must_differ || !taken.contains(col)).collect();
    rng.choose(&free).copied()
}

/// Column per row for one path from `start` to the boss, or `None` once the
/// decision stack is exhausted.
fn grow_path(
    act: &ActSpecification,
    rng: &mut RandomStream,
    start: usize,
    placed: &[Step],
) -> Option<Vec<usize>> {
    let mut columns = vec![start];
    let mut stack: Vec<Decision> = Vec::new();

    while columns.len() < act.rows {
        let row = columns.len() - 1;
        let current = columns[row];
        let mut candidates = ordered_candidates(act, rng, row, current);
        candidates.retain(|&next| {
            let step = Step { row, from: current, to: next };
            !placed.iter().any(|&other| step.crosses(other))
        });

        if candidates.is_empty() {
            loop {
                let mut decision = stack.pop()?;
                if decision.alternatives.is_empty() {
                    continue;
                }
                let next = decision.alternatives.remove(0);
                columns.truncate(decision.row + 1);
                columns.push(next);
                stack.push(decision);
                break;
            }
            continue;
        }

        let next = candidates.remove(rng.range_usize(0, candidates.len()));
        stack.push(Decision { row, alternatives: candidates });
        columns.push(next);
    }

    Some(columns)
}

/// Straight ahead first, then the two diagonals in random order. The row
/// before the boss may only step into the boss column.
fn ordered_candidates(
    act: &ActSpecification,
    rng: &mut RandomStream,
    row: usize,
    current: usize,
) -> Vec<usize> {
    if row + 1 == act.boss_row() {
        return vec![act.boss_column()];
    }
    let mut diagonals: Vec<usize> =
        [current.checked_sub(1), Some(current + 1).filter(|&col| col < act.columns)]
            .into_iter()
            .flatten()
            .collect();
    rng.shuffle(&mut diagonals);
    let mut candidates = vec![current];
    candidates.extend(diagonals);
    candidates
}

fn commit_path(
    graph: &mut MapGraph,
    path_index: u8,
    columns: &[usize],
    used_nodes: &mut BTreeSet<NodeId>,
    used_edges: &mut BTreeSet<EdgeId>,
    steps: &mut Vec<Step>,
) {
    for (row, &col) in columns.iter().enumerate() {
        let id = graph.node_id_at(row, col);
        if let Some(node) = graph.node_mut(id) {
            node.path_indices.insert(path_index);
        }
        used_nodes.insert(id);
    }
    for (row, pair) in columns.windows(2).enumerate() {
        let from = graph.node_id_at(row, pair[0]);
        let to = graph.node_id_at(row + 1, pair[1]);
        used_edges.insert(graph.connect(from, to, Some(path_index)));
        let step = Step { row, from: pair[0], to: pair[1] };
        if !steps.contains(&step) {
            steps.push(step);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weave(seed: u64, rows: usize, columns: usize) -> WeaveOutcome {
        let act = ActSpecification::new(1, rows, columns);
        weave_skeleton(&act, &mut RandomStream::new(seed))
    }

    #[test]
    fn crossing_predicate_matches_definition() {
        let a = Step { row: 2, from: 1, to: 2 };
        let b = Step { row: 2, from: 2, to: 1 };
        assert!(a.crosses(b));
        assert!(b.crosses(a));
        assert!(!a.crosses(Step { row: 3, from: 2, to: 1 }));
        assert!(!a.crosses(Step { row: 2, from: 1, to: 1 }));
        assert!(!a.crosses(Step { row: 2, from: 2, to: 2 }));
        assert!(!Step { row: 0, from: 0, to: 3 }.crosses(Step { row: 0, from: 2, to: 3 }));
    }

    #[test]
    fn all_six_paths_complete_without_restarts() {
        for seed in 0..50 {
            let outcome = weave(seed, 15, 7);
            assert!(outcome.is_complete(), "seed {seed} left paths unfinished");
            assert_eq!(outcome.restarts, 0);
        }
    }

    #[test]
    fn woven_graph_converges_on_one_boss_node() {
        let outcome = weave(11, 10, 7);
        let boss_row: Vec<_> = outcome.graph.nodes_in_row(9).collect();
        assert_eq!(boss_row.len(), 1);
        assert_eq!(boss_row[0].col, 3);
        assert_eq!(boss_row[0].path_indices.len(), PATH_COUNT);
    }

    #[test]
    fn first_two_paths_start_in_different_columns() {
        for seed in 0..100 {
            let outcome = weave(seed, 10, 7);
            let start_of = |path: u8| {
                outcome
                    .graph
                    .nodes_in_row(0)
                    .find(|node| node.path_indices.contains(&path))
                    .map(|node| node.col)
            };
            assert_ne!(start_of(0), start_of(1), "seed {seed}");
        }
    }

    #[test]
    fn edges_only_join_consecutive_rows_and_never_cross() {
        for seed in 0..50 {
            let graph = weave(seed, 12, 5).graph;
            let steps: Vec<Step> = graph
                .edges
                .iter()
                .map(|edge| {
                    let from = graph.node(edge.from).expect("edge source kept");
                    let to = graph.node(edge.to).expect("edge target kept");
                    assert_eq!(from.row + 1, to.row);
                    Step { row: from.row, from: from.col, to: to.col }
                })
                .collect();
            for (index, a) in steps.iter().enumerate() {
                for b in &steps[index + 1..] {
                    assert!(!a.crosses(*b), "seed {seed}: {a:?} crosses {b:?}");
                }
            }
        }
    }

    #[test]
    fn pruning_keeps_only_nodes_on_some_path() {
        let graph = weave(5, 15, 7).graph;
        assert!(graph.nodes.len() < 15 * 7);
        for node in &graph.nodes {
            assert!(!node.path_indices.is_empty(), "{:?} is not on any path", node.id);
        }
        for edge in &graph.edges {
            assert!(!edge.path_indices.is_empty());
        }
    }

    #[test]
    fn same_seed_weaves_identical_skeleton() {
        assert_eq!(weave(99, 15, 7).graph, weave(99, 15, 7).graph);
    }

    #[test]
    fn full_branchiness_spreads_starts_over_six_columns() {
        let act = ActSpecification::new(1, 10, 7).with_branchiness(1.0);
        let outcome = weave_skeleton(&act, &mut RandomStream::new(4));
        assert_eq!(outcome.graph.nodes_in_row(0).count(), 6);
    }
}
