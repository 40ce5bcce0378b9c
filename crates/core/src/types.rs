//! Map data model: node kinds, nodes, edges, and the owning graph.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeType {
    Battle,
    Elite,
    Port,
    Shop,
    Treasure,
    Event,
    Unknown,
    Boss,
}

impl NodeType {
    pub const ALL: [NodeType; 8] = [
        NodeType::Battle,
        NodeType::Elite,
        NodeType::Port,
        NodeType::Shop,
        NodeType::Treasure,
        NodeType::Event,
        NodeType::Unknown,
        NodeType::Boss,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Battle => "Battle",
            NodeType::Elite => "Elite",
            NodeType::Port => "Port",
            NodeType::Shop => "Shop",
            NodeType::Treasure => "Treasure",
            NodeType::Event => "Event",
            NodeType::Unknown => "Unknown",
            NodeType::Boss => "Boss",
        }
    }

    /// Single-character glyph used by the text map printer.
    pub fn glyph(self) -> char {
        match self {
            NodeType::Battle => 'B',
            NodeType::Elite => 'E',
            NodeType::Port => 'P',
            NodeType::Shop => '$',
            NodeType::Treasure => 'T',
            NodeType::Event => '!',
            NodeType::Unknown => '?',
            NodeType::Boss => 'X',
        }
    }

    fn code(self) -> u8 {
        match self {
            NodeType::Battle => 0,
            NodeType::Elite => 1,
            NodeType::Port => 2,
            NodeType::Shop => 3,
            NodeType::Treasure => 4,
            NodeType::Event => 5,
            NodeType::Unknown => 6,
            NodeType::Boss => 7,
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        NodeType::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(raw))
            .ok_or_else(|| format!("unknown node type '{raw}'"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub row: usize,
    pub col: usize,
    pub node_type: NodeType,
    pub tags: BTreeSet<String>,
    pub meta: BTreeMap<String, String>,
    pub path_indices: BTreeSet<u8>,
}

impl Node {
    pub fn placeholder(id: NodeId, row: usize, col: usize) -> Self {
        Self {
            id,
            row,
            col,
            node_type: NodeType::Unknown,
            tags: BTreeSet::new(),
            meta: BTreeMap::new(),
            path_indices: BTreeSet::new(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// Directed edge; `row(to) == row(from) + 1` always holds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub path_indices: BTreeSet<u8>,
}

/// Layered map owning every node and edge. Nodes stay sorted by id, which
/// is row-major because ids are `row * columns + col`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapGraph {
    pub rows: usize,
    pub columns: usize,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl MapGraph {
    pub fn empty(rows: usize, columns: usize) -> Self {
        Self { rows, columns, nodes: Vec::new(), edges: Vec::new() }
    }

    /// Full rows x columns lattice of placeholder nodes and no edges.
    pub fn lattice(rows: usize, columns: usize) -> Self {
        let mut graph = Self::empty(rows, columns);
        for row in 0..rows {
            for col in 0..columns {
                let id = graph.node_id_at(row, col);
                graph.nodes.push(Node::placeholder(id, row, col));
            }
        }
        graph
    }

    pub fn node_id_at(&self, row: usize, col: usize) -> NodeId {
        NodeId((row * self.columns + col) as u32)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.binary_search_by_key(&id, |node| node.id).ok().map(|index| &self.nodes[index])
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        match self.nodes.binary_search_by_key(&id, |node| node.id) {
            Ok(index) => Some(&mut self.nodes[index]),
            Err(_) => None,
        }
    }

    pub fn node_at(&self, row: usize, col: usize) -> Option<&Node> {
        if row >= self.rows || col >= self.columns {
            return None;
        }
        self.node(self.node_id_at(row, col))
    }

    /// Inserts `node` keeping id order. Replaces an existing node with the same id.
    pub fn insert_node(&mut self, node: Node) {
        match self.nodes.binary_search_by_key(&node.id, |existing| existing.id) {
            Ok(index) => self.nodes[index] = node,
            Err(index) => self.nodes.insert(index, node),
        }
    }

    pub fn node_type(&self, id: NodeId) -> Option<NodeType> {
        self.node(id).map(|node| node.node_type)
    }

    pub fn set_node_type(&mut self, id: NodeId, node_type: NodeType) {
        if let Some(node) = self.node_mut(id) {
            node.node_type = node_type;
        }
    }

    pub fn nodes_in_row(&self, row: usize) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().filter(move |node| node.row == row)
    }

    pub fn edge_between(&self, from: NodeId, to: NodeId) -> Option<&Edge> {
        self.edges.iter().find(|edge| edge.from == from && edge.to == to)
    }

    /// Adds `from -> to` for `path_index`, merging into an existing edge.
    pub fn connect(&mut self, from: NodeId, to: NodeId, path_index: Option<u8>) -> EdgeId {
        if let Some(edge) = self.edges.iter_mut().find(|edge| edge.from == from && edge.to == to) {
            edge.path_indices.extend(path_index);
            return edge.id;
        }
        let id = EdgeId(self.edges.iter().map(|edge| edge.id.0 + 1).max().unwrap_or(0));
        self.edges.push(Edge { id, from, to, path_indices: path_index.into_iter().collect() });
        id
    }

    pub fn parents(&self, id: NodeId) -> Vec<NodeId> {
        self.edges.iter().filter(|edge| edge.to == id).map(|edge| edge.from).collect()
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.edges.iter().filter(|edge| edge.from == id).map(|edge| edge.to).collect()
    }

    /// Children of every node, in edge order. Nodes without children are absent.
    pub fn child_lists(&self) -> BTreeMap<NodeId, Vec<NodeId>> {
        let mut lists: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        for edge in &self.edges {
            lists.entry(edge.from).or_default().push(edge.to);
        }
        lists
    }

    pub fn bosses(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().filter(|node| node.node_type == NodeType::Boss)
    }

    /// Ids reachable from `start` by following edges forward, `start` included.
    pub fn reachable_from(&self, start: NodeId) -> BTreeSet<NodeId> {
        let mut seen = BTreeSet::from([start]);
        let mut open = VecDeque::from([start]);
        while let Some(current) = open.pop_front() {
            for next in self.children(current) {
                if seen.insert(next) {
                    open.push_back(next);
                }
            }
        }
        seen
    }

    /// Drops every node and edge not named in the used sets.
    pub fn retain_used(&mut self, used_nodes: &BTreeSet<NodeId>, used_edges: &BTreeSet<EdgeId>) {
        self.nodes.retain(|node| used_nodes.contains(&node.id));
        self.edges.retain(|edge| {
            used_edges.contains(&edge.id)
                && used_nodes.contains(&edge.from)
                && used_nodes.contains(&edge.to)
        });
    }

    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend((self.rows as u32).to_le_bytes());
        bytes.extend((self.columns as u32).to_le_bytes());

        bytes.extend((self.nodes.len() as u32).to_le_bytes());
        for node in &self.nodes {
            bytes.extend(node.id.0.to_le_bytes());
            bytes.extend((node.row as u32).to_le_bytes());
            bytes.extend((node.col as u32).to_le_bytes());
            bytes.push(node.node_type.code());
            bytes.extend((node.path_indices.len() as u32).to_le_bytes());
            bytes.extend(node.path_indices.iter().copied());
            bytes.extend((node.tags.len() as u32).to_le_bytes());
            for tag in &node.tags {
                push_str(&mut bytes, tag);
            }
            bytes.extend((node.meta.len() as u32).to_le_bytes());
            for (key, value) in &node.meta {
                push_str(&mut bytes, key);
                push_str(&mut bytes, value);
            }
        }

        bytes.extend((self.edges.len() as u32).to_le_bytes());
        for edge in &self.edges {
            bytes.extend(edge.id.0.to_le_bytes());
            bytes.extend(edge.from.0.to_le_bytes());
            bytes.extend(edge.to.0.to_le_bytes());
            bytes.extend((edge.path_indices.len() as u32).to_le_bytes());
            bytes.extend(edge.path_indices.iter().copied());
        }

        bytes
    }

    pub fn fingerprint(&self) -> u64 {
        xxh3_64(&self.canonical_bytes())
    }

    /// Text rendering, boss row first. Empty lattice cells print as `.`.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for row in (0..self.rows).rev() {
            out.push_str(&format!("{row:>3} "));
            for col in 0..self.columns {
                let glyph = self.node_at(row, col).map_or('.', |node| node.node_type.glyph());
                out.push(' ');
                out.push(glyph);
            }
            out.push('\n');
        }
        out
    }
}

fn push_str(bytes: &mut Vec<u8>, value: &str) {
    bytes.extend((value.len() as u32).to_le_bytes());
    bytes.extend(value.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_row_graph() -> MapGraph {
        let mut graph = MapGraph::lattice(2, 3);
        let a = graph.node_id_at(0, 1);
        let b = graph.node_id_at(1, 0);
        let c = graph.node_id_at(1, 2);
        graph.connect(a, b, Some(0));
        graph.connect(a, c, Some(1));
        graph
    }

    #[test]
    fn node_type_parses_case_insensitively() {
        assert_eq!("elite".parse::<NodeType>(), Ok(NodeType::Elite));
        assert_eq!("Treasure".parse::<NodeType>(), Ok(NodeType::Treasure));
        assert!("dragon".parse::<NodeType>().is_err());
    }

    #[test]
    fn connect_merges_path_indices_on_repeated_edges() {
        let mut graph = MapGraph::lattice(2, 3);
        let from = graph.node_id_at(0, 1);
        let to = graph.node_id_at(1, 1);
        let first = graph.connect(from, to, Some(0));
        let second = graph.connect(from, to, Some(3));
        assert_eq!(first, second);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].path_indices, BTreeSet::from([0, 3]));
    }

    #[test]
    fn retain_used_prunes_unused_nodes_and_their_edges() {
        let mut graph = two_row_graph();
        let keep = BTreeSet::from([graph.node_id_at(0, 1), graph.node_id_at(1, 0)]);
        let edges = graph.edges.iter().map(|edge| edge.id).collect();
        graph.retain_used(&keep, &edges);
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert!(graph.node_at(1, 2).is_none());
    }

    #[test]
    fn insert_node_keeps_id_order() {
        let mut graph = MapGraph::empty(3, 3);
        graph.insert_node(Node::placeholder(NodeId(7), 2, 1));
        graph.insert_node(Node::placeholder(NodeId(1), 0, 1));
        graph.insert_node(Node::placeholder(NodeId(4), 1, 1));
        let ids: Vec<u32> = graph.nodes.iter().map(|node| node.id.0).collect();
        assert_eq!(ids, vec![1, 4, 7]);
        assert_eq!(graph.node_at(1, 1).map(|node| node.id), Some(NodeId(4)));
    }

    #[test]
    fn reachable_from_follows_edges_forward_only() {
        let graph = two_row_graph();
        let reached = graph.reachable_from(graph.node_id_at(0, 1));
        assert_eq!(reached.len(), 3);
        let from_child = graph.reachable_from(graph.node_id_at(1, 0));
        assert_eq!(from_child.len(), 1);
    }

    #[test]
    fn fingerprint_changes_when_a_node_type_changes() {
        let mut graph = two_row_graph();
        let before = graph.fingerprint();
        graph.set_node_type(graph.node_id_at(1, 0), NodeType::Elite);
        assert_ne!(before, graph.fingerprint());
    }
}
