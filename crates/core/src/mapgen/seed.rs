//! Phase seed derivation so each generation phase draws from its own stream.

use serde::{Deserialize, Serialize};

use crate::rng::{RandomStream, derive_sub_seed};
use crate::types::NodeId;

pub const SKELETON_SALT: &str = "skeleton";
pub const TYPING_SALT: &str = "typing";
pub const REPAIRS_SALT: &str = "repairs";
pub const DECORATIONS_SALT: &str = "decorations";
pub const UNKNOWN_SALT: &str = "unknown";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubSeeds {
    pub skeleton: u64,
    pub typing: u64,
    pub repairs: u64,
    pub decorations: u64,
    pub unknown: u64,
}

impl SubSeeds {
    pub fn derive(run_seed: u64) -> Self {
        Self {
            skeleton: derive_sub_seed(run_seed, SKELETON_SALT),
            typing: derive_sub_seed(run_seed, TYPING_SALT),
            repairs: derive_sub_seed(run_seed, REPAIRS_SALT),
            decorations: derive_sub_seed(run_seed, DECORATIONS_SALT),
            unknown: derive_sub_seed(run_seed, UNKNOWN_SALT),
        }
    }
}

/// Seed owned by one node within a phase, keyed by the node id.
pub fn node_seed(phase_seed: u64, node: NodeId) -> u64 {
    derive_sub_seed(phase_seed, &format!("node:{}", node.0))
}

/// Stream for resolving one Unknown node. Keyed by node id so resolution
/// order never changes another node's outcome.
pub fn unknown_stream_for_node(run_seed: u64, node: NodeId) -> RandomStream {
    RandomStream::derive_stream(node_seed(derive_sub_seed(run_seed, UNKNOWN_SALT), node))
}
