//! Lazy resolution of Unknown nodes with pity-weighted odds.
//!
//! Battle, Treasure and Shop are tried in that order against a single draw,
//! each taking its share of the mass the earlier ones left over. A miss on
//! all three yields Event (or the rule set's fallback type). Pity makes a
//! type likelier every time it is not picked and resets once it is.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::act::ActSpecification;
use crate::error::ResolveError;
use crate::rng::RandomStream;
use crate::rules::RuleSet;
use crate::types::{Node, NodeType};

pub const RESOLVED_TAG: &str = "resolved";

/// Types drawn for, in draw order.
const DRAW_ORDER: [NodeType; 3] = [NodeType::Battle, NodeType::Treasure, NodeType::Shop];

/// Types that accumulate pity.
const PITY_TYPES: [NodeType; 4] =
    [NodeType::Event, NodeType::Battle, NodeType::Shop, NodeType::Treasure];

/// Bad-luck protection counters. Owned by the run and persisted by the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PityState {
    pub pity_accumulated: BTreeMap<NodeType, u32>,
}

impl Default for PityState {
    fn default() -> Self {
        Self { pity_accumulated: PITY_TYPES.into_iter().map(|kind| (kind, 0)).collect() }
    }
}

impl PityState {
    pub fn get(&self, node_type: NodeType) -> u32 {
        self.pity_accumulated.get(&node_type).copied().unwrap_or(0)
    }

    /// Resets `chosen` and bumps every other tracked type up to its cap.
    pub fn record(&mut self, chosen: NodeType, rules: &RuleSet) {
        for kind in PITY_TYPES {
            let Some(params) = rules.unknown.params(kind) else {
                continue;
            };
            let next = if kind == chosen {
                0
            } else {
                self.get(kind).saturating_add(params.pity_increment).min(params.pity_cap)
            };
            self.pity_accumulated.insert(kind, next);
        }
    }
}

/// Multiplicative weight scalars set by game-state effects. Missing types
/// default to 1.0.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UnknownContext {
    pub modifiers: BTreeMap<NodeType, f64>,
}

impl UnknownContext {
    pub fn with_modifier(mut self, node_type: NodeType, modifier: f64) -> Self {
        self.modifiers.insert(node_type, modifier);
        self
    }

    pub fn modifier(&self, node_type: NodeType) -> f64 {
        self.modifiers.get(&node_type).copied().unwrap_or(1.0)
    }
}

/// Chance of `node_type` before the residual split, in `[0, 1]`.
pub fn proc_chance(
    node_type: NodeType,
    rules: &RuleSet,
    pity: &PityState,
    context: &UnknownContext,
) -> f64 {
    let Some(params) = rules.unknown.params(node_type) else {
        return 0.0;
    };
    let base = params.base_chance + params.chance_per_pity * f64::from(pity.get(node_type));
    let scaled = base.clamp(0.0, 1.0) * context.modifier(node_type);
    if scaled.is_finite() { scaled.clamp(0.0, 1.0) } else { 0.0 }
}

/// Resolves `node` once, irreversibly. Updates `pity` exactly once on
/// success and leaves everything untouched on error.
pub fn resolve_unknown(
    node: &mut Node,
    act: &ActSpecification,
    rules: &RuleSet,
    rng: &mut RandomStream,
    pity: &mut PityState,
    context: &UnknownContext,
) -> Result<NodeType, ResolveError> {
    if node.node_type != NodeType::Unknown {
        return Err(ResolveError::AlreadyResolved { node: node.id, node_type: node.node_type });
    }
    if node.row >= act.rows {
        return Err(ResolveError::OutsideAct { node: node.id, row: node.row, rows: act.rows });
    }

    let roll = rng.next_f64();
    let mut remaining = 1.0_f64;
    let mut offset = 0.0_f64;
    let mut chosen = None;
    for kind in DRAW_ORDER {
        let share = proc_chance(kind, rules, pity, context).min(remaining);
        if roll < offset + share {
            chosen = Some(kind);
            break;
        }
        offset += share;
        remaining -= share;
    }
    let resolved = chosen.unwrap_or(if rules.unknown.fallback_to_event {
        NodeType::Event
    } else {
        rules.spacing.fallback_type
    });

    pity.record(resolved, rules);
    node.node_type = resolved;
    node.tags.insert(RESOLVED_TAG.to_string());
    node.meta.insert("resolved_from".to_string(), NodeType::Unknown.to_string());
    node.meta.insert("resolved_in_act".to_string(), act.act_id.to_string());
    debug!(node = %node.id, %resolved, roll, "unknown node resolved");
    Ok(resolved)
}
