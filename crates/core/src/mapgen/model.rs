//! Generation output and the warning collector shared by the phases.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::audit::AuditReport;
use crate::types::MapGraph;

use super::seed::SubSeeds;

/// The engine's sole output. Never mutated after construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub graph: MapGraph,
    pub audits: AuditReport,
    pub seed: u64,
    pub sub_seeds: SubSeeds,
    pub warnings: Vec<String>,
    pub repair_iterations: u32,
}

impl GenerationResult {
    pub fn is_valid(&self) -> bool {
        self.audits.is_valid
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

/// Collects degraded-path diagnostics as data. Each distinct message is
/// logged once and kept once, in first-seen order.
#[derive(Debug, Default)]
pub(super) struct Diagnostics {
    warnings: Vec<String>,
}

impl Diagnostics {
    pub(super) fn warn(&mut self, message: String) {
        if self.warnings.contains(&message) {
            return;
        }
        warn!(%message, "map generation degraded");
        self.warnings.push(message);
    }

    pub(super) fn into_warnings(self) -> Vec<String> {
        self.warnings
    }
}
