//! High-level act generation: weave, type, audit, repair, decorate.

use tracing::debug;

use crate::act::{ActSpecification, PATH_COUNT};
use crate::audit::{self, AuditReport};
use crate::error::ConfigError;
use crate::rng::RandomStream;
use crate::rules::RuleSet;
use crate::types::MapGraph;

use super::decorate::decorate;
use super::model::{Diagnostics, GenerationResult};
use super::repair::{Repair, apply_repair, choose_repair};
use super::seed::SubSeeds;
use super::skeleton::weave_skeleton;
use super::typing::assign_types;

pub const DEFAULT_MAX_REPAIR_ITERATIONS: u32 = 50;

pub struct MapGenerator {
    act: ActSpecification,
    rules: RuleSet,
    max_repair_iterations: u32,
}

/// Phase streams for one `generate` call.
struct PhaseStreams {
    skeleton: RandomStream,
    typing: RandomStream,
    repairs: RandomStream,
}

impl PhaseStreams {
    fn new(sub_seeds: &SubSeeds) -> Self {
        Self {
            skeleton: RandomStream::derive_stream(sub_seeds.skeleton),
            typing: RandomStream::derive_stream(sub_seeds.typing),
            repairs: RandomStream::derive_stream(sub_seeds.repairs),
        }
    }
}

impl MapGenerator {
    /// Validates both inputs up front so `generate` itself cannot fail.
    pub fn new(act: ActSpecification, rules: RuleSet) -> Result<Self, ConfigError> {
        rules.validate()?;
        act.validate(&rules)?;
        Ok(Self { act, rules, max_repair_iterations: DEFAULT_MAX_REPAIR_ITERATIONS })
    }

    pub fn with_max_repair_iterations(mut self, max_repair_iterations: u32) -> Self {
        self.max_repair_iterations = max_repair_iterations;
        self
    }

    pub fn act(&self) -> &ActSpecification {
        &self.act
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn generate(&self, seed: u64) -> GenerationResult {
        let sub_seeds = SubSeeds::derive(seed);
        let mut streams = PhaseStreams::new(&sub_seeds);
        let mut diagnostics = Diagnostics::default();

        let mut graph = self.build(&mut streams, &mut diagnostics);
        let mut report = audit::validate(&graph, &self.rules, &self.act);
        let repair_iterations =
            self.repair(&mut graph, &mut report, &mut streams, &mut diagnostics);

        if !report.is_valid {
            diagnostics.warn(format!(
                "map for seed {seed} is still invalid after {repair_iterations} repair iterations: {}",
                report.messages().join("; ")
            ));
        }

        decorate(&mut graph, &self.act, &self.rules, sub_seeds.decorations);
        debug!(
            seed,
            act = self.act.act_id,
            valid = report.is_valid,
            repair_iterations,
            fingerprint = graph.fingerprint(),
            "act map generated"
        );

        GenerationResult {
            graph,
            audits: report,
            seed,
            sub_seeds,
            warnings: diagnostics.into_warnings(),
            repair_iterations,
        }
    }

    fn build(&self, streams: &mut PhaseStreams, diagnostics: &mut Diagnostics) -> MapGraph {
        let outcome = weave_skeleton(&self.act, &mut streams.skeleton);
        if !outcome.is_complete() {
            diagnostics.warn(format!(
                "skeleton weaver completed {}/{PATH_COUNT} paths after {} restarts",
                outcome.completed_paths, outcome.restarts
            ));
        }
        let mut graph = outcome.graph;
        assign_types(&mut graph, &self.act, &self.rules, &mut streams.typing, diagnostics);
        graph
    }

    /// Repairs until the map audits clean or the budget runs out. Returns
    /// the number of repairs attempted.
    fn repair(
        &self,
        graph: &mut MapGraph,
        report: &mut AuditReport,
        streams: &mut PhaseStreams,
        diagnostics: &mut Diagnostics,
    ) -> u32 {
        let mut iterations = 0;
        while !report.is_valid && iterations < self.max_repair_iterations {
            iterations += 1;
            let repair = choose_repair(graph, report, &self.act, &self.rules, &mut streams.repairs);
            debug!(iteration = iterations, ?repair, violations = report.violations.len(), "repairing");
            let changed = repair != Repair::Regenerate
                && apply_repair(
                    graph,
                    repair,
                    &self.act,
                    &self.rules,
                    &mut streams.repairs,
                    diagnostics,
                );
            if !changed {
                if repair != Repair::Regenerate {
                    debug!(?repair, "repair left the map unchanged; regenerating");
                }
                *graph = self.build(streams, diagnostics);
            }
            *report = audit::validate(graph, &self.rules, &self.act);
        }
        iterations
    }
}
