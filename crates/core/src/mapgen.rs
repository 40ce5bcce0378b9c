//! Procedural act-map generation split into coherent submodules.

pub mod model;
pub mod seed;

mod decorate;
mod generator;
mod repair;
mod skeleton;
mod typing;

pub use generator::{DEFAULT_MAX_REPAIR_ITERATIONS, MapGenerator};
pub use model::GenerationResult;
pub use seed::{SubSeeds, unknown_stream_for_node};

use crate::act::ActSpecification;
use crate::error::ConfigError;
use crate::rules::RuleSet;

/// One-shot entry point. Configuration errors are the only failure; an
/// unrepairable map comes back with `is_valid() == false` and warnings.
pub fn generate_map(
    act: &ActSpecification,
    rules: &RuleSet,
    seed: u64,
    max_repair_iterations: u32,
) -> Result<GenerationResult, ConfigError> {
    let generator = MapGenerator::new(act.clone(), rules.clone())?
        .with_max_repair_iterations(max_repair_iterations);
    Ok(generator.generate(seed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_map_matches_map_generator_output() {
        let act = ActSpecification::new(2, 12, 7);
        let rules = RuleSet::default();

        let from_helper = generate_map(&act, &rules, 123, DEFAULT_MAX_REPAIR_ITERATIONS)
            .expect("standard act is valid");
        let from_generator =
            MapGenerator::new(act, rules).expect("standard act is valid").generate(123);

        assert_eq!(from_helper, from_generator);
    }
}
