pub mod act;
pub mod audit;
pub mod error;
pub mod mapgen;
pub mod rng;
pub mod rules;
pub mod types;
pub mod unknown;

pub use act::{ActFlag, ActSpecification, PATH_COUNT};
pub use audit::{AuditReport, Violation, validate};
pub use error::{ConfigError, ResolveError};
pub use mapgen::{
    DEFAULT_MAX_REPAIR_ITERATIONS, GenerationResult, MapGenerator, SubSeeds, generate_map,
    unknown_stream_for_node,
};
pub use rng::{RandomStream, derive_sub_seed};
pub use rules::RuleSet;
pub use types::*;
pub use unknown::{PityState, UnknownContext, resolve_unknown};
