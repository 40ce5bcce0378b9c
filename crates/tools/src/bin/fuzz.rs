use std::collections::BTreeMap;

use actmap::{ActSpecification, GenerationResult, MapGenerator, NodeType, RuleSet};
use anyhow::{Result, bail};
use clap::Parser;
use rand_chacha::{
    ChaCha8Rng,
    rand_core::{Rng, SeedableRng},
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(author, version, about = "Seed sweep over act generation", long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = 42)]
    seed: u64,
    #[arg(short, long, default_value_t = 500)]
    runs: u32,
}

fn check_invariants(result: &GenerationResult, act: &ActSpecification) -> Result<(), String> {
    let graph = &result.graph;
    let bosses: Vec<_> = graph.bosses().collect();
    if bosses.len() != 1 || bosses[0].row != act.boss_row() {
        return Err(format!("boss invariant broken: {} bosses", bosses.len()));
    }
    let boss = bosses[0].id;
    for start in graph.nodes_in_row(0) {
        if !graph.reachable_from(start.id).contains(&boss) {
            return Err(format!("boss unreachable from {}", start.id));
        }
    }
    for parent in graph.parents(boss) {
        let feeder = graph.node(parent).ok_or_else(|| format!("dangling feeder {parent}"))?;
        if feeder.row != act.pre_boss_row() || feeder.node_type != NodeType::Port {
            return Err(format!("boss fed by {} on row {}", feeder.id, feeder.row));
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).init();

    let args = Args::parse();
    println!("Starting act fuzz on seed {} for {} runs...", args.seed, args.runs);
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);

    let mut invalid = 0_u32;
    let mut repair_histogram: BTreeMap<u32, u32> = BTreeMap::new();
    for run in 0..args.runs {
        let map_seed = rng.next_u64();
        let rows = 8 + (rng.next_u64() % 13) as usize;
        let columns = 3 + 2 * (rng.next_u64() % 4) as usize;
        let branchiness = (rng.next_u64() % 11) as f64 / 10.0;
        let act = ActSpecification::new(1, rows, columns).with_branchiness(branchiness);

        let result = MapGenerator::new(act.clone(), RuleSet::default())?.generate(map_seed);
        if let Err(reason) = check_invariants(&result, &act) {
            bail!("Invariant failed on run {run} (seed {map_seed}, {rows}x{columns}): {reason}");
        }
        if !result.is_valid() {
            invalid += 1;
            info!(run, map_seed, rows, columns, violations = ?result.audits.messages(), "invalid map");
        }
        *repair_histogram.entry(result.repair_iterations).or_default() += 1;
    }

    println!("Fuzzing completed: {} runs, {} invalid maps.", args.runs, invalid);
    for (iterations, count) in repair_histogram {
        println!("  {iterations:>2} repair iterations: {count} maps");
    }
    Ok(())
}
