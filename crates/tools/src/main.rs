use std::io;
use std::path::PathBuf;

use actmap::{
    ActSpecification, DEFAULT_MAX_REPAIR_ITERATIONS, GenerationResult, MapGenerator, NodeType,
    PityState, RuleSet, UnknownContext, resolve_unknown, unknown_stream_for_node,
};
use anyhow::{Context, Result};
use clap::Parser;
use rand_chacha::{
    ChaCha8Rng,
    rand_core::{Rng, SeedableRng},
};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(author, version, about = "Generate and inspect one act map", long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = 42)]
    seed: u64,
    #[arg(long, default_value_t = 15)]
    rows: usize,
    #[arg(long, default_value_t = 7)]
    columns: usize,
    #[arg(long, default_value_t = 1)]
    act: u32,
    #[arg(long, default_value_t = 0.0)]
    branchiness: f64,
    /// Rule set TOML file; the standard rules are used when omitted
    #[arg(long)]
    rules: Option<PathBuf>,
    #[arg(long, default_value_t = DEFAULT_MAX_REPAIR_ITERATIONS)]
    max_repair_iterations: u32,
    /// Print the full generation result as JSON
    #[arg(long)]
    json: bool,
    /// Walk a random route to the boss, resolving Unknown nodes on the way
    #[arg(long)]
    walk: bool,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(io::stderr).init();

    let args = Args::parse();
    let rules = match &args.rules {
        Some(path) => RuleSet::load(path)
            .with_context(|| format!("Failed to load rule set: {}", path.display()))?,
        None => RuleSet::default(),
    };
    let act = ActSpecification::new(args.act, args.rows, args.columns)
        .with_branchiness(args.branchiness);

    let generator = MapGenerator::new(act, rules)
        .context("Invalid act configuration")?
        .with_max_repair_iterations(args.max_repair_iterations);
    let mut result = generator.generate(args.seed);

    if args.json {
        println!("{}", result.to_json().context("Failed to serialize generation result")?);
    } else {
        print_summary(&result);
    }

    if args.walk {
        walk(&mut result, &generator, args.seed)?;
    }
    Ok(())
}

fn print_summary(result: &GenerationResult) {
    println!(
        "seed {} | {} nodes, {} edges | fingerprint {:016x}",
        result.seed,
        result.graph.nodes.len(),
        result.graph.edges.len(),
        result.graph.fingerprint()
    );
    print!("{}", result.graph.to_text());
    if result.is_valid() {
        println!("audit: valid after {} repair iterations", result.repair_iterations);
    } else {
        println!("audit: INVALID after {} repair iterations", result.repair_iterations);
        for message in result.audits.messages() {
            println!("  - {message}");
        }
    }
    for warning in &result.warnings {
        println!("warning: {warning}");
    }
}

/// Follows random edges from a random start to the boss. Unknown nodes are
/// resolved with their own per-node stream as the walk reaches them.
fn walk(result: &mut GenerationResult, generator: &MapGenerator, seed: u64) -> Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut pity = PityState::default();
    let context = UnknownContext::default();

    let starts: Vec<_> = result.graph.nodes_in_row(0).map(|node| node.id).collect();
    if starts.is_empty() {
        println!("walk: map has no start nodes");
        return Ok(());
    }
    let mut current = starts[rng.next_u64() as usize % starts.len()];

    println!("walk:");
    loop {
        let node = result
            .graph
            .node_mut(current)
            .with_context(|| format!("Walk reached missing node {current}"))?;
        if node.node_type == NodeType::Unknown {
            let mut stream = unknown_stream_for_node(seed, current);
            let resolved = resolve_unknown(
                node,
                generator.act(),
                generator.rules(),
                &mut stream,
                &mut pity,
                &context,
            )
            .with_context(|| format!("Failed to resolve {current}"))?;
            println!("  row {:>2} {current}: Unknown -> {resolved}", node.row);
        } else {
            println!("  row {:>2} {current}: {}", node.row, node.node_type);
        }

        let children = result.graph.children(current);
        if children.is_empty() {
            break;
        }
        current = children[rng.next_u64() as usize % children.len()];
    }

    let pity_line: Vec<String> =
        pity.pity_accumulated.iter().map(|(kind, value)| format!("{kind}={value}")).collect();
    println!("pity: {}", pity_line.join(" "));
    Ok(())
}
