//! Search-space comparison for a kernel.
//!
//! Usage:
//!   spacecmp --builtin gemm              # Scores of every loop order
//!   spacecmp problem.json --tiles 5      # Custom problem, five tile options

use anyhow::{bail, Result};
use clap::Parser;
use polyguide::analysis::{
    best_order, count_retained_orders, score_loop_orders, SearchSpaceEstimate, SpaceReduction,
};

/// Deepest nest whose loop orders are listed one by one (8! = 40320 rows).
const MAX_LISTED_LOOPS: usize = 8;
use polyguide::frontend::{self, Problem};
use polyguide::utils::pretty::ReportWriter;

#[derive(Parser)]
#[command(name = "spacecmp")]
#[command(about = "Compare the unconstrained and coalescing-pruned search spaces")]
struct Args {
    /// Problem description (.json)
    #[arg(required_unless_present = "builtin", conflicts_with = "builtin")]
    input: Option<String>,

    /// Use a built-in kernel
    #[arg(short, long)]
    builtin: Option<String>,

    /// Tile size options per dimension
    #[arg(long, default_value = "5")]
    tiles: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn load(args: &Args) -> Result<Problem> {
    if let Some(path) = &args.input {
        return frontend::load(path);
    }
    match args.builtin.as_deref().and_then(frontend::builtin) {
        Some(problem) => Ok(problem),
        None => bail!("Unknown built-in kernel"),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .format_timestamp(None)
        .init();

    let problem = load(&args)?;
    let names = problem.baseline.iterator_names();
    if names.is_empty() {
        eprintln!("Baseline has no loops");
        return Ok(());
    }

    let original = SearchSpaceEstimate::new(names.len(), args.tiles);
    let scored = if names.len() <= MAX_LISTED_LOOPS {
        score_loop_orders(&names, &problem.access_patterns)
    } else {
        Vec::new()
    };
    let retained = count_retained_orders(&names, &problem.access_patterns);
    let reduction = SpaceReduction::from_retained_orders(original, retained);

    let mut w = ReportWriter::default_indent();
    w.section(&format!("Search space: {}", problem.name));
    for pattern in &problem.access_patterns {
        w.writeln(&format!("array {} (weight {:.0})", pattern, pattern.weight()));
    }
    w.writeln("");

    w.section("Unconstrained");
    w.field("Loop orders", 22, format!("{}! = {}", names.len(), original.loop_orders));
    w.field(
        "Tile combinations",
        22,
        format!("{}^{} = {}", args.tiles, names.len(), original.tile_combinations),
    );
    w.field("Total", 22, original.total);
    w.writeln("");

    w.section("Coalescing-pruned");
    if scored.is_empty() {
        w.writeln(&format!(
            "{} loops: per-order listing skipped (limit {})",
            names.len(),
            MAX_LISTED_LOOPS
        ));
    } else {
        w.writeln(&format!("{:<20} {:>12}  {}", "Loop order", "Score", "Decision"));
    }
    for s in &scored {
        w.writeln(&format!(
            "{:<20} {:>12.0}  {}",
            format!("({})", s.order.join(",")),
            s.score,
            if s.score > 0.0 { "retain" } else { "prune" }
        ));
    }
    w.writeln("");
    w.field(
        "Retained orders",
        22,
        format!("{} / {}", reduction.retained_orders, original.loop_orders),
    );
    w.field(
        "Retained configs",
        22,
        format!("{} / {}", reduction.retained_configs, original.total),
    );
    w.field("Reduction", 22, format!("{:.1}%", reduction.reduction_percent()));

    if let Some(best) = best_order(&scored) {
        w.writeln("");
        w.field("Best loop order", 22, format!("({})", best.order.join(",")));
        w.field("Coalescing score", 22, format!("{:.0}", best.score));
    }

    print!("{}", w.finish());
    Ok(())
}
