//! PolyGuide Command Line Interface
//!
//! Usage:
//!   polyguide [OPTIONS] <problem-file>
//!   polyguide [OPTIONS] --builtin <NAME>
//!
//! Examples:
//!   polyguide gemm.json                              # Neighbor search with defaults
//!   polyguide --builtin gemm --strategy all_legal    # Full enumeration of a built-in kernel
//!   polyguide -b gemm --bank-conflict-mode hard      # Reject bank conflicts outright
//!   polyguide gemm.json --emit json -o result.json   # Export for code generation

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use polyguide::autotuning::{HybridOptimizer, OptimizationResult, TuningConfig};
use polyguide::frontend::{self, Problem, BUILTIN_NAMES};
use polyguide::solver::ConstraintMode;
use std::fs;
use std::path::PathBuf;

/// PolyGuide - Constraint-Guided GPU Schedule Search
#[derive(Parser, Debug)]
#[command(name = "polyguide")]
#[command(author = "PolyGuide Contributors")]
#[command(version)]
#[command(about = "Searches loop orders and tile sizes around a polyhedral baseline", long_about = None)]
struct Cli {
    /// Problem description (.json)
    #[arg(value_name = "FILE", required_unless_present = "builtin", conflicts_with = "builtin")]
    input: Option<PathBuf>,

    /// Use a built-in kernel instead of a file (gemm, gemm_bt, jacobi2d)
    #[arg(short, long, value_name = "NAME")]
    builtin: Option<String>,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Search strategy (optimal_neighbors, all_legal, sampling)
    #[arg(short, long, default_value = "optimal_neighbors")]
    strategy: String,

    /// Configuration preset
    #[arg(long, default_value = "default")]
    preset: Preset,

    /// Enforcement of the coalescing constraint
    #[arg(long)]
    coalescing_mode: Option<ModeArg>,

    /// Enforcement of the bank-conflict constraint
    #[arg(long)]
    bank_conflict_mode: Option<ModeArg>,

    /// Disable the bank-conflict penalty
    #[arg(long)]
    no_bank_penalty: bool,

    /// Bank-conflict penalty factor
    #[arg(long, value_name = "F")]
    penalty_factor: Option<f64>,

    /// Candidates for the neighbor strategy
    #[arg(long, value_name = "K")]
    neighbors: Option<usize>,

    /// Candidates for the sampling strategy
    #[arg(long, value_name = "N")]
    samples: Option<usize>,

    /// Keep zero-score loop orders in the full enumeration
    #[arg(long)]
    keep_uncoalesced: bool,

    /// Seed for the evaluation noise
    #[arg(long)]
    seed: Option<u64>,

    /// Relative noise amplitude (0 disables noise)
    #[arg(long)]
    noise: Option<f64>,

    /// Evaluate candidates on a single thread
    #[arg(long)]
    sequential: bool,

    /// What to emit
    #[arg(long, default_value = "summary")]
    emit: EmitKind,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress warnings)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    /// Default menus and counts
    Default,
    /// Few candidates, small menus
    Quick,
    /// Wide menus including conflicting tile sizes
    Thorough,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Reject violating candidates
    Hard,
    /// Record violations only
    Soft,
    /// Record and price violations
    Penalty,
    /// Ignore the constraint
    None,
}

impl From<ModeArg> for ConstraintMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Hard => ConstraintMode::Hard,
            ModeArg::Soft => ConstraintMode::Soft,
            ModeArg::Penalty => ConstraintMode::PenaltyBased,
            ModeArg::None => ConstraintMode::Unconstrained,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EmitKind {
    /// Human-readable report
    Summary,
    /// Full result as JSON
    Json,
    /// All candidates as CSV
    Csv,
    /// Baseline schedule analysis only
    Baseline,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        log::LevelFilter::Error
    } else {
        match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    info!("PolyGuide v{}", polyguide::VERSION);

    let problem = load_problem(&cli)?;
    debug!(
        "Problem: {} ({} access patterns)",
        problem.name,
        problem.access_patterns.len()
    );

    if matches!(cli.emit, EmitKind::Baseline) {
        write_output(&cli.output, &baseline_report(&problem))?;
        return Ok(());
    }

    let config = build_config(&cli);
    config.validate().context("Invalid configuration")?;
    debug!("Tuning config: {:?}", config);

    let mut optimizer = HybridOptimizer::new(config);
    optimizer.set_access_patterns(problem.access_patterns.clone());

    info!("Searching...");
    let result = optimizer.optimize(Some(&problem.baseline), &cli.strategy);
    if !result.succeeded() {
        warn!("no candidate could be evaluated");
    }

    let output = render(&result, cli.emit)?;
    write_output(&cli.output, &output)?;
    Ok(())
}

fn load_problem(cli: &Cli) -> Result<Problem> {
    match (&cli.input, &cli.builtin) {
        (Some(path), _) => frontend::load(path),
        (None, Some(name)) => match frontend::builtin(name) {
            Some(problem) => Ok(problem),
            None => bail!(
                "Unknown built-in kernel '{}' (available: {})",
                name,
                BUILTIN_NAMES.join(", ")
            ),
        },
        (None, None) => bail!("No problem given"),
    }
}

fn build_config(cli: &Cli) -> TuningConfig {
    let mut config = match cli.preset {
        Preset::Default => TuningConfig::default(),
        Preset::Quick => TuningConfig::quick(),
        Preset::Thorough => TuningConfig::thorough(),
    };

    // Override with CLI flags
    if let Some(mode) = cli.coalescing_mode {
        config.solver.coalescing_mode = mode.into();
    }
    if let Some(mode) = cli.bank_conflict_mode {
        config.solver.bank_conflict_mode = mode.into();
    }
    if cli.no_bank_penalty {
        config.evaluator.enable_bank_conflict_penalty = false;
    }
    if let Some(factor) = cli.penalty_factor {
        config.evaluator.penalty_factor = factor;
    }
    if let Some(k) = cli.neighbors {
        config.num_neighbors = k;
    }
    if let Some(n) = cli.samples {
        config.num_samples = n;
    }
    if cli.keep_uncoalesced {
        config.only_coalesced = false;
    }
    if let Some(seed) = cli.seed {
        config.evaluator.seed = seed;
    }
    if let Some(noise) = cli.noise {
        config.evaluator.noise_amplitude = noise;
    }
    if cli.sequential {
        config.evaluator.parallel = false;
    }

    config
}

fn baseline_report(problem: &Problem) -> String {
    let mut report = problem.baseline.to_string();
    for t in problem.baseline.extract_transformations() {
        report.push_str(&format!("baseline transformation: {}\n", t));
    }
    report
}

fn render(result: &OptimizationResult, emit: EmitKind) -> Result<String> {
    Ok(match emit {
        EmitKind::Summary | EmitKind::Baseline => result.summary(),
        EmitKind::Json => {
            serde_json::to_string_pretty(result).context("Failed to serialize result")?
        }
        EmitKind::Csv => result.to_csv(),
    })
}

fn write_output(path: &Option<PathBuf>, content: &str) -> Result<()> {
    match path {
        Some(p) => {
            fs::write(p, content)
                .with_context(|| format!("Failed to write output file: {:?}", p))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
