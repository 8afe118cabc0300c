use anyhow::Result;
use clap::{Parser, Subcommand};
use paper_order::solver::SolverKind;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "paper_order",
    about = "Order committee discussions to minimize conflict room changes"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,

    /// Debug logging and a per-group movement trace
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Warnings only, no progress bar
    #[arg(long, short, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// TOML config; missing file means defaults
    #[arg(long, default_value = "paper_order.toml")]
    config: PathBuf,
    #[arg(long)]
    submissions: Option<PathBuf>,
    /// Bidding export; repeat for several sheets
    #[arg(long)]
    bidding: Vec<PathBuf>,
    /// Reviewer table used to keep only ACs
    #[arg(long)]
    reviewers: Option<PathBuf>,
    #[arg(long)]
    output: Option<PathBuf>,
    /// Comma-separated ascending bucket boundaries
    #[arg(long, value_delimiter = ',')]
    steps: Option<Vec<f64>>,
    #[arg(long)]
    batch_size: Option<usize>,
    /// auto, exact or local-search
    #[arg(long)]
    solver: Option<SolverKind>,
    #[arg(long)]
    seed: Option<u64>,
    /// Solve buckets in parallel
    #[arg(long)]
    parallel: bool,
    /// Also write the run summary as JSON
    #[arg(long)]
    json_summary: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute the discussion order and write the CSV
    Run(RunArgs),

    /// Write a commented default config file
    InitConfig {
        #[arg(default_value = "paper_order.toml")]
        path: PathBuf,
    },

    /// Write synthetic committee exports into a directory
    Generate {
        dir: PathBuf,
        #[arg(long, default_value_t = 60)]
        papers: usize,
        #[arg(long, default_value_t = 12)]
        reviewers: usize,
        #[arg(long, default_value_t = 3)]
        sheets: usize,
        #[arg(long, default_value_t = 0.08)]
        conflict_rate: f64,
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Commands::Run(args) => commands::run::run(&args, cli.verbose, cli.quiet),
        Commands::InitConfig { path } => commands::init_config::run(&path),
        Commands::Generate {
            dir,
            papers,
            reviewers,
            sheets,
            conflict_rate,
            seed,
        } => commands::generate::run(&dir, papers, reviewers, sheets, conflict_rate, seed),
    }
}

mod commands;
mod common;
