use anyhow::{Context, Result};
use itertools::Itertools;
use paper_order::config::Config;
use paper_order::driver::{RunResult, load_committee, progress_bar, run as run_buckets};
use paper_order::movement::trace;
use paper_order::output::write_csv;
use tracing::info;

use crate::RunArgs;
use crate::common::print_table;

fn apply_overrides(config: &mut Config, args: &RunArgs) {
    if let Some(path) = &args.submissions {
        config.submission_csv = Some(path.clone());
    }
    if !args.bidding.is_empty() {
        config.bidding_csvs = args.bidding.clone();
    }
    if let Some(path) = &args.reviewers {
        config.reviewers_csv = Some(path.clone());
    }
    if let Some(path) = &args.output {
        config.output_csv = path.clone();
    }
    if let Some(steps) = &args.steps {
        config.score_steps = steps.clone();
    }
    if let Some(n) = args.batch_size {
        config.batch_size = n;
    }
    if let Some(kind) = args.solver {
        config.solver = kind;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    config.parallel |= args.parallel;
}

pub fn run(args: &RunArgs, verbose: bool, quiet: bool) -> Result<()> {
    let mut config = Config::load(&args.config)?;
    apply_overrides(&mut config, args);
    let inputs = config.inputs()?;
    let settings = config.run_settings()?;

    let committee = load_committee(&inputs)?;
    let pb = progress_bar(settings.steps.ranges().len(), quiet);
    let result = run_buckets(&committee, &settings, &pb)?;

    write_csv(&config.output_csv, &result.rows)?;
    info!(
        path = %config.output_csv.display(),
        rows = result.rows.len(),
        "wrote discussion order"
    );

    if verbose {
        print_trace(&result, &committee.conflicts.reviewers);
    }
    if !quiet {
        print_summary(&result);
    }
    if let Some(path) = &args.json_summary {
        let summary = result.summary(&committee);
        let text = serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?;
        std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}

fn print_summary(result: &RunResult) {
    let rows: Vec<[String; 7]> = result
        .buckets
        .iter()
        .map(|b| {
            [
                b.range.to_string(),
                b.papers.len().to_string(),
                b.groups.len().to_string(),
                b.unlisted.len().to_string(),
                format!("{} -> {}", b.score_order_cost, b.tour_cost),
                format!(
                    "{} -> {}",
                    b.movement.baseline.total_movements, b.movement.optimized.total_movements
                ),
                b.movement.saved().to_string(),
            ]
        })
        .collect();
    print_table(
        &["range", "papers", "groups", "unlisted", "cost", "moves", "saved"],
        &rows,
    );
    println!(
        "total moves: {} in score order, {} optimized ({} saved)",
        result.overall.baseline.total_movements,
        result.overall.optimized.total_movements,
        result.overall.saved()
    );
}

fn print_trace(result: &RunResult, reviewers: &std::collections::BTreeSet<String>) {
    for bucket in result.buckets.iter().filter(|b| !b.is_empty()) {
        println!("{}", bucket.range);
        for (i, moves) in trace(&bucket.groups, reviewers).iter().enumerate() {
            println!(
                "  {:>3}. {:<24} out: {{{}}} left: [{}] entered: [{}]",
                i + 1,
                moves.papers.join(" "),
                moves.outside.iter().join(", "),
                moves.left.join(", "),
                moves.entered.join(", "),
            );
        }
    }
}
