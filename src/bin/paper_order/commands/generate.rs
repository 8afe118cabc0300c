use anyhow::{Context, Result};
use paper_order::config::Config;
use paper_order::datagen::{DatasetParams, generate};
use std::path::Path;
use tracing::info;

pub fn run(
    dir: &Path,
    papers: usize,
    reviewers: usize,
    sheets: usize,
    conflict_rate: f64,
    seed: Option<u64>,
) -> Result<()> {
    let params = DatasetParams {
        papers,
        reviewers,
        sheets,
        conflict_rate,
        ..DatasetParams::default()
    };
    let data = generate(&params, seed)?;
    let paths = data.write_to(dir)?;

    // A config next to the data so `run --config <dir>/paper_order.toml` works as is.
    let config = Config {
        submission_csv: Some(paths.submissions.clone()),
        bidding_csvs: paths.bidding.clone(),
        reviewers_csv: Some(paths.reviewers.clone()),
        output_csv: dir.join("travelingsalesman_order.csv"),
        score_steps: vec![params.min_score, 2.0, 3.0, 4.0, params.max_score],
        ..Config::default()
    };
    let config_path = dir.join("paper_order.toml");
    let text = toml::to_string(&config).context("Failed to serialize config")?;
    std::fs::write(&config_path, text)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    info!(
        dir = %dir.display(),
        papers,
        reviewers,
        sheets = paths.bidding.len(),
        acs = data.acs.len(),
        "generated dataset"
    );
    println!("{}", config_path.display());
    Ok(())
}
