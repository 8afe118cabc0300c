//! # Synthetic Committee Exports
//!
//! Generates random but well-formed submission, bidding and reviewer tables
//! in the same layout as the real exports, for trying the tool out and for
//! tests. Each bidding sheet belongs to one reviewer and, as in the real
//! exports, leaves out the papers that reviewer is conflicted with; merging
//! all sheets recovers the full conflict relation.

use anyhow::{Context, Result, ensure};
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
pub struct DatasetParams {
    pub papers: usize,
    pub reviewers: usize,
    /// Number of bidding sheets; capped at the number of reviewers.
    pub sheets: usize,
    pub conflict_rate: f64,
    pub ac_fraction: f64,
    /// Fraction of submissions with no usable score.
    pub missing_score_rate: f64,
    pub min_score: f64,
    pub max_score: f64,
}

impl Default for DatasetParams {
    fn default() -> Self {
        Self {
            papers: 60,
            reviewers: 12,
            sheets: 3,
            conflict_rate: 0.08,
            ac_fraction: 0.75,
            missing_score_rate: 0.03,
            min_score: 1.0,
            max_score: 5.0,
        }
    }
}

impl DatasetParams {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.reviewers > 0, "at least one reviewer is needed");
        ensure!(
            self.min_score.is_finite() && self.max_score.is_finite() && self.min_score < self.max_score,
            "score range [{}, {}) is empty or not finite",
            self.min_score,
            self.max_score
        );
        for (name, rate) in [
            ("conflict_rate", self.conflict_rate),
            ("ac_fraction", self.ac_fraction),
            ("missing_score_rate", self.missing_score_rate),
        ] {
            ensure!((0.0..=1.0).contains(&rate), "{} must be within [0, 1], got {}", name, rate);
        }
        Ok(())
    }
}

/// CSV text of every generated table, plus the ground truth.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub submissions_csv: String,
    pub bidding_csvs: Vec<String>,
    pub reviewers_csv: String,
    /// paper -> conflicted reviewers, before any sheet drops rows.
    pub conflicts: BTreeMap<String, BTreeSet<String>>,
    pub acs: BTreeSet<String>,
}

#[derive(Debug, Clone)]
pub struct DatasetPaths {
    pub submissions: PathBuf,
    pub bidding: Vec<PathBuf>,
    pub reviewers: PathBuf,
}

fn paper_id(i: usize) -> String {
    format!("{}", 1000 + i)
}

fn reviewer_id(i: usize) -> String {
    format!("reviewer{:02}", i + 1)
}

fn to_csv(rows: &[Vec<String>]) -> Result<String> {
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(vec![]);
    for row in rows {
        wtr.write_record(row)?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV: {}", e))?;
    Ok(String::from_utf8(bytes)?)
}

pub fn generate(params: &DatasetParams, seed: Option<u64>) -> Result<Dataset> {
    params.validate()?;
    let mut rng = match seed {
        Some(s) => rand::rngs::StdRng::seed_from_u64(s),
        None => rand::rngs::StdRng::from_os_rng(),
    };
    let papers: Vec<String> = (0..params.papers).map(paper_id).collect();
    let reviewers: Vec<String> = (0..params.reviewers).map(reviewer_id).collect();

    let mut submissions = vec![vec![
        "Paper ID".to_string(),
        "Title".to_string(),
        "Overall Score".to_string(),
    ]];
    for (i, paper) in papers.iter().enumerate() {
        let score = if rng.random_bool(params.missing_score_rate) {
            String::new()
        } else {
            let s = rng.random_range(params.min_score..params.max_score);
            format!("{:.2}", s)
        };
        submissions.push(vec![paper.clone(), format!("Paper {}", i + 1), score]);
    }

    let mut conflicts: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for paper in &papers {
        let set = reviewers
            .iter()
            .filter(|_| rng.random_bool(params.conflict_rate))
            .cloned()
            .collect();
        conflicts.insert(paper.clone(), set);
    }

    let sheets = params.sheets.clamp(1, params.reviewers.max(1));
    let mut bidding_csvs = Vec::with_capacity(sheets);
    for owner in reviewers.iter().take(sheets) {
        // Filler rows keep their commas; blank lines would not count as rows.
        let width = 2 + 3 * reviewers.len();
        let filler = vec![String::new(); width];
        let mut title = filler.clone();
        title[0] = "Committee bidding".to_string();
        let mut rows = vec![title, filler.clone()];
        let mut header = vec!["ID".to_string(), "Title".to_string()];
        let mut sub_header = vec![String::new(), String::new()];
        for r in &reviewers {
            header.extend([format!("{}\n{} (full name)", r, r), String::new(), String::new()]);
            sub_header.extend(["bid", "preference", "expertise"].map(String::from));
        }
        rows.push(header);
        rows.push(sub_header);
        rows.push(filler);
        for (i, paper) in papers.iter().enumerate() {
            let conflicted = &conflicts[paper];
            if conflicted.contains(owner) {
                continue;
            }
            let mut row = vec![paper.clone(), format!("Paper {}", i + 1)];
            for r in &reviewers {
                let bid = if conflicted.contains(r) {
                    "C".to_string()
                } else if rng.random_bool(0.5) {
                    rng.random_range(1..=4).to_string()
                } else {
                    String::new()
                };
                row.extend([bid, String::new(), String::new()]);
            }
            rows.push(row);
        }
        bidding_csvs.push(to_csv(&rows)?);
    }

    let mut acs = BTreeSet::new();
    let mut roles = vec![vec![
        "\u{feff}Sub ID".to_string(),
        "Reviewer".to_string(),
        "Role".to_string(),
    ]];
    for r in &reviewers {
        let role = if rng.random_bool(params.ac_fraction) {
            acs.insert(r.clone());
            "Primary AC"
        } else {
            "External"
        };
        let paper = if papers.is_empty() {
            String::new()
        } else {
            papers[rng.random_range(0..papers.len())].clone()
        };
        roles.push(vec![paper, r.clone(), role.to_string()]);
    }

    Ok(Dataset {
        submissions_csv: to_csv(&submissions)?,
        bidding_csvs,
        reviewers_csv: to_csv(&roles)?,
        conflicts,
        acs,
    })
}

impl Dataset {
    /// Writes `submission.csv`, `committee_bidding-N.csv` and
    /// `reviewers.csv` into `dir`.
    pub fn write_to(&self, dir: &Path) -> Result<DatasetPaths> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let write = |name: &str, text: &str| -> Result<PathBuf> {
            let path = dir.join(name);
            std::fs::write(&path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Ok(path)
        };
        let submissions = write("submission.csv", &self.submissions_csv)?;
        let bidding = self
            .bidding_csvs
            .iter()
            .enumerate()
            .map(|(i, text)| write(&format!("committee_bidding-{}.csv", i + 1), text))
            .collect::<Result<Vec<_>>>()?;
        let reviewers = write("reviewers.csv", &self.reviewers_csv)?;
        Ok(DatasetPaths {
            submissions,
            bidding,
            reviewers,
        })
    }
}
