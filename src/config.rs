//! Run configuration.
//!
//! Values come from an optional TOML file; command-line flags override them.
//! Every field has a default, so an empty file is a valid configuration.

use crate::error::ConfigError;
use crate::records::ScoreRange;
use crate::solver::{SolverKind, SolverSettings};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

pub const DEFAULT_SCORE_STEPS: &[f64] = &[3.01, 3.25, 3.5, 3.75, 4.0, 4.25, 4.5, 4.75];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Ascending bucket boundaries; each adjacent pair is one `[min, max)`.
    pub score_steps: Vec<f64>,
    pub batch_size: usize,
    pub submission_csv: Option<PathBuf>,
    pub bidding_csvs: Vec<PathBuf>,
    pub reviewers_csv: Option<PathBuf>,
    pub output_csv: PathBuf,
    pub conflict_marker: String,
    pub ac_role: String,
    pub label_prefix: String,
    pub solver: SolverKind,
    pub exact_limit: usize,
    pub seed: u64,
    pub restarts: usize,
    pub parallel: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            score_steps: DEFAULT_SCORE_STEPS.to_vec(),
            batch_size: 1,
            submission_csv: None,
            bidding_csvs: vec![],
            reviewers_csv: None,
            output_csv: PathBuf::from("travelingsalesman_order.csv"),
            conflict_marker: "C".to_string(),
            ac_role: "AC".to_string(),
            label_prefix: "TS".to_string(),
            solver: SolverKind::Auto,
            exact_limit: 12,
            seed: 0,
            restarts: 8,
            parallel: false,
        }
    }
}

pub const DEFAULT_CONFIG_TEMPLATE: &str = "\
# paper_order configuration
# Every value here can be overridden on the command line.

# Bucket boundaries, ascending. Each adjacent pair is one [min, max) range.
# score_steps = [3.01, 3.25, 3.5, 3.75, 4.0, 4.25, 4.5, 4.75]

# Papers discussed together per group.
# batch_size = 1

# Committee exports.
# submission_csv = \"submission.csv\"
# bidding_csvs = [\"committee_bidding-1.csv\", \"committee_bidding-2.csv\"]
# reviewers_csv = \"reviewers.csv\"

# output_csv = \"travelingsalesman_order.csv\"

# Bid value that marks a conflict, and the role text that marks an AC.
# conflict_marker = \"C\"
# ac_role = \"AC\"

# label_prefix = \"TS\"

# auto | exact | local-search
# solver = \"auto\"
# exact_limit = 12
# seed = 0
# restarts = 8

# Solve buckets on all cores. Output is identical either way.
# parallel = false
";

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse config")
    }

    /// Reads `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text)
                .with_context(|| format!("Bad config file {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    pub fn run_settings(&self) -> Result<RunSettings, ConfigError> {
        Ok(RunSettings {
            steps: ScoreSteps::new(self.score_steps.clone())?,
            batch_size: NonZeroUsize::new(self.batch_size).ok_or(ConfigError::ZeroBatchSize)?,
            solver: SolverSettings {
                kind: self.solver,
                exact_limit: self.exact_limit,
                seed: self.seed,
                restarts: self.restarts,
            },
            label_prefix: self.label_prefix.clone(),
            parallel: self.parallel,
        })
    }

    pub fn inputs(&self) -> Result<Inputs, ConfigError> {
        let submissions = self
            .submission_csv
            .clone()
            .ok_or(ConfigError::MissingSubmissions)?;
        if self.bidding_csvs.is_empty() {
            return Err(ConfigError::MissingBidding);
        }
        Ok(Inputs {
            submissions,
            bidding: self.bidding_csvs.clone(),
            reviewers: self.reviewers_csv.clone(),
            conflict_marker: self.conflict_marker.clone(),
            ac_role: self.ac_role.clone(),
        })
    }
}

/// Writes the commented template. Refuses to overwrite.
pub fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("Config file already exists at {}", path.display());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    std::fs::write(path, DEFAULT_CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write config to {}", path.display()))
}

/// Where the data comes from.
#[derive(Debug, Clone)]
pub struct Inputs {
    pub submissions: PathBuf,
    pub bidding: Vec<PathBuf>,
    pub reviewers: Option<PathBuf>,
    pub conflict_marker: String,
    pub ac_role: String,
}

/// Everything the range driver needs, already validated.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub steps: ScoreSteps,
    pub batch_size: NonZeroUsize,
    pub solver: SolverSettings,
    pub label_prefix: String,
    pub parallel: bool,
}

/// Strictly ascending, finite bucket boundaries, at least two of them.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSteps(Vec<f64>);

impl ScoreSteps {
    pub fn new(steps: Vec<f64>) -> Result<Self, ConfigError> {
        if steps.len() < 2 {
            return Err(ConfigError::TooFewSteps(steps.len()));
        }
        if let Some(&bad) = steps.iter().find(|s| !s.is_finite()) {
            return Err(ConfigError::NonFiniteStep(bad));
        }
        for w in steps.windows(2) {
            if w[0] >= w[1] {
                return Err(ConfigError::NotAscending {
                    prev: w[0],
                    next: w[1],
                });
            }
        }
        Ok(Self(steps))
    }

    /// Buckets in ascending order.
    pub fn ranges(&self) -> Vec<ScoreRange> {
        self.0
            .windows(2)
            .map(|w| ScoreRange {
                min: w[0],
                max: w[1],
            })
            .collect()
    }
}
