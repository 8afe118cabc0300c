//! # Range Driver
//!
//! Loads the committee exports once, then runs the whole pipeline (conflict
//! map, cost matrix, tour, groups, movement report) for every score bucket.
//! Buckets share nothing but the read-only inputs; each produces a
//! [`BucketResult`] and the run concatenates them, highest bucket first.

use crate::config::{Inputs, RunSettings};
use crate::conflicts::{ConflictMap, MergedConflicts};
use crate::cost::CostMatrix;
use crate::error::TourError;
use crate::group::{Group, split_into_groups};
use crate::movement::{MovementComparison, baseline_groups};
use crate::output::{OutputRow, bucket_rows};
use crate::records::{
    Paper, ScoreRange, SubmissionTable, load_ac_roster, load_bidding_sheet, load_submissions,
};
use crate::solver::{TourSolver, build_solver, path_cost, solve_tour};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Read-only inputs shared by every bucket.
#[derive(Debug, Clone, Default)]
pub struct Committee {
    pub submissions: SubmissionTable,
    pub conflicts: MergedConflicts,
}

impl Committee {
    /// Reviewers whose movements are counted.
    pub fn reviewers(&self) -> &BTreeSet<String> {
        &self.conflicts.reviewers
    }
}

pub fn load_committee(inputs: &Inputs) -> Result<Committee> {
    let submissions = load_submissions(&inputs.submissions)?;
    info!(
        papers = submissions.papers.len(),
        rejected = submissions.rejected,
        "submissions loaded"
    );

    let sheets = inputs
        .bidding
        .iter()
        .map(|path| load_bidding_sheet(path, &inputs.conflict_marker))
        .collect::<Result<Vec<_>>>()?;
    let mut conflicts = MergedConflicts::merge(&sheets);

    if let Some(path) = &inputs.reviewers {
        let roster = load_ac_roster(path, &inputs.ac_role)?;
        let before = conflicts.reviewers.len();
        conflicts.restrict_to(&roster);
        info!(
            kept = conflicts.reviewers.len(),
            dropped = before - conflicts.reviewers.len(),
            role = %inputs.ac_role,
            "restricted reviewers by role"
        );
    }
    info!(
        reviewers = conflicts.reviewers.len(),
        papers = conflicts.conflicts.len(),
        sheets = sheets.len(),
        "conflicts loaded"
    );
    Ok(Committee {
        submissions,
        conflicts,
    })
}

/// Everything one bucket produced. Never modified after construction.
#[derive(Debug, Clone)]
pub struct BucketResult {
    pub range: ScoreRange,
    /// Eligible papers, best score first.
    pub papers: Vec<Paper>,
    /// Papers listed in no bidding sheet; treated as unconflicted.
    pub unlisted: Vec<String>,
    pub groups: Vec<Group>,
    /// Score-order singletons, for comparison.
    pub baseline: Vec<Group>,
    pub tour_cost: u64,
    pub score_order_cost: u64,
    pub movement: MovementComparison,
}

impl BucketResult {
    fn empty(range: ScoreRange) -> Self {
        Self {
            range,
            papers: vec![],
            unlisted: vec![],
            groups: vec![],
            baseline: vec![],
            tour_cost: 0,
            score_order_cost: 0,
            movement: MovementComparison::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }
}

pub fn solve_bucket(
    range: ScoreRange,
    committee: &Committee,
    settings: &RunSettings,
    solver: &dyn TourSolver,
) -> Result<BucketResult, TourError> {
    let papers = committee.submissions.eligible(range);
    info!(range = %range, papers = papers.len(), "bucket");
    if papers.is_empty() {
        return Ok(BucketResult::empty(range));
    }

    let map = ConflictMap::for_papers(&papers, &committee.conflicts);
    for paper in map.unlisted() {
        warn!(paper = %paper, range = %range, "paper is in no bidding sheet; assuming no conflicts");
    }
    let matrix = CostMatrix::build(&map);
    let tour = solve_tour(solver, &matrix)?;
    let groups = split_into_groups(&tour, &matrix, settings.batch_size);
    let baseline = baseline_groups(&map);
    let movement = MovementComparison::new(&baseline, &groups, committee.reviewers());
    let score_order_cost = path_cost(&(0..matrix.len()).collect::<Vec<_>>(), |i, j| {
        matrix.get(i, j)
    });
    info!(
        range = %range,
        tour_cost = tour.cost,
        score_order_cost,
        moves = movement.optimized.total_movements,
        baseline_moves = movement.baseline.total_movements,
        "bucket ordered"
    );

    Ok(BucketResult {
        range,
        papers,
        unlisted: map.unlisted().to_vec(),
        groups,
        baseline,
        tour_cost: tour.cost,
        score_order_cost,
        movement,
    })
}

/// Buckets highest first, plus the run-wide comparison.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub buckets: Vec<BucketResult>,
    pub overall: MovementComparison,
    pub rows: Vec<OutputRow>,
}

impl RunResult {
    pub fn summary(&self, committee: &Committee) -> RunSummary {
        RunSummary {
            papers: self.buckets.iter().map(|b| b.papers.len()).sum(),
            rejected_scores: committee.submissions.rejected,
            reviewers: committee.reviewers().len(),
            buckets: self
                .buckets
                .iter()
                .map(|b| BucketSummary {
                    range: b.range,
                    papers: b.papers.len(),
                    groups: b.groups.len(),
                    unlisted: b.unlisted.clone(),
                    tour_cost: b.tour_cost,
                    score_order_cost: b.score_order_cost,
                    movement: b.movement,
                })
                .collect(),
            overall: self.overall,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BucketSummary {
    pub range: ScoreRange,
    pub papers: usize,
    pub groups: usize,
    pub unlisted: Vec<String>,
    pub tour_cost: u64,
    pub score_order_cost: u64,
    pub movement: MovementComparison,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub papers: usize,
    pub rejected_scores: usize,
    pub reviewers: usize,
    pub buckets: Vec<BucketSummary>,
    pub overall: MovementComparison,
}

pub fn progress_bar(len: usize, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::with_template("[{elapsed_precise}] {bar:40} {pos}/{len} buckets {msg}") {
        pb.set_style(style.progress_chars("=>-"));
    }
    pb
}

pub fn run(committee: &Committee, settings: &RunSettings, progress: &ProgressBar) -> Result<RunResult> {
    let solver = build_solver(&settings.solver);
    run_with_solver(committee, settings, solver.as_ref(), progress)
}

pub fn run_with_solver(
    committee: &Committee,
    settings: &RunSettings,
    solver: &dyn TourSolver,
    progress: &ProgressBar,
) -> Result<RunResult> {
    let ranges = settings.steps.ranges();
    let solve = |range: &ScoreRange| {
        let result = solve_bucket(*range, committee, settings, solver)
            .with_context(|| format!("Failed to order bucket {}", range));
        progress.inc(1);
        result
    };
    let mut buckets = if settings.parallel {
        ranges.par_iter().map(solve).collect::<Result<Vec<_>>>()?
    } else {
        ranges.iter().map(solve).collect::<Result<Vec<_>>>()?
    };
    progress.finish_and_clear();
    buckets.reverse();

    let baseline: Vec<Group> = buckets.iter().flat_map(|b| b.baseline.clone()).collect();
    let optimized: Vec<Group> = buckets.iter().flat_map(|b| b.groups.clone()).collect();
    let overall = MovementComparison::new(&baseline, &optimized, committee.reviewers());
    let rows = buckets
        .iter()
        .flat_map(|b| bucket_rows(&settings.label_prefix, b.range.min, &b.groups))
        .collect();

    Ok(RunResult {
        buckets,
        overall,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ScoreSteps};
    use crate::conflicts::set;
    use crate::datagen::{DatasetParams, generate};
    use crate::records::BiddingSheet;
    use crate::solver::{SolverKind, SolverSettings};
    use std::num::NonZeroUsize;

    fn paper(id: &str, score: f64) -> Paper {
        Paper {
            id: id.to_string(),
            score,
        }
    }

    fn settings(steps: Vec<f64>) -> RunSettings {
        RunSettings {
            steps: ScoreSteps::new(steps).unwrap(),
            batch_size: NonZeroUsize::MIN,
            solver: SolverSettings {
                kind: SolverKind::Auto,
                exact_limit: 10,
                seed: 0,
                restarts: 4,
            },
            label_prefix: "TS".to_string(),
            parallel: false,
        }
    }

    /// A, B, C in [3.0, 3.5); D alone in [3.5, 4.0); E has no score bucket.
    fn committee() -> Committee {
        let sheet = BiddingSheet {
            reviewers: vec!["r1".to_string(), "r2".to_string()],
            conflicts: [
                ("A", set(&[])),
                ("B", set(&["r1"])),
                ("C", set(&["r1"])),
                ("D", set(&["r2"])),
            ]
            .into_iter()
            .map(|(p, s)| (p.to_string(), s))
            .collect(),
        };
        Committee {
            submissions: SubmissionTable {
                papers: vec![
                    paper("B", 3.4),
                    paper("A", 3.3),
                    paper("C", 3.1),
                    paper("D", 3.7),
                    paper("E", 1.0),
                ],
                rejected: 0,
            },
            conflicts: MergedConflicts::merge([&sheet]),
        }
    }

    #[test]
    fn buckets_are_concatenated_highest_first() {
        let c = committee();
        let result = run(&c, &settings(vec![3.0, 3.5, 4.0]), &ProgressBar::hidden()).unwrap();
        assert_eq!(result.buckets.len(), 2);
        assert_eq!(result.buckets[0].range.min, 3.5);
        assert_eq!(result.buckets[1].range.min, 3.0);

        let papers: Vec<&str> = result.rows.iter().map(|r| r.paper.as_str()).collect();
        assert_eq!(papers[0], "D");
        assert_eq!(papers.len(), 4);
        // B and C share r1, so the tour keeps them together with A at one end.
        let low = &papers[1..];
        assert!(low == ["A", "B", "C"] || low == ["A", "C", "B"] || low == ["B", "C", "A"] || low == ["C", "B", "A"]);
        assert_eq!(result.buckets[1].tour_cost, 1);
        assert_eq!(result.buckets[1].score_order_cost, 2);
        assert_eq!(result.rows[0].label, "TS3.50-1");
        assert_eq!(result.rows[1].label, "TS3.00-3");
    }

    #[test]
    fn empty_bucket_emits_nothing() {
        let c = committee();
        let result = run(&c, &settings(vec![4.0, 4.5]), &ProgressBar::hidden()).unwrap();
        assert_eq!(result.buckets.len(), 1);
        assert!(result.buckets[0].is_empty());
        assert!(result.rows.is_empty());
        assert_eq!(result.overall, MovementComparison::default());
    }

    #[test]
    fn unlisted_papers_count_as_unconflicted() {
        let mut c = committee();
        c.submissions.papers.push(paper("F", 3.2));
        let result = run(&c, &settings(vec![3.0, 3.5]), &ProgressBar::hidden()).unwrap();
        assert_eq!(result.buckets[0].unlisted, vec!["F"]);
        let f = result.rows.iter().find(|r| r.paper == "F").unwrap();
        assert_eq!(f.conflicts, "{}");
    }

    #[test]
    fn solver_failure_aborts_the_run() {
        struct Reversed;
        impl TourSolver for Reversed {
            fn name(&self) -> &str {
                "reversed"
            }
            fn solve(&self, n: usize, _cost: &dyn Fn(usize, usize) -> u32) -> Result<Vec<usize>> {
                Ok((0..n).rev().skip(1).collect())
            }
        }
        let c = committee();
        let err = run_with_solver(&c, &settings(vec![3.0, 3.5]), &Reversed, &ProgressBar::hidden())
            .unwrap_err();
        assert!(err.chain().any(|e| e.downcast_ref::<TourError>().is_some()));
    }

    #[test]
    fn parallel_matches_sequential() {
        let data = generate(
            &DatasetParams {
                papers: 120,
                ..DatasetParams::default()
            },
            Some(31),
        )
        .unwrap();
        let sheets: Vec<BiddingSheet> = data
            .bidding_csvs
            .iter()
            .map(|t| crate::records::read_bidding_sheet(t.as_bytes(), "C").unwrap())
            .collect();
        let c = Committee {
            submissions: crate::records::read_submissions(data.submissions_csv.as_bytes()).unwrap(),
            conflicts: MergedConflicts::merge(&sheets),
        };
        let steps = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let sequential = run(&c, &settings(steps.clone()), &ProgressBar::hidden()).unwrap();
        let mut par = settings(steps);
        par.parallel = true;
        let parallel = run(&c, &par, &ProgressBar::hidden()).unwrap();
        assert_eq!(sequential.rows, parallel.rows);
        assert_eq!(sequential.overall, parallel.overall);
        for bucket in &sequential.buckets {
            assert!(bucket.tour_cost <= bucket.score_order_cost || bucket.papers.len() > 10);
        }
    }

    #[test]
    fn end_to_end_from_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let data = generate(&DatasetParams::default(), Some(8))?;
        let paths = data.write_to(dir.path())?;
        let config = Config {
            score_steps: vec![1.0, 3.0, 5.0],
            submission_csv: Some(paths.submissions.clone()),
            bidding_csvs: paths.bidding.clone(),
            reviewers_csv: Some(paths.reviewers.clone()),
            output_csv: dir.path().join("order.csv"),
            ..Config::default()
        };
        let committee = load_committee(&config.inputs()?)?;
        assert_eq!(committee.reviewers(), &data.acs);

        let result = run(&committee, &config.run_settings()?, &ProgressBar::hidden())?;
        crate::output::write_csv(&config.output_csv, &result.rows)?;
        let written = std::fs::read_to_string(&config.output_csv)?;
        assert_eq!(written.lines().count(), result.rows.len() + 1);

        let eligible: usize = committee
            .submissions
            .papers
            .iter()
            .filter(|p| (1.0..5.0).contains(&p.score))
            .count();
        assert_eq!(result.rows.len(), eligible);
        let summary = result.summary(&committee);
        assert_eq!(summary.papers, eligible);
        assert!(serde_json::to_string(&summary)?.contains("\"buckets\""));
        Ok(())
    }
}
