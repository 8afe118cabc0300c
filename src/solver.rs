//! # Tour Solving
//!
//! Papers are cities and the cost matrix gives the distances; a tour is an
//! open Hamiltonian path (no return leg) through all of them. The solvers
//! here only ever see an index count and a cost function. [`solve_tour`] is
//! the adapter the rest of the crate goes through: it handles the trivial
//! sizes itself and refuses any answer that is not a permutation.

use crate::SetMinMax;
use crate::cost::CostMatrix;
use crate::error::{ConfigError, TourError};
use crate::mat;
use anyhow::{Result, bail};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Largest instance [`ExactSolver`] will take on regardless of settings.
pub const EXACT_HARD_LIMIT: usize = 16;

pub trait TourSolver: Send + Sync {
    fn name(&self) -> &str;
    /// Returns an ordering of `0..n` with small total adjacent cost.
    fn solve(&self, n: usize, cost: &dyn Fn(usize, usize) -> u32) -> Result<Vec<usize>>;
}

/// A validated discussion order over matrix indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tour {
    pub order: Vec<usize>,
    pub cost: u64,
}

impl Tour {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Sum of the costs between consecutive entries of `order`.
pub fn path_cost(order: &[usize], cost: impl Fn(usize, usize) -> u32) -> u64 {
    order.windows(2).map(|w| cost(w[0], w[1]) as u64).sum()
}

fn validate(solver: &str, n: usize, order: &[usize]) -> Result<(), TourError> {
    if order.len() != n {
        return Err(TourError::WrongLength {
            solver: solver.to_string(),
            expected: n,
            got: order.len(),
        });
    }
    let mut seen = vec![false; n];
    for &index in order {
        if index >= n {
            return Err(TourError::OutOfRange {
                solver: solver.to_string(),
                index,
                n,
            });
        }
        if !seen[index].setmax(true) {
            return Err(TourError::Duplicate {
                solver: solver.to_string(),
                index,
            });
        }
    }
    Ok(())
}

/// Runs `solver` on `matrix`. Zero and one paper never reach the solver.
pub fn solve_tour(solver: &dyn TourSolver, matrix: &CostMatrix) -> Result<Tour, TourError> {
    let n = matrix.len();
    if n <= 1 {
        return Ok(Tour {
            order: (0..n).collect(),
            cost: 0,
        });
    }
    let cost = |i: usize, j: usize| matrix.get(i, j);
    let order = solver.solve(n, &cost).map_err(|source| TourError::Failed {
        solver: solver.name().to_string(),
        source,
    })?;
    validate(solver.name(), n, &order)?;
    let total = path_cost(&order, cost);
    debug!(solver = solver.name(), n, cost = total, "tour solved");
    Ok(Tour {
        order,
        cost: total,
    })
}

/// Held-Karp over subsets. Optimal, but exponential in `n`.
#[derive(Debug, Clone)]
pub struct ExactSolver {
    pub limit: usize,
}

impl TourSolver for ExactSolver {
    fn name(&self) -> &str {
        "exact"
    }

    fn solve(&self, n: usize, cost: &dyn Fn(usize, usize) -> u32) -> Result<Vec<usize>> {
        let limit = self.limit.min(EXACT_HARD_LIMIT);
        if n > limit {
            bail!("{} papers exceed the exact solver limit of {}", n, limit);
        }
        if n == 0 {
            return Ok(vec![]);
        }
        const INF: u64 = u64::MAX;
        let full = 1usize << n;
        // best[mask][j]: cheapest path covering `mask` and ending in `j`
        let mut best = mat![INF; full; n];
        let mut parent = mat![usize::MAX; full; n];
        for j in 0..n {
            best[1 << j][j] = 0;
        }
        for mask in 1..full {
            for j in 0..n {
                let here = best[mask][j];
                if here == INF {
                    continue;
                }
                for k in 0..n {
                    if mask >> k & 1 == 1 {
                        continue;
                    }
                    let next = mask | 1 << k;
                    if best[next][k].setmin(here + cost(j, k) as u64) {
                        parent[next][k] = j;
                    }
                }
            }
        }
        let mut mask = full - 1;
        let mut end = 0;
        for j in 1..n {
            if best[mask][j] < best[mask][end] {
                end = j;
            }
        }
        let mut order = Vec::with_capacity(n);
        let mut cur = end;
        loop {
            order.push(cur);
            let prev = parent[mask][cur];
            mask ^= 1 << cur;
            if prev == usize::MAX {
                break;
            }
            cur = prev;
        }
        order.reverse();
        Ok(order)
    }
}

/// Nearest-neighbour starts improved with 2-opt and Or-opt until no
/// improving move is left. Deterministic for a fixed seed.
#[derive(Debug, Clone)]
pub struct LocalSearchSolver {
    pub seed: u64,
    pub restarts: usize,
}

fn nearest_neighbour(n: usize, start: usize, cost: &dyn Fn(usize, usize) -> u32) -> Vec<usize> {
    let mut used = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let mut cur = start;
    used[cur] = true;
    order.push(cur);
    while order.len() < n {
        let next = (0..n)
            .filter(|&k| !used[k])
            .min_by_key(|&k| cost(cur, k))
            .unwrap_or(cur);
        used[next] = true;
        order.push(next);
        cur = next;
    }
    order
}

/// Applies the first improving segment reversal. Costs are symmetric, so the
/// interior of the reversed segment keeps its cost.
fn two_opt_step(order: &mut [usize], cost: &dyn Fn(usize, usize) -> u32) -> bool {
    let n = order.len();
    let d = |a: usize, b: usize| cost(a, b) as i64;
    for i in 0..n {
        for j in i + 1..n {
            let mut delta = 0;
            if i > 0 {
                delta += d(order[i - 1], order[j]) - d(order[i - 1], order[i]);
            }
            if j + 1 < n {
                delta += d(order[i], order[j + 1]) - d(order[j], order[j + 1]);
            }
            if delta < 0 {
                order[i..=j].reverse();
                return true;
            }
        }
    }
    false
}

const OR_OPT_MAX_SEGMENT: usize = 3;

/// Moves a run of up to three papers elsewhere in the path, possibly
/// reversed, if that makes the path cheaper.
fn or_opt_step(order: &mut Vec<usize>, cost: &dyn Fn(usize, usize) -> u32) -> bool {
    let n = order.len();
    let d = |a: usize, b: usize| cost(a, b) as i64;
    for len in 1..=OR_OPT_MAX_SEGMENT.min(n - 1) {
        for i in 0..=n - len {
            let first = order[i];
            let last = order[i + len - 1];
            let prev = (i > 0).then(|| order[i - 1]);
            let next = order.get(i + len).copied();
            let removed = match (prev, next) {
                (Some(p), Some(q)) => d(p, first) + d(last, q) - d(p, q),
                (Some(p), None) => d(p, first),
                (None, Some(q)) => d(last, q),
                (None, None) => continue,
            };
            let rest: Vec<usize> = order[..i].iter().chain(&order[i + len..]).copied().collect();
            for k in 0..=rest.len() {
                if k == i {
                    continue;
                }
                let a = k.checked_sub(1).map(|k| rest[k]);
                let b = rest.get(k).copied();
                let join = |x: usize, y: usize| {
                    a.map_or(0, |a| d(a, x)) + b.map_or(0, |b| d(y, b))
                        - match (a, b) {
                            (Some(a), Some(b)) => d(a, b),
                            _ => 0,
                        }
                };
                let forward = join(first, last);
                let backward = join(last, first);
                let (added, reverse) = if backward < forward {
                    (backward, true)
                } else {
                    (forward, false)
                };
                if added - removed < 0 {
                    let mut segment = order[i..i + len].to_vec();
                    if reverse {
                        segment.reverse();
                    }
                    let mut moved = rest;
                    moved.splice(k..k, segment);
                    *order = moved;
                    return true;
                }
            }
        }
    }
    false
}

fn improve(order: &mut Vec<usize>, cost: &dyn Fn(usize, usize) -> u32) {
    loop {
        if two_opt_step(order, cost) {
            continue;
        }
        if !or_opt_step(order, cost) {
            break;
        }
    }
}

impl TourSolver for LocalSearchSolver {
    fn name(&self) -> &str {
        "local-search"
    }

    fn solve(&self, n: usize, cost: &dyn Fn(usize, usize) -> u32) -> Result<Vec<usize>> {
        if n <= 1 {
            return Ok((0..n).collect());
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<(u64, Vec<usize>)> = None;
        for restart in 0..self.restarts.max(1) {
            let start = if restart == 0 { 0 } else { rng.random_range(0..n) };
            let mut order = nearest_neighbour(n, start, cost);
            improve(&mut order, cost);
            let total = path_cost(&order, cost);
            debug!(restart, start, cost = total, "local search restart");
            if best.as_ref().is_none_or(|(c, _)| total < *c) {
                best = Some((total, order));
            }
        }
        Ok(best.map(|(_, order)| order).unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SolverKind {
    /// Exact for small buckets, local search above `exact_limit`.
    #[default]
    Auto,
    Exact,
    LocalSearch,
}

impl std::str::FromStr for SolverKind {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "exact" => Ok(Self::Exact),
            "local-search" => Ok(Self::LocalSearch),
            other => Err(ConfigError::UnknownSolver(other.to_string())),
        }
    }
}

/// Dispatches to [`ExactSolver`] or [`LocalSearchSolver`] by instance size.
#[derive(Debug, Clone)]
pub struct AutoSolver {
    pub exact: ExactSolver,
    pub local: LocalSearchSolver,
}

impl TourSolver for AutoSolver {
    fn name(&self) -> &str {
        "auto"
    }

    fn solve(&self, n: usize, cost: &dyn Fn(usize, usize) -> u32) -> Result<Vec<usize>> {
        if n <= self.exact.limit.min(EXACT_HARD_LIMIT) {
            self.exact.solve(n, cost)
        } else {
            self.local.solve(n, cost)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverSettings {
    pub kind: SolverKind,
    pub exact_limit: usize,
    pub seed: u64,
    pub restarts: usize,
}

pub fn build_solver(settings: &SolverSettings) -> Box<dyn TourSolver> {
    let exact = ExactSolver {
        limit: settings.exact_limit,
    };
    let local = LocalSearchSolver {
        seed: settings.seed,
        restarts: settings.restarts,
    };
    match settings.kind {
        SolverKind::Auto => Box::new(AutoSolver { exact, local }),
        SolverKind::Exact => Box::new(exact),
        SolverKind::LocalSearch => Box::new(local),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflicts::{ConflictMap, set};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed(Vec<usize>);
    impl TourSolver for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }
        fn solve(&self, _n: usize, _cost: &dyn Fn(usize, usize) -> u32) -> Result<Vec<usize>> {
            Ok(self.0.clone())
        }
    }

    struct Counting(AtomicUsize);
    impl TourSolver for Counting {
        fn name(&self) -> &str {
            "counting"
        }
        fn solve(&self, n: usize, _cost: &dyn Fn(usize, usize) -> u32) -> Result<Vec<usize>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok((0..n).collect())
        }
    }

    struct Broken;
    impl TourSolver for Broken {
        fn name(&self) -> &str {
            "broken"
        }
        fn solve(&self, _n: usize, _cost: &dyn Fn(usize, usize) -> u32) -> Result<Vec<usize>> {
            bail!("no tour today")
        }
    }

    fn abc() -> CostMatrix {
        CostMatrix::build(&ConflictMap::from_entries(vec![
            ("A".to_string(), set(&[])),
            ("B".to_string(), set(&["r1"])),
            ("C".to_string(), set(&["r1"])),
        ]))
    }

    fn random_matrix(rng: &mut StdRng, n: usize) -> CostMatrix {
        let entries = (0..n)
            .map(|i| {
                let conflicts = (0..10)
                    .filter(|_| rng.random_bool(0.25))
                    .map(|r| format!("r{}", r))
                    .collect();
                (format!("p{}", i), conflicts)
            })
            .collect();
        CostMatrix::build(&ConflictMap::from_entries(entries))
    }

    fn settings(kind: SolverKind) -> SolverSettings {
        SolverSettings {
            kind,
            exact_limit: 12,
            seed: 1,
            restarts: 4,
        }
    }

    #[test]
    fn three_papers_reach_minimum() {
        for kind in [SolverKind::Exact, SolverKind::LocalSearch, SolverKind::Auto] {
            let m = abc();
            let tour = solve_tour(build_solver(&settings(kind)).as_ref(), &m).unwrap();
            // B and C adjacent, A on the outside: one cost-1 edge.
            assert_eq!(tour.cost, 1, "{:?}", kind);
            let pos_a = tour.order.iter().position(|&i| i == 0).unwrap();
            assert!(pos_a == 0 || pos_a == 2, "{:?}: {:?}", kind, tour.order);
            let pos_b = tour.order.iter().position(|&i| i == 1).unwrap();
            let pos_c = tour.order.iter().position(|&i| i == 2).unwrap();
            assert_eq!(pos_b.abs_diff(pos_c), 1, "{:?}: {:?}", kind, tour.order);
        }
    }

    #[test]
    fn trivial_sizes_skip_the_solver() {
        let counting = Counting(AtomicUsize::new(0));
        let empty = CostMatrix::build(&ConflictMap::default());
        assert!(solve_tour(&counting, &empty).unwrap().is_empty());
        let one = CostMatrix::build(&ConflictMap::from_entries(vec![(
            "A".to_string(),
            set(&["r1"]),
        )]));
        assert_eq!(solve_tour(&counting, &one).unwrap().order, vec![0]);
        assert_eq!(counting.0.load(Ordering::SeqCst), 0);
        solve_tour(&counting, &abc()).unwrap();
        assert_eq!(counting.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn malformed_permutations_are_rejected() {
        let m = abc();
        assert!(matches!(
            solve_tour(&Fixed(vec![0, 1]), &m),
            Err(TourError::WrongLength { expected: 3, got: 2, .. })
        ));
        assert!(matches!(
            solve_tour(&Fixed(vec![0, 1, 1]), &m),
            Err(TourError::Duplicate { index: 1, .. })
        ));
        assert!(matches!(
            solve_tour(&Fixed(vec![0, 1, 3]), &m),
            Err(TourError::OutOfRange { index: 3, n: 3, .. })
        ));
        assert!(matches!(
            solve_tour(&Broken, &m),
            Err(TourError::Failed { .. })
        ));
        assert_eq!(solve_tour(&Fixed(vec![2, 1, 0]), &m).unwrap().cost, 1);
    }

    #[test]
    fn exact_refuses_large_instances() {
        let exact = ExactSolver { limit: 4 };
        assert!(exact.solve(5, &|_, _| 0).is_err());
        assert_eq!(exact.solve(1, &|_, _| 0).unwrap(), vec![0]);

        let unbounded = ExactSolver { limit: usize::MAX };
        assert!(unbounded.solve(EXACT_HARD_LIMIT + 1, &|_, _| 0).is_err());
        let auto = AutoSolver {
            exact: unbounded,
            local: LocalSearchSolver { seed: 0, restarts: 1 },
        };
        let order = auto.solve(EXACT_HARD_LIMIT + 4, &|i, j| i.abs_diff(j) as u32).unwrap();
        assert_eq!(order.len(), EXACT_HARD_LIMIT + 4);
    }

    #[test]
    fn local_search_is_never_better_than_exact() {
        let mut rng = StdRng::seed_from_u64(42);
        let exact = ExactSolver { limit: 10 };
        let local = LocalSearchSolver {
            seed: 3,
            restarts: 6,
        };
        for _ in 0..30 {
            let n = rng.random_range(2..=9);
            let m = random_matrix(&mut rng, n);
            let best = solve_tour(&exact, &m).unwrap();
            let heuristic = solve_tour(&local, &m).unwrap();
            let identity = path_cost(&(0..n).collect::<Vec<_>>(), |i, j| m.get(i, j));
            assert!(best.cost <= heuristic.cost);
            assert!(best.cost <= identity);
        }
    }

    #[test]
    fn local_search_is_deterministic_and_improves_on_identity() {
        let mut rng = StdRng::seed_from_u64(5);
        let m = random_matrix(&mut rng, 60);
        let local = LocalSearchSolver {
            seed: 11,
            restarts: 3,
        };
        let a = solve_tour(&local, &m).unwrap();
        let b = solve_tour(&local, &m).unwrap();
        assert_eq!(a, b);
        let identity = path_cost(&(0..60).collect::<Vec<_>>(), |i, j| m.get(i, j));
        assert!(a.cost <= identity);
    }

    #[test]
    fn solver_kind_parses() {
        assert_eq!("exact".parse::<SolverKind>(), Ok(SolverKind::Exact));
        assert_eq!("local-search".parse::<SolverKind>(), Ok(SolverKind::LocalSearch));
        assert_eq!(
            "greedy".parse::<SolverKind>(),
            Err(ConfigError::UnknownSolver("greedy".to_string()))
        );
    }
}
