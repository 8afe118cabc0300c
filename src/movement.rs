//! # Room Movement Accounting
//!
//! Replays a discussion order and counts how often reviewers have to leave or
//! re-enter the room. Each reviewer starts inside; before each group, anyone
//! conflicted on it steps out and anyone outside who is not conflicted comes
//! back. This is reporting only and never feeds back into the order.

use crate::conflicts::{ConflictMap, ConflictSet};
use crate::group::Group;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    InRoom,
    OutOfRoom,
}

impl Presence {
    /// Next state for a reviewer about to see a group. `true` in the second
    /// slot means the reviewer moved.
    pub fn step(self, conflicted: bool) -> (Self, bool) {
        match (self, conflicted) {
            (Self::InRoom, true) => (Self::OutOfRoom, true),
            (Self::OutOfRoom, false) => (Self::InRoom, true),
            (state, _) => (state, false),
        }
    }
}

/// Who crossed the door right before a group was discussed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMoves {
    pub papers: Vec<String>,
    pub left: Vec<String>,
    pub entered: Vec<String>,
    /// Reviewers outside while the group is discussed.
    pub outside: ConflictSet,
}

impl GroupMoves {
    pub fn movements(&self) -> usize {
        self.left.len() + self.entered.len()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MovementReport {
    pub total_movements: usize,
    pub groups_with_movement: usize,
    pub papers: usize,
}

/// Per-group replay of the room state for `reviewers`, in group order.
pub fn trace(groups: &[Group], reviewers: &BTreeSet<String>) -> Vec<GroupMoves> {
    let mut presence = vec![Presence::InRoom; reviewers.len()];
    groups
        .iter()
        .map(|group| {
            let mut moves = GroupMoves {
                papers: group.papers.clone(),
                left: vec![],
                entered: vec![],
                outside: group.conflicts.clone(),
            };
            for (state, reviewer) in presence.iter_mut().zip(reviewers) {
                let (next, moved) = state.step(group.conflicts.contains(reviewer));
                if moved {
                    match next {
                        Presence::OutOfRoom => moves.left.push(reviewer.clone()),
                        Presence::InRoom => moves.entered.push(reviewer.clone()),
                    }
                }
                *state = next;
            }
            moves
        })
        .collect()
}

pub fn summarize(moves: &[GroupMoves]) -> MovementReport {
    MovementReport {
        total_movements: moves.iter().map(GroupMoves::movements).sum(),
        groups_with_movement: moves.iter().filter(|m| m.movements() > 0).count(),
        papers: moves.iter().map(|m| m.papers.len()).sum(),
    }
}

pub fn analyze(groups: &[Group], reviewers: &BTreeSet<String>) -> MovementReport {
    summarize(&trace(groups, reviewers))
}

/// Every paper on its own, in the map's order.
pub fn baseline_groups(map: &ConflictMap) -> Vec<Group> {
    map.entries()
        .iter()
        .map(|(paper, conflicts)| Group::single(paper, conflicts))
        .collect()
}

/// Score order against the optimized order over the same papers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MovementComparison {
    pub baseline: MovementReport,
    pub optimized: MovementReport,
}

impl MovementComparison {
    pub fn new(
        baseline: &[Group],
        optimized: &[Group],
        reviewers: &BTreeSet<String>,
    ) -> Self {
        Self {
            baseline: analyze(baseline, reviewers),
            optimized: analyze(optimized, reviewers),
        }
    }

    /// Movements avoided by the optimized order; negative if it is worse.
    pub fn saved(&self) -> i64 {
        self.baseline.total_movements as i64 - self.optimized.total_movements as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflicts::set;

    fn g(paper: &str, conflicts: &[&str]) -> Group {
        Group::single(paper, &set(conflicts))
    }

    #[test]
    fn state_machine() {
        assert_eq!(Presence::InRoom.step(true), (Presence::OutOfRoom, true));
        assert_eq!(Presence::InRoom.step(false), (Presence::InRoom, false));
        assert_eq!(Presence::OutOfRoom.step(true), (Presence::OutOfRoom, false));
        assert_eq!(Presence::OutOfRoom.step(false), (Presence::InRoom, true));
    }

    #[test]
    fn bca_scenario_moves_r1_twice() {
        let groups = vec![g("B", &["r1"]), g("C", &["r1"]), g("A", &[])];
        let moves = trace(&groups, &set(&["r1"]));
        assert_eq!(moves[0].left, vec!["r1"]);
        assert_eq!(moves[1].movements(), 0);
        assert_eq!(moves[2].entered, vec!["r1"]);
        assert_eq!(
            summarize(&moves),
            MovementReport {
                total_movements: 2,
                groups_with_movement: 2,
                papers: 3,
            }
        );
    }

    #[test]
    fn order_matters() {
        let reviewers = set(&["r1", "r2"]);
        let forward = vec![g("A", &[]), g("B", &["r1"]), g("C", &["r1", "r2"])];
        let mut backward = forward.clone();
        backward.reverse();
        assert_eq!(analyze(&forward, &reviewers).total_movements, 2);
        assert_eq!(analyze(&backward, &reviewers).total_movements, 4);
    }

    #[test]
    fn reviewers_outside_the_universe_are_ignored() {
        let groups = vec![g("A", &["ghost"]), g("B", &["r1"])];
        let report = analyze(&groups, &set(&["r1"]));
        assert_eq!(report.total_movements, 1);
        assert_eq!(report.groups_with_movement, 1);
    }

    #[test]
    fn batches_count_papers() {
        let groups = vec![Group {
            papers: vec!["A".to_string(), "B".to_string()],
            conflicts: set(&["r1"]),
        }];
        let report = analyze(&groups, &set(&["r1", "r2"]));
        assert_eq!(report.papers, 2);
        assert_eq!(report.total_movements, 1);
    }

    #[test]
    fn comparison_against_score_order() {
        let map = ConflictMap::from_entries(vec![
            ("B".to_string(), set(&["r1"])),
            ("A".to_string(), set(&[])),
            ("C".to_string(), set(&["r1"])),
        ]);
        let baseline = baseline_groups(&map);
        let optimized = vec![g("B", &["r1"]), g("C", &["r1"]), g("A", &[])];
        let cmp = MovementComparison::new(&baseline, &optimized, &set(&["r1"]));
        assert_eq!(cmp.baseline.total_movements, 3);
        assert_eq!(cmp.optimized.total_movements, 2);
        assert_eq!(cmp.saved(), 1);
    }
}
