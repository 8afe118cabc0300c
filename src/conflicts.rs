//! Conflict sets per paper.
//!
//! Bidding sheets are merged once per run; every bucket then cuts its own
//! [`ConflictMap`] out of the merged view, so nothing written here is ever
//! shared between buckets.

use crate::records::{BiddingSheet, Paper};
use std::collections::{BTreeMap, BTreeSet};

pub type ConflictSet = BTreeSet<String>;

/// Union of several bidding sheets.
#[derive(Debug, Clone, Default)]
pub struct MergedConflicts {
    /// Reviewers that conflict accounting is done for.
    pub reviewers: BTreeSet<String>,
    /// Papers listed by at least one sheet.
    pub conflicts: BTreeMap<String, ConflictSet>,
}

impl MergedConflicts {
    /// A reviewer is conflicted on a paper if any sheet says so. A sheet
    /// that does not list a paper adds nothing for it.
    pub fn merge<'a>(sheets: impl IntoIterator<Item = &'a BiddingSheet>) -> Self {
        let mut merged = Self::default();
        for sheet in sheets {
            merged.reviewers.extend(sheet.reviewers.iter().cloned());
            for (paper, reviewers) in &sheet.conflicts {
                merged
                    .conflicts
                    .entry(paper.clone())
                    .or_default()
                    .extend(reviewers.iter().cloned());
            }
        }
        merged
    }

    /// Drops every reviewer outside `roster`, both from the universe and from
    /// the per-paper sets.
    pub fn restrict_to(&mut self, roster: &BTreeSet<String>) {
        self.reviewers.retain(|r| roster.contains(r));
        for set in self.conflicts.values_mut() {
            set.retain(|r| roster.contains(r));
        }
    }
}

/// Ordered paper -> conflict set mapping for one bucket.
///
/// The order is fixed at construction and is the index order every later
/// stage uses.
#[derive(Debug, Clone, Default)]
pub struct ConflictMap {
    entries: Vec<(String, ConflictSet)>,
    unlisted: Vec<String>,
}

impl ConflictMap {
    /// One entry per eligible paper, in the given order. Papers that no sheet
    /// lists get an empty set and are remembered in [`Self::unlisted`].
    pub fn for_papers(papers: &[Paper], merged: &MergedConflicts) -> Self {
        let mut map = Self::default();
        for paper in papers {
            let set = match merged.conflicts.get(&paper.id) {
                Some(set) => set.clone(),
                None => {
                    map.unlisted.push(paper.id.clone());
                    ConflictSet::new()
                }
            };
            map.entries.push((paper.id.clone(), set));
        }
        map
    }

    pub fn from_entries(entries: Vec<(String, ConflictSet)>) -> Self {
        Self {
            entries,
            unlisted: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(String, ConflictSet)] {
        &self.entries
    }

    pub fn get(&self, paper: &str) -> Option<&ConflictSet> {
        self.entries
            .iter()
            .find(|(id, _)| id == paper)
            .map(|(_, set)| set)
    }

    pub fn unlisted(&self) -> &[String] {
        &self.unlisted
    }
}

#[cfg(test)]
pub(crate) fn set(reviewers: &[&str]) -> ConflictSet {
    reviewers.iter().map(|r| r.to_string()).collect()
}
