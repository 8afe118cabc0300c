//! Output rows for the review system's import.
//!
//! The review system can only sort labels in descending order, so a bucket's
//! labels count down along the tour: the first group gets the highest number
//! and a descending sort replays the tour forwards. Positions are zero-padded
//! to a common width so a text sort and a numeric sort agree. Nothing else
//! depends on that inversion.

use crate::conflicts::ConflictSet;
use crate::group::Group;
use anyhow::{Context, Result};
use itertools::Itertools;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

pub const EMPTY_CONFLICTS: &str = "{}";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRow {
    pub paper: String,
    /// Lower score bound of the bucket.
    pub group: String,
    /// 1-based group position within the bucket.
    pub order: usize,
    pub label: String,
    pub conflicts: String,
}

/// `{a, b}` with reviewers sorted, `{}` when nobody is conflicted.
pub fn render_conflicts(conflicts: &ConflictSet) -> String {
    if conflicts.is_empty() {
        EMPTY_CONFLICTS.to_string()
    } else {
        format!("{{{}}}", conflicts.iter().join(", "))
    }
}

/// `width` is the digit count of the bucket's group count.
pub fn label(prefix: &str, bucket_min: f64, reverse_position: usize, width: usize) -> String {
    format!(
        "{}{:.2}-{:0width$}",
        prefix,
        bucket_min,
        reverse_position,
        width = width
    )
}

/// One row per paper, groups in the given order.
pub fn bucket_rows(prefix: &str, bucket_min: f64, groups: &[Group]) -> Vec<OutputRow> {
    let n = groups.len();
    let width = n.to_string().len();
    groups
        .iter()
        .enumerate()
        .flat_map(|(i, group)| {
            let conflicts = render_conflicts(&group.conflicts);
            let tag = label(prefix, bucket_min, n - i, width);
            group.papers.iter().map(move |paper| OutputRow {
                paper: paper.clone(),
                group: format!("{:.2}", bucket_min),
                order: i + 1,
                label: tag.clone(),
                conflicts: conflicts.clone(),
            })
        })
        .collect()
}

pub fn write_rows<W: Write>(writer: W, rows: &[OutputRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    if rows.is_empty() {
        wtr.write_record(["paper", "group", "order", "label", "conflicts"])?;
    }
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_csv(path: &Path, rows: &[OutputRow]) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_rows(file, rows).with_context(|| format!("Failed to write {}", path.display()))
}
