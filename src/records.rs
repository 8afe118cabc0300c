//! # Record Loading
//!
//! Readers for the three committee exports the tool consumes: the submission
//! table (paper ids and overall scores), the committee bidding sheets (the
//! only export that carries conflict markers), and the optional reviewer
//! table used to decide who holds the AC role.

use anyhow::{Context, Result, bail};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

const BOM: char = '\u{feff}';

/// Header of the bidding sheet; rows 1, 2, 4 and 5 are layout filler.
const BIDDING_HEADER_ROW: usize = 3;
const BIDDING_FIRST_DATA_ROW: usize = 6;
/// Columns 0 and 1 hold the paper id and title.
const BIDDING_FIRST_REVIEWER_COLUMN: usize = 2;
/// Every reviewer owns a triple of columns; the bid is the first of them.
const BIDDING_COLUMNS_PER_REVIEWER: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Paper {
    pub id: String,
    pub score: f64,
}

/// Half-open score interval `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ScoreRange {
    pub min: f64,
    pub max: f64,
}

impl ScoreRange {
    pub fn contains(&self, score: f64) -> bool {
        self.min <= score && score < self.max
    }
}

impl std::fmt::Display for ScoreRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:.2}, {:.2})", self.min, self.max)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SubmissionTable {
    pub papers: Vec<Paper>,
    /// Rows whose score was missing or not a number.
    pub rejected: usize,
}

impl SubmissionTable {
    /// Papers inside `range`, best score first. Ties keep table order.
    pub fn eligible(&self, range: ScoreRange) -> Vec<Paper> {
        let mut papers: Vec<Paper> = self
            .papers
            .iter()
            .filter(|p| range.contains(p.score))
            .cloned()
            .collect();
        papers.sort_by_key(|p| std::cmp::Reverse(ordered_float::OrderedFloat(p.score)));
        papers
    }
}

fn clean_header(h: &str) -> String {
    h.trim_start_matches(BOM).trim().to_string()
}

fn column(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| clean_header(h) == name)
        .with_context(|| format!("Missing column '{}'", name))
}

pub fn read_submissions<R: Read>(reader: R) -> Result<SubmissionTable> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers().context("Failed to read submission header")?.clone();
    let id_col = column(&headers, "Paper ID")?;
    let score_col = column(&headers, "Overall Score")?;

    let mut table = SubmissionTable::default();
    let mut seen = BTreeSet::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("Bad submission row {}", i + 2))?;
        let id = record.get(id_col).unwrap_or("").trim();
        if id.is_empty() {
            continue;
        }
        let score = record
            .get(score_col)
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|s| s.is_finite());
        let Some(score) = score else {
            debug!(paper = id, "no usable overall score; not eligible");
            table.rejected += 1;
            continue;
        };
        if !seen.insert(id.to_string()) {
            debug!(paper = id, "duplicate submission row ignored");
            continue;
        }
        table.papers.push(Paper {
            id: id.to_string(),
            score,
        });
    }
    Ok(table)
}

pub fn load_submissions(path: &Path) -> Result<SubmissionTable> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    read_submissions(file).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Conflict markers from one bidding export.
#[derive(Debug, Clone, Default)]
pub struct BiddingSheet {
    /// Reviewer ids in column order.
    pub reviewers: Vec<String>,
    /// Every paper the sheet lists, with the reviewers marked as conflicted.
    /// Listed papers without conflicts map to an empty set.
    pub conflicts: BTreeMap<String, BTreeSet<String>>,
}

/// Turns every blank line outside a quoted cell into a record of empty
/// fields. The csv reader drops blank lines, but the sheet layout counts them
/// as rows.
fn keep_blank_rows(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_quotes = false;
    for line in text.split_inclusive('\n') {
        let content = line.trim_end_matches(['\r', '\n']);
        if !in_quotes && content.is_empty() {
            out.push(',');
        }
        out.push_str(line);
        if line.bytes().filter(|&b| b == b'"').count() % 2 == 1 {
            in_quotes = !in_quotes;
        }
    }
    out
}

pub fn read_bidding_sheet<R: Read>(mut reader: R, conflict_marker: &str) -> Result<BiddingSheet> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .context("Failed to read bidding sheet")?;
    let text = keep_blank_rows(&text);
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut sheet = BiddingSheet::default();
    // column index -> reviewer id, bid columns only
    let mut bid_columns: Vec<(usize, String)> = Vec::new();
    let mut saw_header = false;

    for (i, record) in rdr.records().enumerate() {
        let row_num = i + 1;
        let record = record.with_context(|| format!("Bad bidding row {}", row_num))?;
        if row_num == BIDDING_HEADER_ROW {
            for (col, cell) in record.iter().enumerate().skip(BIDDING_FIRST_REVIEWER_COLUMN) {
                if (col - BIDDING_FIRST_REVIEWER_COLUMN) % BIDDING_COLUMNS_PER_REVIEWER != 0 {
                    continue;
                }
                let name = cell.lines().next().unwrap_or("").trim();
                if name.is_empty() {
                    continue;
                }
                bid_columns.push((col, name.to_string()));
                sheet.reviewers.push(name.to_string());
            }
            saw_header = true;
            continue;
        }
        if row_num < BIDDING_FIRST_DATA_ROW {
            continue;
        }
        let paper = record.get(0).unwrap_or("").trim_start_matches(BOM).trim();
        if paper.is_empty() {
            continue;
        }
        let entry = sheet.conflicts.entry(paper.to_string()).or_default();
        for (col, reviewer) in &bid_columns {
            if record.get(*col).map(str::trim) == Some(conflict_marker) {
                entry.insert(reviewer.clone());
            }
        }
    }
    if !saw_header {
        bail!("Bidding sheet has no reviewer header row");
    }
    if sheet.reviewers.is_empty() {
        bail!("Bidding sheet header row {} names no reviewers", BIDDING_HEADER_ROW);
    }
    if sheet.conflicts.is_empty() {
        bail!("Bidding sheet has no paper rows from row {} on", BIDDING_FIRST_DATA_ROW);
    }
    Ok(sheet)
}

pub fn load_bidding_sheet(path: &Path, conflict_marker: &str) -> Result<BiddingSheet> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    read_bidding_sheet(file, conflict_marker)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Reviewers holding the AC role in at least one assignment row. A table
/// without role data makes nobody an AC.
pub fn read_ac_roster<R: Read>(reader: R, ac_role: &str) -> Result<BTreeSet<String>> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers().context("Failed to read reviewer header")?.clone();
    let (reviewer_col, role_col) = match (column(&headers, "Reviewer"), column(&headers, "Role")) {
        (Ok(reviewer), Ok(role)) => (reviewer, role),
        (Err(e), _) | (_, Err(e)) => {
            warn!("reviewer table has no usable role data ({:#}); no reviewer counts as AC", e);
            return Ok(BTreeSet::new());
        }
    };

    let mut acs = BTreeSet::new();
    for record in rdr.records() {
        // A broken row only costs us that reviewer.
        let Ok(record) = record else { continue };
        let reviewer = record.get(reviewer_col).unwrap_or("").trim();
        let role = record.get(role_col).unwrap_or("").trim();
        if reviewer.is_empty() || role.is_empty() {
            continue;
        }
        if role.contains(ac_role) {
            acs.insert(reviewer.to_string());
        }
    }
    Ok(acs)
}

pub fn load_ac_roster(path: &Path, ac_role: &str) -> Result<BTreeSet<String>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    read_ac_roster(file, ac_role).with_context(|| format!("Failed to parse {}", path.display()))
}
