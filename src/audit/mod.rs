//! Completeness per book: source image count against what the library holds.
//!
//! Gaps are only detected inside the observed page-number span. Pages missing
//! before the first or after the last found number, and pages that never got
//! a number, show up in `missing_count` and nowhere else.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::corpus::{BookPages, CorpusIndex};
use crate::identity::BookIdentity;
use crate::model::{AuditEntry, AuditStatus, LibrarySummaryEntry, MatchStrategy};
use crate::source::{discover_book_folders, folder_name, list_source_images};
use crate::util::{fresh_run_directory, strip_whitespace, write_json_pretty};

#[cfg(test)]
mod tests;

pub const AUDIT_DIR_PREFIX: &str = "library_audit";
pub const SUMMARY_FILE: &str = "1_library_high_level.json";
pub const GAP_REPORT_FILE: &str = "2_gap_analysis_report.json";

pub fn completion_percentage(processed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    processed as f64 / total as f64 * 100.0
}

pub fn format_percentage(value: f64) -> String {
    format!("{value:.1}%")
}

/// Integers in `[min, max]` of the found pages that were not found.
pub fn sequence_gaps(found: &[i64]) -> Vec<i64> {
    let (Some(min), Some(max)) = (found.iter().min(), found.iter().max()) else {
        return Vec::new();
    };
    let mut present = found.to_vec();
    present.sort_unstable();
    present.dedup();

    (*min..=*max)
        .filter(|number| present.binary_search(number).is_err())
        .collect()
}

/// `{5,6,7,10,12,13}` → `"5-7, 10, 12-13"`.
pub fn compact_ranges(numbers: &[i64]) -> String {
    let mut sorted = numbers.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut parts = Vec::new();
    let mut iter = sorted.into_iter();
    let Some(mut start) = iter.next() else {
        return String::new();
    };
    let mut end = start;

    for number in iter {
        if number == end + 1 {
            end = number;
            continue;
        }
        parts.push(render_range(start, end));
        start = number;
        end = number;
    }
    parts.push(render_range(start, end));

    parts.join(", ")
}

fn render_range(start: i64, end: i64) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{start}-{end}")
    }
}

/// Finds the folder standing for `wanted` among `candidates`, tolerating naming drift.
///
/// Strategies run in order (exact, whitespace-stripped, title prefix) and the
/// first candidate accepted by `usable` wins.
pub fn match_folder<'a>(
    wanted: &str,
    candidates: &'a [String],
    usable: impl Fn(&str) -> bool,
) -> Option<(&'a str, MatchStrategy)> {
    let wanted_stripped = strip_whitespace(wanted);
    let wanted_lower = wanted_stripped.to_lowercase();
    let wanted_title = BookIdentity::from_folder_name(wanted).title_key();

    let strategies: [(MatchStrategy, Box<dyn Fn(&str) -> bool + '_>); 3] = [
        (
            MatchStrategy::Exact,
            Box::new(|candidate: &str| candidate == wanted),
        ),
        (
            MatchStrategy::WhitespaceStripped,
            Box::new(|candidate: &str| strip_whitespace(candidate) == wanted_stripped),
        ),
        (
            MatchStrategy::TitlePrefix,
            Box::new(|candidate: &str| {
                let candidate_lower = strip_whitespace(candidate).to_lowercase();
                let candidate_title = BookIdentity::from_folder_name(candidate).title_key();
                prefix_at_boundary(&candidate_lower, &wanted_title)
                    || prefix_at_boundary(&wanted_lower, &candidate_title)
            }),
        ),
    ];

    for (strategy, is_match) in &strategies {
        if let Some(candidate) = candidates
            .iter()
            .find(|candidate| is_match(candidate.as_str()) && usable(candidate.as_str()))
        {
            return Some((candidate.as_str(), *strategy));
        }
    }
    None
}

/// `text` starts with `prefix` and the remainder is empty or begins at the author separator,
/// so `dune` never claims `dunemessiah_herbert`.
fn prefix_at_boundary(text: &str, prefix: &str) -> bool {
    !prefix.is_empty()
        && text
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('_'))
}

/// One audit row. `pages` is `None` when no output folder could be matched.
pub fn audit_book(
    source_folder: &str,
    total_images: usize,
    pages: Option<&BookPages>,
    matched: Option<(&str, MatchStrategy)>,
) -> AuditEntry {
    let identity = BookIdentity::from_folder_name(source_folder);
    let processed = pages.map(BookPages::processed_count).unwrap_or(0);
    let found = pages.map(BookPages::page_numbers).unwrap_or_default();
    let gaps = sequence_gaps(&found);
    let missing_count = total_images as i64 - processed as i64;
    let completion = completion_percentage(processed, total_images);

    let integrity_warning = (missing_count < 0).then(|| {
        format!(
            "{} processed records exceed {} source images",
            processed, total_images
        )
    });
    if let Some(message) = &integrity_warning {
        warn!(book = %identity, "{message}");
    }

    let status = if processed == 0 {
        AuditStatus::NotStarted
    } else if missing_count <= 0 {
        AuditStatus::Complete
    } else {
        AuditStatus::InProgress
    };

    AuditEntry {
        book_name: identity.title.clone(),
        author: identity.author.clone(),
        source_folder: source_folder.to_string(),
        status,
        completion_percentage: format_percentage(completion),
        completion_ratio: completion,
        pages_processed: processed,
        total_images_in_source: total_images,
        missing_count,
        gap_ranges: compact_ranges(&gaps),
        sequence_gaps: gaps,
        total_word_count: pages.map(BookPages::total_word_count).unwrap_or(0),
        matched_output_folder: matched.map(|(folder, _)| folder.to_string()),
        match_strategy: matched.map(|(_, strategy)| strategy),
        integrity_warning,
    }
}

pub struct AuditReport {
    pub entries: Vec<AuditEntry>,
    pub summary: Vec<LibrarySummaryEntry>,
}

pub fn audit_library(
    source_root: &Path,
    index: &CorpusIndex,
    extensions: &[String],
) -> Result<AuditReport> {
    let folder_pages: BTreeMap<String, BookPages> = index
        .folder_names()
        .into_iter()
        .map(|folder| {
            let pages = index.folder_pages(&folder);
            (folder, pages)
        })
        .collect();
    let output_folders: Vec<String> = folder_pages.keys().cloned().collect();

    let mut entries = Vec::new();
    let mut summary = Vec::new();

    for source in discover_book_folders(source_root)? {
        let name = folder_name(&source);
        let total = match list_source_images(&source, extensions) {
            Ok(images) => images.len(),
            Err(err) => {
                warn!(folder = %source.display(), error = %err, "cannot list source images");
                0
            }
        };

        let matched = match_folder(&name, &output_folders, |candidate| {
            folder_pages
                .get(candidate)
                .map(|pages| !pages.is_empty())
                .unwrap_or(false)
        });
        if matched.is_none() {
            warn!(folder = %name, "no output folder matched; reporting zero progress");
        }
        let pages = matched.and_then(|(folder, _)| folder_pages.get(folder));

        let entry = audit_book(&name, total, pages, matched);
        info!(
            book = %entry.book_name,
            completion = %entry.completion_percentage,
            missing = entry.missing_count,
            gaps = %entry.gap_ranges,
            "audited"
        );

        if entry.pages_processed > 0 {
            let found = pages.map(BookPages::page_numbers).unwrap_or_default();
            summary.push(LibrarySummaryEntry {
                book_name: entry.book_name.clone(),
                author: entry.author.clone(),
                page_range: match (found.first(), found.last()) {
                    (Some(first), Some(last)) => format!("{first} - {last}"),
                    _ => "N/A".to_string(),
                },
                unique_pages_count: entry.pages_processed,
                total_word_count: entry.total_word_count,
                body_sensation_pages_found: None,
            });
        }
        entries.push(entry);
    }

    Ok(AuditReport { entries, summary })
}

pub fn write_audit(results_root: &Path, report: &AuditReport, ts: DateTime<Utc>) -> Result<PathBuf> {
    let output_dir = fresh_run_directory(results_root, AUDIT_DIR_PREFIX, ts)?;
    write_json_pretty(&output_dir.join(SUMMARY_FILE), &report.summary)?;
    write_json_pretty(&output_dir.join(GAP_REPORT_FILE), &report.entries)?;
    Ok(output_dir)
}

/// Most recent audit directory; stamps sort lexically in time order.
pub fn latest_audit_dir(results_root: &Path) -> Result<Option<PathBuf>> {
    if !results_root.exists() {
        return Ok(None);
    }

    let prefix = format!("{AUDIT_DIR_PREFIX}_");
    let mut dirs = Vec::new();
    let entries = fs::read_dir(results_root)
        .with_context(|| format!("failed to read {}", results_root.display()))?;
    for entry in entries {
        let entry = entry
            .with_context(|| format!("failed to read entry in {}", results_root.display()))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = folder_name(&path);
        if let Some(rest) = name.strip_prefix(&prefix) {
            dirs.push((run_order_key(rest), path));
        }
    }

    Ok(dirs.into_iter().max().map(|(_, path)| path))
}

/// `<stamp>` or `<stamp>_<n>`; collision suffixes compare numerically so `_10` follows `_9`.
fn run_order_key(rest: &str) -> (String, u32) {
    match rest.split_once('_') {
        Some((stamp, suffix)) => (stamp.to_string(), suffix.parse().unwrap_or(0)),
        None => (rest.to_string(), 0),
    }
}

pub fn load_audit_entries(audit_dir: &Path) -> Result<Vec<AuditEntry>> {
    let path = audit_dir.join(GAP_REPORT_FILE);
    let raw = fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("failed to parse {}", path.display()))
}
