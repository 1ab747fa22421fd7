use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub fn utc_compact_string(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%dT%H%M%SZ").to_string()
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

/// Whitespace-delimited token count, the unit for thresholds and word totals.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn strip_whitespace(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Creates `<parent>/<prefix>_<stamp>` without ever reusing an existing directory.
pub fn fresh_run_directory(parent: &Path, prefix: &str, ts: DateTime<Utc>) -> Result<PathBuf> {
    let base = format!("{prefix}_{}", utc_compact_string(ts));
    let mut candidate = parent.join(&base);
    let mut suffix = 1_u32;
    while candidate.exists() {
        candidate = parent.join(format!("{base}_{suffix}"));
        suffix += 1;
    }

    ensure_directory(&candidate)?;
    Ok(candidate)
}

pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let data = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;

    let mut file = File::create(path)
        .with_context(|| format!("failed to create json file: {}", path.display()))?;
    file.write_all(&data)
        .with_context(|| format!("failed to write json file: {}", path.display()))?;
    file.write_all(b"\n")
        .with_context(|| format!("failed to finalize json file: {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn word_count_ignores_repeated_whitespace() {
        assert_eq!(word_count("  one\ttwo\n\nthree  "), 3);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn fresh_run_directory_never_reuses_a_name() {
        let dir = tempfile::tempdir().unwrap();
        let ts = Utc.with_ymd_and_hms(2026, 2, 19, 10, 30, 0).unwrap();

        let first = fresh_run_directory(dir.path(), "library_audit", ts).unwrap();
        let second = fresh_run_directory(dir.path(), "library_audit", ts).unwrap();

        assert_eq!(
            first.file_name().unwrap().to_str().unwrap(),
            "library_audit_20260219T103000Z"
        );
        assert_eq!(
            second.file_name().unwrap().to_str().unwrap(),
            "library_audit_20260219T103000Z_1"
        );
    }
}
