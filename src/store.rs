//! On-disk page records: one pretty-printed JSON object per accepted page.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use regex::Regex;

use crate::model::{PageRecord, SourceImage};
use crate::util::write_json_pretty;

const REQUIRED_FIELDS: [&str; 5] = [
    "book_name",
    "book_author",
    "page_number",
    "content",
    "source_image",
];

pub fn record_name_pattern() -> Result<Regex> {
    Regex::new(r"^page_.+\.json$").context("failed to compile page record filename regex")
}

/// Page number when known, otherwise a token that cannot collide with a numbered label.
pub fn page_label(page_number: Option<i64>, image: &SourceImage) -> String {
    match page_number {
        Some(number) => number.to_string(),
        None => format!("file_{}", image.stem()),
    }
}

pub fn record_file_name(page_number: Option<i64>, image: &SourceImage) -> String {
    format!("page_{}.json", page_label(page_number, image))
}

pub fn write_record(book_dir: &Path, record: &PageRecord, image: &SourceImage) -> Result<PathBuf> {
    let path = book_dir.join(record_file_name(record.page_number, image));
    write_json_pretty(&path, record)?;
    Ok(path)
}

/// Parses one record file. Any shape problem is an error so scanners can skip it.
pub fn read_record(path: &Path) -> Result<PageRecord> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    let Some(object) = value.as_object() else {
        bail!("record is not a JSON object: {}", path.display());
    };
    if let Some(missing) = REQUIRED_FIELDS
        .iter()
        .find(|field| !object.contains_key(**field))
    {
        bail!("record {} lacks field {missing}", path.display());
    }

    serde_json::from_value(value)
        .with_context(|| format!("record has invalid field types: {}", path.display()))
}
