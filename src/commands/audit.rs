use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::audit::{audit_library, write_audit};
use crate::cli::AuditArgs;
use crate::corpus::CorpusIndex;
use crate::model::AuditStatus;

use super::{book_folders, load_config};

pub fn run(args: AuditArgs) -> Result<()> {
    let config = load_config(&args.common)?;
    book_folders(&config)?;

    info!(
        source_root = %config.paths.source_root.display(),
        results_root = %config.paths.results_root.display(),
        "starting gap audit"
    );

    let index = CorpusIndex::scan(&config.paths.results_root)?;
    let report = audit_library(
        &config.paths.source_root,
        &index,
        &config.extraction.image_extensions,
    )?;
    let output_dir = write_audit(&config.paths.results_root, &report, Utc::now())?;

    let not_started: Vec<&str> = report
        .entries
        .iter()
        .filter(|entry| entry.status == AuditStatus::NotStarted)
        .map(|entry| entry.book_name.as_str())
        .collect();
    if !not_started.is_empty() {
        warn!(books = ?not_started, "some books have no progress");
    }

    info!(
        books = report.entries.len(),
        output = %output_dir.display(),
        "audit complete"
    );
    Ok(())
}
