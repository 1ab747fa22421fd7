//! Targeted re-extraction for books the latest audit found incomplete.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{info, warn};

use crate::audit::match_folder;
use crate::collaborators::PageTranscriber;
use crate::config::Config;
use crate::corpus::CorpusIndex;
use crate::identity::BookIdentity;
use crate::ledger::{ExtractionSession, SessionOutcome, plan};
use crate::model::{AuditEntry, SourceImage};
use crate::prompt::Prompt;
use crate::source::{discover_book_folders, folder_name, list_source_images};

pub fn incomplete_books(entries: &[AuditEntry]) -> Vec<&AuditEntry> {
    entries.iter().filter(|entry| entry.missing_count > 0).collect()
}

/// Source folder for an audit entry, through the same fallback chain the auditor uses.
pub fn resolve_source_folder(source_root: &Path, entry: &AuditEntry) -> Result<Option<PathBuf>> {
    let folders = discover_book_folders(source_root)?;
    let names: Vec<String> = folders.iter().map(|path| folder_name(path)).collect();

    let wanted = if entry.source_folder.is_empty() {
        BookIdentity::new(&entry.book_name, &entry.author).slug()
    } else {
        entry.source_folder.clone()
    };

    Ok(match_folder(&wanted, &names, |_| true).map(|(name, strategy)| {
        info!(wanted = %wanted, found = %name, strategy = ?strategy, "resolved source folder");
        source_root.join(name)
    }))
}

/// Images in the folder with no accepted record yet, keyed by `source_image`.
pub fn remaining_images(
    book_folder: &Path,
    identity: &BookIdentity,
    index: &CorpusIndex,
    extensions: &[String],
) -> Result<Vec<SourceImage>> {
    let all_images = list_source_images(book_folder, extensions)?;
    let done = index.processed_images(&identity.title);
    Ok(plan(&all_images, &done))
}

#[derive(Debug, Clone)]
pub struct BackfillPlan {
    pub identity: BookIdentity,
    pub source_folder: PathBuf,
    pub remaining: Vec<SourceImage>,
}

pub fn prepare(
    config: &Config,
    index: &CorpusIndex,
    entry: &AuditEntry,
) -> Result<Option<BackfillPlan>> {
    let Some(source_folder) = resolve_source_folder(&config.paths.source_root, entry)? else {
        warn!(book = %entry.book_name, "source folder not found");
        return Ok(None);
    };

    let identity = BookIdentity::from_folder_name(&folder_name(&source_folder));
    let remaining = remaining_images(
        &source_folder,
        &identity,
        index,
        &config.extraction.image_extensions,
    )?;

    Ok(Some(BackfillPlan {
        identity,
        source_folder,
        remaining,
    }))
}

pub fn run_backfill(
    config: &Config,
    backfill: &BackfillPlan,
    transcriber: &mut dyn PageTranscriber,
    prompt: &mut dyn Prompt,
) -> Result<SessionOutcome> {
    if backfill.remaining.is_empty() {
        info!(book = %backfill.identity, "no images left to backfill");
        return Ok(SessionOutcome::default());
    }

    let limit = prompt.backfill_limit(backfill.remaining.len());
    info!(
        book = %backfill.identity,
        remaining = backfill.remaining.len(),
        limit,
        "starting backfill"
    );

    let output_dir = config.paths.library_root().join(backfill.identity.slug());
    ExtractionSession::new(
        &backfill.identity,
        output_dir,
        config.extraction.word_threshold,
        config.extraction.batch_size,
        transcriber,
        prompt,
    )
    .run(&backfill.remaining, Some(limit))
}
