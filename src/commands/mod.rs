use std::io;
use std::path::PathBuf;

use anyhow::{Result, bail};
use tracing::{debug, info};

use crate::audit::match_folder;
use crate::cli::{CommonArgs, OcrArgs};
use crate::config::Config;
use crate::ledger::SessionOutcome;
use crate::prompt::{AutoPrompt, ConsolePrompt, Prompt};
use crate::source::{discover_book_folders, folder_name};

pub mod audit;
pub mod backfill;
pub mod consolidate;
pub mod extract;
pub mod status;

fn load_config(common: &CommonArgs) -> Result<Config> {
    let mut config = Config::load(common.config.as_deref())?;
    if let Some(source_root) = &common.source_root {
        config.paths.source_root = source_root.clone();
    }
    if let Some(results_root) = &common.results_root {
        config.paths.results_root = results_root.clone();
    }
    config.validate()?;
    Ok(config)
}

fn apply_ocr_overrides(config: &mut Config, ocr: &OcrArgs) -> Result<()> {
    if let Some(command) = &ocr.ocr_command {
        config.ocr.command = Some(command.clone());
    }
    if !ocr.ocr_args.is_empty() {
        config.ocr.args = ocr.ocr_args.clone();
    }
    if let Some(threshold) = ocr.word_threshold {
        config.extraction.word_threshold = threshold;
    }
    if let Some(batch_size) = ocr.batch_size {
        config.extraction.batch_size = batch_size;
    }
    config.validate()
}

fn report_written(outcome: &SessionOutcome) {
    for path in &outcome.written {
        debug!(path = %path.display(), "page record written");
    }
    if let Some(last) = outcome.written.last() {
        info!(
            written = outcome.written.len(),
            last = %last.display(),
            "page records persisted"
        );
    }
}

fn build_prompt(
    non_interactive: bool,
    selection: Option<usize>,
    limit: Option<usize>,
    fallback_limit: usize,
) -> Box<dyn Prompt> {
    if non_interactive {
        Box::new(AutoPrompt { selection, limit })
    } else {
        Box::new(ConsolePrompt::new(io::stdin().lock(), io::stdout(), fallback_limit).with_limit(limit))
    }
}

/// Every book folder under the source root; an empty corpus is fatal.
fn book_folders(config: &Config) -> Result<Vec<PathBuf>> {
    let root = &config.paths.source_root;
    if !root.is_dir() {
        bail!("source root does not exist: {}", root.display());
    }
    let folders = discover_book_folders(root)?;
    if folders.is_empty() {
        bail!("no book folders found in {}", root.display());
    }
    Ok(folders)
}

fn find_book(folders: &[PathBuf], wanted: &str) -> Result<PathBuf> {
    let names: Vec<String> = folders.iter().map(|path| folder_name(path)).collect();
    let Some((name, _)) = match_folder(wanted, &names, |_| true) else {
        bail!("no book folder matches {wanted}");
    };
    folders
        .iter()
        .find(|path| folder_name(path) == name)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("no book folder matches {wanted}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folders(names: &[&str]) -> Vec<PathBuf> {
        let mut folders: Vec<PathBuf> = names
            .iter()
            .map(|name| PathBuf::from("/books").join(name))
            .collect();
        folders.sort();
        folders
    }

    #[test]
    fn book_lookup_skips_siblings_sharing_a_title_prefix() {
        let folders = folders(&["Dune_Herbert", "DuneMessiah_Herbert"]);

        let found = find_book(&folders, "Dune").unwrap();
        assert_eq!(folder_name(&found), "Dune_Herbert");

        let found = find_book(&folders, "DuneMessiah").unwrap();
        assert_eq!(folder_name(&found), "DuneMessiah_Herbert");
    }

    #[test]
    fn book_lookup_without_a_match_is_an_error() {
        let folders = folders(&["DuneMessiah_Herbert"]);
        assert!(find_book(&folders, "Dune").is_err());
    }
}
