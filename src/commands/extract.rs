use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::info;

use crate::cli::ExtractArgs;
use crate::collaborators::CommandTranscriber;
use crate::config::Config;
use crate::corpus::CorpusIndex;
use crate::identity::BookIdentity;
use crate::ledger::{ExtractionSession, plan};
use crate::model::SourceImage;
use crate::source::{folder_name, list_source_images};

use super::{
    apply_ocr_overrides, book_folders, build_prompt, find_book, load_config, report_written,
};

pub fn run(args: ExtractArgs) -> Result<()> {
    let mut config = load_config(&args.common)?;
    apply_ocr_overrides(&mut config, &args.ocr)?;
    let command = config.ocr_command()?.to_string();
    let mut transcriber = CommandTranscriber::new(command, config.ocr.args.clone());

    let folders = book_folders(&config)?;
    let index = CorpusIndex::scan(&config.paths.results_root)?;
    let mut prompt = build_prompt(
        args.ocr.non_interactive,
        None,
        None,
        config.backfill.fallback_limit,
    );

    let target = match &args.book {
        Some(book) => Some(find_book(&folders, book)?),
        None if args.ocr.non_interactive => first_book_with_work(&config, &folders, &index)?,
        None => {
            let names: Vec<String> = folders.iter().map(|path| folder_name(path)).collect();
            prompt.select_book(&names).map(|choice| folders[choice].clone())
        }
    };
    let Some(book_folder) = target else {
        info!("no book selected");
        return Ok(());
    };

    let identity = BookIdentity::from_folder_name(&folder_name(&book_folder));
    let (all_images, remaining) = pending_images(&config, &book_folder, &identity, &index)?;
    info!(book = %identity, "session started");

    if remaining.is_empty() {
        info!(
            book = %identity,
            images = all_images.len(),
            "all images for this book are already processed"
        );
        return Ok(());
    }
    info!(
        done = all_images.len() - remaining.len(),
        remaining = remaining.len(),
        "extraction plan ready"
    );

    let output_dir = config.paths.library_root().join(identity.slug());
    let outcome = ExtractionSession::new(
        &identity,
        output_dir,
        config.extraction.word_threshold,
        config.extraction.batch_size,
        &mut transcriber,
        prompt.as_mut(),
    )
    .run(&remaining, args.limit)?;

    report_written(&outcome);
    if outcome.stopped_early {
        info!(
            left = remaining.len() - outcome.attempted,
            "session stopped; rerun to resume"
        );
    }
    Ok(())
}

fn pending_images(
    config: &Config,
    book_folder: &Path,
    identity: &BookIdentity,
    index: &CorpusIndex,
) -> Result<(Vec<SourceImage>, Vec<SourceImage>)> {
    let all_images = list_source_images(book_folder, &config.extraction.image_extensions)?;
    let remaining = plan(&all_images, &index.processed_images(&identity.title));
    Ok((all_images, remaining))
}

fn first_book_with_work(
    config: &Config,
    folders: &[PathBuf],
    index: &CorpusIndex,
) -> Result<Option<PathBuf>> {
    for folder in folders {
        let identity = BookIdentity::from_folder_name(&folder_name(folder));
        let (_, remaining) = pending_images(config, folder, &identity, index)?;
        if !remaining.is_empty() {
            return Ok(Some(folder.clone()));
        }
    }
    Ok(None)
}
