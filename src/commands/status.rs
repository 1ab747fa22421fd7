use anyhow::Result;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::corpus::CorpusIndex;
use crate::identity::BookIdentity;
use crate::ledger::plan;
use crate::source::{folder_name, list_source_images};

use super::{book_folders, find_book, load_config};

pub fn run(args: StatusArgs) -> Result<()> {
    let config = load_config(&args.common)?;
    let folders = match &args.book {
        Some(book) => vec![find_book(&book_folders(&config)?, book)?],
        None => book_folders(&config)?,
    };

    info!(
        source_root = %config.paths.source_root.display(),
        results_root = %config.paths.results_root.display(),
        "status requested"
    );

    let index = CorpusIndex::scan(&config.paths.results_root)?;
    if index.skipped() > 0 {
        warn!(skipped = index.skipped(), "malformed page records ignored");
    }
    info!(records = index.len(), "loaded corpus index");

    for folder in folders {
        let identity = BookIdentity::from_folder_name(&folder_name(&folder));
        let images = list_source_images(&folder, &config.extraction.image_extensions)?;
        let done = index.processed_images(&identity.title);
        let remaining = plan(&images, &done);

        info!(
            book = %identity,
            images = images.len(),
            accepted = images.len() - remaining.len(),
            remaining = remaining.len(),
            next = %remaining.first().map(|image| image.name.as_str()).unwrap_or("-"),
            "book status"
        );
    }

    Ok(())
}
