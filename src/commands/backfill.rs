use anyhow::{Result, bail};
use tracing::{info, warn};

use crate::audit::{latest_audit_dir, load_audit_entries};
use crate::backfill::{incomplete_books, prepare, run_backfill};
use crate::cli::BackfillArgs;
use crate::collaborators::CommandTranscriber;
use crate::corpus::CorpusIndex;
use crate::prompt::parse_limit;

use super::{apply_ocr_overrides, build_prompt, load_config, report_written};

pub fn run(args: BackfillArgs) -> Result<()> {
    let mut config = load_config(&args.common)?;
    apply_ocr_overrides(&mut config, &args.ocr)?;
    let command = config.ocr_command()?.to_string();
    let mut transcriber = CommandTranscriber::new(command, config.ocr.args.clone());

    let Some(audit_dir) = latest_audit_dir(&config.paths.results_root)? else {
        bail!(
            "no audit found under {}; run `pageledger audit` first",
            config.paths.results_root.display()
        );
    };
    let entries = load_audit_entries(&audit_dir)?;
    info!(audit = %audit_dir.display(), books = entries.len(), "loaded latest audit");

    let incomplete = incomplete_books(&entries);
    if incomplete.is_empty() {
        info!("all books are complete according to the last audit");
        return Ok(());
    }

    let limit = args
        .limit
        .as_deref()
        .map(|raw| parse_limit(raw, usize::MAX, config.backfill.fallback_limit));
    let mut prompt = build_prompt(
        args.ocr.non_interactive,
        args.book,
        limit,
        config.backfill.fallback_limit,
    );

    let choices: Vec<String> = incomplete
        .iter()
        .map(|entry| {
            format!(
                "{} - {} ({} missing)",
                entry.book_name, entry.completion_percentage, entry.missing_count
            )
        })
        .collect();
    let selection = match args.book {
        Some(choice) if choice < choices.len() => Some(choice),
        Some(choice) => {
            warn!(choice, available = choices.len(), "book index out of range");
            None
        }
        None if args.ocr.non_interactive => Some(0),
        None => prompt.select_book(&choices),
    };
    let Some(choice) = selection else {
        info!("no book selected");
        return Ok(());
    };
    let entry = incomplete[choice];

    let index = CorpusIndex::scan(&config.paths.results_root)?;
    let Some(backfill) = prepare(&config, &index, entry)? else {
        return Ok(());
    };

    let outcome = run_backfill(&config, &backfill, &mut transcriber, prompt.as_mut())?;
    report_written(&outcome);
    info!(
        book = %backfill.identity,
        attempted = outcome.attempted,
        accepted = outcome.accepted,
        still_remaining = backfill.remaining.len().saturating_sub(outcome.accepted),
        "backfill finished"
    );
    Ok(())
}
