use anyhow::{Result, bail};
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::ConsolidateArgs;
use crate::collaborators::{CommandAnnotator, PageAnnotator};
use crate::config::require_env;
use crate::consolidate::{build_report, write_report};
use crate::corpus::CorpusIndex;

use super::load_config;

pub fn run(args: ConsolidateArgs) -> Result<()> {
    let mut config = load_config(&args.common)?;
    if let Some(command) = &args.annotate_command {
        config.annotation.command = Some(command.clone());
    }

    let mut annotator = if args.annotate {
        let Some(command) = config.annotation.command.clone() else {
            bail!("--annotate needs [annotation].command or --annotate-command");
        };
        require_env(&config.annotation.required_env)?;
        Some(CommandAnnotator::new(command, config.annotation.args.clone()))
    } else {
        None
    };

    info!(results_root = %config.paths.results_root.display(), "starting consolidation");
    let index = CorpusIndex::scan(&config.paths.results_root)?.limited(args.max_records);
    if index.skipped() > 0 {
        warn!(skipped = index.skipped(), "malformed page records ignored");
    }
    if index.is_empty() {
        bail!(
            "no page records found under {}",
            config.paths.results_root.display()
        );
    }

    let library = index.library();
    let report = build_report(
        &library,
        annotator
            .as_mut()
            .map(|annotator| annotator as &mut dyn PageAnnotator),
        args.full_text,
    );
    let output_dir = write_report(&config.paths.results_root, &report, Utc::now())?;

    info!(
        books = report.summary.len(),
        records = index.len(),
        output = %output_dir.display(),
        "consolidation finished"
    );
    Ok(())
}
