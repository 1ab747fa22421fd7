use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "pageledger",
    version,
    about = "Incremental page extraction ledger for photographed books"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract pages for one book, skipping images already accepted in any run.
    Extract(ExtractArgs),
    /// Show done/remaining counts per book without calling the OCR collaborator.
    Status(StatusArgs),
    /// Merge all runs into one library and write the summary reports.
    Consolidate(ConsolidateArgs),
    /// Compare source image counts against the library and write a gap report.
    Audit(AuditArgs),
    /// Re-extract missing images for a book flagged by the latest audit.
    Backfill(BackfillArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub source_root: Option<PathBuf>,

    #[arg(long)]
    pub results_root: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct OcrArgs {
    #[arg(long)]
    pub ocr_command: Option<String>,

    #[arg(long = "ocr-arg")]
    pub ocr_args: Vec<String>,

    #[arg(long)]
    pub word_threshold: Option<usize>,

    #[arg(long)]
    pub batch_size: Option<usize>,

    #[arg(long, default_value_t = false)]
    pub non_interactive: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub ocr: OcrArgs,

    /// Book folder name; matched with the same fallbacks as the audit.
    #[arg(long)]
    pub book: Option<String>,

    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[arg(long)]
    pub book: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ConsolidateArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[arg(long, default_value_t = false)]
    pub full_text: bool,

    #[arg(long, default_value_t = false)]
    pub annotate: bool,

    #[arg(long)]
    pub annotate_command: Option<String>,

    /// Fold only the first N records in scan order.
    #[arg(long)]
    pub max_records: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct AuditArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug, Clone)]
pub struct BackfillArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub ocr: OcrArgs,

    /// Index into the list of incomplete books from the latest audit.
    #[arg(long)]
    pub book: Option<usize>,

    /// A number of images, or `all`.
    #[arg(long)]
    pub limit: Option<String>,
}
