use std::path::PathBuf;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::collaborators::{PageTranscriber, transcribe_or_empty};
use crate::identity::BookIdentity;
use crate::model::SourceImage;
use crate::prompt::Prompt;
use crate::store::write_record;
use crate::util::{ensure_directory, word_count};

use super::{accept, batches};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOutcome {
    pub attempted: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub write_failures: usize,
    pub stopped_early: bool,
    pub written: Vec<PathBuf>,
}

/// One sequential extraction pass over a single book.
pub struct ExtractionSession<'a> {
    identity: &'a BookIdentity,
    output_dir: PathBuf,
    word_threshold: usize,
    batch_size: usize,
    transcriber: &'a mut dyn PageTranscriber,
    prompt: &'a mut dyn Prompt,
}

impl<'a> ExtractionSession<'a> {
    pub fn new(
        identity: &'a BookIdentity,
        output_dir: PathBuf,
        word_threshold: usize,
        batch_size: usize,
        transcriber: &'a mut dyn PageTranscriber,
        prompt: &'a mut dyn Prompt,
    ) -> Self {
        Self {
            identity,
            output_dir,
            word_threshold,
            batch_size: batch_size.max(1),
            transcriber,
            prompt,
        }
    }

    /// Processes up to `limit` images, persisting each accepted page before moving on.
    pub fn run(&mut self, remaining: &[SourceImage], limit: Option<usize>) -> Result<SessionOutcome> {
        let mut outcome = SessionOutcome::default();
        let take = limit.unwrap_or(remaining.len()).min(remaining.len());
        let work = &remaining[..take];
        if work.is_empty() {
            return Ok(outcome);
        }

        ensure_directory(&self.output_dir)?;
        let total = work.len();

        for batch in batches(work, self.batch_size) {
            let start = outcome.attempted + 1;
            info!(
                book = %self.identity,
                from = start,
                to = outcome.attempted + batch.len(),
                total,
                "processing batch"
            );

            for image in batch {
                info!(image = %image.name, ordinal = image.ordinal, "scanning");
                let raw = transcribe_or_empty(self.transcriber, &image.path);
                outcome.attempted += 1;

                let Some(record) = accept(raw.clone(), self.identity, image, self.word_threshold)
                else {
                    let words = word_count(raw.content.as_deref().unwrap_or_default());
                    info!(
                        image = %image.name,
                        words,
                        threshold = self.word_threshold,
                        "below word threshold; not stored"
                    );
                    outcome.rejected += 1;
                    continue;
                };

                match write_record(&self.output_dir, &record, image) {
                    Ok(path) => {
                        outcome.accepted += 1;
                        outcome.written.push(path);
                    }
                    Err(err) => {
                        error!(image = %image.name, error = %err, "failed to persist page record");
                        outcome.write_failures += 1;
                    }
                }
            }

            if outcome.attempted < total {
                let next = self.batch_size.min(total - outcome.attempted);
                if !self.prompt.continue_batch(outcome.attempted, total, next) {
                    warn!(
                        attempted = outcome.attempted,
                        total, "stopped at batch checkpoint"
                    );
                    outcome.stopped_early = true;
                    break;
                }
            }
        }

        info!(
            book = %self.identity,
            attempted = outcome.attempted,
            accepted = outcome.accepted,
            rejected = outcome.rejected,
            write_failures = outcome.write_failures,
            output = %self.output_dir.display(),
            "extraction session finished"
        );
        Ok(outcome)
    }
}
