//! Which images still need extraction, and whether an extraction is kept.

use std::collections::BTreeSet;

use crate::identity::BookIdentity;
use crate::model::{PageRecord, RawExtraction, SourceImage};
use crate::util::word_count;

mod session;

pub use session::{ExtractionSession, SessionOutcome};

/// All images in file-name order, minus those already accepted in any run.
pub fn plan(all_images: &[SourceImage], already_done: &BTreeSet<String>) -> Vec<SourceImage> {
    let mut remaining: Vec<SourceImage> = all_images
        .iter()
        .filter(|image| !already_done.contains(&image.name))
        .cloned()
        .collect();
    remaining.sort_by(|a, b| a.name.cmp(&b.name));
    remaining
}

pub fn batches(remaining: &[SourceImage], batch_size: usize) -> std::slice::Chunks<'_, SourceImage> {
    remaining.chunks(batch_size.max(1))
}

/// Keeps an extraction only when it reaches the word threshold.
pub fn accept(
    raw: RawExtraction,
    identity: &BookIdentity,
    image: &SourceImage,
    word_threshold: usize,
) -> Option<PageRecord> {
    let content = raw.content.unwrap_or_default();
    if word_count(&content) < word_threshold {
        return None;
    }

    Some(PageRecord {
        book_name: identity.title.clone(),
        book_author: identity.author.clone(),
        page_number: raw.page_number,
        content,
        source_image: image.name.clone(),
    })
}
