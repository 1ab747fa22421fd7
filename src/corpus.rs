//! Read-time index over every page record under the results root.
//!
//! Nothing here is cached between runs: each run rescans the tree, sorts the
//! paths, and folds them in order. Later paths win when two records claim the
//! same page of the same book.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::Result;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::identity::BookIdentity;
use crate::model::PageRecord;
use crate::store::{read_record, record_name_pattern};
use crate::util::word_count;

#[derive(Debug, Clone)]
pub struct IndexedRecord {
    pub folder: String,
    pub record: PageRecord,
}

#[derive(Debug, Default)]
pub struct CorpusIndex {
    records: Vec<IndexedRecord>,
    skipped: usize,
}

impl CorpusIndex {
    pub fn scan(root: &Path) -> Result<Self> {
        if !root.exists() {
            info!(root = %root.display(), "results root missing; corpus is empty");
            return Ok(Self::default());
        }

        let pattern = record_name_pattern()?;
        let mut paths = Vec::new();
        for entry in WalkDir::new(root) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let is_record = entry
                .file_name()
                .to_str()
                .map(|name| pattern.is_match(name))
                .unwrap_or(false);
            if is_record {
                paths.push(entry.into_path());
            }
        }
        paths.sort();

        let mut index = Self::default();
        for path in paths {
            match read_record(&path) {
                Ok(record) => {
                    let folder = path
                        .parent()
                        .and_then(|parent| parent.file_name())
                        .map(|name| name.to_string_lossy().to_string())
                        .unwrap_or_default();
                    index.records.push(IndexedRecord { folder, record });
                }
                Err(err) => {
                    debug!(error = %err, "skipping malformed page record");
                    index.skipped += 1;
                }
            }
        }

        debug!(
            records = index.records.len(),
            skipped = index.skipped,
            "corpus scan complete"
        );
        Ok(index)
    }

    /// Keeps only the first `max` records in scan order.
    pub fn limited(mut self, max: Option<usize>) -> Self {
        if let Some(max) = max {
            self.records.truncate(max);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Dedup view: images with an accepted record whose `book_name` matches, from any run.
    pub fn processed_images(&self, book_name: &str) -> BTreeSet<String> {
        self.records
            .iter()
            .filter(|indexed| indexed.record.book_name == book_name)
            .map(|indexed| indexed.record.source_image.clone())
            .collect()
    }

    pub fn folder_names(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|indexed| indexed.folder.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn folder_pages(&self, folder: &str) -> BookPages {
        let mut pages = BookPages::new(BookIdentity::from_folder_name(folder));
        for indexed in self.records.iter().filter(|indexed| indexed.folder == folder) {
            pages.insert(indexed.record.clone());
        }
        pages
    }

    /// Consolidation view: records grouped by their containing folder's identity.
    pub fn library(&self) -> BTreeMap<String, BookPages> {
        let mut library: BTreeMap<String, BookPages> = BTreeMap::new();
        for indexed in &self.records {
            let identity = BookIdentity::from_folder_name(&indexed.folder);
            let book = library
                .entry(identity.title_key())
                .or_insert_with(|| BookPages::new(identity.clone()));
            if !book.identity.has_known_author() && identity.has_known_author() {
                book.identity.author = identity.author;
            }
            book.insert(indexed.record.clone());
        }
        library
    }
}

/// The authoritative records for one book after the newest-wins fold.
#[derive(Debug, Clone)]
pub struct BookPages {
    pub identity: BookIdentity,
    pub numbered: BTreeMap<i64, PageRecord>,
    pub unnumbered: BTreeMap<String, PageRecord>,
}

impl BookPages {
    pub fn new(identity: BookIdentity) -> Self {
        Self {
            identity,
            numbered: BTreeMap::new(),
            unnumbered: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, record: PageRecord) {
        match record.page_number {
            Some(number) => {
                self.numbered.insert(number, record);
            }
            None => {
                self.unnumbered.insert(record.source_image.clone(), record);
            }
        }
    }

    pub fn processed_count(&self) -> usize {
        self.numbered.len() + self.unnumbered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processed_count() == 0
    }

    pub fn page_numbers(&self) -> Vec<i64> {
        self.numbered.keys().copied().collect()
    }

    pub fn total_word_count(&self) -> usize {
        self.numbered
            .values()
            .chain(self.unnumbered.values())
            .map(|record| word_count(&record.content))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn record(book: &str, page: Option<i64>, content: &str, image: &str) -> PageRecord {
        PageRecord {
            book_name: book.to_string(),
            book_author: "Doe".to_string(),
            page_number: page,
            content: content.to_string(),
            source_image: image.to_string(),
        }
    }

    fn write(root: &Path, relative: &str, record: &PageRecord) {
        let path = root.join(relative);
        crate::util::write_json_pretty(&path, record).unwrap();
    }

    #[test]
    fn later_insert_wins_for_the_same_page() {
        let mut pages = BookPages::new(BookIdentity::new("Book", "Doe"));
        pages.insert(record("Book", Some(1), "A", "a.jpg"));
        pages.insert(record("Book", Some(1), "B", "b.jpg"));
        pages.insert(record("Book", Some(2), "C", "c.jpg"));

        assert_eq!(pages.numbered[&1].content, "B");
        assert_eq!(pages.page_numbers(), vec![1, 2]);
        assert_eq!(pages.processed_count(), 2);
    }

    #[test]
    fn scan_order_is_lexical_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "run_b/Book_Doe/page_1.json", &record("Book", Some(1), "B", "b.jpg"));
        write(root, "run_a/Book_Doe/page_1.json", &record("Book", Some(1), "A", "a.jpg"));
        write(root, "run_a/Book_Doe/page_2.json", &record("Book", Some(2), "C", "c.jpg"));

        let index = CorpusIndex::scan(root).unwrap();
        let library = index.library();
        let book = &library["book"];

        assert_eq!(book.numbered[&1].content, "B");
        assert_eq!(book.identity.author, "Doe");
        assert_eq!(
            index.processed_images("Book"),
            BTreeSet::from(["a.jpg".to_string(), "b.jpg".to_string(), "c.jpg".to_string()])
        );
    }

    #[test]
    fn malformed_and_foreign_files_contribute_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "Book_Doe/page_3.json", &record("Book", Some(3), "ok", "c.jpg"));
        fs::write(root.join("Book_Doe/page_4.json"), b"{ broken").unwrap();
        fs::write(root.join("Book_Doe/summary.json"), b"{}").unwrap();

        let index = CorpusIndex::scan(root).unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index.skipped(), 1);
        assert_eq!(index.folder_names(), vec!["Book_Doe".to_string()]);
    }

    #[test]
    fn dedup_matches_on_book_name_field() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "Book_Doe/page_1.json", &record("Book", Some(1), "x", "a.jpg"));
        write(root, "Other_Doe/page_1.json", &record("Other", Some(1), "y", "z.jpg"));

        let index = CorpusIndex::scan(root).unwrap();

        assert_eq!(
            index.processed_images("Book"),
            BTreeSet::from(["a.jpg".to_string()])
        );
        assert!(index.processed_images("Missing").is_empty());
    }

    #[test]
    fn unnumbered_records_count_as_processed_but_not_as_pages() {
        let mut pages = BookPages::new(BookIdentity::new("Book", "Doe"));
        pages.insert(record("Book", None, "one two", "a.jpg"));
        pages.insert(record("Book", Some(4), "three", "b.jpg"));

        assert_eq!(pages.processed_count(), 2);
        assert_eq!(pages.page_numbers(), vec![4]);
        assert_eq!(pages.total_word_count(), 3);
    }

    #[test]
    fn missing_root_is_an_empty_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let index = CorpusIndex::scan(&dir.path().join("absent")).unwrap();
        assert!(index.is_empty());
    }
}
