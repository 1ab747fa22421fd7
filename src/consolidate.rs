//! Merges every record of a book into one ordered page sequence and derives the library views.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::collaborators::{PageAnnotator, analyze_or_default};
use crate::corpus::BookPages;
use crate::identity::BookIdentity;
use crate::model::{AnnotatedPage, BookAnnotationReport, LibrarySummaryEntry};
use crate::util::{fresh_run_directory, word_count, write_json_pretty};

pub const SUMMARY_FILE: &str = "1_library_high_level.json";
pub const ANNOTATION_FILE: &str = "2_body_sensations_report.json";
pub const FULL_TEXT_FILE: &str = "3_master_book_texts.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolidatedPage {
    pub page_number: i64,
    pub word_count: usize,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct ConsolidatedBook {
    pub identity: BookIdentity,
    pub pages: Vec<ConsolidatedPage>,
    pub total_word_count: usize,
}

impl ConsolidatedBook {
    pub fn page_range(&self) -> String {
        match (self.pages.first(), self.pages.last()) {
            (Some(first), Some(last)) => format!("{} - {}", first.page_number, last.page_number),
            _ => "0".to_string(),
        }
    }

    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|page| format!("--- Page {} ---\n{}", page.page_number, page.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Numbered pages only: a page without a number has no place in the sequence.
pub fn consolidate_book(book: &BookPages) -> ConsolidatedBook {
    let pages: Vec<ConsolidatedPage> = book
        .numbered
        .iter()
        .map(|(number, record)| ConsolidatedPage {
            page_number: *number,
            word_count: word_count(&record.content),
            content: record.content.clone(),
        })
        .collect();
    let total_word_count = pages.iter().map(|page| page.word_count).sum();

    ConsolidatedBook {
        identity: book.identity.clone(),
        pages,
        total_word_count,
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConsolidationReport {
    pub summary: Vec<LibrarySummaryEntry>,
    pub annotations: BTreeMap<String, BookAnnotationReport>,
    pub full_texts: Option<BTreeMap<String, String>>,
}

pub fn build_report(
    library: &BTreeMap<String, BookPages>,
    mut annotator: Option<&mut dyn PageAnnotator>,
    include_full_text: bool,
) -> ConsolidationReport {
    let mut report = ConsolidationReport {
        full_texts: include_full_text.then(BTreeMap::new),
        ..ConsolidationReport::default()
    };

    for book in library.values() {
        let consolidated = consolidate_book(book);
        let title = consolidated.identity.title.clone();
        info!(
            book = %consolidated.identity,
            unique_pages = consolidated.pages.len(),
            "consolidating"
        );

        let annotated_pages = annotator.as_deref_mut().map(|annotator| {
            consolidated
                .pages
                .iter()
                .filter_map(|page| {
                    let annotation = analyze_or_default(annotator, &page.content);
                    annotation.flag.then(|| AnnotatedPage {
                        page_number: page.page_number,
                        sensations: annotation.findings,
                    })
                })
                .collect::<Vec<_>>()
        });

        report.summary.push(LibrarySummaryEntry {
            book_name: title.clone(),
            author: consolidated.identity.author.clone(),
            page_range: consolidated.page_range(),
            unique_pages_count: consolidated.pages.len(),
            total_word_count: consolidated.total_word_count,
            body_sensation_pages_found: annotated_pages.as_ref().map(Vec::len),
        });

        if let Some(relevant_pages) = annotated_pages.filter(|pages| !pages.is_empty()) {
            report.annotations.insert(
                title.clone(),
                BookAnnotationReport {
                    author: consolidated.identity.author.clone(),
                    relevant_pages,
                },
            );
        }

        if let Some(full_texts) = report.full_texts.as_mut() {
            full_texts.insert(title, consolidated.full_text());
        }
    }

    report
}

pub fn write_report(
    results_root: &Path,
    report: &ConsolidationReport,
    ts: DateTime<Utc>,
) -> Result<PathBuf> {
    let output_dir = fresh_run_directory(results_root, "consolidated_summary", ts)?;

    write_json_pretty(&output_dir.join(SUMMARY_FILE), &report.summary)?;
    write_json_pretty(&output_dir.join(ANNOTATION_FILE), &report.annotations)?;
    if let Some(full_texts) = &report.full_texts {
        write_json_pretty(&output_dir.join(FULL_TEXT_FILE), full_texts)?;
    }

    Ok(output_dir)
}
