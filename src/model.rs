use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One accepted extraction result, persisted as a single JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub book_name: String,
    pub book_author: String,
    pub page_number: Option<i64>,
    pub content: String,
    pub source_image: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub name: String,
    pub ordinal: usize,
    pub extension: String,
    pub path: PathBuf,
}

impl SourceImage {
    pub fn stem(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(self.name.as_str())
    }
}

/// What the OCR collaborator handed back for one image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawExtraction {
    pub content: Option<String>,
    pub page_number: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default, alias = "sensations_found", alias = "has_sensations")]
    pub flag: bool,
    #[serde(default, alias = "sensations", alias = "found_sensations")]
    pub findings: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibrarySummaryEntry {
    pub book_name: String,
    pub author: String,
    pub page_range: String,
    pub unique_pages_count: usize,
    pub total_word_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_sensation_pages_found: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedPage {
    pub page_number: i64,
    pub sensations: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookAnnotationReport {
    pub author: String,
    pub relevant_pages: Vec<AnnotatedPage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditStatus {
    #[serde(rename = "Complete")]
    Complete,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Not Started")]
    NotStarted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    Exact,
    WhitespaceStripped,
    TitlePrefix,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub book_name: String,
    pub author: String,
    /// Empty in reports that predate the field; backfill then resolves by slug.
    #[serde(default)]
    pub source_folder: String,
    pub status: AuditStatus,
    pub completion_percentage: String,
    pub completion_ratio: f64,
    pub pages_processed: usize,
    pub total_images_in_source: usize,
    pub missing_count: i64,
    pub sequence_gaps: Vec<i64>,
    pub gap_ranges: String,
    pub total_word_count: usize,
    #[serde(default)]
    pub matched_output_folder: Option<String>,
    #[serde(default)]
    pub match_strategy: Option<MatchStrategy>,
    #[serde(default)]
    pub integrity_warning: Option<String>,
}
