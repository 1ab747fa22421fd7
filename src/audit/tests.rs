use std::fs;

use chrono::TimeZone;

use super::*;
use crate::model::PageRecord;

fn record(book: &str, page: Option<i64>, image: &str) -> PageRecord {
    PageRecord {
        book_name: book.to_string(),
        book_author: "JaneDoe".to_string(),
        page_number: page,
        content: "one two three".to_string(),
        source_image: image.to_string(),
    }
}

fn source_book(root: &Path, folder: &str, images: usize) {
    let dir = root.join("books").join(folder);
    fs::create_dir_all(&dir).unwrap();
    for index in 0..images {
        fs::write(dir.join(format!("IMG_{index:04}.jpg")), b"jpeg").unwrap();
    }
}

fn extensions() -> Vec<String> {
    vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()]
}

#[test]
fn gaps_inside_the_observed_span() {
    let gaps = sequence_gaps(&[1, 2, 3, 6, 8, 9, 10]);
    assert_eq!(gaps, vec![4, 5, 7]);
    assert_eq!(compact_ranges(&gaps), "4-5, 7");
    assert!(sequence_gaps(&[]).is_empty());
    assert!(sequence_gaps(&[12]).is_empty());
}

#[test]
fn compaction_renders_runs_and_singles() {
    assert_eq!(compact_ranges(&[5, 6, 7, 10, 12, 13]), "5-7, 10, 12-13");
    assert_eq!(compact_ranges(&[13, 12, 5]), "5, 12-13");
    assert_eq!(compact_ranges(&[]), "");
}

#[test]
fn completion_never_divides_by_zero() {
    assert_eq!(completion_percentage(0, 0), 0.0);
    assert_eq!(format_percentage(completion_percentage(40, 40)), "100.0%");
    assert_eq!(format_percentage(completion_percentage(1, 3)), "33.3%");
}

#[test]
fn fully_processed_book_is_complete() {
    let mut pages = BookPages::new(BookIdentity::new("TheWinterOfMySoul", "JaneDoe"));
    for page in 1..=40 {
        pages.insert(record("TheWinterOfMySoul", Some(page), &format!("{page}.jpg")));
    }

    let entry = audit_book("TheWinterOfMySoul_JaneDoe", 40, Some(&pages), None);

    assert_eq!(entry.completion_percentage, "100.0%");
    assert_eq!(entry.missing_count, 0);
    assert!(entry.sequence_gaps.is_empty());
    assert_eq!(entry.gap_ranges, "");
    assert_eq!(entry.status, AuditStatus::Complete);
    assert!(entry.integrity_warning.is_none());
}

#[test]
fn excess_records_surface_an_integrity_warning() {
    let mut pages = BookPages::new(BookIdentity::new("Book", "JaneDoe"));
    pages.insert(record("Book", Some(1), "a.jpg"));
    pages.insert(record("Book", Some(2), "a.jpg"));
    pages.insert(record("Book", Some(3), "b.jpg"));

    let entry = audit_book("Book_JaneDoe", 2, Some(&pages), None);

    assert_eq!(entry.missing_count, -1);
    assert!(entry.integrity_warning.is_some());
}

#[test]
fn unmatched_book_reports_zero_progress() {
    let entry = audit_book("Lost_JaneDoe", 12, None, None);
    assert_eq!(entry.status, AuditStatus::NotStarted);
    assert_eq!(entry.pages_processed, 0);
    assert_eq!(entry.missing_count, 12);
    assert_eq!(entry.completion_percentage, "0.0%");
}

#[test]
fn folder_matching_falls_back_in_order() {
    let candidates = vec![
        "Other_Author".to_string(),
        "The Winter Of My Soul_JaneDoe".to_string(),
    ];
    let matched = match_folder("TheWinterOfMySoul_JaneDoe", &candidates, |_| true);
    assert_eq!(
        matched,
        Some(("The Winter Of My Soul_JaneDoe", MatchStrategy::WhitespaceStripped))
    );

    let candidates = vec!["TheWinterOfMySoul".to_string()];
    let matched = match_folder("TheWinterOfMySoul_JaneDoe", &candidates, |_| true);
    assert_eq!(matched, Some(("TheWinterOfMySoul", MatchStrategy::TitlePrefix)));

    let matched = match_folder("TheWinterOfMySoul_JaneDoe", &candidates, |_| false);
    assert_eq!(matched, None);
}

#[test]
fn title_prefix_stops_at_the_author_separator() {
    let candidates = vec!["DuneMessiah_Herbert".to_string()];
    assert_eq!(match_folder("Dune_Herbert", &candidates, |_| true), None);
    assert_eq!(match_folder("Dune", &candidates, |_| true), None);

    let candidates = vec!["Dune_Herbert".to_string()];
    assert_eq!(match_folder("DuneMessiah_Herbert", &candidates, |_| true), None);
    assert_eq!(match_folder("DuneMessiah", &candidates, |_| true), None);

    let candidates = vec!["DuneMessiah_Herbert".to_string(), "Dune".to_string()];
    assert_eq!(
        match_folder("Dune_Herbert", &candidates, |_| true),
        Some(("Dune", MatchStrategy::TitlePrefix))
    );
}

#[test]
fn sibling_book_pages_are_not_credited() {
    let dir = tempfile::tempdir().unwrap();
    source_book(dir.path(), "Dune_Herbert", 3);
    source_book(dir.path(), "DuneMessiah_Herbert", 3);
    let library = dir.path().join("results").join("Organized_Library");
    for (page, image) in [(1, "IMG_0000.jpg"), (2, "IMG_0001.jpg")] {
        write_json_pretty(
            &library
                .join("DuneMessiah_Herbert")
                .join(format!("page_{page}.json")),
            &record("DuneMessiah", Some(page), image),
        )
        .unwrap();
    }

    let index = CorpusIndex::scan(&dir.path().join("results")).unwrap();
    let report = audit_library(&dir.path().join("books"), &index, &extensions()).unwrap();
    let dune = report
        .entries
        .iter()
        .find(|entry| entry.source_folder == "Dune_Herbert")
        .unwrap();
    let messiah = report
        .entries
        .iter()
        .find(|entry| entry.source_folder == "DuneMessiah_Herbert")
        .unwrap();

    assert_eq!(dune.pages_processed, 0);
    assert_eq!(dune.status, AuditStatus::NotStarted);
    assert_eq!(dune.matched_output_folder, None);
    assert_eq!(messiah.pages_processed, 2);
    assert_eq!(messiah.match_strategy, Some(MatchStrategy::Exact));
}

#[test]
fn latest_audit_orders_collision_suffixes_numerically() {
    let dir = tempfile::tempdir().unwrap();
    let results = dir.path();
    for name in [
        "library_audit_20260219T090000Z",
        "library_audit_20260219T090000Z_9",
        "library_audit_20260219T090000Z_10",
        "library_audit_20260219T080000Z_11",
    ] {
        fs::create_dir_all(results.join(name)).unwrap();
    }
    fs::write(results.join("library_audit_20260219T100000Z"), b"not a dir").unwrap();

    assert_eq!(
        latest_audit_dir(results).unwrap(),
        Some(results.join("library_audit_20260219T090000Z_10"))
    );
}

#[test]
fn renamed_output_folder_yields_identical_audit() {
    let mut results = Vec::new();
    for output_folder in ["TheWinterOfMySoul_JaneDoe", "TheWinterOfMySoul"] {
        let dir = tempfile::tempdir().unwrap();
        source_book(dir.path(), "TheWinterOfMySoul_JaneDoe", 6);
        let library = dir.path().join("results").join("Organized_Library");
        for (page, image) in [(1, "IMG_0000.jpg"), (2, "IMG_0001.jpg"), (4, "IMG_0003.jpg")] {
            write_json_pretty(
                &library.join(output_folder).join(format!("page_{page}.json")),
                &record("TheWinterOfMySoul", Some(page), image),
            )
            .unwrap();
        }

        let index = CorpusIndex::scan(&dir.path().join("results")).unwrap();
        let report = audit_library(&dir.path().join("books"), &index, &extensions()).unwrap();
        let mut entry = report.entries[0].clone();
        entry.matched_output_folder = None;
        entry.match_strategy = None;
        results.push(entry);
    }

    assert_eq!(results[0], results[1]);
    assert_eq!(results[0].pages_processed, 3);
    assert_eq!(results[0].missing_count, 3);
    assert_eq!(results[0].gap_ranges, "3");
    assert_eq!(results[0].completion_percentage, "50.0%");
}

#[test]
fn audit_reports_go_to_fresh_directories_and_latest_wins() {
    let dir = tempfile::tempdir().unwrap();
    source_book(dir.path(), "Alpha_Author", 2);
    source_book(dir.path(), "Beta_Author", 1);
    let results = dir.path().join("results");
    write_json_pretty(
        &results.join("Organized_Library/Alpha_Author/page_1.json"),
        &record("Alpha", Some(1), "IMG_0000.jpg"),
    )
    .unwrap();

    let index = CorpusIndex::scan(&results).unwrap();
    let report = audit_library(&dir.path().join("books"), &index, &extensions()).unwrap();
    assert_eq!(report.entries.len(), 2);
    assert_eq!(report.summary.len(), 1);
    assert_eq!(report.summary[0].page_range, "1 - 1");

    let early = Utc.with_ymd_and_hms(2026, 2, 19, 8, 0, 0).unwrap();
    let late = Utc.with_ymd_and_hms(2026, 2, 19, 9, 0, 0).unwrap();
    let first = write_audit(&results, &report, early).unwrap();
    let second = write_audit(&results, &report, late).unwrap();

    assert!(first.join(GAP_REPORT_FILE).exists());
    assert_eq!(latest_audit_dir(&results).unwrap(), Some(second.clone()));

    let loaded = load_audit_entries(&second).unwrap();
    assert_eq!(loaded, report.entries);
}
