// Tests for report generation functionality

use chrono::{TimeZone, Utc};
use linkmerge_core::data::Database;
use linkmerge_core::merge::{MergeFailure, MergeSummary};
use linkmerge_core::report::{
    PageRow, ReportData, ReportFormat, gather_report_data, generate_json_report,
    generate_markdown_report, generate_report, generate_text_report, save_report,
};
use linkmerge_graph::{CounterSnapshot, DepthBucket, GroupKey, WebPage};
use tempfile::TempDir;

fn sample_summary() -> MergeSummary {
    let mut counters = CounterSnapshot {
        rows: 3,
        persisted: 2,
        created: 1,
        skipped: 0,
        failed: 1,
        ..Default::default()
    };
    counters.depth.insert(DepthBucket::Depth0, 1);
    counters.depth.insert(DepthBucket::Depth1, 1);

    MergeSummary {
        batch_id: Some("batch-1234".to_string()),
        keys: 3,
        started_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        finished_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 5).unwrap(),
        counters,
        failures: vec![MergeFailure {
            key: GroupKey::new("com.example.broken:http/"),
            error: "Store error: disk full".to_string(),
        }],
    }
}

fn sample_data() -> ReportData {
    let mut root = WebPage::new("http://example.com/");
    root.distance = 0;
    let mut child = WebPage::new("http://example.com/docs");
    child.distance = 1;
    child.referrer = Some("http://example.com/".to_string());
    let orphan = WebPage::new("http://example.com/orphan");

    ReportData {
        summary: sample_summary(),
        total_pages: 3,
        pages: [&root, &child, &orphan].into_iter().map(PageRow::from).collect(),
    }
}

// ============================================================================
// Report Format Tests
// ============================================================================

#[test]
fn test_report_format_from_str_text() {
    let format = ReportFormat::from_str("text");
    assert!(matches!(format, Some(ReportFormat::Text)));
}

#[test]
fn test_report_format_from_str_json() {
    let format = ReportFormat::from_str("json");
    assert!(matches!(format, Some(ReportFormat::Json)));
}

#[test]
fn test_report_format_from_str_markdown() {
    assert!(matches!(
        ReportFormat::from_str("markdown"),
        Some(ReportFormat::Markdown)
    ));
    assert!(matches!(
        ReportFormat::from_str("md"),
        Some(ReportFormat::Markdown)
    ));
}

#[test]
fn test_report_format_from_str_case_insensitive() {
    assert!(matches!(
        ReportFormat::from_str("TEXT"),
        Some(ReportFormat::Text)
    ));
    assert!(matches!(
        ReportFormat::from_str("Json"),
        Some(ReportFormat::Json)
    ));
}

#[test]
fn test_report_format_from_str_invalid() {
    assert!(ReportFormat::from_str("csv").is_none());
    assert!(ReportFormat::from_str("").is_none());
}

// ============================================================================
// Page Row Tests
// ============================================================================

#[test]
fn test_page_row_unreachable_has_no_distance() {
    let row = PageRow::from(&WebPage::new("http://example.com/orphan"));
    assert_eq!(row.distance, None);
}

#[test]
fn test_page_row_counts_inlinks() {
    let mut page = WebPage::new("http://example.com/a");
    page.distance = 2;
    page.inlinks.insert("http://x/".to_string(), "x".to_string());
    page.inlinks.insert("http://y/".to_string(), "y".to_string());

    let row = PageRow::from(&page);
    assert_eq!(row.distance, Some(2));
    assert_eq!(row.inlinks, 2);
}

// ============================================================================
// Text Report Tests
// ============================================================================

#[test]
fn test_text_report_contains_summary() {
    let report = generate_text_report(&sample_data());

    assert!(report.contains("LINKMERGE BATCH REPORT"));
    assert!(report.contains("batch-1234"));
    assert!(report.contains("Duration:     5 seconds"));
    assert!(report.contains("persisted"));
    assert!(report.contains("depth_n"));
    assert!(report.contains("End of Report"));
}

#[test]
fn test_text_report_lists_failures_and_pages() {
    let report = generate_text_report(&sample_data());

    assert!(report.contains("FAILURES"));
    assert!(report.contains("com.example.broken:http/"));
    assert!(report.contains("[1] http://example.com/docs"));
    assert!(report.contains("via http://example.com/"));
    assert!(report.contains("[∞] http://example.com/orphan"));
}

#[test]
fn test_text_report_without_failures() {
    let mut data = sample_data();
    data.summary.failures.clear();

    let report = generate_text_report(&data);
    assert!(!report.contains("FAILURES"));
}

// ============================================================================
// JSON Report Tests
// ============================================================================

#[test]
fn test_json_report_structure() {
    let json = generate_json_report(&sample_data()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    let report = &value["report"];
    assert_eq!(report["metadata"]["generator"], "linkmerge");
    assert_eq!(report["batch"]["id"], "batch-1234");
    assert_eq!(report["batch"]["duration_seconds"], 5);
    assert_eq!(report["counters"]["persisted"], 2);
    assert_eq!(report["counters"]["depth"]["depth0"], 1);
    assert_eq!(report["pages"]["total"], 3);
    assert_eq!(report["pages"]["listed"].as_array().unwrap().len(), 3);
    assert!(report["pages"]["listed"][2]["distance"].is_null());
    assert_eq!(report["failures"][0]["key"], "com.example.broken:http/");
}

// ============================================================================
// Markdown Report Tests
// ============================================================================

#[test]
fn test_markdown_report_tables() {
    let report = generate_markdown_report(&sample_data());

    assert!(report.starts_with("# linkmerge batch report"));
    assert!(report.contains("| persisted | 2 |"));
    assert!(report.contains("| depth0 | 1 |"));
    assert!(report.contains("| 1 | http://example.com/docs | http://example.com/ | 0 | 0.000 |"));
    assert!(report.contains("## Failures"));
}

#[test]
fn test_generate_report_dispatches_on_format() {
    let data = sample_data();

    let text = generate_report(&data, ReportFormat::Text).unwrap();
    let json = generate_report(&data, ReportFormat::Json).unwrap();
    let markdown = generate_report(&data, ReportFormat::Markdown).unwrap();

    assert!(text.contains("LINKMERGE BATCH REPORT"));
    assert!(json.trim_start().starts_with('{'));
    assert!(markdown.starts_with('#'));
}

// ============================================================================
// Gather and Save Tests
// ============================================================================

#[test]
fn test_gather_report_data_from_database() {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::new(&temp_dir.path().join("test.db")).unwrap();

    for (url, distance) in [("http://example.com/", 0), ("http://example.com/a", 1)] {
        let mut page = WebPage::new(url);
        page.distance = distance;
        db.put_page(&GroupKey::from_url(url).unwrap(), &page).unwrap();
    }

    let data = gather_report_data(&db, &sample_summary(), 1).unwrap();
    assert_eq!(data.total_pages, 2);
    assert_eq!(data.pages.len(), 1);
    assert_eq!(data.pages[0].url, "http://example.com/");
}

#[test]
fn test_save_report() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("report.md");

    save_report("# report\n", &path).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "# report\n");
}
