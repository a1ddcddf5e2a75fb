// Tests for database functionality

use chrono::{TimeZone, Utc};
use linkmerge_core::data::{BatchStatus, Database};
use linkmerge_graph::{DISTANCE_INFINITE, GroupKey, Mark, PageStore, WebPage};
use tempfile::TempDir;

fn create_test_db() -> (TempDir, Database) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::new(&db_path).unwrap();
    (temp_dir, db)
}

fn sample_page(url: &str) -> WebPage {
    let mut page = WebPage::new(url);
    page.distance = 2;
    page.referrer = Some("http://example.com/".to_string());
    page.anchor = Some("docs".to_string());
    page.score = 0.5;
    page.fetch_time = Some(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap());
    page.fetch_interval_secs = 86_400;
    page.inlinks
        .insert("http://example.com/".to_string(), "docs".to_string());
    page.marks.put(Mark::Parse, "batch-7");
    page
}

// ============================================================================
// Database Creation Tests
// ============================================================================

#[test]
fn test_database_creation() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let db = Database::new(&db_path);
    assert!(db.is_ok());
    assert!(db_path.exists());
}

#[test]
fn test_database_exists() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    assert!(!Database::exists(&db_path));

    let _db = Database::new(&db_path).unwrap();
    assert!(Database::exists(&db_path));
}

#[test]
fn test_database_drop() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    {
        let _db = Database::new(&db_path).unwrap();
    }
    assert!(Database::exists(&db_path));

    Database::drop(&db_path).unwrap();
    assert!(!Database::exists(&db_path));
}

#[test]
fn test_database_drop_removes_wal_files() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let wal = temp_dir.path().join("test.db-wal");
    let shm = temp_dir.path().join("test.db-shm");

    std::fs::write(&db_path, b"").unwrap();
    std::fs::write(&wal, b"left over").unwrap();
    std::fs::write(&shm, b"left over").unwrap();

    Database::drop(&db_path).unwrap();

    assert!(!db_path.exists());
    assert!(!wal.exists());
    assert!(!shm.exists());
}

#[test]
fn test_database_drop_missing_is_ok() {
    let temp_dir = TempDir::new().unwrap();
    assert!(Database::drop(&temp_dir.path().join("never.db")).is_ok());
}

#[test]
fn test_reopen_keeps_pages() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let key = GroupKey::from_url("http://example.com/a").unwrap();

    {
        let db = Database::new(&db_path).unwrap();
        db.put_page(&key, &sample_page("http://example.com/a")).unwrap();
    }

    let db = Database::new(&db_path).unwrap();
    assert_eq!(db.count_pages().unwrap(), 1);
}

// ============================================================================
// Batch Tests
// ============================================================================

#[test]
fn test_create_batch() {
    let (_temp_dir, db) = create_test_db();

    let batch_id = db.create_batch("outlinks.jsonl", None).unwrap();
    assert!(!batch_id.is_empty());

    let batch = db.get_batch(&batch_id).unwrap().unwrap();
    assert_eq!(batch.status, BatchStatus::Running);
    assert_eq!(batch.input, "outlinks.jsonl");
    assert!(batch.end_time.is_none());
}

#[test]
fn test_create_multiple_batches() {
    let (_temp_dir, db) = create_test_db();

    let first = db.create_batch("a.jsonl", None).unwrap();
    let second = db.create_batch("b.jsonl", None).unwrap();

    assert_ne!(first, second);
}

#[test]
fn test_complete_batch() {
    let (_temp_dir, db) = create_test_db();

    let batch_id = db.create_batch("a.jsonl", Some("{\"workers\":2}")).unwrap();
    db.complete_batch(&batch_id, "{\"rows\":3}").unwrap();

    let batch = db.get_batch(&batch_id).unwrap().unwrap();
    assert_eq!(batch.status, BatchStatus::Completed);
    assert_eq!(batch.configuration.as_deref(), Some("{\"workers\":2}"));
    assert_eq!(batch.counters.as_deref(), Some("{\"rows\":3}"));
    assert!(batch.end_time.is_some());
}

#[test]
fn test_fail_batch() {
    let (_temp_dir, db) = create_test_db();

    let batch_id = db.create_batch("a.jsonl", None).unwrap();
    db.fail_batch(&batch_id).unwrap();

    let batch = db.get_batch(&batch_id).unwrap().unwrap();
    assert_eq!(batch.status, BatchStatus::Failed);
    assert!(batch.counters.is_none());
}

#[test]
fn test_get_unknown_batch() {
    let (_temp_dir, db) = create_test_db();
    assert!(db.get_batch("no-such-batch").unwrap().is_none());
}

#[test]
fn test_batch_status_strings() {
    for status in [BatchStatus::Running, BatchStatus::Completed, BatchStatus::Failed] {
        assert_eq!(BatchStatus::from_str(status.as_str()), Some(status));
    }
    assert_eq!(BatchStatus::from_str("cancelled"), None);
}

// ============================================================================
// Page Tests
// ============================================================================

#[test]
fn test_put_and_get_page() {
    let (_temp_dir, db) = create_test_db();
    let page = sample_page("http://example.com/docs");
    let key = GroupKey::from_url(&page.url).unwrap();

    db.put_page(&key, &page).unwrap();
    let loaded = db.get_page(&key).unwrap().unwrap();

    assert_eq!(loaded, page);
    assert_eq!(loaded.marks.get(Mark::Parse), Some("batch-7"));
}

#[test]
fn test_get_missing_page() {
    let (_temp_dir, db) = create_test_db();
    let key = GroupKey::from_url("http://example.com/missing").unwrap();
    assert!(db.get_page(&key).unwrap().is_none());
}

#[test]
fn test_put_page_replaces() {
    let (_temp_dir, db) = create_test_db();
    let mut page = sample_page("http://example.com/docs");
    let key = GroupKey::from_url(&page.url).unwrap();

    db.put_page(&key, &page).unwrap();
    page.distance = 1;
    page.inlinks.clear();
    db.put_page(&key, &page).unwrap();

    let loaded = db.get_page(&key).unwrap().unwrap();
    assert_eq!(loaded.distance, 1);
    assert!(loaded.inlinks.is_empty());
    assert_eq!(db.count_pages().unwrap(), 1);
}

#[test]
fn test_unreachable_distance_round_trips() {
    let (_temp_dir, db) = create_test_db();
    let page = WebPage::new("http://example.com/orphan");
    let key = GroupKey::from_url(&page.url).unwrap();

    db.put_page(&key, &page).unwrap();
    let loaded = db.get_page(&key).unwrap().unwrap();

    assert_eq!(loaded.distance, DISTANCE_INFINITE);
    assert!(!loaded.is_reachable());
}

#[test]
fn test_list_pages_ordered_by_distance() {
    let (_temp_dir, db) = create_test_db();

    for (url, distance) in [
        ("http://example.com/far", 3),
        ("http://example.com/", 0),
        ("http://example.com/near", 1),
    ] {
        let mut page = WebPage::new(url);
        page.distance = distance;
        db.put_page(&GroupKey::from_url(url).unwrap(), &page).unwrap();
    }

    let pages = db.list_pages(10).unwrap();
    let urls: Vec<_> = pages.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(
        urls,
        vec!["http://example.com/", "http://example.com/near", "http://example.com/far"]
    );

    assert_eq!(db.list_pages(2).unwrap().len(), 2);
}

#[test]
fn test_distance_histogram() {
    let (_temp_dir, db) = create_test_db();

    for (url, distance) in [
        ("http://example.com/a", 1),
        ("http://example.com/b", 1),
        ("http://example.com/c", 2),
    ] {
        let mut page = WebPage::new(url);
        page.distance = distance;
        db.put_page(&GroupKey::from_url(url).unwrap(), &page).unwrap();
    }

    assert_eq!(db.distance_histogram().unwrap(), vec![(1, 2), (2, 1)]);
}

// ============================================================================
// PageStore Tests
// ============================================================================

#[test]
fn test_page_store_missing_is_nil() {
    let (_temp_dir, db) = create_test_db();

    let page = db.get_or_nil("http://example.com/new").unwrap();
    assert!(page.is_nil());
    assert_eq!(page.url, "http://example.com/new");
}

#[test]
fn test_page_store_put_then_get() {
    let (_temp_dir, db) = create_test_db();
    let page = sample_page("http://example.com/docs");
    let key = GroupKey::from_url(&page.url).unwrap();

    PageStore::put(&db, &key, &page).unwrap();
    let loaded = db.get_or_nil("http://example.com/docs").unwrap();

    assert!(!loaded.is_nil());
    assert_eq!(loaded.distance, 2);
}

#[test]
fn test_page_store_rejects_bad_url() {
    let (_temp_dir, db) = create_test_db();
    assert!(db.get_or_nil("not a url").is_err());
}

#[test]
fn test_in_memory_database() {
    let db = Database::in_memory().unwrap();
    assert_eq!(db.count_pages().unwrap(), 0);
}
