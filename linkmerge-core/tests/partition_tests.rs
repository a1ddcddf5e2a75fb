// Tests for the local partitioner

use linkmerge_core::partition::{
    OutlinkRecord, hydrate_records, parse_records, partition, read_records,
};
use linkmerge_graph::{GroupKey, Mark, MemoryPageStore, WebPage};
use std::io::Write;
use tempfile::NamedTempFile;

fn record(url: &str) -> OutlinkRecord {
    let mut page = WebPage::new(url);
    page.distance = 0;
    page.inlinks
        .insert("http://old.example.com/".to_string(), "old".to_string());
    OutlinkRecord::new(page)
}

fn key(url: &str) -> GroupKey {
    GroupKey::from_url(url).unwrap()
}

// ============================================================================
// Partition Tests
// ============================================================================

#[test]
fn test_record_yields_loop_edge_under_own_key() {
    let groups = partition(vec![record("http://a.example.com/")]);

    assert_eq!(groups.len(), 1);
    let (group_key, fragments) = &groups[0];
    assert_eq!(group_key, &key("http://a.example.com/"));
    assert_eq!(fragments.len(), 1);

    let edge = &fragments[0].edges[0];
    assert!(edge.is_loop());
    let snapshot = edge.source_page.as_ref().unwrap();
    assert_eq!(snapshot.distance, 0);
    // The focus page keeps its own inlinks on the loop edge
    assert_eq!(snapshot.inlinks.len(), 1);
}

#[test]
fn test_outlinks_grouped_under_target_key() {
    let records = vec![
        record("http://a.example.com/")
            .with_outlink("http://b.example.com/", "to b")
            .with_outlink("http://c.example.com/", "to c"),
        record("http://d.example.com/").with_outlink("http://b.example.com/", "also b"),
    ];

    let groups = partition(records);
    let b = groups
        .iter()
        .find(|(k, _)| k == &key("http://b.example.com/"))
        .map(|(_, f)| f)
        .unwrap();

    assert_eq!(b.len(), 2);
    assert_eq!(b[0].edges[0].source_url, "http://a.example.com/");
    assert_eq!(b[0].edges[0].anchor, "to b");
    assert_eq!(b[1].edges[0].source_url, "http://d.example.com/");
    assert_eq!(b[1].edges[0].anchor, "also b");
}

#[test]
fn test_outlink_snapshot_drops_inlinks() {
    let groups = partition(vec![
        record("http://a.example.com/").with_outlink("http://b.example.com/", "b"),
    ]);

    let (_, fragments) = groups
        .iter()
        .find(|(k, _)| k == &key("http://b.example.com/"))
        .unwrap();
    let snapshot = fragments[0].edges[0].source_page.as_ref().unwrap();

    assert_eq!(snapshot.url, "http://a.example.com/");
    assert_eq!(snapshot.distance, 0);
    assert!(snapshot.inlinks.is_empty());
}

#[test]
fn test_keys_are_sorted() {
    let groups = partition(vec![
        record("http://z.example.com/"),
        record("http://a.example.com/"),
    ]);

    let keys: Vec<_> = groups.iter().map(|(k, _)| k.as_str().to_string()).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

#[test]
fn test_self_links_are_skipped() {
    let groups = partition(vec![
        record("http://a.example.com/").with_outlink("http://a.example.com/", "home"),
    ]);

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].1.len(), 1);
    assert!(groups[0].1[0].edges[0].is_loop());
}

#[test]
fn test_invalid_urls_are_skipped() {
    let groups = partition(vec![
        record("not a url"),
        record("http://a.example.com/").with_outlink("::nope::", "broken"),
    ]);

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].0, key("http://a.example.com/"));
}

#[test]
fn test_urls_are_normalized() {
    let groups = partition(vec![
        record("HTTP://A.Example.com").with_outlink("http://B.example.com", "b"),
    ]);

    let (_, fragments) = &groups[0];
    let loop_edge = &fragments[0].edges[0];
    assert_eq!(loop_edge.source_url, "http://a.example.com/");
    assert_eq!(loop_edge.source_page.as_ref().unwrap().url, "http://a.example.com/");

    assert!(groups.iter().any(|(k, _)| k == &key("http://b.example.com/")));
}

// ============================================================================
// Record Parsing Tests
// ============================================================================

#[test]
fn test_parse_records_minimal_page() {
    let input = r#"
{"page": {"url": "http://a.example.com/"}, "outlinks": [{"url": "http://b.example.com/"}]}

{"page": {"url": "http://b.example.com/", "distance": 1}}
"#;

    let records = parse_records(input).unwrap();
    assert_eq!(records.len(), 2);
    assert!(!records[0].page.is_reachable());
    assert_eq!(records[0].outlinks[0].weight, 1.0);
    assert_eq!(records[0].outlinks[0].anchor, "");
    assert_eq!(records[1].page.distance, 1);
    assert!(records[1].outlinks.is_empty());
}

#[test]
fn test_parse_records_reports_line() {
    let err = parse_records("{\"page\": {\"url\": \"http://a/\"}}\n{broken").unwrap_err();
    assert!(err.starts_with("Line 2"));
}

#[test]
fn test_read_records_from_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    writeln!(
        temp_file,
        r#"{{"page": {{"url": "http://a.example.com/", "distance": 0}}, "outlinks": [{{"url": "http://b.example.com/", "anchor": "b", "weight": 0.5}}]}}"#
    )?;
    writeln!(temp_file)?;

    let records = read_records(temp_file.path())?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].outlinks[0].weight, 0.5);

    Ok(())
}

#[test]
fn test_read_records_missing_file() {
    let result = read_records(std::path::Path::new("/nonexistent/outlinks.jsonl"));
    assert!(result.is_err());
}

// ============================================================================
// Hydration Tests
// ============================================================================

fn stored_page(url: &str, distance: u32) -> WebPage {
    let mut page = WebPage::new(url);
    page.distance = distance;
    page.referrer = Some("http://root.example.com/".to_string());
    page.anchor = Some("from root".to_string());
    page.score = 0.5;
    page.marks.put(Mark::Generate, "gen-1");
    page
}

#[test]
fn test_hydrate_keeps_stored_state() {
    let store = MemoryPageStore::new();
    store.insert(stored_page("http://b.example.com/", 1)).unwrap();

    let mut fetched = WebPage::new("http://b.example.com/");
    fetched.marks.put(Mark::Parse, "parse-7");
    let records = vec![OutlinkRecord::new(fetched).with_outlink("http://c.example.com/", "c")];

    let hydrated = hydrate_records(records, &store).unwrap();
    let page = &hydrated[0].page;

    assert_eq!(page.distance, 1);
    assert_eq!(page.referrer.as_deref(), Some("http://root.example.com/"));
    assert_eq!(page.score, 0.5);
    assert_eq!(page.marks.get(Mark::Generate), Some("gen-1"));
    assert_eq!(page.marks.get(Mark::Parse), Some("parse-7"));
    assert_eq!(hydrated[0].outlinks.len(), 1);

    // Outgoing edges carry the stored distance
    let groups = partition(hydrated);
    let (_, fragments) = groups
        .iter()
        .find(|(k, _)| k == &key("http://c.example.com/"))
        .unwrap();
    let source = fragments[0].edges[0].source_page.as_ref().unwrap();
    assert_eq!(source.distance, 1);
}

#[test]
fn test_hydrate_takes_shorter_fetched_distance() {
    let store = MemoryPageStore::new();
    store.insert(stored_page("http://b.example.com/", 3)).unwrap();

    let mut reseeded = WebPage::new("http://b.example.com/");
    reseeded.distance = 0;
    let hydrated = hydrate_records(vec![OutlinkRecord::new(reseeded)], &store).unwrap();

    assert_eq!(hydrated[0].page.distance, 0);
    assert!(hydrated[0].page.referrer.is_none());
    assert_eq!(hydrated[0].page.score, 0.5);
}

#[test]
fn test_hydrate_replaces_inlinks_only_when_fetched_has_some() {
    let store = MemoryPageStore::new();
    let mut stored = stored_page("http://b.example.com/", 1);
    stored
        .inlinks
        .insert("http://root.example.com/".to_string(), "from root".to_string());
    store.insert(stored).unwrap();

    let bare = hydrate_records(
        vec![OutlinkRecord::new(WebPage::new("http://b.example.com/"))],
        &store,
    )
    .unwrap();
    assert_eq!(bare[0].page.inlinks.len(), 1);

    let with_inlinks = hydrate_records(vec![record("http://b.example.com/")], &store).unwrap();
    assert_eq!(
        with_inlinks[0].page.inlinks.keys().collect::<Vec<_>>(),
        vec!["http://old.example.com/"]
    );
}

#[test]
fn test_hydrate_passes_unknown_pages_through() {
    let store = MemoryPageStore::new();
    let records = vec![record("http://new.example.com/")];

    let hydrated = hydrate_records(records.clone(), &store).unwrap();

    assert_eq!(hydrated, records);
}
