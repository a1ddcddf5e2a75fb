// Local partitioner: turns parsed pages and their outlinks into per-key
// graph fragments, the way the merge step expects them delivered.

use linkmerge_graph::error::Result as GraphResult;
use linkmerge_graph::{GraphFragment, GroupKey, PageStore, WebEdge, WebPage, normalize_url};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outlink {
    pub url: String,
    #[serde(default)]
    pub anchor: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl Outlink {
    pub fn new(url: impl Into<String>, anchor: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anchor: anchor.into(),
            weight: default_weight(),
        }
    }
}

/// One fetched and parsed page together with the links found on it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlinkRecord {
    pub page: WebPage,
    #[serde(default)]
    pub outlinks: Vec<Outlink>,
}

impl OutlinkRecord {
    pub fn new(page: WebPage) -> Self {
        Self {
            page,
            outlinks: Vec::new(),
        }
    }

    pub fn with_outlink(mut self, url: impl Into<String>, anchor: impl Into<String>) -> Self {
        self.outlinks.push(Outlink::new(url, anchor));
        self
    }
}

/// Fold a freshly fetched page into its stored row. The stored row wins
/// except for marks, inlinks when the fetch saw any, and a shorter distance.
fn overlay_fetched(mut stored: WebPage, fetched: WebPage) -> WebPage {
    for (mark, stamp) in fetched.marks.iter() {
        stored.marks.put(mark, stamp);
    }
    if !fetched.inlinks.is_empty() {
        stored.inlinks = fetched.inlinks;
    }
    if fetched.distance < stored.distance {
        stored.distance = fetched.distance;
        stored.referrer = fetched.referrer;
        stored.anchor = fetched.anchor;
    }
    stored
}

/// Replace each record's page with its stored row, overlaid with what the
/// fetch produced. Records without a stored row, or with a URL that does
/// not parse, pass through untouched.
pub fn hydrate_records<S>(records: Vec<OutlinkRecord>, store: &S) -> GraphResult<Vec<OutlinkRecord>>
where
    S: PageStore + ?Sized,
{
    let mut hydrated = Vec::with_capacity(records.len());
    let mut from_store = 0usize;

    for record in records {
        let Ok(url) = normalize_url(&record.page.url) else {
            hydrated.push(record);
            continue;
        };

        let stored = store.get_or_nil(&url)?;
        if stored.is_nil() {
            hydrated.push(record);
            continue;
        }

        from_store += 1;
        hydrated.push(OutlinkRecord {
            page: overlay_fetched(stored, record.page),
            outlinks: record.outlinks,
        });
    }

    debug!("Hydrated {}/{} records from the page store", from_store, hydrated.len());
    Ok(hydrated)
}

/// Snapshot shipped along outgoing edges. Inlinks are dropped since the
/// target never reads them.
fn edge_snapshot(page: &WebPage) -> WebPage {
    let mut snapshot = page.clone();
    snapshot.inlinks.clear();
    snapshot
}

/// Group records by key. Every record yields a loop edge under its own key
/// and one edge per outlink under the outlink's key. Keys come out sorted,
/// fragments within a key keep input order.
pub fn partition<I>(records: I) -> Vec<(GroupKey, Vec<GraphFragment>)>
where
    I: IntoIterator<Item = OutlinkRecord>,
{
    let mut groups: BTreeMap<GroupKey, Vec<GraphFragment>> = BTreeMap::new();

    for record in records {
        let OutlinkRecord { mut page, outlinks } = record;

        let source_url = match normalize_url(&page.url) {
            Ok(url) => url,
            Err(e) => {
                warn!("Skipping record with invalid page URL: {}", e);
                continue;
            }
        };
        let source_key = match GroupKey::from_url(&source_url) {
            Ok(key) => key,
            Err(e) => {
                warn!("Skipping record for {}: {}", source_url, e);
                continue;
            }
        };
        page.url = source_url.clone();

        let snapshot = edge_snapshot(&page);
        let mut outgoing: Vec<(GroupKey, WebEdge)> = Vec::with_capacity(outlinks.len());

        for outlink in outlinks {
            let target_url = match normalize_url(&outlink.url) {
                Ok(url) => url,
                Err(e) => {
                    warn!("Skipping outlink of {}: {}", source_url, e);
                    continue;
                }
            };
            if target_url == source_url {
                debug!("Skipping self-link on {}", source_url);
                continue;
            }
            let target_key = match GroupKey::from_url(&target_url) {
                Ok(key) => key,
                Err(e) => {
                    warn!("Skipping outlink of {}: {}", source_url, e);
                    continue;
                }
            };

            let edge = WebEdge::new(&source_url, target_url, outlink.anchor)
                .with_weight(outlink.weight)
                .with_source_page(snapshot.clone());
            outgoing.push((target_key, edge));
        }

        groups
            .entry(source_key)
            .or_default()
            .push(GraphFragment::new(vec![WebEdge::self_loop(page)]));

        for (key, edge) in outgoing {
            groups
                .entry(key)
                .or_default()
                .push(GraphFragment::new(vec![edge]));
        }
    }

    groups.into_iter().collect()
}

/// Parse JSON lines, ignoring blank lines
pub fn parse_records(content: &str) -> Result<Vec<OutlinkRecord>, String> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|e| format!("Line {}: {}", idx + 1, e))
        })
        .collect()
}

pub fn read_records(path: &Path) -> Result<Vec<OutlinkRecord>, String> {
    let file =
        File::open(path).map_err(|e| format!("Failed to open {}: {}", path.display(), e))?;

    let mut records = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line)
            .map_err(|e| format!("{} line {}: {}", path.display(), idx + 1, e))?;
        records.push(record);
    }

    Ok(records)
}
