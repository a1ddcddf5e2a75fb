use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Distance of a page no seed has reached yet
pub const DISTANCE_INFINITE: u32 = u32::MAX;

/// Pipeline stages a page can be stamped with
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mark {
    Inject,
    Generate,
    Fetch,
    Parse,
    UpdateOutGraph,
    UpdateInGraph,
    Index,
}

impl Mark {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mark::Inject => "inject",
            Mark::Generate => "generate",
            Mark::Fetch => "fetch",
            Mark::Parse => "parse",
            Mark::UpdateOutGraph => "update_out_graph",
            Mark::UpdateInGraph => "update_in_graph",
            Mark::Index => "index",
        }
    }
}

/// Stage stamps of a page. Stamp values are opaque and only ever copied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Marks(BTreeMap<Mark, String>);

impl Marks {
    pub fn get(&self, mark: Mark) -> Option<&str> {
        self.0.get(&mark).map(String::as_str)
    }

    pub fn put(&mut self, mark: Mark, stamp: impl Into<String>) {
        self.0.insert(mark, stamp.into());
    }

    /// Store `stamp` under `mark` unless it is `None`; an existing stamp is
    /// never cleared.
    pub fn put_if_non_null(&mut self, mark: Mark, stamp: Option<String>) {
        if let Some(stamp) = stamp {
            self.0.insert(mark, stamp);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Mark, &str)> {
        self.0.iter().map(|(m, s)| (*m, s.as_str()))
    }
}

fn default_distance() -> u32 {
    DISTANCE_INFINITE
}

/// Persistent record of one URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebPage {
    pub url: String,
    #[serde(default = "default_distance")]
    pub distance: u32,
    #[serde(default)]
    pub referrer: Option<String>,
    /// Anchor text of the link from `referrer`
    #[serde(default)]
    pub anchor: Option<String>,
    /// Source URL -> anchor text, rebuilt on every merge
    #[serde(default)]
    pub inlinks: BTreeMap<String, String>,
    #[serde(default)]
    pub marks: Marks,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub fetch_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub prev_fetch_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fetch_interval_secs: u64,
    #[serde(default)]
    pub fetch_retries: u32,
    #[serde(skip)]
    nil: bool,
}

impl WebPage {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            distance: DISTANCE_INFINITE,
            referrer: None,
            anchor: None,
            inlinks: BTreeMap::new(),
            marks: Marks::default(),
            score: 0.0,
            fetch_time: None,
            prev_fetch_time: None,
            fetch_interval_secs: 0,
            fetch_retries: 0,
            nil: false,
        }
    }

    /// Sentinel returned by page stores for a URL they have never seen
    pub fn nil(url: impl Into<String>) -> Self {
        Self {
            nil: true,
            ..Self::new(url)
        }
    }

    pub fn is_nil(&self) -> bool {
        self.nil
    }

    pub fn is_reachable(&self) -> bool {
        self.distance != DISTANCE_INFINITE
    }
}
