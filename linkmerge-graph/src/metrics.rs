use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    /// Group keys handed to the merge driver
    Rows,
    /// Pages written back to the store
    Persisted,
    /// Pages created because the store had no record
    Created,
    /// Keys dropped because no focus page could be resolved
    Skipped,
    /// Keys dropped because processing failed
    Failed,
}

/// Histogram bucket of the merged page's distance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthBucket {
    Depth0,
    Depth1,
    Depth2,
    Depth3,
    DepthN,
}

impl DepthBucket {
    pub const ALL: [DepthBucket; 5] = [
        DepthBucket::Depth0,
        DepthBucket::Depth1,
        DepthBucket::Depth2,
        DepthBucket::Depth3,
        DepthBucket::DepthN,
    ];

    pub fn for_distance(distance: u32) -> Self {
        match distance {
            0 => DepthBucket::Depth0,
            1 => DepthBucket::Depth1,
            2 => DepthBucket::Depth2,
            3 => DepthBucket::Depth3,
            _ => DepthBucket::DepthN,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DepthBucket::Depth0 => "depth0",
            DepthBucket::Depth1 => "depth1",
            DepthBucket::Depth2 => "depth2",
            DepthBucket::Depth3 => "depth3",
            DepthBucket::DepthN => "depth_n",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Monotonic merge counters, safe to share across workers
#[derive(Debug, Default)]
pub struct MergeCounters {
    rows: AtomicU64,
    persisted: AtomicU64,
    created: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    depth: [AtomicU64; 5],
}

impl MergeCounters {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, counter: Counter) -> &AtomicU64 {
        match counter {
            Counter::Rows => &self.rows,
            Counter::Persisted => &self.persisted,
            Counter::Created => &self.created,
            Counter::Skipped => &self.skipped,
            Counter::Failed => &self.failed,
        }
    }

    pub fn increase(&self, counter: Counter) {
        self.counter(counter).fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, counter: Counter) -> u64 {
        self.counter(counter).load(Ordering::Relaxed)
    }

    pub fn increase_depth(&self, distance: u32) {
        self.depth[DepthBucket::for_distance(distance).index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn depth(&self, bucket: DepthBucket) -> u64 {
        self.depth[bucket.index()].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            rows: self.get(Counter::Rows),
            persisted: self.get(Counter::Persisted),
            created: self.get(Counter::Created),
            skipped: self.get(Counter::Skipped),
            failed: self.get(Counter::Failed),
            depth: DepthBucket::ALL
                .iter()
                .map(|b| (*b, self.depth(*b)))
                .collect(),
        }
    }
}

/// Point-in-time copy of [`MergeCounters`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub rows: u64,
    pub persisted: u64,
    pub created: u64,
    pub skipped: u64,
    pub failed: u64,
    pub depth: BTreeMap<DepthBucket, u64>,
}
