use crate::config::MergeConfig;
use crate::data::Database;
use crate::partition::{OutlinkRecord, hydrate_records, partition};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use linkmerge_graph::{
    CounterSnapshot, GraphFragment, GroupKey, MergeResult, OutGraphReducer, PageStore,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, error, info};

/// Options for configuring a merge run
pub struct MergeOptions {
    pub workers: usize,
    pub show_progress_bars: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            workers: 4,
            show_progress_bars: false,
        }
    }
}

/// Callback for reporting merge progress
pub type MergeProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Callback for individual merge results as they come in
pub type MergeResultCallback = Arc<dyn Fn(&MergeResult) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeFailure {
    pub key: GroupKey,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    pub keys: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub counters: CounterSnapshot,
    pub failures: Vec<MergeFailure>,
}

impl MergeSummary {
    pub fn duration_secs(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

type WorkQueue = VecDeque<(GroupKey, Vec<GraphFragment>)>;

/// Deal groups out to `workers` queues, round-robin
fn distribute(groups: Vec<(GroupKey, Vec<GraphFragment>)>, workers: usize) -> Vec<WorkQueue> {
    let mut queues: Vec<WorkQueue> = (0..workers).map(|_| VecDeque::new()).collect();
    for (idx, group) in groups.into_iter().enumerate() {
        queues[idx % workers].push_back(group);
    }
    queues
}

/// Merge every group with a pool of blocking workers sharing one reducer.
///
/// Each key is handled by exactly one worker, so no two workers ever write
/// the same page.
pub async fn execute_merge(
    options: MergeOptions,
    reducer: Arc<OutGraphReducer>,
    groups: Vec<(GroupKey, Vec<GraphFragment>)>,
    progress_callback: Option<MergeProgressCallback>,
    result_callback: Option<MergeResultCallback>,
) -> Result<MergeSummary, String> {
    let MergeOptions {
        workers,
        show_progress_bars,
    } = options;

    let started_at = Utc::now();
    let total = groups.len();
    let workers = workers.max(1).min(total.max(1));

    info!("Merging {} keys with {} workers", total, workers);
    if let Some(ref callback) = progress_callback {
        callback(format!("Merging {} keys with {} workers", total, workers));
    }

    // Set up single progress bar for overall merge progress (only if enabled)
    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .map_err(|e| format!("Invalid progress template: {}", e))?,
        );
        pb.set_message("Starting merge...");
        Some(Arc::new(pb))
    } else {
        None
    };

    let processed_count = Arc::new(AtomicUsize::new(0));
    let mut handles = Vec::with_capacity(workers);

    for (worker_id, mut queue) in distribute(groups, workers).into_iter().enumerate() {
        let reducer = reducer.clone();
        let processed_count = processed_count.clone();
        let progress_bar = progress_bar.clone();
        let result_callback = result_callback.clone();

        let handle = tokio::task::spawn_blocking(move || {
            debug!("Worker {} started with {} keys", worker_id, queue.len());
            let mut failures = Vec::new();

            while let Some((key, fragments)) = queue.pop_front() {
                let result = reducer.reduce(&key, fragments);

                if let Some(ref cb) = result_callback {
                    cb(&result);
                }
                if let Some(error) = result.error {
                    failures.push(MergeFailure {
                        key: result.key,
                        error,
                    });
                }

                let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;
                if let Some(ref pb) = progress_bar {
                    pb.set_message(format!("Merging... {}/{} keys", count, total));
                    pb.tick();
                }
            }

            debug!("Worker {} finished", worker_id);
            failures
        });
        handles.push(handle);
    }

    let mut failures = Vec::new();
    for joined in join_all(handles).await {
        match joined {
            Ok(worker_failures) => failures.extend(worker_failures),
            Err(e) => {
                error!("Merge worker died: {}", e);
                return Err(format!("Merge worker died: {}", e));
            }
        }
    }
    failures.sort_by(|a, b| a.key.cmp(&b.key));

    if let Some(ref pb) = progress_bar {
        let done = processed_count.load(Ordering::Relaxed);
        pb.finish_with_message(format!("Merge complete! {} keys processed", done));
    }

    let counters = reducer.counters().snapshot();
    info!(
        "Merge finished: {} persisted, {} created, {} skipped, {} failed",
        counters.persisted, counters.created, counters.skipped, counters.failed
    );

    Ok(MergeSummary {
        batch_id: None,
        keys: total,
        started_at,
        finished_at: Utc::now(),
        counters,
        failures,
    })
}

/// Run one full merge cycle against the page database: record the batch,
/// hydrate and partition the input, merge every key and close the batch.
pub async fn run_merge_cycle(
    db: Arc<Database>,
    config: &MergeConfig,
    records: Vec<OutlinkRecord>,
    input: &str,
    show_progress_bars: bool,
    progress_callback: Option<MergeProgressCallback>,
) -> Result<MergeSummary, String> {
    let configuration = serde_json::to_string(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    let batch_id = db
        .create_batch(input, Some(&configuration))
        .map_err(|e| format!("Failed to create batch: {}", e))?;
    info!("Started merge batch {} from {}", batch_id, input);

    let outcome = merge_batch(
        db.clone(),
        config,
        records,
        show_progress_bars,
        progress_callback,
    )
    .await;

    match outcome {
        Ok(mut summary) => {
            let counters = serde_json::to_string(&summary.counters)
                .map_err(|e| format!("Failed to serialize counters: {}", e))?;
            db.complete_batch(&batch_id, &counters)
                .map_err(|e| format!("Failed to complete batch: {}", e))?;
            summary.batch_id = Some(batch_id);
            Ok(summary)
        }
        Err(e) => {
            error!("Merge batch {} failed: {}", batch_id, e);
            if let Err(db_err) = db.fail_batch(&batch_id) {
                error!("Failed to mark batch {} as failed: {}", batch_id, db_err);
            }
            Err(e)
        }
    }
}

async fn merge_batch(
    db: Arc<Database>,
    config: &MergeConfig,
    records: Vec<OutlinkRecord>,
    show_progress_bars: bool,
    progress_callback: Option<MergeProgressCallback>,
) -> Result<MergeSummary, String> {
    // Fixed for the whole batch
    let cycle_start = Utc::now();
    let scoring_filters = config.scoring_filters().map_err(|e| e.to_string())?;
    let fetch_schedule = config.fetch_schedule(cycle_start).map_err(|e| e.to_string())?;

    // Edges must carry the stored state of their source, not just the fetch
    let hydrate_db = db.clone();
    let records = tokio::task::spawn_blocking(move || hydrate_records(records, hydrate_db.as_ref()))
        .await
        .map_err(|e| format!("Hydration task died: {}", e))?
        .map_err(|e| format!("Failed to read stored pages: {}", e))?;

    let store: Arc<dyn PageStore> = db;
    let reducer = Arc::new(OutGraphReducer::new(store, fetch_schedule, scoring_filters));
    let groups = partition(records);

    execute_merge(
        MergeOptions {
            workers: config.workers,
            show_progress_bars,
        },
        reducer,
        groups,
        progress_callback,
        None,
    )
    .await
}
