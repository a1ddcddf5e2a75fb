use crate::builder::GraphBuilder;
use crate::error::{GraphError, Result};
use crate::graph::GraphFragment;
use crate::key::GroupKey;
use crate::metrics::{Counter, MergeCounters};
use crate::page::Mark;
use crate::result::MergeResult;
use crate::schedule::FetchSchedule;
use crate::scoring::ScoringFilters;
use crate::store::PageStore;
use crate::updater::GraphUpdater;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Merge driver: turns the fragments of one group key into one updated page.
///
/// A reducer holds no per-key state, so a single instance can be shared by
/// any number of workers.
pub struct OutGraphReducer {
    store: Arc<dyn PageStore>,
    fetch_schedule: Box<dyn FetchSchedule>,
    scoring_filters: ScoringFilters,
    counters: Arc<MergeCounters>,
}

impl OutGraphReducer {
    pub fn new(
        store: Arc<dyn PageStore>,
        fetch_schedule: Box<dyn FetchSchedule>,
        scoring_filters: ScoringFilters,
    ) -> Self {
        info!(
            "OutGraphReducer ready, fetchSchedule: {}, scoringFilters: {}",
            fetch_schedule.name(),
            scoring_filters
        );

        Self {
            store,
            fetch_schedule,
            scoring_filters,
            counters: Arc::new(MergeCounters::new()),
        }
    }

    pub fn counters(&self) -> &Arc<MergeCounters> {
        &self.counters
    }

    /// Merge one key. Never fails: errors and panics are logged, counted and
    /// reported in the returned result, and the key is dropped.
    pub fn reduce(&self, key: &GroupKey, fragments: Vec<GraphFragment>) -> MergeResult {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.do_reduce(key, fragments)))
            .unwrap_or_else(|payload| Err(GraphError::Other(panic_message(payload.as_ref()))));

        match outcome {
            Ok(result) => result,
            Err(e) => {
                error!("Failed to merge {}: {}", key, e);
                self.counters.increase(Counter::Failed);
                MergeResult::with_error(key.clone(), e.to_string())
            }
        }
    }

    fn do_reduce(&self, key: &GroupKey, fragments: Vec<GraphFragment>) -> Result<MergeResult> {
        self.counters.increase(Counter::Rows);

        let url = key.url()?;

        let builder = GraphBuilder::new(
            self.store.as_ref(),
            self.fetch_schedule.as_ref(),
            &self.scoring_filters,
            &self.counters,
        );
        let mut graph = builder.build(&url, key, fragments)?;

        if graph.focus_page().is_none() {
            debug!("No focus page for {}, skipping", key);
            self.counters.increase(Counter::Skipped);
            return Ok(MergeResult::skipped(key.clone()));
        }

        GraphUpdater::new(&self.scoring_filters).update(&mut graph);

        let Some(mut page) = graph.into_focus_page() else {
            self.counters.increase(Counter::Skipped);
            return Ok(MergeResult::skipped(key.clone()));
        };

        let parsed = page.marks.get(Mark::Parse).map(str::to_string);
        page.marks.put_if_non_null(Mark::UpdateOutGraph, parsed);

        self.store.put(key, &page)?;
        self.counters.increase(Counter::Persisted);
        self.counters.increase_depth(page.distance);

        Ok(MergeResult::persisted(key.clone(), page))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic: unknown payload".to_string()
    }
}
