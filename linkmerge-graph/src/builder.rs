use crate::error::Result;
use crate::graph::{GraphFragment, WebGraph, WebVertex};
use crate::key::GroupKey;
use crate::metrics::{Counter, MergeCounters};
use crate::page::WebPage;
use crate::schedule::FetchSchedule;
use crate::scoring::ScoringFilters;
use crate::store::PageStore;
use tracing::debug;

/// Assembles the star-shaped in-link graph of one group key.
///
/// ```text
///            v1
///            |
///            v
///  v2 ->   focus   <- v3
///          ^   ^
///         /     \
///        v4     v5
/// ```
pub struct GraphBuilder<'a> {
    store: &'a dyn PageStore,
    fetch_schedule: &'a dyn FetchSchedule,
    scoring_filters: &'a ScoringFilters,
    counters: &'a MergeCounters,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(
        store: &'a dyn PageStore,
        fetch_schedule: &'a dyn FetchSchedule,
        scoring_filters: &'a ScoringFilters,
        counters: &'a MergeCounters,
    ) -> Self {
        Self {
            store,
            fetch_schedule,
            scoring_filters,
            counters,
        }
    }

    /// Build the graph for `url` from the fragments delivered under `key`.
    ///
    /// A loop edge carries the freshly parsed focus page and binds it to the
    /// focus vertex. Without one the page comes from the store, or is
    /// created when the store has never seen the URL.
    pub fn build<I>(&self, url: &str, key: &GroupKey, fragments: I) -> Result<WebGraph>
    where
        I: IntoIterator<Item = GraphFragment>,
    {
        let mut graph = WebGraph::new();
        let focus = graph.add_vertex(WebVertex::new(url));

        for fragment in fragments {
            for edge in fragment.edges {
                let source = if edge.is_loop() {
                    if let Some(page) = edge.source_page.clone() {
                        graph.set_vertex_page(focus, page);
                    }
                    focus
                } else {
                    graph.add_vertex(WebVertex::new(edge.source_url.clone()))
                };

                graph.add_edge_lenient(source, focus, edge);
            }
        }

        if graph.vertex_page(focus).is_none() {
            let page = self.load_or_create(url, key)?;
            graph.set_vertex_page(focus, page);
        }
        graph.set_focus(focus);

        debug!(
            "Built graph for {} with {} vertices and {} edges",
            key,
            graph.vertex_count(),
            graph.edge_count()
        );

        Ok(graph)
    }

    /// The focus page was either fetched in another batch and lives in the
    /// store, or has never been fetched and gets a fresh row.
    fn load_or_create(&self, url: &str, key: &GroupKey) -> Result<WebPage> {
        let loaded = self.store.get_or_nil(url)?;
        if !loaded.is_nil() {
            return Ok(loaded);
        }

        debug!("No stored page for {}, creating one", key);
        let page = self.create_page(url);
        self.counters.increase(Counter::Created);
        Ok(page)
    }

    fn create_page(&self, url: &str) -> WebPage {
        let mut page = WebPage::new(url);
        self.fetch_schedule.initialize_schedule(&mut page);
        self.scoring_filters.initial_score(&mut page);
        page
    }
}
