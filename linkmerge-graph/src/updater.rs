use crate::graph::{WebEdge, WebGraph};
use crate::page::WebPage;
use crate::scoring::ScoringFilters;

/// Rewrites the focus page of a built graph: inlinks, distance, referrer and
/// score.
pub struct GraphUpdater<'a> {
    scoring_filters: &'a ScoringFilters,
}

impl<'a> GraphUpdater<'a> {
    pub fn new(scoring_filters: &'a ScoringFilters) -> Self {
        Self { scoring_filters }
    }

    /// Update the focus page in place. A graph without a focus page is left
    /// untouched.
    pub fn update(&self, graph: &mut WebGraph) {
        let Some(mut page) = graph.focus_page().cloned() else {
            return;
        };

        let inbound: Vec<WebEdge> = graph.inbound_edges().into_iter().cloned().collect();

        // Inlinks are replaced, links missing from this delivery are dropped
        page.inlinks.clear();

        let mut smallest_distance = page.distance;
        let mut shallowest: Option<(&WebEdge, &WebPage)> = None;

        for edge in &inbound {
            page.inlinks.insert(edge.source_url.clone(), edge.anchor.clone());

            // Without a source snapshot there is no distance to compare
            let Some(source) = edge.source_page.as_ref() else {
                continue;
            };

            let candidate = source.distance.saturating_add(1);
            if candidate < smallest_distance {
                smallest_distance = candidate;
                shallowest = Some((edge, source));
            }
        }

        if let Some((edge, source)) = shallowest {
            page.distance = smallest_distance;
            page.referrer = Some(source.url.clone());
            page.anchor = Some(edge.anchor.clone());
        }

        // Filters read the graph with links and distance already applied
        graph.set_focus_page(page.clone());
        let inbound: Vec<&WebEdge> = inbound.iter().collect();
        self.scoring_filters.update_score(&mut page, graph, &inbound);

        graph.set_focus_page(page);
    }
}
