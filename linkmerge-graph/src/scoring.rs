//! Pluggable scoring.
//!
//! A [`ScoringFilters`] chain is assembled once at start-up from filter names
//! and applied in order to every merged page.

use crate::error::{GraphError, Result};
use crate::graph::{WebEdge, WebGraph};
use crate::page::WebPage;
use serde::{Deserialize, Serialize};
use std::fmt;

pub trait ScoringFilter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Called once for a page that did not exist before this merge
    fn initial_score(&self, page: &mut WebPage);

    /// Called after the page's inlinks, distance and referrer were rebuilt.
    /// `inbound` never contains the loop edge.
    fn update_score(&self, page: &mut WebPage, graph: &WebGraph, inbound: &[&WebEdge]);
}

/// Tunables shared by the built-in filters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub initial_score: f64,
    pub damping: f64,
    pub max_distance: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            initial_score: 1.0,
            damping: 0.85,
            max_distance: 10,
        }
    }
}

/// One-hop link analysis: a page's score is a damped sum of the weighted
/// scores of the pages linking to it.
pub struct OpicScoringFilter {
    initial_score: f64,
    damping: f64,
}

impl OpicScoringFilter {
    pub fn new(initial_score: f64, damping: f64) -> Self {
        Self {
            initial_score,
            damping,
        }
    }
}

impl ScoringFilter for OpicScoringFilter {
    fn name(&self) -> &'static str {
        "opic"
    }

    fn initial_score(&self, page: &mut WebPage) {
        page.score = self.initial_score;
    }

    fn update_score(&self, page: &mut WebPage, _graph: &WebGraph, inbound: &[&WebEdge]) {
        let contribution: f64 = inbound
            .iter()
            .filter_map(|e| e.source_page.as_ref().map(|p| e.weight * p.score))
            .sum();
        page.score = (1.0 - self.damping) * self.initial_score + self.damping * contribution;
    }
}

/// Zeroes the score of pages too far from any seed
pub struct DepthScoringFilter {
    max_distance: u32,
}

impl DepthScoringFilter {
    pub fn new(max_distance: u32) -> Self {
        Self { max_distance }
    }
}

impl ScoringFilter for DepthScoringFilter {
    fn name(&self) -> &'static str {
        "depth"
    }

    fn initial_score(&self, _page: &mut WebPage) {}

    fn update_score(&self, page: &mut WebPage, _graph: &WebGraph, _inbound: &[&WebEdge]) {
        if page.distance > self.max_distance {
            page.score = 0.0;
        }
    }
}

/// Look up a built-in filter by name
pub fn scoring_filter_from_name(
    name: &str,
    config: &ScoringConfig,
) -> Result<Box<dyn ScoringFilter>> {
    match name.trim().to_lowercase().as_str() {
        "opic" => Ok(Box::new(OpicScoringFilter::new(
            config.initial_score,
            config.damping,
        ))),
        "depth" => Ok(Box::new(DepthScoringFilter::new(config.max_distance))),
        other => Err(GraphError::UnknownScoringFilter(other.to_string())),
    }
}

/// Ordered chain of scoring filters
#[derive(Default)]
pub struct ScoringFilters {
    filters: Vec<Box<dyn ScoringFilter>>,
}

impl ScoringFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_names<S: AsRef<str>>(names: &[S], config: &ScoringConfig) -> Result<Self> {
        let filters = names
            .iter()
            .map(|n| scoring_filter_from_name(n.as_ref(), config))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { filters })
    }

    pub fn with_filter(mut self, filter: Box<dyn ScoringFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn initial_score(&self, page: &mut WebPage) {
        for filter in &self.filters {
            filter.initial_score(page);
        }
    }

    pub fn update_score(&self, page: &mut WebPage, graph: &WebGraph, inbound: &[&WebEdge]) {
        for filter in &self.filters {
            filter.update_score(page, graph, inbound);
        }
    }
}

impl fmt::Display for ScoringFilters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.names().join(", "))
    }
}
