use crate::page::WebPage;
use petgraph::Direction;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_weight() -> f64 {
    1.0
}

/// A page in the graph, identified by its URL
#[derive(Debug, Clone, PartialEq)]
pub struct WebVertex {
    pub url: String,
    pub page: Option<WebPage>,
}

impl WebVertex {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            page: None,
        }
    }

    pub fn has_page(&self) -> bool {
        self.page.is_some()
    }
}

/// One observed link. Only the source side travels with the edge, the target
/// page is never shipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebEdge {
    pub source_url: String,
    pub target_url: String,
    #[serde(default)]
    pub anchor: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_page: Option<WebPage>,
}

impl WebEdge {
    pub fn new(
        source_url: impl Into<String>,
        target_url: impl Into<String>,
        anchor: impl Into<String>,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            target_url: target_url.into(),
            anchor: anchor.into(),
            weight: default_weight(),
            source_page: None,
        }
    }

    /// Edge from a page to itself, carrying the page's own snapshot
    pub fn self_loop(page: WebPage) -> Self {
        Self {
            source_url: page.url.clone(),
            target_url: page.url.clone(),
            anchor: String::new(),
            weight: default_weight(),
            source_page: Some(page),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_source_page(mut self, page: WebPage) -> Self {
        self.source_page = Some(page);
        self
    }

    pub fn is_loop(&self) -> bool {
        self.source_url == self.target_url
    }
}

/// An upstream sub-graph delivered for one group key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphFragment {
    pub edges: Vec<WebEdge>,
}

impl GraphFragment {
    pub fn new(edges: Vec<WebEdge>) -> Self {
        Self { edges }
    }
}

/// Directed multigraph around a single focus vertex.
///
/// Vertices are interned by URL, edges are not: adding the same
/// (source, target) pair twice keeps both edges.
#[derive(Debug, Default)]
pub struct WebGraph {
    graph: DiGraph<WebVertex, WebEdge>,
    vertices: HashMap<String, NodeIndex>,
    focus: Option<NodeIndex>,
}

impl WebGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a vertex, or return the existing one with the same URL
    pub fn add_vertex(&mut self, vertex: WebVertex) -> NodeIndex {
        if let Some(idx) = self.vertices.get(&vertex.url) {
            return *idx;
        }
        let url = vertex.url.clone();
        let idx = self.graph.add_node(vertex);
        self.vertices.insert(url, idx);
        idx
    }

    /// Add an edge without checking for an existing one between the same pair
    pub fn add_edge_lenient(
        &mut self,
        source: NodeIndex,
        target: NodeIndex,
        edge: WebEdge,
    ) -> EdgeIndex {
        self.graph.add_edge(source, target, edge)
    }

    pub fn set_vertex_page(&mut self, idx: NodeIndex, page: WebPage) {
        if let Some(vertex) = self.graph.node_weight_mut(idx) {
            vertex.page = Some(page);
        }
    }

    pub fn vertex_page(&self, idx: NodeIndex) -> Option<&WebPage> {
        self.graph.node_weight(idx).and_then(|v| v.page.as_ref())
    }

    pub fn set_focus(&mut self, idx: NodeIndex) {
        self.focus = Some(idx);
    }

    pub fn focus(&self) -> Option<&WebVertex> {
        self.focus.and_then(|idx| self.graph.node_weight(idx))
    }

    pub fn focus_page(&self) -> Option<&WebPage> {
        self.focus().and_then(|v| v.page.as_ref())
    }

    pub fn set_focus_page(&mut self, page: WebPage) {
        if let Some(idx) = self.focus {
            self.set_vertex_page(idx, page);
        }
    }

    /// Consume the graph, keeping only the focus page
    pub fn into_focus_page(mut self) -> Option<WebPage> {
        let idx = self.focus?;
        self.graph.node_weight_mut(idx).and_then(|v| v.page.take())
    }

    /// All edges pointing at `idx`, loops included, in insertion order
    pub fn incoming_edges(&self, idx: NodeIndex) -> Vec<&WebEdge> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .collect();
        // petgraph walks its adjacency lists newest first
        edges.sort_by_key(|e| e.id());
        edges.into_iter().map(|e| e.weight()).collect()
    }

    /// Genuine inbound links of the focus vertex, in delivery order
    pub fn inbound_edges(&self) -> Vec<&WebEdge> {
        match self.focus {
            Some(idx) => self
                .incoming_edges(idx)
                .into_iter()
                .filter(|e| !e.is_loop())
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
