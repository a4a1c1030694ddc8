//! Trough network graph.
//!
//! Nodes are trough junctions/ends named by their `Pixel`; each directed edge is
//! one trough carrying its geometric length and, after enrichment, the edge's
//! `EdgeStatistics`. The graph is a simple digraph: at most one edge per
//! ordered node pair.
//!
//! - `enrich`: copy per-edge statistics onto matching graph edges.
//! - `metrics`: structural measures (sources/sinks, components, density, length).

pub mod enrich;
pub mod metrics;

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::aggregate::EdgeStatistics;
use crate::types::{EdgeKey, Pixel};

pub use enrich::{enrich_graph, EnrichReport};
pub use metrics::{analyze_network, NetworkMetrics};

/// Attributes of one trough edge.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TroughAttrs {
    /// Ground length of the trough, in pixel units.
    pub length: f64,
    pub stats: Option<EdgeStatistics>,
}

impl TroughAttrs {
    pub fn new(length: f64) -> Self {
        Self {
            length,
            stats: None,
        }
    }
}

/// Directed trough network keyed by pixel coordinates.
#[derive(Clone, Debug, Default)]
pub struct NetworkGraph {
    graph: DiGraph<Pixel, TroughAttrs>,
    node_index: HashMap<Pixel, NodeIndex>,
}

impl NetworkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, or return the existing one for `pixel`.
    pub fn add_node(&mut self, pixel: Pixel) -> NodeIndex {
        if let Some(&idx) = self.node_index.get(&pixel) {
            return idx;
        }
        let idx = self.graph.add_node(pixel);
        self.node_index.insert(pixel, idx);
        idx
    }

    /// Add the trough `start -> end`. Re-adding an existing edge updates its
    /// length and keeps any statistics already attached.
    pub fn add_edge(&mut self, start: Pixel, end: Pixel, length: f64) {
        let a = self.add_node(start);
        let b = self.add_node(end);
        match self.graph.find_edge(a, b) {
            Some(e) => {
                if let Some(attrs) = self.graph.edge_weight_mut(e) {
                    attrs.length = length;
                }
            }
            None => {
                self.graph.add_edge(a, b, TroughAttrs::new(length));
            }
        }
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains_node(&self, pixel: &Pixel) -> bool {
        self.node_index.contains_key(pixel)
    }

    fn edge_index(&self, key: &EdgeKey) -> Option<petgraph::graph::EdgeIndex> {
        let a = *self.node_index.get(&key.start)?;
        let b = *self.node_index.get(&key.end)?;
        self.graph.find_edge(a, b)
    }

    pub fn attrs(&self, key: &EdgeKey) -> Option<&TroughAttrs> {
        self.edge_index(key)
            .and_then(|e| self.graph.edge_weight(e))
    }

    pub fn attrs_mut(&mut self, key: &EdgeKey) -> Option<&mut TroughAttrs> {
        let e = self.edge_index(key)?;
        self.graph.edge_weight_mut(e)
    }

    /// All edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeKey, &TroughAttrs)> + '_ {
        self.graph.edge_references().map(move |e| {
            let key = EdgeKey::new(self.graph[e.source()], self.graph[e.target()]);
            (key, e.weight())
        })
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = Pixel> + '_ {
        self.graph.node_weights().copied()
    }

    pub fn in_degree(&self, pixel: &Pixel) -> usize {
        self.degree(pixel, Direction::Incoming)
    }

    pub fn out_degree(&self, pixel: &Pixel) -> usize {
        self.degree(pixel, Direction::Outgoing)
    }

    fn degree(&self, pixel: &Pixel, dir: Direction) -> usize {
        self.node_index
            .get(pixel)
            .map_or(0, |&idx| self.graph.edges_directed(idx, dir).count())
    }

    /// Underlying petgraph graph, for algorithms not wrapped here.
    pub fn inner(&self) -> &DiGraph<Pixel, TroughAttrs> {
        &self.graph
    }
}
