//! Structural measures of a trough network.
//!
//! All functions are pure and ignore edge statistics; only topology and the
//! `length` attribute are read.

use std::collections::{BTreeMap, HashSet};

use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use super::NetworkGraph;

/// Edges per potential edge in a near-planar network: `1.5 · (n + 1)`.
const POTENTIAL_EDGES_PER_NODE: f64 = 1.5;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetrics {
    pub edge_count: usize,
    pub node_count: usize,
    /// Component edge count → number of components with that many edges.
    pub component_histogram: BTreeMap<usize, usize>,
    pub sinks: usize,
    pub sources: usize,
    pub potential_edges: f64,
    pub density: f64,
    pub total_length: f64,
}

/// `(sinks, sources)`.
///
/// A node without incoming edges is a source; otherwise a node without outgoing
/// edges is a sink. Isolated nodes therefore count as sources.
pub fn sinks_sources(graph: &NetworkGraph) -> (usize, usize) {
    let mut sinks = 0;
    let mut sources = 0;
    for node in graph.nodes() {
        if graph.in_degree(&node) == 0 {
            sources += 1;
        } else if graph.out_degree(&node) == 0 {
            sinks += 1;
        }
    }
    (sinks, sources)
}

/// Histogram of edge counts per connected component of the undirected view.
///
/// In the undirected view `a -> b` and `b -> a` collapse into one edge.
/// Isolated nodes form components with zero edges.
pub fn component_edge_histogram(graph: &NetworkGraph) -> BTreeMap<usize, usize> {
    let g = graph.inner();
    let mut uf = UnionFind::<usize>::new(g.node_count());
    let mut undirected = HashSet::new();
    for e in g.edge_references() {
        let (a, b) = (e.source().index(), e.target().index());
        uf.union(a, b);
        undirected.insert((a.min(b), a.max(b)));
    }
    let labels = uf.into_labeling();

    let mut edges_per_root: BTreeMap<usize, usize> = labels.iter().map(|&root| (root, 0)).collect();
    for (a, _) in &undirected {
        *edges_per_root.entry(labels[*a]).or_insert(0) += 1;
    }

    let mut histogram = BTreeMap::new();
    for count in edges_per_root.into_values() {
        *histogram.entry(count).or_insert(0) += 1;
    }
    histogram
}

/// `(potential_edges, density)` with `potential_edges = 1.5 · (n + 1)`.
pub fn network_density(graph: &NetworkGraph) -> (f64, f64) {
    let potential = POTENTIAL_EDGES_PER_NODE * (graph.node_count() + 1) as f64;
    (potential, graph.edge_count() as f64 / potential)
}

/// Sum of edge lengths, rounded half-to-even to two decimals.
pub fn total_length(graph: &NetworkGraph) -> f64 {
    let sum: f64 = graph.edges().map(|(_, attrs)| attrs.length).sum();
    round_to(sum, 2)
}

/// Round half-to-even at `decimals` places.
pub(crate) fn round_to(x: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (x * scale).round_ties_even() / scale
}

pub fn analyze_network(graph: &NetworkGraph) -> NetworkMetrics {
    let (sinks, sources) = sinks_sources(graph);
    let (potential_edges, density) = network_density(graph);
    let metrics = NetworkMetrics {
        edge_count: graph.edge_count(),
        node_count: graph.node_count(),
        component_histogram: component_edge_histogram(graph),
        sinks,
        sources,
        potential_edges,
        density,
        total_length: total_length(graph),
    };
    tracing::info!(
        edges = metrics.edge_count,
        nodes = metrics.node_count,
        components = metrics.component_histogram.values().sum::<usize>(),
        density = metrics.density,
        "network analyzed"
    );
    metrics
}
