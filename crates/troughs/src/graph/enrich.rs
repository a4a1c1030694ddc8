//! Attach per-edge statistics to the network graph.

use std::collections::BTreeMap;

use tracing::info;

use crate::aggregate::EdgeStatistics;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::types::EdgeKey;

use super::NetworkGraph;

/// What `enrich_graph` did to the graph.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnrichReport {
    pub enriched: usize,
    /// Graph edges without statistics, in graph edge order.
    pub missing: Vec<EdgeKey>,
    pub diagnostics: Diagnostics,
}

impl EnrichReport {
    #[inline]
    pub fn missing_count(&self) -> usize {
        self.missing.len()
    }
}

/// Copy `statistics[key]` onto every graph edge `key` that has an entry.
///
/// Edges without an entry have their statistics cleared and are listed in
/// `missing`; topology and statistics may legitimately disagree (troughs at the
/// raster border have no transects). Lengths are never touched. Statistics for
/// keys absent from the graph are ignored.
pub fn enrich_graph(
    graph: &mut NetworkGraph,
    statistics: &BTreeMap<EdgeKey, EdgeStatistics>,
) -> EnrichReport {
    let keys: Vec<EdgeKey> = graph.edges().map(|(key, _)| key).collect();
    let mut report = EnrichReport::default();
    for key in keys {
        let Some(attrs) = graph.attrs_mut(&key) else {
            continue;
        };
        attrs.stats = statistics.get(&key).copied();
        match attrs.stats {
            Some(_) => report.enriched += 1,
            None => {
                report
                    .diagnostics
                    .record(Diagnostic::edge(key, DiagnosticKind::MissingStatistics));
                report.missing.push(key);
            }
        }
    }
    info!(
        enriched = report.enriched,
        missing = report.missing.len(),
        "graph enriched"
    );
    report
}
