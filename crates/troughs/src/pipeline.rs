//! End-to-end run: fit → aggregate → enrich → analyze.

use tracing::info;

use crate::aggregate::{aggregate_edges, Aggregation};
use crate::cfg::PipelineCfg;
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::graph::{analyze_network, enrich_graph, EnrichReport, NetworkGraph, NetworkMetrics};
use crate::schedule::FitScheduler;
use crate::summary::{summarize_fits, FitSummary};
use crate::types::TransectCollection;

/// Everything a run produced. `diagnostics` holds the entries of all stages;
/// the per-stage reports keep theirs for stage-local inspection.
#[derive(Clone, Debug)]
pub struct PipelineReport {
    pub fitted: TransectCollection,
    pub aggregation: Aggregation,
    pub enrichment: EnrichReport,
    pub metrics: NetworkMetrics,
    pub summary: FitSummary,
    pub diagnostics: Diagnostics,
}

/// Run all stages on `collection`, enriching `graph` in place.
///
/// Fails only on invalid configuration, pool construction, or an unexpected
/// fit defect under `FaultPolicy::Abort`.
pub fn run(
    collection: &TransectCollection,
    graph: &mut NetworkGraph,
    cfg: &PipelineCfg,
) -> Result<PipelineReport> {
    cfg.validate()?;
    info!(
        edges = collection.len(),
        graph_edges = graph.edge_count(),
        "pipeline started"
    );

    let fit_run = FitScheduler::from_cfg(cfg).fit_collection(collection)?;
    let mut diagnostics = fit_run.diagnostics;
    let fitted = fit_run.fitted;

    let aggregation = aggregate_edges(&fitted, &cfg.aggregate);
    diagnostics.merge(aggregation.diagnostics.clone());

    let enrichment = enrich_graph(graph, &aggregation.statistics);
    diagnostics.merge(enrichment.diagnostics.clone());

    let metrics = analyze_network(graph);
    let summary = summarize_fits(&fitted, &cfg.aggregate);

    info!(
        transects = summary.fitted,
        statistics = aggregation.statistics.len(),
        enriched = enrichment.enriched,
        diagnostics = diagnostics.len(),
        "pipeline finished"
    );
    Ok(PipelineReport {
        fitted,
        aggregation,
        enrichment,
        metrics,
        summary,
        diagnostics,
    })
}
