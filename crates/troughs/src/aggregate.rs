//! Per-edge reduction of fitted transects.
//!
//! Each transect of an edge falls in exactly one class:
//! - water: counted for `water_fraction` only;
//! - considered: fitted, width inside the open window, quality above threshold;
//! - discarded: everything else (unfitted, implausible width, poor fit).
//!
//! Statistics are computed over the considered set. An edge without any
//! transects produces no statistics and is reported in `empty_edges`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cfg::AggregateCfg;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::graph::metrics::round_to;
use crate::types::{EdgeKey, Transect, TransectCollection, TroughEdge};

/// Aggregate fit measures of one edge.
///
/// Means and medians are `None` when no transect of the edge was considered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeStatistics {
    pub mean_width: Option<f64>,
    pub median_width: Option<f64>,
    pub mean_depth: Option<f64>,
    pub median_depth: Option<f64>,
    pub mean_quality: Option<f64>,
    pub median_quality: Option<f64>,
    /// Considered transects / all transects, rounded.
    pub considered_fraction: f64,
    /// Water-flagged transects / all transects, rounded.
    pub water_fraction: f64,
}

/// Class of one transect during aggregation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransectClass {
    Water,
    Considered,
    Unfitted,
    ImplausibleWidth,
    LowQuality,
}

pub fn classify(transect: &Transect, cfg: &AggregateCfg) -> TransectClass {
    if transect.has_water {
        return TransectClass::Water;
    }
    match transect.fit_result() {
        None => TransectClass::Unfitted,
        Some(r) if !(r.width > cfg.width_min && r.width < cfg.width_max) => {
            TransectClass::ImplausibleWidth
        }
        Some(r) if !(r.quality > cfg.min_quality) => TransectClass::LowQuality,
        Some(_) => TransectClass::Considered,
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Aggregation {
    /// Statistics of every non-empty edge.
    pub statistics: BTreeMap<EdgeKey, EdgeStatistics>,
    pub empty_edges: BTreeSet<EdgeKey>,
    pub diagnostics: Diagnostics,
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median; the two middle values are averaged for even lengths.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut v = values.to_vec();
    v.sort_by(f64::total_cmp);
    let mid = v.len() / 2;
    Some(if v.len() % 2 == 0 {
        (v[mid - 1] + v[mid]) / 2.0
    } else {
        v[mid]
    })
}

/// Statistics of one non-empty edge. Returns `None` for an empty edge.
pub fn edge_statistics(edge: &TroughEdge, cfg: &AggregateCfg) -> Option<EdgeStatistics> {
    if edge.is_empty() {
        return None;
    }
    let total = edge.len() as f64;
    let mut water = 0usize;
    let (mut widths, mut depths, mut qualities) = (Vec::new(), Vec::new(), Vec::new());
    for transect in edge.values() {
        match (classify(transect, cfg), transect.fit_result()) {
            (TransectClass::Water, _) => water += 1,
            (TransectClass::Considered, Some(r)) => {
                widths.push(r.width);
                depths.push(r.depth);
                qualities.push(r.quality);
            }
            _ => {}
        }
    }
    Some(EdgeStatistics {
        mean_width: mean(&widths),
        median_width: median(&widths),
        mean_depth: mean(&depths),
        median_depth: median(&depths),
        mean_quality: mean(&qualities),
        median_quality: median(&qualities),
        considered_fraction: round_to(widths.len() as f64 / total, cfg.fraction_decimals),
        water_fraction: round_to(water as f64 / total, cfg.fraction_decimals),
    })
}

/// Reduce every edge of a fitted collection.
pub fn aggregate_edges(collection: &TransectCollection, cfg: &AggregateCfg) -> Aggregation {
    let mut out = Aggregation::default();
    for (key, edge) in collection {
        match edge_statistics(edge, cfg) {
            Some(stats) => {
                out.statistics.insert(*key, stats);
            }
            None => {
                out.empty_edges.insert(*key);
                out.diagnostics
                    .record(Diagnostic::edge(*key, DiagnosticKind::EmptyEdge));
            }
        }
    }
    info!(
        edges = out.statistics.len(),
        empty = out.empty_edges.len(),
        "edges aggregated"
    );
    out
}
