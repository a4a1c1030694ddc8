//! Trough-network transect fitting and graph statistics.
//!
//! Pipeline
//! - `schedule`: fan out per-edge transect batches to a worker pool and fit each
//!   transect to a Gaussian depression (`fit`, `profile`).
//! - `aggregate`: filter fitted transects per edge and reduce them to
//!   `EdgeStatistics`.
//! - `graph`: write statistics onto a caller-supplied `NetworkGraph` and compute
//!   structural metrics over it.
//! - `pipeline`: run all stages in order and collect one `Diagnostics` log.
//!
//! Scope
//! - In-memory only. Reading/writing transect collections and graphs, export to
//!   GIS formats and plotting live with the callers.

pub mod aggregate;
pub mod cfg;
pub mod diagnostics;
pub mod error;
pub mod fit;
pub mod graph;
pub mod pipeline;
pub mod profile;
pub mod schedule;
pub mod summary;
pub mod synth;
pub mod types;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use error::{Result, TroughError};

/// Common exports for callers driving the pipeline.
pub mod prelude {
    pub use crate::aggregate::{aggregate_edges, Aggregation, EdgeStatistics};
    pub use crate::cfg::{AggregateCfg, FaultPolicy, FitCfg, PipelineCfg};
    pub use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
    pub use crate::error::{DataError, FitError, TroughError};
    pub use crate::fit::{fit_transect, DropReason, FitOutcome};
    pub use crate::graph::{
        analyze_network, enrich_graph, EnrichReport, NetworkGraph, NetworkMetrics, TroughAttrs,
    };
    pub use crate::pipeline::{run as run_pipeline, PipelineReport};
    pub use crate::profile::{GaussParams, NumericDefect};
    pub use crate::schedule::{FitRun, FitScheduler};
    pub use crate::types::{
        EdgeKey, FitResult, FitState, Orientation, Pixel, Transect, TransectCollection, TroughEdge,
    };
}
