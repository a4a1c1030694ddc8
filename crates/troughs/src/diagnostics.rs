//! Run-scoped diagnostic log.
//!
//! Every stage returns the diagnostics it produced; the pipeline merges them
//! after each fan-in. Entries are also emitted as `tracing` events at the point
//! they are recorded.

use std::fmt;

use crate::error::{DataError, NumericDefect};
use crate::types::{EdgeKey, Pixel};

#[derive(Clone, Debug, PartialEq)]
pub enum DiagnosticKind {
    /// Transect broke its structural contract and was excluded.
    DataError(DataError),
    /// Optimizer exhausted its budget; transect excluded.
    NonConvergence { iterations: usize },
    /// Post-fit defect on a water-flagged transect; transect excluded.
    SuppressedDefect(NumericDefect),
    /// Unexpected defect contained to its edge (`FaultPolicy::IsolateEdge`).
    EdgeIsolated(NumericDefect),
    /// Trough without any transects; no statistics produced.
    EmptyEdge,
    /// Graph edge without matching statistics; left unenriched.
    MissingStatistics,
}

impl DiagnosticKind {
    /// Short stable label, used for counting and log fields.
    pub fn label(&self) -> &'static str {
        match self {
            DiagnosticKind::DataError(_) => "data_error",
            DiagnosticKind::NonConvergence { .. } => "non_convergence",
            DiagnosticKind::SuppressedDefect(_) => "suppressed_defect",
            DiagnosticKind::EdgeIsolated(_) => "edge_isolated",
            DiagnosticKind::EmptyEdge => "empty_edge",
            DiagnosticKind::MissingStatistics => "missing_statistics",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::DataError(e) => write!(f, "data error: {e}"),
            DiagnosticKind::NonConvergence { iterations } => {
                write!(f, "fit did not converge within {iterations} iterations")
            }
            DiagnosticKind::SuppressedDefect(d) => write!(f, "water-filled trough not fitted: {d}"),
            DiagnosticKind::EdgeIsolated(d) => write!(f, "edge isolated after unexpected defect: {d}"),
            DiagnosticKind::EmptyEdge => write!(f, "trough has no transects"),
            DiagnosticKind::MissingStatistics => write!(f, "graph edge has no statistics"),
        }
    }
}

/// One entry, keyed by edge and (for transect-level entries) pixel.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub edge: EdgeKey,
    pub pixel: Option<Pixel>,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn transect(edge: EdgeKey, pixel: Pixel, kind: DiagnosticKind) -> Self {
        Self {
            edge,
            pixel: Some(pixel),
            kind,
        }
    }

    pub fn edge(edge: EdgeKey, kind: DiagnosticKind) -> Self {
        Self {
            edge,
            pixel: None,
            kind,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an entry and emit it as a log event.
    pub fn record(&mut self, entry: Diagnostic) {
        let kind = entry.kind.label();
        match (&entry.kind, entry.pixel) {
            (DiagnosticKind::EmptyEdge | DiagnosticKind::MissingStatistics, _) => {
                tracing::debug!(edge = %entry.edge, kind, "{}", entry.kind);
            }
            (_, Some(pixel)) => {
                tracing::warn!(edge = %entry.edge, pixel = %pixel, kind, "{}", entry.kind);
            }
            (_, None) => {
                tracing::warn!(edge = %entry.edge, kind, "{}", entry.kind);
            }
        }
        self.entries.push(entry);
    }

    /// Append entries that were already logged by another stage or job.
    pub fn merge(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries whose kind carries `label` (see `DiagnosticKind::label`).
    pub fn count(&self, label: &str) -> usize {
        self.entries
            .iter()
            .filter(|d| d.kind.label() == label)
            .count()
    }

    pub fn for_edge<'a>(&'a self, edge: &'a EdgeKey) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.entries.iter().filter(move |d| &d.edge == edge)
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;
    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
