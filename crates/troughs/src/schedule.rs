//! Per-edge parallel fitting.
//!
//! One edge = one job: all transects of an edge are fitted sequentially by the
//! worker that picked the job up; different edges run concurrently on a rayon
//! pool. Each job hands back its own `EdgeKey` together with its result, so
//! fan-in never relies on completion order. Jobs share no mutable state; their
//! diagnostics are merged after the pool returns.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::info;

use crate::cfg::{FaultPolicy, FitCfg, PipelineCfg};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::{FitError, NumericDefect, Result, TroughError};
use crate::fit::{fit_transect, DropReason, FitOutcome};
use crate::types::{EdgeKey, FitState, Pixel, Transect, TransectCollection, TroughEdge};

/// Unexpected defect that stopped an edge job.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeFault {
    pub pixel: Pixel,
    pub defect: NumericDefect,
}

/// Result of one edge job.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EdgeFit {
    /// Surviving transects, each with `FitState::Fitted`.
    pub transects: TroughEdge,
    /// Entries for every transect dropped before the job ended.
    pub diagnostics: Diagnostics,
    /// Set when a dry transect hit an unexpected defect; the job stopped there.
    pub fault: Option<EdgeFault>,
}

impl EdgeFit {
    /// Apply `policy` to a faulted job. Diagnostics gathered before the fault
    /// are kept either way.
    pub fn resolve(mut self, key: &EdgeKey, policy: FaultPolicy) -> Result<EdgeFit> {
        let Some(EdgeFault { pixel, defect }) = self.fault.take() else {
            return Ok(self);
        };
        match policy {
            FaultPolicy::Abort => Err(TroughError::UnexpectedFitDefect {
                edge: *key,
                pixel,
                defect,
            }),
            FaultPolicy::IsolateEdge => {
                self.transects.clear();
                self.diagnostics.record(Diagnostic::transect(
                    *key,
                    pixel,
                    DiagnosticKind::EdgeIsolated(defect),
                ));
                Ok(self)
            }
        }
    }
}

/// Fitted collection plus everything that was dropped on the way.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FitRun {
    pub fitted: TransectCollection,
    pub diagnostics: Diagnostics,
}

impl FitRun {
    pub fn transect_count(&self) -> usize {
        self.fitted.values().map(|edge| edge.len()).sum()
    }
}

/// Fit every transect of one edge with `fit_transect`.
pub fn fit_edge(key: &EdgeKey, edge: &TroughEdge, cfg: &FitCfg) -> EdgeFit {
    fit_edge_with(key, edge, |transect| fit_transect(transect, cfg))
}

/// Fit every transect of one edge with `fit`.
///
/// Per-transect problems are recorded and the transect is skipped. An
/// unexpected defect on a dry transect stops the edge and is returned in
/// `fault`, next to the diagnostics recorded up to that point.
pub fn fit_edge_with<F>(key: &EdgeKey, edge: &TroughEdge, fit: F) -> EdgeFit
where
    F: Fn(&Transect) -> std::result::Result<FitOutcome, FitError>,
{
    let mut out = EdgeFit::default();
    for (&pixel, transect) in edge {
        let kind = match fit(transect) {
            Ok(FitOutcome::Fitted(result)) => {
                out.transects.insert(
                    pixel,
                    Transect {
                        fit: FitState::Fitted(result),
                        ..transect.clone()
                    },
                );
                continue;
            }
            Ok(FitOutcome::Dropped(DropReason::NonConvergence { iterations })) => {
                DiagnosticKind::NonConvergence { iterations }
            }
            Ok(FitOutcome::Dropped(DropReason::SuppressedDefect(defect))) => {
                DiagnosticKind::SuppressedDefect(defect)
            }
            Err(FitError::Data(err)) => DiagnosticKind::DataError(err),
            Err(FitError::UnexpectedDefect(defect)) => {
                out.fault = Some(EdgeFault { pixel, defect });
                break;
            }
        };
        out.diagnostics
            .record(Diagnostic::transect(*key, pixel, kind));
    }
    out
}

/// Bounded worker pool that fits a `TransectCollection` edge by edge.
#[derive(Clone, Copy, Debug, Default)]
pub struct FitScheduler {
    workers: usize,
    fault_policy: FaultPolicy,
    fit: FitCfg,
}

impl FitScheduler {
    pub fn new(fit: FitCfg) -> Self {
        Self {
            fit,
            ..Self::default()
        }
    }

    pub fn from_cfg(cfg: &PipelineCfg) -> Self {
        Self {
            workers: cfg.workers,
            fault_policy: cfg.fault_policy,
            fit: cfg.fit,
        }
    }

    /// Pool size; 0 uses one thread per logical CPU.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.fault_policy = policy;
        self
    }

    /// Fit all edges. The input is left untouched; a new collection is returned.
    pub fn fit_collection(&self, collection: &TransectCollection) -> Result<FitRun> {
        let cfg = self.fit;
        self.run_with(collection, |key, edge| Ok(fit_edge(key, edge, &cfg)))
    }

    /// Dispatch `job` once per edge on the pool and re-key the results.
    ///
    /// A job's `fault` is resolved with the scheduler's `FaultPolicy`. The first
    /// error aborts the batch; jobs not yet started are skipped.
    pub fn run_with<F>(&self, collection: &TransectCollection, job: F) -> Result<FitRun>
    where
        F: Fn(&EdgeKey, &TroughEdge) -> Result<EdgeFit> + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()?;
        let jobs: Vec<(&EdgeKey, &TroughEdge)> = collection.iter().collect();
        info!(
            edges = jobs.len(),
            workers = pool.current_num_threads(),
            "fitting transects"
        );

        let policy = self.fault_policy;
        let results: Vec<(EdgeKey, EdgeFit)> = pool.install(|| {
            jobs.par_iter()
                .map(|&(key, edge)| {
                    job(key, edge)
                        .and_then(|fit| fit.resolve(key, policy))
                        .map(|fit| (*key, fit))
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let run = assemble(results);
        info!(
            edges = run.fitted.len(),
            transects = run.transect_count(),
            dropped = run.diagnostics.len(),
            "fitting finished"
        );
        Ok(run)
    }
}

/// Fan-in: every result already carries its key, so arrival order is irrelevant.
fn assemble(results: impl IntoIterator<Item = (EdgeKey, EdgeFit)>) -> FitRun {
    let mut fitted = BTreeMap::new();
    let mut diagnostics = Diagnostics::new();
    for (key, fit) in results {
        diagnostics.merge(fit.diagnostics);
        fitted.insert(key, fit.transects);
    }
    FitRun {
        fitted,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{GaussParams, FWHM_PER_SIGMA};
    use crate::synth::depression;
    use crate::types::Orientation;
    use std::sync::mpsc;
    use std::sync::Mutex;
    use std::time::Duration;

    fn edge_with_spread(row: u32, spread: f64, count: u32) -> TroughEdge {
        (0..count)
            .map(|i| {
                let tr = depression(
                    41,
                    Orientation::Straight,
                    GaussParams::new(1.0, 20.0, spread),
                    5.0,
                );
                (Pixel::new(row, i), tr)
            })
            .collect()
    }

    fn two_edges() -> (EdgeKey, EdgeKey, TransectCollection) {
        let ab = EdgeKey::new((0, 0), (0, 9));
        let cd = EdgeKey::new((20, 0), (20, 9));
        let mut coll = TransectCollection::new();
        coll.insert(ab, edge_with_spread(0, 1.5, 3));
        coll.insert(cd, edge_with_spread(20, 3.0, 4));
        (ab, cd, coll)
    }

    fn assert_widths(edge: &TroughEdge, spread: f64) {
        for tr in edge.values() {
            let r = tr.fit_result().expect("fitted");
            assert!((r.width - FWHM_PER_SIGMA * spread).abs() < 1e-6);
        }
    }

    #[test]
    fn results_stay_with_their_edge_when_completion_is_reversed() {
        let (ab, cd, coll) = two_edges();
        let (tx, rx) = mpsc::channel::<()>();
        let tx = Mutex::new(tx);
        let rx = Mutex::new(rx);
        let finished = Mutex::new(Vec::new());
        let cfg = FitCfg::default();

        // `ab` is submitted first but waits until `cd` has completed.
        let run = FitScheduler::new(cfg)
            .with_workers(2)
            .run_with(&coll, |key, edge| {
                if *key == ab {
                    let _ = rx.lock().unwrap().recv_timeout(Duration::from_secs(10));
                }
                let fit = fit_edge(key, edge, &cfg);
                finished.lock().unwrap().push(*key);
                if *key == cd {
                    let _ = tx.lock().unwrap().send(());
                }
                Ok(fit)
            })
            .unwrap();

        assert_eq!(*finished.lock().unwrap(), vec![cd, ab]);
        assert_eq!(run.fitted.keys().copied().collect::<Vec<_>>(), vec![ab, cd]);
        assert_eq!(run.fitted[&ab].len(), 3);
        assert_eq!(run.fitted[&cd].len(), 4);
        assert!(run.fitted[&ab].keys().all(|p| p.row == 0));
        assert!(run.fitted[&cd].keys().all(|p| p.row == 20));
        assert_widths(&run.fitted[&ab], 1.5);
        assert_widths(&run.fitted[&cd], 3.0);
    }

    #[test]
    fn assemble_ignores_arrival_order() {
        let ab = EdgeKey::new((0, 0), (0, 1));
        let cd = EdgeKey::new((5, 5), (6, 6));
        let fit_ab = EdgeFit {
            transects: edge_with_spread(0, 1.0, 1),
            ..EdgeFit::default()
        };
        let fit_cd = EdgeFit {
            transects: edge_with_spread(5, 2.0, 2),
            ..EdgeFit::default()
        };
        let forward = assemble(vec![(ab, fit_ab.clone()), (cd, fit_cd.clone())]);
        let reversed = assemble(vec![(cd, fit_cd), (ab, fit_ab)]);
        assert_eq!(forward.fitted, reversed.fitted);
        assert_eq!(reversed.fitted[&cd].len(), 2);
    }

    #[test]
    fn input_is_not_mutated_and_tags_pass_through() {
        let (ab, _, mut coll) = two_edges();
        for tr in coll.get_mut(&ab).unwrap().values_mut() {
            tr.scenario = "x-shaped".to_string();
        }
        let before = coll.clone();
        let run = FitScheduler::default().with_workers(2).fit_collection(&coll).unwrap();
        assert_eq!(coll, before);
        assert!(coll[&ab].values().all(|t| t.fit == FitState::Pending));
        assert!(run.fitted[&ab].values().all(|t| t.scenario == "x-shaped"));
        assert!(run.diagnostics.is_empty());
    }

    #[test]
    fn bad_transects_are_dropped_individually() {
        let key = EdgeKey::new((1, 1), (1, 8));
        let mut edge = edge_with_spread(1, 2.0, 1);
        edge.insert(
            Pixel::new(1, 5),
            Transect::new(Vec::new(), Vec::new(), Orientation::Straight),
        );
        edge.insert(
            Pixel::new(1, 6),
            Transect::new(vec![3.0], vec![Pixel::new(1, 6)], Orientation::Straight)
                .with_water(true),
        );
        let mut coll = TransectCollection::new();
        coll.insert(key, edge);

        let run = FitScheduler::default().fit_collection(&coll).unwrap();
        assert_eq!(run.fitted[&key].len(), 1);
        assert!(run.fitted[&key].contains_key(&Pixel::new(1, 0)));
        assert_eq!(run.diagnostics.count("data_error"), 1);
        assert_eq!(run.diagnostics.count("suppressed_defect"), 1);
        let pixels: Vec<_> = run.diagnostics.entries().iter().map(|d| d.pixel).collect();
        assert_eq!(pixels, vec![Some(Pixel::new(1, 5)), Some(Pixel::new(1, 6))]);
    }

    #[test]
    fn edge_where_everything_fails_yields_empty_mapping() {
        let key = EdgeKey::new((2, 2), (2, 3));
        let mut edge = TroughEdge::new();
        edge.insert(
            Pixel::new(2, 2),
            Transect::new(Vec::new(), Vec::new(), Orientation::Diagonal),
        );
        let mut coll = TransectCollection::new();
        coll.insert(key, edge);
        let run = FitScheduler::default().fit_collection(&coll).unwrap();
        assert!(run.fitted[&key].is_empty());
    }

    fn with_dry_defect() -> (EdgeKey, EdgeKey, TransectCollection) {
        let (ab, cd, mut coll) = two_edges();
        coll.get_mut(&cd).unwrap().insert(
            Pixel::new(20, 7),
            Transect::new(vec![1.0], vec![Pixel::new(20, 7)], Orientation::Straight),
        );
        (ab, cd, coll)
    }

    #[test]
    fn unexpected_defect_aborts_the_run() {
        let (_, cd, coll) = with_dry_defect();
        let err = FitScheduler::default().fit_collection(&coll).unwrap_err();
        match err {
            TroughError::UnexpectedFitDefect {
                edge,
                pixel,
                defect,
            } => {
                assert_eq!(edge, cd);
                assert_eq!(pixel, Pixel::new(20, 7));
                assert_eq!(defect, NumericDefect::UndefinedQuality { samples: 1 });
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn isolate_policy_contains_defect_to_its_edge() {
        let (ab, cd, coll) = with_dry_defect();
        let run = FitScheduler::default()
            .with_fault_policy(FaultPolicy::IsolateEdge)
            .fit_collection(&coll)
            .unwrap();
        assert!(run.fitted[&cd].is_empty());
        assert_eq!(run.fitted[&ab].len(), 3);
        assert_eq!(run.diagnostics.count("edge_isolated"), 1);
        assert_eq!(run.diagnostics.for_edge(&cd).count(), 1);
    }

    #[test]
    fn worker_count_does_not_change_results() {
        let (_, _, coll) = two_edges();
        let one = FitScheduler::default().with_workers(1).fit_collection(&coll).unwrap();
        let four = FitScheduler::default().with_workers(4).fit_collection(&coll).unwrap();
        assert_eq!(one, four);
    }

    #[test]
    fn isolated_edge_keeps_diagnostics_of_earlier_siblings() {
        let key = EdgeKey::new((0, 0), (0, 9));
        let mut edge = TroughEdge::new();
        edge.insert(
            Pixel::new(0, 1),
            Transect::new(Vec::new(), Vec::new(), Orientation::Straight),
        );
        edge.insert(
            Pixel::new(0, 2),
            Transect::new(vec![1.0], vec![Pixel::new(0, 2)], Orientation::Straight),
        );
        let mut coll = TransectCollection::new();
        coll.insert(key, edge);

        let run = FitScheduler::default()
            .with_fault_policy(FaultPolicy::IsolateEdge)
            .fit_collection(&coll)
            .unwrap();
        assert!(run.fitted[&key].is_empty());
        assert_eq!(run.diagnostics.count("data_error"), 1);
        assert_eq!(run.diagnostics.count("edge_isolated"), 1);
        let labels: Vec<_> = run.diagnostics.entries().iter().map(|d| d.kind.label()).collect();
        assert_eq!(labels, vec!["data_error", "edge_isolated"]);
    }

    #[test]
    fn faulted_job_reports_where_it_stopped() {
        let key = EdgeKey::new((0, 0), (0, 9));
        let mut edge = edge_with_spread(0, 2.0, 1);
        edge.insert(
            Pixel::new(0, 4),
            Transect::new(vec![1.0], vec![Pixel::new(0, 4)], Orientation::Straight),
        );
        edge.insert(
            Pixel::new(0, 5),
            Transect::new(Vec::new(), Vec::new(), Orientation::Straight),
        );
        let fit = fit_edge(&key, &edge, &FitCfg::default());
        assert_eq!(
            fit.fault,
            Some(EdgeFault {
                pixel: Pixel::new(0, 4),
                defect: NumericDefect::UndefinedQuality { samples: 1 },
            })
        );
        // The transect after the fault is never looked at.
        assert!(fit.diagnostics.is_empty());
        assert_eq!(fit.transects.len(), 1);
        assert!(fit.clone().resolve(&key, FaultPolicy::Abort).is_err());
        let isolated = fit.resolve(&key, FaultPolicy::IsolateEdge).unwrap();
        assert!(isolated.transects.is_empty());
        assert!(isolated.fault.is_none());
    }

    #[test]
    fn non_converged_transect_is_dropped_and_siblings_survive() {
        let key = EdgeKey::new((3, 0), (3, 9));
        let stuck = Pixel::new(3, 1);
        let edge = edge_with_spread(3, 2.0, 3);
        let cfg = FitCfg::default();

        let run = FitScheduler::new(cfg)
            .run_with(&TransectCollection::from([(key, edge)]), |key, job_edge| {
                let fit = fit_edge_with(key, job_edge, |tr| {
                    if std::ptr::eq(tr, &job_edge[&stuck]) {
                        Ok(FitOutcome::Dropped(DropReason::NonConvergence { iterations: 7 }))
                    } else {
                        fit_transect(tr, &cfg)
                    }
                });
                Ok(fit)
            })
            .unwrap();

        let fitted = &run.fitted[&key];
        assert_eq!(fitted.len(), 2);
        assert!(!fitted.contains_key(&stuck));
        assert!(fitted.contains_key(&Pixel::new(3, 0)));
        assert!(fitted.contains_key(&Pixel::new(3, 2)));
        assert_widths(fitted, 2.0);
        assert_eq!(run.diagnostics.count("non_convergence"), 1);
        let entry = &run.diagnostics.entries()[0];
        assert_eq!(entry.edge, key);
        assert_eq!(entry.pixel, Some(stuck));
        assert_eq!(entry.kind, DiagnosticKind::NonConvergence { iterations: 7 });
    }

    #[test]
    fn exhausted_budget_is_reported_per_transect() {
        let (ab, cd, coll) = two_edges();
        let tight = FitCfg {
            max_iterations: 1,
            ..FitCfg::default()
        };
        let run = FitScheduler::default()
            .run_with(&coll, |key, edge| {
                let cfg = if *key == ab { tight } else { FitCfg::default() };
                Ok(fit_edge(key, edge, &cfg))
            })
            .unwrap();

        assert!(run.fitted[&ab].is_empty());
        assert_eq!(run.fitted[&cd].len(), 4);
        assert_eq!(run.diagnostics.count("non_convergence"), 3);
        let pixels: Vec<_> = run.diagnostics.for_edge(&ab).map(|d| d.pixel).collect();
        assert_eq!(pixels, (0..3).map(|i| Some(Pixel::new(0, i))).collect::<Vec<_>>());
    }
}
