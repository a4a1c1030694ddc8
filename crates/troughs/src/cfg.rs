//! Run configuration.
//!
//! Defaults carry the constants the analysis was calibrated with (σ bounds,
//! plausible width window, R² threshold). `PipelineCfg` can be read from JSON;
//! every field is optional there.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TroughError};

/// Optimizer settings for a single transect fit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitCfg {
    /// Lower bound on σ; keeps the model away from a zero-width spike.
    pub spread_min: f64,
    pub spread_max: f64,
    pub initial_amplitude: f64,
    /// Iteration budget (accepted and rejected steps). Initial guesses can be poor.
    pub max_iterations: usize,
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
}

impl Default for FitCfg {
    fn default() -> Self {
        Self {
            spread_min: 0.01,
            spread_max: 8.5,
            initial_amplitude: 1.0,
            max_iterations: 10_000,
            ftol: 1e-12,
            xtol: 1e-12,
            gtol: 1e-12,
        }
    }
}

/// Filter thresholds for per-edge statistics. All bounds are exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateCfg {
    pub width_min: f64,
    pub width_max: f64,
    pub min_quality: f64,
    /// Decimal places kept for `considered_fraction` and `water_fraction`.
    pub fraction_decimals: u32,
}

impl Default for AggregateCfg {
    fn default() -> Self {
        Self {
            width_min: 0.0,
            width_max: 15.0,
            min_quality: 0.8,
            fraction_decimals: 2,
        }
    }
}

/// What the scheduler does when one edge hits an unexpected fit defect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultPolicy {
    /// Abort the whole run.
    #[default]
    Abort,
    /// Keep going; the edge yields no transects and an `EdgeIsolated` diagnostic.
    IsolateEdge,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineCfg {
    /// Worker threads for fitting; 0 uses one per logical CPU.
    pub workers: usize,
    pub fault_policy: FaultPolicy,
    pub fit: FitCfg,
    pub aggregate: AggregateCfg,
}

impl PipelineCfg {
    /// Parse and validate a JSON document.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: PipelineCfg = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let f = &self.fit;
        if !(f.spread_min > 0.0 && f.spread_min < f.spread_max) {
            return Err(TroughError::InvalidConfig(format!(
                "spread bounds must satisfy 0 < min < max, got [{}, {}]",
                f.spread_min, f.spread_max
            )));
        }
        if !(f.ftol > 0.0 && f.xtol > 0.0 && f.gtol > 0.0) {
            return Err(TroughError::InvalidConfig(
                "fit tolerances must be positive".to_string(),
            ));
        }
        let a = &self.aggregate;
        if !(a.width_min < a.width_max) {
            return Err(TroughError::InvalidConfig(format!(
                "width window must satisfy min < max, got ({}, {})",
                a.width_min, a.width_max
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let cfg = PipelineCfg::from_json_str("{}").unwrap();
        assert_eq!(cfg, PipelineCfg::default());
        assert_eq!(cfg.fit.spread_max, 8.5);
        assert_eq!(cfg.aggregate.min_quality, 0.8);
    }

    #[test]
    fn partial_json_overrides_fields() {
        let cfg = PipelineCfg::from_json_str(
            r#"{"workers": 4, "fault_policy": "isolate_edge", "fit": {"max_iterations": 50}}"#,
        )
        .unwrap();
        assert_eq!(cfg.workers, 4);
        assert_eq!(cfg.fault_policy, FaultPolicy::IsolateEdge);
        assert_eq!(cfg.fit.max_iterations, 50);
        assert_eq!(cfg.fit.spread_min, 0.01);
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let err = PipelineCfg::from_json_str(r#"{"fit": {"spread_min": 9.0}}"#).unwrap_err();
        assert!(matches!(err, TroughError::InvalidConfig(_)));
        let err = PipelineCfg::from_json_str(r#"{"aggregate": {"width_max": -1.0}}"#).unwrap_err();
        assert!(matches!(err, TroughError::InvalidConfig(_)));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = PipelineCfg::from_json_str("{workers: }").unwrap_err();
        assert!(matches!(err, TroughError::ConfigParse(_)));
    }
}
