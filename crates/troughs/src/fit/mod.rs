//! Single-transect Gaussian fitting.
//!
//! Steps
//! - Flip the profile (`max(h) − h`) so the trough becomes a peak.
//! - Sample axis `t`: `0..N−1` for straight transects, `0..N·√2` for diagonal ones.
//! - Initial guess: amplitude from config, center = argmax, spread from the
//!   second moment plus one (avoids σ=0 on flat profiles).
//! - Bounded least squares (`lm`), then width/depth/quality via `profile::derive_fit`.
//!
//! Outcome classes
//! - `Err(FitError::Data)`: the transect breaks its contract; nothing was fitted.
//! - `Ok(Dropped(NonConvergence))`: optimizer ran out of budget.
//! - `Ok(Dropped(SuppressedDefect))`: derived quantities failed on a water-flagged
//!   transect, an expected outcome for water surfaces.
//! - `Err(FitError::UnexpectedDefect)`: the same failure on a dry transect.

mod lm;

use nalgebra::Vector3;

use crate::cfg::FitCfg;
use crate::error::{DataError, FitError, NumericDefect};
use crate::profile::{derive_fit, GaussParams};
use crate::types::{FitResult, Orientation, Transect};

use lm::SolveError;

/// Why a transect was left out of the fitted collection without failing the run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DropReason {
    NonConvergence { iterations: usize },
    SuppressedDefect(NumericDefect),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FitOutcome {
    Fitted(FitResult),
    Dropped(DropReason),
}

/// Check the structural contract of a transect.
pub fn validate(transect: &Transect) -> Result<(), DataError> {
    let n = transect.heights.len();
    if n == 0 {
        return Err(DataError::EmptyProfile);
    }
    if n != transect.pixel_path.len() {
        return Err(DataError::LengthMismatch {
            heights: n,
            pixels: transect.pixel_path.len(),
        });
    }
    if let Some(index) = transect.heights.iter().position(|h| !h.is_finite()) {
        return Err(DataError::NonFiniteHeight { index });
    }
    Ok(())
}

/// `n` evenly spaced positions covering the ground extent of the transect.
pub fn sample_axis(n: usize, orientation: Orientation) -> Vec<f64> {
    let end = match orientation {
        Orientation::Straight => n.saturating_sub(1) as f64,
        Orientation::Diagonal => n as f64 * orientation.step_scale(),
    };
    linspace(0.0, end, n)
}

fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Depression → peak: `max(h) − h`.
pub fn flip_profile(heights: &[f64]) -> Vec<f64> {
    let top = heights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    heights.iter().map(|h| top - h).collect()
}

/// Starting point for the optimizer (not yet projected into the σ bounds).
pub fn initial_guess(t: &[f64], data: &[f64], cfg: &FitCfg) -> GaussParams {
    // First maximum wins, matching argmax semantics.
    let center = data
        .iter()
        .enumerate()
        .fold((0usize, f64::NEG_INFINITY), |best, (i, &v)| {
            if v > best.1 {
                (i, v)
            } else {
                best
            }
        })
        .0 as f64;
    let n = data.len() as f64;
    let second_moment: f64 = t
        .iter()
        .zip(data)
        .map(|(&x, &y)| y * (x - center) * (x - center))
        .sum();
    GaussParams::new(cfg.initial_amplitude, center, (second_moment / n).sqrt() + 1.0)
}

/// Fit one transect. See the module docs for the outcome classes.
pub fn fit_transect(transect: &Transect, cfg: &FitCfg) -> Result<FitOutcome, FitError> {
    validate(transect)?;
    let data = flip_profile(&transect.heights);
    let t = sample_axis(data.len(), transect.orientation);
    let p0 = initial_guess(&t, &data, cfg);
    if !(cfg.spread_min..=cfg.spread_max).contains(&p0.spread) {
        // Infeasible starts are clamped into the bounds, not rejected.
        tracing::debug!(
            spread = p0.spread,
            min = cfg.spread_min,
            max = cfg.spread_max,
            "initial spread outside bounds, clamped"
        );
    }

    let derived = match lm::solve(
        &t,
        &data,
        Vector3::new(p0.amplitude, p0.center, p0.spread),
        cfg,
    ) {
        Ok(sol) => {
            tracing::trace!(iterations = sol.iterations, cost = sol.cost, "gaussian fit converged");
            let params = GaussParams::new(sol.params[0], sol.params[1], sol.params[2]);
            derive_fit(params, &t, &data)
        }
        Err(SolveError::MaxIterations { iterations }) => {
            return Ok(FitOutcome::Dropped(DropReason::NonConvergence { iterations }));
        }
        Err(SolveError::NonFiniteCost) => Err(NumericDefect::NonFiniteCurve),
    };

    match derived {
        Ok(result) => Ok(FitOutcome::Fitted(result)),
        Err(defect) if transect.has_water => {
            Ok(FitOutcome::Dropped(DropReason::SuppressedDefect(defect)))
        }
        Err(defect) => Err(FitError::UnexpectedDefect(defect)),
    }
}
