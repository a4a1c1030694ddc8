//! Gaussian depression model and the quantities derived from a fit.
//!
//! - `shape(x) = a · exp(−(x − μ)² / (2σ²))`
//! - width = FWHM = `2·sqrt(2·ln 2)·|σ|`
//! - depth = peak of the fitted curve over the sample positions
//! - quality = coefficient of determination (R²)

use serde::{Deserialize, Serialize};

pub use crate::error::NumericDefect;
use crate::types::FitResult;

/// `2·sqrt(2·ln 2)`; converts a Gaussian σ into its full width at half maximum.
pub const FWHM_PER_SIGMA: f64 = 2.354_820_045_030_949_3;

/// Parameters `(amplitude, center, spread)` of the Gaussian peak.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GaussParams {
    pub amplitude: f64,
    pub center: f64,
    pub spread: f64,
}

impl GaussParams {
    #[inline]
    pub fn new(amplitude: f64, center: f64, spread: f64) -> Self {
        Self {
            amplitude,
            center,
            spread,
        }
    }

    #[inline]
    pub fn eval(&self, x: f64) -> f64 {
        shape(x, self.amplitude, self.center, self.spread)
    }

    /// Full width at half maximum.
    #[inline]
    pub fn fwhm(&self) -> f64 {
        FWHM_PER_SIGMA * self.spread.abs()
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.amplitude.is_finite() && self.center.is_finite() && self.spread.is_finite()
    }

    /// Evaluate the curve at every position of `t`.
    pub fn curve(&self, t: &[f64]) -> Vec<f64> {
        t.iter().map(|&x| self.eval(x)).collect()
    }
}

/// Gaussian peak evaluated at `x`.
#[inline]
pub fn shape(x: f64, amplitude: f64, center: f64, spread: f64) -> f64 {
    let d = x - center;
    amplitude * (-(d * d) / (2.0 * spread * spread)).exp()
}

/// Coefficient of determination of `fitted` against `observed`.
///
/// Undefined below two samples. Constant observations score 1.0 when matched
/// exactly and 0.0 otherwise.
pub fn r_squared(observed: &[f64], fitted: &[f64]) -> Option<f64> {
    debug_assert_eq!(observed.len(), fitted.len());
    let n = observed.len();
    if n < 2 {
        return None;
    }
    let mean = observed.iter().sum::<f64>() / n as f64;
    let ss_tot: f64 = observed.iter().map(|y| (y - mean) * (y - mean)).sum();
    let ss_res: f64 = observed
        .iter()
        .zip(fitted)
        .map(|(y, f)| (y - f) * (y - f))
        .sum();
    if ss_tot == 0.0 {
        return Some(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Some(1.0 - ss_res / ss_tot)
}

/// Rebuild the fitted curve on `t` and derive width, depth and quality.
pub fn derive_fit(params: GaussParams, t: &[f64], data: &[f64]) -> Result<FitResult, NumericDefect> {
    if !params.is_finite() {
        return Err(NumericDefect::NonFiniteParameters);
    }
    let curve = params.curve(t);
    if curve.iter().any(|v| !v.is_finite()) {
        return Err(NumericDefect::NonFiniteCurve);
    }
    let depth = curve.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let quality = r_squared(data, &curve).ok_or(NumericDefect::UndefinedQuality {
        samples: data.len(),
    })?;
    if !quality.is_finite() || !depth.is_finite() {
        return Err(NumericDefect::NonFiniteCurve);
    }
    Ok(FitResult {
        width: params.fwhm(),
        depth,
        quality,
        params,
    })
}
