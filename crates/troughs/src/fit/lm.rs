//! Box-constrained Levenberg–Marquardt for the three-parameter Gaussian.
//!
//! Residuals `r_i = shape(t_i; a, μ, σ) − y_i`, cost `½·Σ r_i²`. The normal
//! equations are 3×3, so each iteration is one pass over the samples plus an LU
//! solve. Candidates are projected back into the box before evaluation.

use nalgebra::{Matrix3, Vector3};

use crate::cfg::FitCfg;

/// Damping beyond which no descent direction is left; treated as converged.
const LAMBDA_MAX: f64 = 1e16;
const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_INIT: f64 = 1e-3;
/// Keeps the Marquardt scaling non-singular when a Jacobian column vanishes.
const DIAG_FLOOR: f64 = 1e-12;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Solution {
    /// `(amplitude, center, spread)`.
    pub params: Vector3<f64>,
    pub cost: f64,
    pub iterations: usize,
}

impl Solution {
    #[inline]
    fn new(params: Vector3<f64>, cost: f64, iterations: usize) -> Self {
        Self {
            params,
            cost,
            iterations,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum SolveError {
    /// Budget exhausted before any convergence test passed.
    MaxIterations { iterations: usize },
    /// The starting point already evaluates to NaN/∞.
    NonFiniteCost,
}

#[derive(Clone, Copy, Debug)]
struct Bounds {
    lo: Vector3<f64>,
    hi: Vector3<f64>,
}

impl Bounds {
    fn from_cfg(cfg: &FitCfg) -> Self {
        Self {
            lo: Vector3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, cfg.spread_min),
            hi: Vector3::new(f64::INFINITY, f64::INFINITY, cfg.spread_max),
        }
    }

    #[inline]
    fn project(&self, p: Vector3<f64>) -> Vector3<f64> {
        Vector3::new(
            p[0].clamp(self.lo[0], self.hi[0]),
            p[1].clamp(self.lo[1], self.hi[1]),
            p[2].clamp(self.lo[2], self.hi[2]),
        )
    }

    /// Gradient with components that push against an active bound removed.
    fn projected_gradient(&self, p: &Vector3<f64>, grad: &Vector3<f64>) -> Vector3<f64> {
        let mut g = *grad;
        for i in 0..3 {
            let blocked_low = p[i] <= self.lo[i] && grad[i] > 0.0;
            let blocked_high = p[i] >= self.hi[i] && grad[i] < 0.0;
            if blocked_low || blocked_high {
                g[i] = 0.0;
            }
        }
        g
    }
}

/// Cost, `JᵀJ` and `Jᵀr` at `p` in one pass.
fn normal_equations(t: &[f64], y: &[f64], p: &Vector3<f64>) -> (f64, Matrix3<f64>, Vector3<f64>) {
    let (a, mu, sigma) = (p[0], p[1], p[2]);
    let s2 = sigma * sigma;
    let mut cost = 0.0;
    let mut jtj = Matrix3::zeros();
    let mut jtr = Vector3::zeros();
    for (&x, &yi) in t.iter().zip(y) {
        let d = x - mu;
        let g = (-(d * d) / (2.0 * s2)).exp();
        let r = a * g - yi;
        let j = Vector3::new(g, a * g * d / s2, a * g * d * d / (s2 * sigma));
        jtj += j * j.transpose();
        jtr += j * r;
        cost += r * r;
    }
    (0.5 * cost, jtj, jtr)
}

/// Minimise the Gaussian least-squares cost from `p0` within the σ bounds of `cfg`.
pub(crate) fn solve(
    t: &[f64],
    y: &[f64],
    p0: Vector3<f64>,
    cfg: &FitCfg,
) -> Result<Solution, SolveError> {
    debug_assert_eq!(t.len(), y.len());
    let bounds = Bounds::from_cfg(cfg);
    // A start outside the box is clamped onto it rather than reported.
    let mut p = bounds.project(p0);
    let (mut cost, mut jtj, mut jtr) = normal_equations(t, y, &p);
    if !cost.is_finite() {
        return Err(SolveError::NonFiniteCost);
    }
    let mut lambda = LAMBDA_INIT;

    for iter in 0..cfg.max_iterations {
        if cost == 0.0 || bounds.projected_gradient(&p, &jtr).amax() <= cfg.gtol {
            return Ok(Solution::new(p, cost, iter));
        }

        let mut damped = jtj;
        for i in 0..3 {
            damped[(i, i)] += lambda * jtj[(i, i)].max(DIAG_FLOOR);
        }
        let Some(delta) = damped.lu().solve(&(-jtr)) else {
            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                return Ok(Solution::new(p, cost, iter + 1));
            }
            continue;
        };

        let candidate = bounds.project(p + delta);
        let (c_cost, c_jtj, c_jtr) = normal_equations(t, y, &candidate);
        if c_cost.is_finite() && c_cost < cost {
            let step = (candidate - p).norm();
            let converged =
                cost - c_cost <= cfg.ftol * cost || step <= cfg.xtol * (cfg.xtol + p.norm());
            p = candidate;
            cost = c_cost;
            jtj = c_jtj;
            jtr = c_jtr;
            lambda = (lambda / 10.0).max(LAMBDA_MIN);
            if converged {
                return Ok(Solution::new(p, cost, iter + 1));
            }
        } else {
            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                return Ok(Solution::new(p, cost, iter + 1));
            }
        }
    }
    Err(SolveError::MaxIterations {
        iterations: cfg.max_iterations,
    })
}
