//! Data model shared by all pipeline stages.
//!
//! - `Pixel`: raster coordinate; keys transects inside a trough and names graph nodes.
//! - `EdgeKey`: directed `(start, end)` node pair identifying one trough.
//! - `Transect`: one cross-section with its fit state.
//! - `TroughEdge`, `TransectCollection`: the nested mapping handed in by the
//!   extraction stage. `BTreeMap` keeps iteration deterministic.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::profile::GaussParams;

/// Raster coordinate `(row, col)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pixel {
    pub row: u32,
    pub col: u32,
}

impl Pixel {
    #[inline]
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Pixel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

impl From<(u32, u32)> for Pixel {
    fn from((row, col): (u32, u32)) -> Self {
        Self { row, col }
    }
}

/// Directed trough identifier. `(a, b)` and `(b, a)` are different edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    pub start: Pixel,
    pub end: Pixel,
}

impl EdgeKey {
    #[inline]
    pub fn new(start: impl Into<Pixel>, end: impl Into<Pixel>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
    #[inline]
    pub fn reversed(&self) -> Self {
        Self {
            start: self.end,
            end: self.start,
        }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.start, self.end)
    }
}

/// Sampling direction of a transect relative to the raster grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Straight,
    Diagonal,
}

impl Orientation {
    /// Ground distance covered by one sample step, in pixel units.
    #[inline]
    pub fn step_scale(self) -> f64 {
        match self {
            Orientation::Straight => 1.0,
            Orientation::Diagonal => std::f64::consts::SQRT_2,
        }
    }
}

/// Fit-derived quantities of one transect.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    /// Full width at half maximum of the fitted Gaussian.
    pub width: f64,
    /// Peak of the fitted curve over the sample positions.
    pub depth: f64,
    /// Coefficient of determination between observed and fitted profile.
    pub quality: f64,
    pub params: GaussParams,
}

/// Whether a transect has been through the fitter.
///
/// Transects whose fit failed are not kept with a marker; they are dropped from
/// the fitted collection and reported through `Diagnostics`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum FitState {
    #[default]
    Pending,
    Fitted(FitResult),
}

impl FitState {
    #[inline]
    pub fn result(&self) -> Option<&FitResult> {
        match self {
            FitState::Fitted(r) => Some(r),
            FitState::Pending => None,
        }
    }
}

/// One sampled cross-section.
///
/// Invariant: `heights.len() == pixel_path.len()`; checked by the fitter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transect {
    pub heights: Vec<f64>,
    pub pixel_path: Vec<Pixel>,
    pub orientation: Orientation,
    /// Domain classification tag; carried through untouched.
    pub scenario: String,
    pub has_water: bool,
    #[serde(default)]
    pub fit: FitState,
}

impl Transect {
    pub fn new(heights: Vec<f64>, pixel_path: Vec<Pixel>, orientation: Orientation) -> Self {
        Self {
            heights,
            pixel_path,
            orientation,
            scenario: String::new(),
            has_water: false,
            fit: FitState::Pending,
        }
    }

    pub fn with_water(mut self, has_water: bool) -> Self {
        self.has_water = has_water;
        self
    }

    pub fn with_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario = scenario.into();
        self
    }

    #[inline]
    pub fn fit_result(&self) -> Option<&FitResult> {
        self.fit.result()
    }
}

/// Transects of one trough keyed by the trough pixel they are centred on.
pub type TroughEdge = BTreeMap<Pixel, Transect>;

/// All troughs of a network; one entry is one unit of parallel work.
pub type TransectCollection = BTreeMap<EdgeKey, TroughEdge>;
