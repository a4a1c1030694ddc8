//! Error taxonomy.
//!
//! - `DataError`: a transect violates its structural contract. Never retried.
//! - `NumericDefect`: the fitted curve cannot be turned into width/depth/quality.
//!   Tolerated only for water-flagged transects.
//! - `FitError`: what a single transect fit can return.
//! - `TroughError`: what escapes a pipeline run.

use thiserror::Error;

use crate::types::{EdgeKey, Pixel};

/// Structural precondition violated by an input transect.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("transect has an empty height profile")]
    EmptyProfile,
    #[error("transect has {heights} heights but {pixels} path pixels")]
    LengthMismatch { heights: usize, pixels: usize },
    #[error("transect height at sample {index} is not finite")]
    NonFiniteHeight { index: usize },
}

/// Post-fit numeric failure while deriving width, depth and quality.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum NumericDefect {
    #[error("fitted parameters are not finite")]
    NonFiniteParameters,
    #[error("fitted curve is not finite")]
    NonFiniteCurve,
    #[error("fit quality is undefined for {samples} sample(s)")]
    UndefinedQuality { samples: usize },
}

/// Failure of one transect fit that the caller must handle.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error("unexpected fit defect on a dry transect: {0}")]
    UnexpectedDefect(NumericDefect),
}

/// Run-level error.
#[derive(Error, Debug)]
pub enum TroughError {
    #[error("unexpected fit defect on edge {edge} at pixel {pixel}: {defect}")]
    UnexpectedFitDefect {
        edge: EdgeKey,
        pixel: Pixel,
        defect: NumericDefect,
    },
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TroughError>;
