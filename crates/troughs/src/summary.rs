//! Distribution of fit results over a whole collection.
//!
//! Reported separately for width, depth and quality, over all fitted transects
//! with |width| < 30 and over the subset that also passes the quality
//! threshold. Widths are taken as absolute values.

use serde::{Deserialize, Serialize};

use crate::aggregate::{mean, median};
use crate::cfg::AggregateCfg;
use crate::types::TransectCollection;

/// Widths at or beyond this magnitude are fit artifacts and left out.
pub const WIDTH_CUTOFF: f64 = 30.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SampleStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    /// Population standard deviation.
    pub std: f64,
}

impl SampleStats {
    /// `None` for an empty sample.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mean = mean(values)?;
        let median = median(values)?;
        let n = values.len() as f64;
        let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        Some(Self {
            count: values.len(),
            mean,
            median,
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            std: var.sqrt(),
        })
    }
}

/// One measure, unfiltered and quality-filtered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasureSummary {
    pub all: Option<SampleStats>,
    pub good: Option<SampleStats>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    pub fitted: usize,
    pub width: MeasureSummary,
    pub depth: MeasureSummary,
    pub quality: MeasureSummary,
    /// Percentage of fitted transects with negative R²; `None` without fits.
    pub negative_quality_percent: Option<f64>,
}

#[derive(Default)]
struct Samples {
    all: Vec<f64>,
    good: Vec<f64>,
}

impl Samples {
    fn push(&mut self, value: f64, good: bool) {
        self.all.push(value);
        if good {
            self.good.push(value);
        }
    }

    fn summarize(&self) -> MeasureSummary {
        MeasureSummary {
            all: SampleStats::from_values(&self.all),
            good: SampleStats::from_values(&self.good),
        }
    }
}

/// Summarize every fitted transect in `collection`; water flags are ignored.
pub fn summarize_fits(collection: &TransectCollection, cfg: &AggregateCfg) -> FitSummary {
    let (mut width, mut depth, mut quality) =
        (Samples::default(), Samples::default(), Samples::default());
    let mut fitted = 0usize;
    let mut negative = 0usize;

    for r in collection
        .values()
        .flat_map(|edge| edge.values())
        .filter_map(|tr| tr.fit_result())
    {
        fitted += 1;
        if r.quality < 0.0 {
            negative += 1;
        }
        if r.width.abs() < WIDTH_CUTOFF {
            let good = r.quality > cfg.min_quality;
            width.push(r.width.abs(), good);
            depth.push(r.depth, good);
            quality.push(r.quality, good);
        }
    }

    FitSummary {
        fitted,
        width: width.summarize(),
        depth: depth.summarize(),
        quality: quality.summarize(),
        negative_quality_percent: (fitted > 0)
            .then(|| negative as f64 * 100.0 / fitted as f64),
    }
}
