//! Deterministic synthetic troughs for tests, benches and demos.
//!
//! Model
//! - Each edge is a straight run of trough pixels; each pixel gets one transect
//!   whose heights are `base − shape(t)` plus optional uniform noise.
//! - Amplitude and spread are drawn per transect from the configured ranges;
//!   a share of transects is flagged as water-filled or sampled diagonally.
//! - One `StdRng` seeded from `seed` drives everything, so a `(cfg, seed)` pair
//!   always reproduces the same collection.

use std::ops::Range;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::fit::sample_axis;
use crate::graph::NetworkGraph;
use crate::profile::GaussParams;
use crate::types::{EdgeKey, Orientation, Pixel, Transect, TransectCollection, TroughEdge};

/// Noise-free depression sampled on the transect axis of `orientation`.
pub fn depression(n: usize, orientation: Orientation, params: GaussParams, base: f64) -> Transect {
    let t = sample_axis(n, orientation);
    let heights = t.iter().map(|&x| base - params.eval(x)).collect();
    let pixel_path = (0..n as u32).map(|i| Pixel::new(0, i)).collect();
    Transect::new(heights, pixel_path, orientation)
}

#[derive(Clone, Debug)]
pub struct SynthCfg {
    pub edges: usize,
    pub transects_per_edge: usize,
    /// Samples per transect (transect half-width × 2 + 1).
    pub samples: usize,
    pub amplitude: Range<f64>,
    pub spread: Range<f64>,
    /// Half-range of uniform height noise; 0 disables noise.
    pub noise: f64,
    pub water_share: f64,
    pub diagonal_share: f64,
    /// Share of edges generated without any transects.
    pub empty_edge_share: f64,
}

impl Default for SynthCfg {
    fn default() -> Self {
        Self {
            edges: 8,
            transects_per_edge: 12,
            samples: 21,
            amplitude: 0.2..0.8,
            spread: 0.8..2.5,
            noise: 0.01,
            water_share: 0.1,
            diagonal_share: 0.25,
            empty_edge_share: 0.0,
        }
    }
}

/// Edge `i` runs along row `10·i` from column 0 to `transects_per_edge + 1`.
fn edge_key(i: usize, cfg: &SynthCfg) -> EdgeKey {
    let row = 10 * i as u32;
    EdgeKey::new((row, 0), (row, cfg.transects_per_edge as u32 + 1))
}

fn synth_transect<R: Rng>(rng: &mut R, cfg: &SynthCfg, pixel: Pixel) -> Transect {
    let orientation = if rng.gen_bool(cfg.diagonal_share.clamp(0.0, 1.0)) {
        Orientation::Diagonal
    } else {
        Orientation::Straight
    };
    let t = sample_axis(cfg.samples, orientation);
    let mid = t.get(t.len() / 2).copied().unwrap_or(0.0);
    let params = GaussParams::new(
        rng.gen_range(cfg.amplitude.clone()),
        mid + rng.gen_range(-0.5..0.5),
        rng.gen_range(cfg.spread.clone()),
    );
    let heights = t
        .iter()
        .map(|&x| {
            let jitter = if cfg.noise > 0.0 {
                rng.gen_range(-cfg.noise..cfg.noise)
            } else {
                0.0
            };
            5.0 - params.eval(x) + jitter
        })
        .collect();
    let pixel_path = (0..cfg.samples as u32)
        .map(|k| Pixel::new(pixel.row + k, pixel.col))
        .collect();
    Transect::new(heights, pixel_path, orientation)
        .with_water(rng.gen_bool(cfg.water_share.clamp(0.0, 1.0)))
        .with_scenario("synthetic")
}

/// Build a reproducible collection from `cfg` and `seed`.
pub fn synth_collection(cfg: &SynthCfg, seed: u64) -> TransectCollection {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..cfg.edges)
        .map(|i| {
            let key = edge_key(i, cfg);
            let mut edge = TroughEdge::new();
            if !rng.gen_bool(cfg.empty_edge_share.clamp(0.0, 1.0)) {
                for c in 1..=cfg.transects_per_edge as u32 {
                    let pixel = Pixel::new(key.start.row, c);
                    edge.insert(pixel, synth_transect(&mut rng, cfg, pixel));
                }
            }
            (key, edge)
        })
        .collect()
}

/// Graph with one edge per collection key; length is the Euclidean pixel distance.
pub fn graph_for(collection: &TransectCollection) -> NetworkGraph {
    let mut graph = NetworkGraph::new();
    for key in collection.keys() {
        let dr = key.end.row as f64 - key.start.row as f64;
        let dc = key.end.col as f64 - key.start.col as f64;
        graph.add_edge(key.start, key.end, dr.hypot(dc));
    }
    graph
}
