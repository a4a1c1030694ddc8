//! Criterion benches for single-transect fitting and the per-edge scheduler.
//! Focus sizes: samples per transect in {11, 21, 41}; edges in {8, 64}.
//! Results: by default under target/criterion.

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use troughs::cfg::FitCfg;
use troughs::fit::fit_transect;
use troughs::schedule::FitScheduler;
use troughs::synth::{synth_collection, SynthCfg};
use troughs::types::Transect;

fn first_transect(samples: usize, seed: u64) -> Option<Transect> {
    let cfg = SynthCfg {
        edges: 1,
        transects_per_edge: 1,
        samples,
        water_share: 0.0,
        ..SynthCfg::default()
    };
    synth_collection(&cfg, seed)
        .into_values()
        .flat_map(|edge| edge.into_values())
        .next()
}

fn bench_fit_transect(c: &mut Criterion) {
    let mut group = c.benchmark_group("fit_transect");
    let cfg = FitCfg::default();
    for &n in &[11usize, 21, 41] {
        group.bench_with_input(BenchmarkId::new("noisy_gaussian", n), &n, |b, &n| {
            let mut seed = 0u64;
            b.iter_batched(
                || {
                    seed = seed.wrapping_add(1);
                    first_transect(n, seed)
                },
                |tr| {
                    if let Some(tr) = tr {
                        let _ = fit_transect(&tr, &cfg);
                    }
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_scheduler(c: &mut Criterion) {
    let mut group = c.benchmark_group("fit_collection");
    group.sample_size(20);
    for &edges in &[8usize, 64] {
        let coll = synth_collection(
            &SynthCfg {
                edges,
                ..SynthCfg::default()
            },
            42,
        );
        for &workers in &[1usize, 4] {
            let scheduler = FitScheduler::new(FitCfg::default()).with_workers(workers);
            group.bench_with_input(
                BenchmarkId::new(format!("workers_{workers}"), edges),
                &coll,
                |b, coll| {
                    b.iter(|| {
                        let _ = scheduler.fit_collection(coll);
                    })
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_fit_transect, bench_scheduler);
criterion_main!(benches);
