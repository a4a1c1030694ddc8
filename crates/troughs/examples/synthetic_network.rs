//! Run the full pipeline on a synthetic trough network and print the results.
//!
//! Usage:
//!   cargo run -p troughs --example synthetic_network -- [seed] [config.json]
//!
//! Prints per-edge statistics, network metrics and the fit summary as JSON on
//! stdout; progress and diagnostics go to the log on stderr.

use anyhow::{Context, Result};
use tracing_subscriber::fmt::SubscriberBuilder;
use troughs::prelude::*;
use troughs::synth::{graph_for, synth_collection, SynthCfg};

fn main() -> Result<()> {
    SubscriberBuilder::default()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let seed: u64 = match args.next() {
        Some(s) => s.parse().with_context(|| format!("invalid seed {s:?}"))?,
        None => 2009,
    };
    let cfg = match args.next() {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {path}"))?;
            PipelineCfg::from_json_str(&text)?
        }
        None => PipelineCfg::default(),
    };

    let synth = SynthCfg {
        edges: 24,
        empty_edge_share: 0.1,
        ..SynthCfg::default()
    };
    let collection = synth_collection(&synth, seed);
    let mut graph = graph_for(&collection);
    // A trough the extraction found in the skeleton but sampled no transects for.
    graph.add_edge(Pixel::new(500, 0), Pixel::new(500, 40), 40.0);

    let report = run_pipeline(&collection, &mut graph, &cfg)?;

    for (key, stats) in &report.aggregation.statistics {
        println!("{key}: {}", serde_json::to_string(stats)?);
    }
    println!("metrics: {}", serde_json::to_string_pretty(&report.metrics)?);
    println!("summary: {}", serde_json::to_string_pretty(&report.summary)?);
    println!(
        "diagnostics: {} (non_convergence={}, empty_edge={}, missing_statistics={})",
        report.diagnostics.len(),
        report.diagnostics.count("non_convergence"),
        report.diagnostics.count("empty_edge"),
        report.diagnostics.count("missing_statistics"),
    );
    Ok(())
}
