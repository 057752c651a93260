//! Benchmark suite for comparing replay strategies
//!
//! This benchmark compares the sequential and concurrent replay strategies
//! using the divan benchmarking framework.
//!
//! # Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench
//! ```
//!
//! # Benchmark Fixtures
//!
//! Three generated operation logs are used:
//! - `benchmark_small.csv` - 2 groups, 10 payments (~140 operations)
//! - `benchmark_medium.csv` - 10 groups, 200 payments (~2,700 operations)
//! - `benchmark_large.csv` - 20 groups, 3,000 payments (~43,000 operations)
//!
//! Each payment is built the way a client would build it: insert an entry,
//! then set its participant and amount as separate field edits. The smaller
//! logs also retitle some payments and edit entries after removing them.

use std::path::Path;
use warikan_engine::cli::{OutputFormat, StrategyType};
use warikan_engine::strategy::{create_strategy, BatchConfig};

fn main() {
    divan::main();
}

const FIXTURES: [&str; 3] = ["small", "medium", "large"];

fn fixture_path(size: &str) -> String {
    format!("benches/fixtures/benchmark_{}.csv", size)
}

/// Sequential replay through the single-threaded engine
#[divan::bench(args = FIXTURES)]
fn sync_strategy(size: &str) {
    let strategy = create_strategy(StrategyType::Sync, None, OutputFormat::Csv);
    let mut output = Vec::new();

    strategy
        .process(Path::new(&fixture_path(size)), &mut output)
        .expect("Replay failed");
}

/// Concurrent replay with the default batch configuration
#[divan::bench(args = FIXTURES)]
fn async_strategy(size: &str) {
    let strategy = create_strategy(
        StrategyType::Async,
        Some(BatchConfig::default()),
        OutputFormat::Csv,
    );
    let mut output = Vec::new();

    strategy
        .process(Path::new(&fixture_path(size)), &mut output)
        .expect("Replay failed");
}

/// Concurrent replay with small batches, so barriers cross batch boundaries often
#[divan::bench(args = FIXTURES)]
fn async_strategy_small_batches(size: &str) {
    let strategy = create_strategy(
        StrategyType::Async,
        Some(BatchConfig::new(64, num_cpus::get())),
        OutputFormat::Csv,
    );
    let mut output = Vec::new();

    strategy
        .process(Path::new(&fixture_path(size)), &mut output)
        .expect("Replay failed");
}
