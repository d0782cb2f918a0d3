//! Benchmark suite for comparing processing strategies
//!
//! Compares the synchronous and the account-partitioned asynchronous strategy
//! using the divan benchmarking framework.
//!
//! # Running Benchmarks
//!
//! ```bash
//! cargo bench
//! ```
//!
//! # Benchmark Fixtures
//!
//! - `benchmark_small.csv` - 4 accounts, 100 commands
//! - `benchmark_medium.csv` - 20 accounts, 2,000 commands
//!
//! Each fixture mixes adds, drawings, deducts, replayed adds, and reversals.
//! Every iteration starts from an empty database file.

use rust_ledger_engine::cli::StrategyType;
use rust_ledger_engine::strategy::{create_strategy, BatchConfig, LedgerConfig};
use std::path::Path;
use tempfile::TempDir;

fn main() {
    divan::main();
}

fn run(strategy_type: StrategyType, fixture: &str, db_dir: TempDir) {
    let ledger = LedgerConfig {
        db_path: db_dir.path().join("ledger.db"),
        ..LedgerConfig::default()
    };
    let strategy = create_strategy(strategy_type, ledger, Some(BatchConfig::default()));
    let mut output = Vec::new();

    strategy
        .process(Path::new(fixture), &mut output)
        .expect("Processing failed");
}

fn fresh_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

#[divan::bench]
fn sync_strategy_small(bencher: divan::Bencher) {
    bencher
        .with_inputs(fresh_dir)
        .bench_values(|dir| run(StrategyType::Sync, "benches/fixtures/benchmark_small.csv", dir));
}

#[divan::bench]
fn async_strategy_small(bencher: divan::Bencher) {
    bencher
        .with_inputs(fresh_dir)
        .bench_values(|dir| run(StrategyType::Async, "benches/fixtures/benchmark_small.csv", dir));
}

#[divan::bench(sample_count = 20)]
fn sync_strategy_medium(bencher: divan::Bencher) {
    bencher
        .with_inputs(fresh_dir)
        .bench_values(|dir| run(StrategyType::Sync, "benches/fixtures/benchmark_medium.csv", dir));
}

#[divan::bench(sample_count = 20)]
fn async_strategy_medium(bencher: divan::Bencher) {
    bencher
        .with_inputs(fresh_dir)
        .bench_values(|dir| run(StrategyType::Async, "benches/fixtures/benchmark_medium.csv", dir));
}
