//! Rust Ledger Engine CLI
//!
//! Applies balance and capacity commands from a CSV file to a SQLite ledger.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- commands.csv > accounts.csv
//! cargo run -- --db books.db --ident billing --group eu commands.csv
//! cargo run -- --report packages commands.csv > packages.csv
//! cargo run -- --strategy async --batch-size 2000 --max-concurrent 8 commands.csv
//! ```
//!
//! The report goes to stdout. Diagnostics go to stderr through `tracing`;
//! set `RUST_LOG` (for example `RUST_LOG=debug`) to change the level.
//!
//! # Exit Codes
//!
//! - 0: Success (individual commands may still have been rejected)
//! - 1: Fatal error (file not found, database cannot be opened, etc.)

use rust_ledger_engine::cli;
use rust_ledger_engine::strategy;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = cli::parse_args();

    let strategy = {
        let config = if matches!(args.strategy, cli::StrategyType::Async) {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy, args.to_ledger_config(), config)
    };

    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&args.input_file, &mut output) {
        tracing::error!(error = %e, "Processing failed");
        process::exit(1);
    }
}
