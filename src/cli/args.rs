use crate::strategy::{BatchConfig, LedgerConfig};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Apply ledger commands and report account balances or package capacities
#[derive(Parser, Debug)]
#[command(name = "ledger-engine")]
#[command(about = "Apply idempotent balance and capacity mutations from a CSV file", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing ledger commands
    #[arg(value_name = "INPUT", help = "Path to the input CSV file")]
    pub input_file: PathBuf,

    /// Ledger database file
    #[arg(
        long = "db",
        value_name = "PATH",
        default_value = "ledger.db",
        help = "SQLite database file (':memory:' for a throwaway database, sync only)"
    )]
    pub db: PathBuf,

    /// Owning application identity
    #[arg(long = "ident", value_name = "IDENT", default_value = "ledger")]
    pub ident: String,

    /// Sub-scope within the identity
    #[arg(long = "group", value_name = "GROUP", default_value = "-")]
    pub group: String,

    /// Report written to stdout after processing
    #[arg(long = "report", value_name = "REPORT", default_value = "accounts")]
    pub report: ReportKind,

    /// Processing strategy to use for applying commands
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "sync",
        help = "Processing strategy: 'sync' for in-order or 'async' for account-partitioned batches"
    )]
    pub strategy: StrategyType,

    /// Number of commands per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of commands per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Maximum number of concurrent partitions (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Maximum number of account partitions processing concurrently (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,
}

/// Available processing strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

/// Report selection
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportKind {
    /// `eid,name,balance,credit`
    Accounts,
    /// `eid,spid,name,total,daily,capacity`
    Packages,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments
    ///
    /// Missing values take the defaults; zero values are replaced by
    /// [`BatchConfig::new`] with a warning.
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_none() && self.max_concurrent_batches.is_none() {
            return BatchConfig::default();
        }

        let default = BatchConfig::default();
        BatchConfig::new(
            self.batch_size.unwrap_or(default.batch_size),
            self.max_concurrent_batches
                .unwrap_or(default.max_concurrent_batches),
        )
    }

    pub fn to_ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            db_path: self.db.clone(),
            ident: self.ident.clone(),
            group: self.group.clone(),
            report: self.report,
        }
    }
}
