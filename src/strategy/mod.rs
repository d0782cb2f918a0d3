//! Processing strategy module for batch command processing
//!
//! A strategy is a complete pipeline: read the command file, apply every
//! command to the ledger database, write the selected report. The
//! synchronous and the account-partitioned concurrent pipelines are selected
//! at runtime.

use crate::cli::{ReportKind, StrategyType};
use crate::core::LedgerEngine;
use crate::db::Executor;
use crate::io::csv_format::{write_accounts_csv, write_packages_csv};
use crate::types::{LedgerError, MutationStatus};
use std::io::Write;
use std::path::{Path, PathBuf};

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// SQLite path that names a private in-memory database
pub const MEMORY_DB: &str = ":memory:";

/// Where and under which scope commands are applied, and what gets reported
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    pub db_path: PathBuf,
    pub ident: String,
    pub group: String,
    pub report: ReportKind,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("ledger.db"),
            ident: "ledger".to_string(),
            group: "-".to_string(),
            report: ReportKind::Accounts,
        }
    }
}

impl LedgerConfig {
    pub fn engine(&self) -> LedgerEngine {
        LedgerEngine::new(self.ident.clone(), self.group.clone())
    }

    pub fn is_in_memory(&self) -> bool {
        self.db_path.as_os_str() == MEMORY_DB
    }
}

/// Processing strategy trait for complete command pipelines
pub trait ProcessingStrategy: Send + Sync {
    /// Apply the commands in `input_path` and write the report to `output`
    ///
    /// # Errors
    ///
    /// Returns an error only for fatal conditions: unreadable input, database
    /// that cannot be opened, report that cannot be written. A command that
    /// fails is logged and skipped.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), LedgerError>;
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - Sync or Async
/// * `ledger` - Database path, scope, and report selection
/// * `config` - Batch configuration (ignored for sync)
pub fn create_strategy(
    strategy_type: StrategyType,
    ledger: LedgerConfig,
    config: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(ledger)),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(ledger, config))
        }
    }
}

/// Running totals of command outcomes
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingSummary {
    pub applied: usize,
    pub replayed: usize,
    pub failed: usize,
}

impl ProcessingSummary {
    pub(crate) fn record(&mut self, result: &Result<MutationStatus, LedgerError>) {
        match result {
            Ok(MutationStatus::Applied) => self.applied += 1,
            Ok(MutationStatus::AlreadyExists) => self.replayed += 1,
            Err(_) => self.failed += 1,
        }
    }
}

pub(crate) fn write_report(
    engine: &LedgerEngine,
    executor: &dyn Executor,
    report: ReportKind,
    output: &mut dyn Write,
) -> Result<(), LedgerError> {
    match report {
        ReportKind::Accounts => {
            let accounts = engine.accounts().list_accounts(executor)?;
            write_accounts_csv(&accounts, output)
        }
        ReportKind::Packages => {
            let packages = engine.packages().list_packages(executor)?;
            write_packages_csv(&packages, output)
        }
    }
}
