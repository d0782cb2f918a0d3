//! Asynchronous batch processing strategy
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch CSV reading)
//!     └── BatchProcessor (eid partitioning + blocking workers)
//!         └── LedgerEngine (one connection per worker)
//! ```
//!
//! Batches are processed one after another. Within a batch, partitions for
//! different accounts run concurrently on tokio's blocking pool, bounded by
//! `max_concurrent_batches`. Concurrent writers need a shared database file,
//! so an in-memory database is rejected.

use crate::core::BatchProcessor;
use crate::db::sqlite;
use crate::io::async_reader::AsyncReader;
use crate::strategy::{
    write_report, LedgerConfig, ProcessingStrategy, ProcessingSummary, MEMORY_DB,
};
use crate::types::LedgerError;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Configuration for batch processing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of commands per batch
    pub batch_size: usize,
    /// Maximum number of partitions processing concurrently
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a BatchConfig; zero values fall back to the defaults with a warning
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            tracing::warn!(
                batch_size,
                default = default.batch_size,
                "Invalid batch_size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            tracing::warn!(
                max_concurrent_batches,
                default = default.max_concurrent_batches,
                "Invalid max_concurrent_batches, using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Asynchronous batch processing strategy
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    ledger: LedgerConfig,
    config: BatchConfig,
}

impl AsyncProcessingStrategy {
    /// # Arguments
    ///
    /// * `ledger` - Database file, scope, and report selection
    /// * `config` - Batch size and concurrency bound
    pub fn new(ledger: LedgerConfig, config: BatchConfig) -> Self {
        Self { ledger, config }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), LedgerError> {
        if self.ledger.is_in_memory() {
            return Err(LedgerError::unsupported_input("db", MEMORY_DB));
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .max_blocking_threads(self.config.max_concurrent_batches)
            .build()?;

        // Applies the schema before any worker connects
        let conn = sqlite::open(&self.ledger.db_path)?;
        let engine = Arc::new(self.ledger.engine());

        runtime.block_on(async {
            let processor = BatchProcessor::new(Arc::clone(&engine), self.ledger.db_path.clone());

            let file = tokio::fs::File::open(input_path).await.map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => LedgerError::FileNotFound {
                    path: input_path.display().to_string(),
                },
                _ => LedgerError::from(e),
            })?;
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);
            let mut summary = ProcessingSummary::default();

            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                // Wait for the whole batch so per-account order holds across batches
                for outcome in processor.process_batch(batch).await {
                    if let Err(e) = &outcome.result {
                        tracing::warn!(eid = outcome.command.eid(), error = %e, "Command rejected");
                    }
                    summary.record(&outcome.result);
                }
            }

            tracing::info!(
                applied = summary.applied,
                replayed = summary.replayed,
                failed = summary.failed,
                "Processing complete"
            );

            Ok::<(), LedgerError>(())
        })?;

        write_report(&engine, &conn, self.ledger.report, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ReportKind;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    /// Helper function to create a temporary CSV file for testing
    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn strategy(dir: &TempDir, config: BatchConfig) -> AsyncProcessingStrategy {
        AsyncProcessingStrategy::new(
            LedgerConfig {
                db_path: dir.path().join("ledger.db"),
                ..LedgerConfig::default()
            },
            config,
        )
    }

    #[test]
    fn test_async_strategy_maintains_ordering_across_batches() {
        let csv_content = "op,eid,spid,trade_no,amount,ext_no,name,expires\n\
                           create_account,1,,,,,,\n\
                           create_account,2,,,,,,\n\
                           add,1,,T1,100,,,\n\
                           add,2,,T2,50,,,\n\
                           deduct,1,,T3,30,,,\n\
                           add,2,,T4,25,,,\n\
                           deduct,1,,T5,20,,,\n";
        let file = create_temp_csv(csv_content);
        let dir = TempDir::new().unwrap();

        // Small batches force each account's commands across several batches
        let strategy = strategy(&dir, BatchConfig::new(2, 4));
        let mut output = Vec::new();
        strategy.process(file.path(), &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "eid,name,balance,credit\n1,1,50.00,0.00\n2,2,75.00,0.00\n"
        );
    }

    #[test]
    fn test_async_strategy_rejects_in_memory_database() {
        let file = create_temp_csv("op,eid\n");
        let strategy = AsyncProcessingStrategy::new(
            LedgerConfig {
                db_path: MEMORY_DB.into(),
                report: ReportKind::Accounts,
                ..LedgerConfig::default()
            },
            BatchConfig::default(),
        );
        let mut output = Vec::new();

        let result = strategy.process(file.path(), &mut output);

        assert!(matches!(result, Err(LedgerError::UnsupportedInput { .. })));
    }

    #[test]
    fn test_async_strategy_handles_missing_file() {
        let dir = TempDir::new().unwrap();
        let strategy = strategy(&dir, BatchConfig::default());
        let mut output = Vec::new();

        let result = strategy.process(Path::new("nonexistent.csv"), &mut output);

        assert!(matches!(result, Err(LedgerError::FileNotFound { .. })));
    }

    #[test]
    fn test_batch_config_zero_values_fall_back() {
        assert_eq!(BatchConfig::new(0, 0), BatchConfig::default());
    }
}
