//! Batch processing with account-based partitioning
//!
//! [`BatchProcessor`] splits a batch of commands by account external id and
//! applies each partition on its own blocking worker with its own database
//! connection.
//!
//! # Ordering
//!
//! - Commands for one eid run sequentially in input order on one worker
//! - Partitions for different eids run concurrently; the database serializes
//!   writers through its transaction lock
//! - The caller awaits a whole batch before submitting the next one, so
//!   ordering also holds across batches

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::engine::LedgerEngine;
use crate::db::sqlite;
use crate::types::{LedgerCommand, LedgerError, MutationStatus};

/// Outcome of one command
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    pub command: LedgerCommand,
    pub result: Result<MutationStatus, LedgerError>,
}

/// Concurrent batch processor over a ledger database file
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    engine: Arc<LedgerEngine>,
    db_path: Arc<PathBuf>,
}

impl BatchProcessor {
    /// # Arguments
    ///
    /// * `engine` - Shared command engine
    /// * `db_path` - Database file; each worker opens its own connection to it
    pub fn new(engine: Arc<LedgerEngine>, db_path: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            db_path: Arc::new(db_path.into()),
        }
    }

    /// Split a batch into per-eid partitions, preserving input order inside each
    pub fn partition_by_account(
        &self,
        batch: Vec<LedgerCommand>,
    ) -> HashMap<String, Vec<LedgerCommand>> {
        let mut partitions: HashMap<String, Vec<LedgerCommand>> = HashMap::new();

        for command in batch {
            partitions
                .entry(command.eid().to_string())
                .or_default()
                .push(command);
        }

        partitions
    }

    /// Apply one partition in order on a fresh connection
    ///
    /// Every command gets a result; a failure does not stop the partition.
    pub fn process_partition(&self, commands: Vec<LedgerCommand>) -> Vec<ProcessingResult> {
        let conn = match sqlite::open_existing(self.db_path.as_path()) {
            Ok(conn) => conn,
            Err(err) => {
                tracing::warn!(path = %self.db_path.display(), error = %err, "Worker connection failed");
                return commands
                    .into_iter()
                    .map(|command| ProcessingResult {
                        command,
                        result: Err(err.clone()),
                    })
                    .collect();
            }
        };

        commands
            .into_iter()
            .map(|command| {
                let result = self.engine.process(&conn, &command);
                ProcessingResult { command, result }
            })
            .collect()
    }

    /// Apply a batch: partition by eid, run partitions concurrently, collect all results
    ///
    /// Results are grouped by partition, not in input order.
    pub async fn process_batch(&self, batch: Vec<LedgerCommand>) -> Vec<ProcessingResult> {
        let partitions = self.partition_by_account(batch);

        let mut tasks = Vec::with_capacity(partitions.len());
        for (_eid, commands) in partitions {
            let processor = self.clone();
            tasks.push(tokio::task::spawn_blocking(move || {
                processor.process_partition(commands)
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(partition_results) => results.extend(partition_results),
                Err(err) => tracing::error!(error = %err, "Partition worker panicked"),
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MoneyOp;
    use tempfile::TempDir;

    fn money(eid: &str, trade_no: &str, amount: i64) -> LedgerCommand {
        LedgerCommand::Money {
            op: MoneyOp::Add,
            eid: eid.to_string(),
            trade_no: trade_no.to_string(),
            amount,
        }
    }

    fn processor(dir: &TempDir) -> BatchProcessor {
        let path = dir.path().join("ledger.db");
        sqlite::open(&path).unwrap();
        BatchProcessor::new(Arc::new(LedgerEngine::new("test", "-")), path)
    }

    #[test]
    fn test_partition_preserves_order() {
        let dir = TempDir::new().unwrap();
        let processor = processor(&dir);

        let partitions = processor.partition_by_account(vec![
            money("a", "1", 1),
            money("b", "2", 1),
            money("a", "3", 1),
        ]);

        assert_eq!(partitions.len(), 2);
        assert_eq!(partitions["a"], vec![money("a", "1", 1), money("a", "3", 1)]);
        assert_eq!(partitions["b"], vec![money("b", "2", 1)]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_process_batch_applies_every_partition() {
        let dir = TempDir::new().unwrap();
        let processor = processor(&dir);
        let mut batch = Vec::new();
        for eid in ["a", "b", "c"] {
            batch.push(LedgerCommand::CreateAccount {
                eid: eid.to_string(),
                name: eid.to_uppercase(),
            });
            batch.push(money(eid, "T1", 100));
            batch.push(money(eid, "T1", 100));
        }

        let results = processor.process_batch(batch).await;

        assert_eq!(results.len(), 9);
        let replays = results
            .iter()
            .filter(|r| r.result == Ok(MutationStatus::AlreadyExists))
            .count();
        assert_eq!(replays, 3);

        let conn = sqlite::open_existing(dir.path().join("ledger.db")).unwrap();
        for eid in ["a", "b", "c"] {
            let balance = processor
                .engine
                .accounts()
                .get_balance(&conn, eid)
                .unwrap();
            assert_eq!(balance, 100);
        }
    }
}
