//! Synchronous processing strategy
//!
//! One connection, commands applied in file order, each in its own
//! transaction. Delegates:
//! - CSV parsing to `SyncReader` (iterator interface)
//! - Command dispatch to `LedgerEngine`
//! - Report output to `csv_format`

use crate::db::sqlite;
use crate::io::sync_reader::SyncReader;
use crate::strategy::{write_report, LedgerConfig, ProcessingStrategy, ProcessingSummary};
use crate::types::LedgerError;
use std::io::Write;
use std::path::Path;

/// Synchronous processing strategy
///
/// ```no_run
/// use rust_ledger_engine::strategy::{LedgerConfig, ProcessingStrategy, SyncProcessingStrategy};
/// use std::path::Path;
/// use std::io;
///
/// let strategy = SyncProcessingStrategy::new(LedgerConfig::default());
/// let mut output = io::stdout();
///
/// strategy.process(Path::new("commands.csv"), &mut output)
///     .expect("Processing failed");
/// ```
#[derive(Debug, Clone)]
pub struct SyncProcessingStrategy {
    ledger: LedgerConfig,
}

impl SyncProcessingStrategy {
    pub fn new(ledger: LedgerConfig) -> Self {
        Self { ledger }
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), LedgerError> {
        let reader = SyncReader::new(input_path)?;
        let conn = sqlite::open(&self.ledger.db_path)?;
        let engine = self.ledger.engine();
        let mut summary = ProcessingSummary::default();

        for result in reader {
            let command = match result {
                Ok(command) => command,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping row");
                    summary.failed += 1;
                    continue;
                }
            };

            let outcome = engine.process(&conn, &command);
            if let Err(e) = &outcome {
                tracing::warn!(eid = command.eid(), error = %e, "Command rejected");
            }
            summary.record(&outcome);
        }

        tracing::info!(
            applied = summary.applied,
            replayed = summary.replayed,
            failed = summary.failed,
            "Processing complete"
        );

        write_report(&engine, &conn, self.ledger.report, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ReportKind;
    use crate::strategy::MEMORY_DB;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper function to create a temporary CSV file for testing
    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn in_memory(report: ReportKind) -> SyncProcessingStrategy {
        SyncProcessingStrategy::new(LedgerConfig {
            db_path: MEMORY_DB.into(),
            report,
            ..LedgerConfig::default()
        })
    }

    fn run(strategy: &SyncProcessingStrategy, content: &str) -> String {
        let file = create_temp_csv(content);
        let mut output = Vec::new();
        strategy.process(file.path(), &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_sync_strategy_applies_commands_in_order() {
        let csv_content = "op,eid,spid,trade_no,amount,ext_no,name,expires\n\
                           create_account,alice,,,,,Alice,\n\
                           add,alice,,T1,100.00,,,\n\
                           add,alice,,T1,100.00,,,\n\
                           deduct,alice,,T2,150,,,\n\
                           drawing,alice,,T3,30.25,,,\n";

        let output = run(&in_memory(ReportKind::Accounts), csv_content);

        assert_eq!(output, "eid,name,balance,credit\nalice,Alice,69.75,0.00\n");
    }

    #[test]
    fn test_sync_strategy_continues_on_malformed_record() {
        let csv_content = "op,eid,spid,trade_no,amount,ext_no,name,expires\n\
                           create_account,a,,,,,,\n\
                           add,a,,T1,invalid,,,\n\
                           create_account,b,,,,,,\n\
                           add,b,,T1,5,,,\n";

        let output = run(&in_memory(ReportKind::Accounts), csv_content);

        assert_eq!(output, "eid,name,balance,credit\na,a,0.00,0.00\nb,b,5.00,0.00\n");
    }

    #[test]
    fn test_sync_strategy_packages_report() {
        let csv_content = "op,eid,spid,trade_no,amount,ext_no,name,expires,daily\n\
                           create_account,a,,,,,,,\n\
                           create_package,a,sms,,100,,SMS,20301231,10\n\
                           deduct_capacity,a,sms,U1,30,,,,\n\
                           deduct_capacity,a,sms,U2,80,,,,\n";

        let output = run(&in_memory(ReportKind::Packages), csv_content);

        assert_eq!(
            output,
            "eid,spid,name,total,daily,capacity\na,sms,SMS,100,10,70\n"
        );
    }

    #[test]
    fn test_sync_strategy_handles_missing_file() {
        let strategy = in_memory(ReportKind::Accounts);
        let mut output = Vec::new();

        let result = strategy.process(Path::new("nonexistent.csv"), &mut output);

        assert!(matches!(result, Err(LedgerError::FileNotFound { .. })));
    }

    #[test]
    fn test_sync_strategy_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncProcessingStrategy>();
    }
}
