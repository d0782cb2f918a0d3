//! End-to-end integration tests
//!
//! These tests validate the complete command pipeline using predefined CSV
//! fixtures. Each test:
//! 1. Reads input.csv from a fixture directory
//! 2. Applies every command to a fresh database file
//! 3. Writes the selected report
//! 4. Compares the report with expected.csv
//!
//! Fixtures are located in tests/fixtures/ and cover:
//! - Happy path money mutations
//! - Idempotent replays of the same trade number
//! - Guarded updates that would go negative
//! - Refunds and red-ink reversals
//! - Malformed and unknown rows
//! - Interleaved commands for several accounts
//! - Capacity packages
//!
//! Each fixture is run with both the synchronous and the asynchronous strategy.

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use rust_ledger_engine::cli::{ReportKind, StrategyType};
    use rust_ledger_engine::strategy::{create_strategy, BatchConfig, LedgerConfig};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// Run a fixture by processing input.csv and comparing with expected.csv
    ///
    /// # Panics
    ///
    /// Panics if fixture files cannot be read or the report does not match.
    fn run_test_fixture(fixture_name: &str, report: ReportKind, strategy_type: StrategyType) {
        let fixture_dir = format!("tests/fixtures/{}", fixture_name);
        let input_path = format!("{}/input.csv", fixture_dir);
        let expected_path = format!("{}/expected.csv", fixture_dir);

        assert!(
            Path::new(&input_path).exists(),
            "Input file not found: {}",
            input_path
        );

        let db_dir = TempDir::new().expect("Failed to create temp dir");
        let ledger = LedgerConfig {
            db_path: db_dir.path().join("ledger.db"),
            report,
            ..LedgerConfig::default()
        };
        // Small batches so the async run spans several batches per account
        let strategy = create_strategy(strategy_type, ledger, Some(BatchConfig::new(3, 4)));

        let mut output = Vec::new();
        strategy
            .process(Path::new(&input_path), &mut output)
            .unwrap_or_else(|e| panic!("Failed to process commands: {}", e));

        let actual_output = String::from_utf8(output).expect("Report is not UTF-8");
        let expected_output = fs::read_to_string(&expected_path)
            .unwrap_or_else(|e| panic!("Failed to read expected file {}: {}", expected_path, e));

        assert_eq!(
            actual_output, expected_output,
            "\n\nOutput mismatch for fixture: {} (strategy: {:?})\n\nActual output:\n{}\n\nExpected output:\n{}\n",
            fixture_name, strategy_type, actual_output, expected_output
        );
    }

    #[rstest]
    #[case("happy_path", ReportKind::Accounts)]
    #[case("idempotent_replay", ReportKind::Accounts)]
    #[case("insufficient_funds", ReportKind::Accounts)]
    #[case("refunds_and_reversals", ReportKind::Accounts)]
    #[case("malformed_data", ReportKind::Accounts)]
    #[case("multiple_accounts", ReportKind::Accounts)]
    #[case("packages", ReportKind::Packages)]
    fn test_fixtures(
        #[case] fixture: &str,
        #[case] report: ReportKind,
        #[values(StrategyType::Sync, StrategyType::Async)] strategy: StrategyType,
    ) {
        run_test_fixture(fixture, report, strategy);
    }

    /// A second run over the same database replays every command
    #[rstest]
    fn test_rerun_is_idempotent(
        #[values(StrategyType::Sync, StrategyType::Async)] strategy: StrategyType,
    ) {
        let db_dir = TempDir::new().expect("Failed to create temp dir");
        let ledger = LedgerConfig {
            db_path: db_dir.path().join("ledger.db"),
            ..LedgerConfig::default()
        };
        let input = Path::new("tests/fixtures/refunds_and_reversals/input.csv");
        let expected = fs::read_to_string("tests/fixtures/refunds_and_reversals/expected.csv")
            .expect("Failed to read expected file");

        for _ in 0..2 {
            let strategy = create_strategy(strategy, ledger.clone(), None);
            let mut output = Vec::new();
            strategy.process(input, &mut output).expect("Processing failed");
            assert_eq!(String::from_utf8(output).unwrap(), expected);
        }
    }
}
