//! Rust Ledger Engine Library
//! # Overview
//!
//! An idempotent ledger for account balances and capacity packages, stored in
//! SQLite. Every mutation is a guarded update plus an audit record, keyed by a
//! caller-supplied trade number so retries are safe.
//!
//! # Architecture
//!
//! - [`types`] - Accounts, packages, audit records, commands, errors
//! - [`db`] - The executor/transaction capability and its `rusqlite` adapter
//! - [`core`] - Ledger logic:
//!   - [`core::ledger`] - Generic guarded update + audit insert
//!   - [`core::guard`] - Idempotency checks
//!   - [`core::scope`] - Caller-owned vs. self-owned transactions
//!   - [`core::balance`] - Accounts and money mutations
//!   - [`core::capacity`] - Packages and capacity mutations
//!   - [`core::engine`] - Batch command dispatch
//! - [`io`] - CSV command input and report output
//! - [`strategy`] - Sync and account-partitioned async pipelines
//! - [`cli`] - CLI argument parsing
//!
//! # Mutations
//!
//! Money: add, drawing, deduct, refund, trade flat, balance flat, and the
//! reversal of an add or a drawing. Capacity: add, drawing, deduct, refund.
//! Applying the same trade number twice returns
//! [`MutationStatus::AlreadyExists`] with the original record.

pub mod cli;
pub mod core;
pub mod db;
pub mod io;
pub mod strategy;
pub mod types;

pub use core::{AccountLedger, LedgerEngine, PackageLedger, TxScope};
pub use io::{write_accounts_csv, write_packages_csv};
pub use types::{
    Account, ChangeKind, LedgerCommand, LedgerError, MutationResult, MutationStatus, Package,
    Record, RecordMeta,
};
