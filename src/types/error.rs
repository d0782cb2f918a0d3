//! Error types for the Rust Ledger Engine
//!
//! This module defines all error types that can occur while mutating or querying
//! the ledger, plus the I/O errors of the batch command pipeline.
//!
//! # Error Categories
//!
//! - **Lookup Errors**: Account, package, or referenced trade does not exist
//! - **Validation Errors**: Non-positive amounts, malformed query windows
//! - **Guard Errors**: A guarded update affected zero rows (insufficient funds/capacity)
//! - **Storage Errors**: Anything the database executor reports, propagated unmodified
//! - **Pipeline Errors**: File I/O, CSV parsing, unknown commands
//!
//! Idempotent replays are deliberately absent: they are reported through
//! [`MutationStatus::AlreadyExists`](crate::types::MutationStatus) on a successful result.

use crate::types::{AccountId, ChangeKind, PackageId};
use thiserror::Error;

/// Main error type for the ledger engine
///
/// Each variant carries the structured context needed to diagnose the failure
/// (account id, trade number, requested amount) instead of a formatted code.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// No account exists for the external id within the ledger scope
    #[error("Account '{eid}' does not exist")]
    AccountNotExists {
        /// External account id
        eid: String,
    },

    /// No package exists for the account and external service id
    #[error("Package '{spid}' of account '{eid}' does not exist")]
    PackageNotExists {
        /// External account id
        eid: String,
        /// External service package id
        spid: String,
    },

    /// A referenced trade (for refund or reversal) has no matching record
    #[error("Trade '{trade_no}' ({kind}) not found for owner {owner_id}")]
    TradeNotExists {
        /// Account or package id the trade was looked up under
        owner_id: i64,
        /// Trade number that was not found
        trade_no: String,
        /// Change kind that was expected
        kind: ChangeKind,
    },

    /// Amount must be strictly positive (or non-negative where documented)
    #[error("Invalid amount {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: i64,
    },

    /// Guarded balance update affected zero rows
    #[error("Insufficient funds on account {account_id} for trade '{trade_no}': requested {requested}")]
    InsufficientFunds {
        /// Account id
        account_id: AccountId,
        /// Trade number of the rejected mutation
        trade_no: String,
        /// Signed amount that could not be applied
        requested: i64,
    },

    /// Guarded capacity update affected zero rows
    #[error("Insufficient capacity on package {package_id} for trade '{trade_no}': requested {requested}")]
    InsufficientCapacity {
        /// Package id
        package_id: PackageId,
        /// Trade number of the rejected mutation
        trade_no: String,
        /// Signed capacity delta that could not be applied
        requested: i64,
    },

    /// Guarded update rejected because the quantity would exceed `i64::MAX`
    #[error("{unit} overflow on owner {owner_id} for trade '{trade_no}': requested {requested}")]
    QuantityOverflow {
        /// Quantity that would overflow (`balance` or `capacity`)
        unit: String,
        /// Account or package id
        owner_id: i64,
        /// Trade number of the rejected mutation
        trade_no: String,
        /// Signed amount that could not be applied
        requested: i64,
    },

    /// Caller supplied a value the ledger cannot interpret
    #[error("Unsupported input for {field}: '{value}'")]
    UnsupportedInput {
        /// Name of the offending field
        field: String,
        /// The rejected value
        value: String,
    },

    /// Failure reported by the database executor
    #[error("Storage failure: {message}")]
    Storage {
        /// Description reported by the executor
        message: String,
    },

    /// File not found at the specified path
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV parsing error occurred
    ///
    /// This is a recoverable error - the malformed record is skipped
    /// and processing continues with the next record.
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },

    /// A command row could not be turned into a ledger command
    #[error("Invalid command '{op}': {reason}")]
    InvalidCommand {
        /// Operation name from the input
        op: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Coarse classification of [`LedgerError`] variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotExists,
    InvalidAmount,
    InsufficientFunds,
    InsufficientCapacity,
    Overflow,
    UnsupportedInput,
    StorageFailure,
    /// Batch pipeline input (files, CSV rows, commands)
    Input,
}

impl LedgerError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::AccountNotExists { .. }
            | LedgerError::PackageNotExists { .. }
            | LedgerError::TradeNotExists { .. } => ErrorKind::NotExists,
            LedgerError::InvalidAmount { .. } => ErrorKind::InvalidAmount,
            LedgerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            LedgerError::InsufficientCapacity { .. } => ErrorKind::InsufficientCapacity,
            LedgerError::QuantityOverflow { .. } => ErrorKind::Overflow,
            LedgerError::UnsupportedInput { .. } => ErrorKind::UnsupportedInput,
            LedgerError::Storage { .. } => ErrorKind::StorageFailure,
            LedgerError::FileNotFound { .. }
            | LedgerError::IoError { .. }
            | LedgerError::ParseError { .. }
            | LedgerError::InvalidCommand { .. } => ErrorKind::Input,
        }
    }

    /// Create an AccountNotExists error
    pub fn account_not_exists(eid: &str) -> Self {
        LedgerError::AccountNotExists {
            eid: eid.to_string(),
        }
    }

    /// Create a PackageNotExists error
    pub fn package_not_exists(eid: &str, spid: &str) -> Self {
        LedgerError::PackageNotExists {
            eid: eid.to_string(),
            spid: spid.to_string(),
        }
    }

    /// Create a TradeNotExists error
    pub fn trade_not_exists(owner_id: i64, trade_no: &str, kind: ChangeKind) -> Self {
        LedgerError::TradeNotExists {
            owner_id,
            trade_no: trade_no.to_string(),
            kind,
        }
    }

    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: i64) -> Self {
        LedgerError::InvalidAmount { amount }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(account_id: AccountId, trade_no: &str, requested: i64) -> Self {
        LedgerError::InsufficientFunds {
            account_id,
            trade_no: trade_no.to_string(),
            requested,
        }
    }

    /// Create an InsufficientCapacity error
    pub fn insufficient_capacity(package_id: PackageId, trade_no: &str, requested: i64) -> Self {
        LedgerError::InsufficientCapacity {
            package_id,
            trade_no: trade_no.to_string(),
            requested,
        }
    }

    /// Create a QuantityOverflow error
    pub fn quantity_overflow(unit: &str, owner_id: i64, trade_no: &str, requested: i64) -> Self {
        LedgerError::QuantityOverflow {
            unit: unit.to_string(),
            owner_id,
            trade_no: trade_no.to_string(),
            requested,
        }
    }

    /// Create an UnsupportedInput error
    pub fn unsupported_input(field: &str, value: impl ToString) -> Self {
        LedgerError::UnsupportedInput {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    /// Create a Storage error
    pub fn storage(message: impl ToString) -> Self {
        LedgerError::Storage {
            message: message.to_string(),
        }
    }

    /// Create an InvalidCommand error
    pub fn invalid_command(op: &str, reason: impl ToString) -> Self {
        LedgerError::InvalidCommand {
            op: op.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(error: rusqlite::Error) -> Self {
        LedgerError::Storage {
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(error: serde_json::Error) -> Self {
        LedgerError::UnsupportedInput {
            field: "ext".to_string(),
            value: error.to_string(),
        }
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        LedgerError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

impl From<csv_async::Error> for LedgerError {
    fn from(error: csv_async::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        LedgerError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}
