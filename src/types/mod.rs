//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account entity
//! - `record`: Change kinds, balance audit records, mutation results
//! - `package`: Capacity packages and their audit records
//! - `query`: Time windows and pagination
//! - `command`: Batch pipeline commands
//! - `error`: Error types for the ledger engine

pub mod account;
pub mod command;
pub mod error;
pub mod package;
pub mod query;
pub mod record;

pub use account::{Account, AccountId};
pub use command::{CapacityOp, LedgerCommand, MoneyOp};
pub use error::{ErrorKind, LedgerError};
pub use package::{AccountPackage, NewPackage, Package, PackageId, PackageRecord};
pub use query::{PageRequest, TimeWindow};
pub use record::{
    ChangeKind, MutationResult, MutationStatus, Record, RecordId, RecordMeta, TradeType,
    DEFAULT_TRADE_TYPE,
};
