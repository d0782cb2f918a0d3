//! Core business logic module
//!
//! This module contains the ledger components:
//! - `traits` - The `LedgerUnit` binding of one guarded quantity to storage
//! - `guard` - Idempotency checks over audit records
//! - `ledger` - The generic guarded update + audit insert algorithm
//! - `scope` - Explicit transaction ownership (`Joined` / `Owned`)
//! - `balance` - Accounts and money mutations
//! - `capacity` - Capacity packages and their mutations
//! - `engine` - Batch command dispatch
//! - `batch_processor` - Account-partitioned concurrent batch processing

pub mod balance;
pub mod batch_processor;
pub mod capacity;
pub mod engine;
pub mod guard;
pub mod ledger;
pub mod scope;
pub mod traits;

pub use balance::{AccountLedger, Money};
pub use batch_processor::{BatchProcessor, ProcessingResult};
pub use capacity::{Capacity, PackageLedger};
pub use engine::LedgerEngine;
pub use guard::IdempotencyGuard;
pub use ledger::GuardedLedger;
pub use scope::TxScope;
pub use traits::LedgerUnit;
