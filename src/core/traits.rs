//! Core traits for the guarded signed-quantity ledger
//!
//! Balances and capacity packages follow the same algorithm: an idempotency
//! check, a conditional update that keeps the quantity non-negative, and an
//! audit insert that snapshots the resulting quantity. A [`LedgerUnit`] supplies
//! the statements and error for one kind of quantity so that algorithm is
//! written once in [`GuardedLedger`](crate::core::GuardedLedger).

use crate::db::FromRow;
use crate::types::LedgerError;

/// Storage binding of one kind of guarded quantity
///
/// Statements use the named parameters listed on each constant. `:owner_id`
/// always refers to the row that holds the quantity (account or package).
pub trait LedgerUnit {
    /// Audit record written for every applied mutation
    type Record: FromRow;

    /// Short name used in log fields
    const LABEL: &'static str;

    /// Conditional update: `:owner_id`, `:delta`
    ///
    /// Must affect zero rows when the quantity would become negative or
    /// exceed `i64::MAX`.
    const UPDATE_SQL: &'static str;

    /// Count of matching records: `:owner_id`, `:trade_no`, `:change_type`, `:threshold`
    ///
    /// A record matches when the magnitude of its delta is at least `:threshold`.
    const EXISTS_SQL: &'static str;

    /// Newest matching record: same parameters as [`Self::EXISTS_SQL`]
    const FIND_SQL: &'static str;

    /// Audit insert: `:owner_id`, `:trade_no`, `:ext_no`, `:trade_type`,
    /// `:change_type`, `:delta`, `:ext`, `:now`
    ///
    /// The resulting quantity is read from the owner row inside the statement.
    const INSERT_RECORD_SQL: &'static str;

    /// Newest-first page: `:owner_id`, `:start`, `:end`, `:limit`, `:offset`
    const QUERY_SQL: &'static str;

    /// Error reported when the conditional update affected zero rows
    fn insufficient(owner_id: i64, trade_no: &str, delta: i64) -> LedgerError;
}
