//! Idempotency guard
//!
//! Answers one question before any mutation: has this owner already recorded
//! this trade number with this change kind, for at least this magnitude?
//!
//! - A threshold of zero matches any prior record. Add, Deduct, Drawing and the
//!   flat adjustments use it, so any replay of a trade number is a duplicate.
//! - A threshold equal to the requested amount is used for refunds. A prior
//!   partial refund (smaller magnitude) does not count as "already done".

use crate::core::traits::LedgerUnit;
use crate::db::{Executor, SqlValue};
use crate::types::{ChangeKind, LedgerError};
use std::marker::PhantomData;

/// Existence check over the audit records of one [`LedgerUnit`]
#[derive(Debug)]
pub struct IdempotencyGuard<U> {
    _unit: PhantomData<U>,
}

impl<U: LedgerUnit> IdempotencyGuard<U> {
    pub fn new() -> Self {
        IdempotencyGuard { _unit: PhantomData }
    }

    /// Whether a matching record exists
    ///
    /// # Arguments
    ///
    /// * `owner_id` - Account or package id
    /// * `trade_no` - Idempotency key supplied by the caller
    /// * `threshold` - Minimum magnitude of the stored delta; 0 matches any
    /// * `kind` - Change kind of the record
    pub fn exists(
        &self,
        executor: &dyn Executor,
        owner_id: i64,
        trade_no: &str,
        threshold: i64,
        kind: ChangeKind,
    ) -> Result<bool, LedgerError> {
        let count = executor
            .scalar(
                U::EXISTS_SQL,
                &[
                    (":owner_id", SqlValue::from(owner_id)),
                    (":trade_no", SqlValue::from(trade_no)),
                    (":change_type", SqlValue::from(kind.code())),
                    (":threshold", SqlValue::from(threshold.abs())),
                ],
            )?
            .and_then(|value| value.as_i64())
            .unwrap_or(0);

        tracing::debug!(
            unit = U::LABEL,
            owner_id,
            trade_no,
            kind = %kind,
            threshold,
            hit = count > 0,
            "Idempotency check"
        );

        Ok(count > 0)
    }
}

impl<U: LedgerUnit> Default for IdempotencyGuard<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U> Clone for IdempotencyGuard<U> {
    fn clone(&self) -> Self {
        IdempotencyGuard { _unit: PhantomData }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::balance::{AccountLedger, Money};
    use crate::core::scope::TxScope;
    use crate::db::sqlite::open_in_memory;
    use crate::types::RecordMeta;
    use rstest::rstest;

    #[rstest]
    #[case::any_amount(0, ChangeKind::Add, true)]
    #[case::below_stored(30, ChangeKind::Add, true)]
    #[case::equal_to_stored(50, ChangeKind::Add, true)]
    #[case::above_stored(51, ChangeKind::Add, false)]
    #[case::negative_threshold_uses_magnitude(-50, ChangeKind::Add, true)]
    #[case::other_kind(0, ChangeKind::Refund, false)]
    fn test_exists_threshold(
        #[case] threshold: i64,
        #[case] kind: ChangeKind,
        #[case] expected: bool,
    ) {
        let conn = open_in_memory().unwrap();
        let accounts = AccountLedger::new("test", "-");
        accounts
            .create_account(TxScope::Owned(&conn), "alice", "Alice")
            .unwrap();
        let record = accounts
            .add_amount(TxScope::Owned(&conn), "alice", "T1", 50, RecordMeta::default())
            .unwrap()
            .value;

        let guard = IdempotencyGuard::<Money>::new();

        assert_eq!(
            guard
                .exists(&conn, record.account_id, "T1", threshold, kind)
                .unwrap(),
            expected
        );
        assert!(!guard
            .exists(&conn, record.account_id, "T2", 0, ChangeKind::Add)
            .unwrap());
    }
}
