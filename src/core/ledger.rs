//! Generic guarded signed-quantity ledger
//!
//! [`GuardedLedger`] implements, once, the algorithm shared by balances and
//! capacity packages:
//!
//! 1. conditional update `quantity += delta` only while `quantity + delta >= 0`
//! 2. audit insert whose snapshot is read from the owner row in the same statement
//! 3. fetch of the record just written
//!
//! Both statements run on the executor handed in, so inside a transaction the
//! row lock taken by step 1 is held through step 2.

use crate::core::guard::IdempotencyGuard;
use crate::core::traits::LedgerUnit;
use crate::db::{query_all, query_one, Executor, SqlValue};
use crate::types::{ChangeKind, LedgerError, MutationResult, PageRequest, RecordMeta, TimeWindow};
use chrono::{NaiveDateTime, Utc};
use std::marker::PhantomData;

/// Mutation primitives over one [`LedgerUnit`]
#[derive(Debug)]
pub struct GuardedLedger<U> {
    guard: IdempotencyGuard<U>,
    _unit: PhantomData<U>,
}

impl<U: LedgerUnit> GuardedLedger<U> {
    pub fn new() -> Self {
        GuardedLedger {
            guard: IdempotencyGuard::new(),
            _unit: PhantomData,
        }
    }

    pub fn guard(&self) -> &IdempotencyGuard<U> {
        &self.guard
    }

    /// Apply `delta` to the owner and write its audit record
    ///
    /// # Errors
    ///
    /// Returns the unit's insufficient error when the update affected no rows.
    /// Nothing is written in that case.
    pub fn change(
        &self,
        executor: &dyn Executor,
        owner_id: i64,
        trade_no: &str,
        kind: ChangeKind,
        delta: i64,
        meta: &RecordMeta,
    ) -> Result<U::Record, LedgerError> {
        let affected = executor.execute(
            U::UPDATE_SQL,
            &[
                (":owner_id", SqlValue::from(owner_id)),
                (":delta", SqlValue::from(delta)),
            ],
        )?;
        if affected == 0 {
            tracing::warn!(
                unit = U::LABEL,
                owner_id,
                trade_no,
                kind = %kind,
                delta,
                "Guarded update rejected"
            );
            // The owner row is resolved by the caller, so a rejected credit can only overflow
            if delta > 0 {
                return Err(LedgerError::quantity_overflow(U::LABEL, owner_id, trade_no, delta));
            }
            return Err(U::insufficient(owner_id, trade_no, delta));
        }

        let inserted = executor.execute(
            U::INSERT_RECORD_SQL,
            &[
                (":owner_id", SqlValue::from(owner_id)),
                (":trade_no", SqlValue::from(trade_no)),
                (":ext_no", SqlValue::from(meta.ext_no.clone())),
                (":trade_type", SqlValue::from(meta.trade_type)),
                (":change_type", SqlValue::from(kind.code())),
                (":delta", SqlValue::from(delta)),
                (":ext", SqlValue::from(serde_json::to_string(&meta.ext)?)),
                (":now", SqlValue::from(now())),
            ],
        )?;
        if inserted != 1 {
            return Err(LedgerError::storage(format!(
                "audit insert for {} owner {} wrote {} rows",
                U::LABEL,
                owner_id,
                inserted
            )));
        }

        let record = self.find(executor, owner_id, trade_no, kind, 0)?.ok_or_else(|| {
            LedgerError::storage(format!(
                "audit record for trade '{}' missing after insert",
                trade_no
            ))
        })?;

        tracing::info!(
            unit = U::LABEL,
            owner_id,
            trade_no,
            kind = %kind,
            delta,
            "Mutation applied"
        );

        Ok(record)
    }

    /// Newest record for `(owner, trade_no, kind)` with magnitude at least `threshold`
    pub fn find(
        &self,
        executor: &dyn Executor,
        owner_id: i64,
        trade_no: &str,
        kind: ChangeKind,
        threshold: i64,
    ) -> Result<Option<U::Record>, LedgerError> {
        query_one(
            executor,
            U::FIND_SQL,
            &[
                (":owner_id", SqlValue::from(owner_id)),
                (":trade_no", SqlValue::from(trade_no)),
                (":change_type", SqlValue::from(kind.code())),
                (":threshold", SqlValue::from(threshold.abs())),
            ],
        )
    }

    /// Guard-then-change with a zero threshold
    ///
    /// Any prior record with the same trade number and kind is a replay.
    pub fn apply(
        &self,
        executor: &dyn Executor,
        owner_id: i64,
        trade_no: &str,
        kind: ChangeKind,
        delta: i64,
        meta: &RecordMeta,
    ) -> Result<MutationResult<U::Record>, LedgerError> {
        if let Some(prior) = self.replay(executor, owner_id, trade_no, kind, 0)? {
            return Ok(prior);
        }
        self.change(executor, owner_id, trade_no, kind, delta, meta)
            .map(MutationResult::applied)
    }

    /// Return of a previously added `amount` under the same trade number
    ///
    /// # Errors
    ///
    /// Returns `TradeNotExists` when no Add record of at least `amount` exists.
    pub fn refund(
        &self,
        executor: &dyn Executor,
        owner_id: i64,
        trade_no: &str,
        amount: i64,
        meta: &RecordMeta,
    ) -> Result<MutationResult<U::Record>, LedgerError> {
        if let Some(prior) = self.replay(executor, owner_id, trade_no, ChangeKind::Refund, amount)? {
            return Ok(prior);
        }
        if !self
            .guard
            .exists(executor, owner_id, trade_no, amount, ChangeKind::Add)?
        {
            tracing::warn!(unit = U::LABEL, owner_id, trade_no, amount, "Refund without matching add");
            return Err(LedgerError::trade_not_exists(owner_id, trade_no, ChangeKind::Add));
        }
        self.change(executor, owner_id, trade_no, ChangeKind::Refund, amount, meta)
            .map(MutationResult::applied)
    }

    /// Prior record as an `AlreadyExists` result when the guard hits
    pub fn replay(
        &self,
        executor: &dyn Executor,
        owner_id: i64,
        trade_no: &str,
        kind: ChangeKind,
        threshold: i64,
    ) -> Result<Option<MutationResult<U::Record>>, LedgerError> {
        if !self.guard.exists(executor, owner_id, trade_no, threshold, kind)? {
            return Ok(None);
        }
        let prior = self
            .find(executor, owner_id, trade_no, kind, threshold)?
            .ok_or_else(|| {
                LedgerError::storage(format!(
                    "guard matched trade '{}' but no record was found",
                    trade_no
                ))
            })?;
        tracing::debug!(unit = U::LABEL, owner_id, trade_no, kind = %kind, "Idempotent replay");
        Ok(Some(MutationResult::already_exists(prior)))
    }

    /// One newest-first page of the owner's records inside `window`
    pub fn query(
        &self,
        executor: &dyn Executor,
        owner_id: i64,
        window: &TimeWindow,
        page: PageRequest,
    ) -> Result<Vec<U::Record>, LedgerError> {
        query_all(
            executor,
            U::QUERY_SQL,
            &[
                (":owner_id", SqlValue::from(owner_id)),
                (":start", SqlValue::from(window.start)),
                (":end", SqlValue::from(window.end)),
                (":limit", SqlValue::from(page.limit())),
                (":offset", SqlValue::from(page.offset())),
            ],
        )
    }
}

impl<U: LedgerUnit> Default for GuardedLedger<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U> Clone for GuardedLedger<U> {
    fn clone(&self) -> Self {
        GuardedLedger {
            guard: self.guard.clone(),
            _unit: PhantomData,
        }
    }
}

/// Current UTC time, the creation time of new rows
pub(crate) fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Reject non-positive amounts before any statement runs
pub(crate) fn require_positive(amount: i64) -> Result<(), LedgerError> {
    if amount <= 0 {
        return Err(LedgerError::invalid_amount(amount));
    }
    Ok(())
}

pub(crate) fn require_trade_no(trade_no: &str) -> Result<(), LedgerError> {
    if trade_no.trim().is_empty() {
        return Err(LedgerError::unsupported_input("trade_no", trade_no));
    }
    Ok(())
}
