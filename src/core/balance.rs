//! Balance ledger
//!
//! Accounts of one `(ident, group)` scope and every money mutation on them.
//! Mutations take a [`TxScope`]; reads take a plain [`Executor`].

use crate::core::ledger::{now, require_positive, require_trade_no, GuardedLedger};
use crate::core::scope::TxScope;
use crate::core::traits::LedgerUnit;
use crate::db::{query_all, query_one, Executor, SqlValue};
use crate::types::{
    Account, ChangeKind, LedgerError, MutationResult, PageRequest, Record, RecordMeta, TimeWindow,
};

const ACCOUNT_COLUMNS: &str =
    "account_id, ident, account_type, eid, account_name, balance, credit, status, create_time";

const GET_ACCOUNT_SQL: &str = "SELECT account_id, ident, account_type, eid, account_name, balance, credit, status, create_time \
     FROM account_info WHERE ident = :ident AND account_type = :group AND eid = :eid";

const INSERT_ACCOUNT_SQL: &str = "INSERT OR IGNORE INTO account_info \
     (ident, account_type, eid, account_name, balance, credit, status, create_time) \
     VALUES (:ident, :group, :eid, :name, 0, 0, 0, :now)";

const SET_CREDIT_SQL: &str = "UPDATE account_info SET credit = :credit WHERE account_id = :account_id";

const FIND_REVERSAL_SQL: &str = "SELECT record_id, account_id, trade_no, ext_no, trade_type, change_type, amount, balance, ext, create_time \
     FROM account_record \
     WHERE account_id = :owner_id AND ext_no = :ext_no AND change_type = :change_type AND amount = :amount \
     ORDER BY record_id DESC LIMIT 1";

/// Money: `account_info.balance` audited by `account_record`
#[derive(Debug, Clone, Copy)]
pub struct Money;

impl LedgerUnit for Money {
    type Record = Record;

    const LABEL: &'static str = "balance";

    const UPDATE_SQL: &'static str = "UPDATE account_info SET balance = balance + :delta \
         WHERE account_id = :owner_id AND balance + :delta >= 0 \
         AND :delta <= 9223372036854775807 - balance";

    const EXISTS_SQL: &'static str = "SELECT COUNT(0) FROM account_record \
         WHERE account_id = :owner_id AND trade_no = :trade_no AND change_type = :change_type \
         AND abs(amount) >= :threshold";

    const FIND_SQL: &'static str = "SELECT record_id, account_id, trade_no, ext_no, trade_type, change_type, amount, balance, ext, create_time \
         FROM account_record \
         WHERE account_id = :owner_id AND trade_no = :trade_no AND change_type = :change_type \
         AND abs(amount) >= :threshold \
         ORDER BY record_id DESC LIMIT 1";

    const INSERT_RECORD_SQL: &'static str = "INSERT INTO account_record \
         (account_id, trade_no, ext_no, trade_type, change_type, amount, balance, ext, create_time) \
         SELECT t.account_id, :trade_no, :ext_no, :trade_type, :change_type, :delta, t.balance, :ext, :now \
         FROM account_info t WHERE t.account_id = :owner_id";

    const QUERY_SQL: &'static str = "SELECT record_id, account_id, trade_no, ext_no, trade_type, change_type, amount, balance, ext, create_time \
         FROM account_record \
         WHERE account_id = :owner_id AND create_time >= :start AND create_time < :end \
         ORDER BY record_id DESC LIMIT :limit OFFSET :offset";

    fn insufficient(owner_id: i64, trade_no: &str, delta: i64) -> LedgerError {
        LedgerError::insufficient_funds(owner_id, trade_no, delta)
    }
}

/// Accounts and balances of one `(ident, group)` scope
#[derive(Debug, Clone)]
pub struct AccountLedger {
    ident: String,
    group: String,
    ledger: GuardedLedger<Money>,
}

impl AccountLedger {
    pub fn new(ident: impl Into<String>, group: impl Into<String>) -> Self {
        AccountLedger {
            ident: ident.into(),
            group: group.into(),
            ledger: GuardedLedger::new(),
        }
    }

    pub fn ident(&self) -> &str {
        &self.ident
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    /// Create the account for `eid`, or return the existing one
    pub fn create_account(
        &self,
        scope: TxScope<'_>,
        eid: &str,
        name: &str,
    ) -> Result<MutationResult<Account>, LedgerError> {
        require_eid(eid)?;
        scope.run(|exec| {
            if let Some(existing) = self.find_account(exec, eid)? {
                tracing::debug!(ident = %self.ident, eid, "Account already exists");
                return Ok(MutationResult::already_exists(existing));
            }

            let inserted = exec.execute(
                INSERT_ACCOUNT_SQL,
                &[
                    (":ident", SqlValue::from(self.ident.as_str())),
                    (":group", SqlValue::from(self.group.as_str())),
                    (":eid", SqlValue::from(eid)),
                    (":name", SqlValue::from(name)),
                    (":now", SqlValue::from(now())),
                ],
            )?;
            let account = self.get_account(exec, eid)?;

            // Lost a race against a concurrent create
            if inserted == 0 {
                return Ok(MutationResult::already_exists(account));
            }
            tracing::info!(ident = %self.ident, eid, account_id = account.id, "Account created");
            Ok(MutationResult::applied(account))
        })
    }

    /// # Errors
    ///
    /// Returns `AccountNotExists` when the scope has no account for `eid`.
    pub fn get_account(&self, executor: &dyn Executor, eid: &str) -> Result<Account, LedgerError> {
        self.find_account(executor, eid)?
            .ok_or_else(|| LedgerError::account_not_exists(eid))
    }

    pub fn get_balance(&self, executor: &dyn Executor, eid: &str) -> Result<i64, LedgerError> {
        self.get_account(executor, eid).map(|account| account.balance)
    }

    /// Set the tracked credit limit
    ///
    /// Credit never lets the balance go negative.
    pub fn set_credit_amount(
        &self,
        scope: TxScope<'_>,
        eid: &str,
        credit: i64,
    ) -> Result<Account, LedgerError> {
        if credit < 0 {
            return Err(LedgerError::invalid_amount(credit));
        }
        scope.run(|exec| {
            let account = self.get_account(exec, eid)?;
            exec.execute(
                SET_CREDIT_SQL,
                &[
                    (":credit", SqlValue::from(credit)),
                    (":account_id", SqlValue::from(account.id)),
                ],
            )?;
            tracing::info!(eid, account_id = account.id, credit, "Credit updated");
            self.get_account(exec, eid)
        })
    }

    /// All accounts of the scope ordered by eid
    pub fn list_accounts(&self, executor: &dyn Executor) -> Result<Vec<Account>, LedgerError> {
        let sql = format!(
            "SELECT {} FROM account_info WHERE ident = :ident AND account_type = :group ORDER BY eid",
            ACCOUNT_COLUMNS
        );
        query_all(
            executor,
            &sql,
            &[
                (":ident", SqlValue::from(self.ident.as_str())),
                (":group", SqlValue::from(self.group.as_str())),
            ],
        )
    }

    /// Credit `amount` under `trade_no`
    ///
    /// # Arguments
    ///
    /// * `scope` - Transaction ownership
    /// * `eid` - External account id
    /// * `trade_no` - Idempotency key; any prior Add with it is a replay
    /// * `amount` - Positive amount in minor units
    /// * `meta` - Trade type and extension payload stored on the record
    ///
    /// # Returns
    ///
    /// `Applied` with the new record, or `AlreadyExists` with the prior one.
    ///
    /// # Errors
    ///
    /// * `InvalidAmount` - `amount <= 0`
    /// * `AccountNotExists` - no account for `eid`
    pub fn add_amount(
        &self,
        scope: TxScope<'_>,
        eid: &str,
        trade_no: &str,
        amount: i64,
        meta: RecordMeta,
    ) -> Result<MutationResult<Record>, LedgerError> {
        self.guarded(scope, eid, trade_no, amount, ChangeKind::Add, amount, meta)
    }

    /// Withdraw `amount`; fails with `InsufficientFunds` rather than go negative
    pub fn drawing_amount(
        &self,
        scope: TxScope<'_>,
        eid: &str,
        trade_no: &str,
        amount: i64,
        meta: RecordMeta,
    ) -> Result<MutationResult<Record>, LedgerError> {
        self.guarded(scope, eid, trade_no, amount, ChangeKind::Drawing, -amount, meta)
    }

    /// Charge `amount`; fails with `InsufficientFunds` rather than go negative
    pub fn deduct_amount(
        &self,
        scope: TxScope<'_>,
        eid: &str,
        trade_no: &str,
        amount: i64,
        meta: RecordMeta,
    ) -> Result<MutationResult<Record>, LedgerError> {
        self.guarded(scope, eid, trade_no, amount, ChangeKind::Deduct, -amount, meta)
    }

    /// Return `amount` previously added under the same `trade_no`
    ///
    /// A prior refund of at least `amount` is a replay. Otherwise an Add record
    /// of at least `amount` must exist, else `TradeNotExists`.
    pub fn refund_amount(
        &self,
        scope: TxScope<'_>,
        eid: &str,
        trade_no: &str,
        amount: i64,
        meta: RecordMeta,
    ) -> Result<MutationResult<Record>, LedgerError> {
        require_positive(amount)?;
        require_trade_no(trade_no)?;
        scope.run(|exec| {
            let account = self.get_account(exec, eid)?;
            self.ledger.refund(exec, account.id, trade_no, amount, &meta)
        })
    }

    /// Settlement adjustment that takes `amount` out of the balance
    pub fn trade_flat_amount(
        &self,
        scope: TxScope<'_>,
        eid: &str,
        trade_no: &str,
        amount: i64,
        meta: RecordMeta,
    ) -> Result<MutationResult<Record>, LedgerError> {
        self.guarded(scope, eid, trade_no, amount, ChangeKind::TradeFlat, -amount, meta)
    }

    /// Settlement adjustment that puts `amount` into the balance
    pub fn balance_flat_amount(
        &self,
        scope: TxScope<'_>,
        eid: &str,
        trade_no: &str,
        amount: i64,
        meta: RecordMeta,
    ) -> Result<MutationResult<Record>, LedgerError> {
        self.guarded(scope, eid, trade_no, amount, ChangeKind::BalanceFlat, amount, meta)
    }

    pub fn reverse_add_amount(
        &self,
        scope: TxScope<'_>,
        eid: &str,
        trade_no: &str,
        ext_no: &str,
        meta: RecordMeta,
    ) -> Result<MutationResult<Record>, LedgerError> {
        self.reverse_amount(scope, eid, trade_no, ext_no, ChangeKind::Add, meta)
    }

    pub fn reverse_drawing_amount(
        &self,
        scope: TxScope<'_>,
        eid: &str,
        trade_no: &str,
        ext_no: &str,
        meta: RecordMeta,
    ) -> Result<MutationResult<Record>, LedgerError> {
        self.reverse_amount(scope, eid, trade_no, ext_no, ChangeKind::Drawing, meta)
    }

    /// Red-ink reversal of the `original` record recorded under `ext_no`
    ///
    /// The reversal is recorded under its own `trade_no` with the inverse
    /// amount and `ext_no` pointing at the original trade.
    ///
    /// # Errors
    ///
    /// * `TradeNotExists` - no `original` record under `ext_no`
    /// * `InsufficientFunds` - the inverse amount would drive the balance negative
    /// * `UnsupportedInput` - `original` is itself a reversal
    pub fn reverse_amount(
        &self,
        scope: TxScope<'_>,
        eid: &str,
        trade_no: &str,
        ext_no: &str,
        original: ChangeKind,
        meta: RecordMeta,
    ) -> Result<MutationResult<Record>, LedgerError> {
        require_trade_no(trade_no)?;
        if ext_no.trim().is_empty() {
            return Err(LedgerError::unsupported_input("ext_no", ext_no));
        }
        if original == ChangeKind::Reverse {
            return Err(LedgerError::unsupported_input("original", original));
        }
        let meta = meta.with_ext_no(ext_no);

        scope.run(|exec| {
            let account = self.get_account(exec, eid)?;
            let source = self
                .ledger
                .find(exec, account.id, ext_no, original, 0)?
                .ok_or_else(|| LedgerError::trade_not_exists(account.id, ext_no, original))?;
            let delta = -source.amount;

            if let Some(prior) =
                self.ledger
                    .replay(exec, account.id, trade_no, ChangeKind::Reverse, delta)?
            {
                return Ok(prior);
            }
            if let Some(prior) = self.find_reversal_of(exec, account.id, ext_no, delta)? {
                tracing::debug!(eid, ext_no, reversal = %prior.trade_no, "Original already reversed");
                return Ok(MutationResult::already_exists(prior));
            }

            self.ledger
                .change(exec, account.id, trade_no, ChangeKind::Reverse, delta, &meta)
                .map(MutationResult::applied)
        })
    }

    /// Record of `kind` written under `trade_no`
    pub fn get_record(
        &self,
        executor: &dyn Executor,
        eid: &str,
        trade_no: &str,
        kind: ChangeKind,
    ) -> Result<Record, LedgerError> {
        let account = self.get_account(executor, eid)?;
        self.ledger
            .find(executor, account.id, trade_no, kind, 0)?
            .ok_or_else(|| LedgerError::trade_not_exists(account.id, trade_no, kind))
    }

    /// Newest-first page of the account's records created in `[start, end)`
    ///
    /// `start` and `end` are `yyyymmdd` dates.
    pub fn query_records(
        &self,
        executor: &dyn Executor,
        eid: &str,
        start: &str,
        end: &str,
        page_index: usize,
        page_size: usize,
    ) -> Result<Vec<Record>, LedgerError> {
        let window = TimeWindow::from_dates(start, end)?;
        let page = PageRequest::new(page_index, page_size)?;
        let account = self.get_account(executor, eid)?;
        self.ledger.query(executor, account.id, &window, page)
    }

    #[allow(clippy::too_many_arguments)]
    fn guarded(
        &self,
        scope: TxScope<'_>,
        eid: &str,
        trade_no: &str,
        amount: i64,
        kind: ChangeKind,
        delta: i64,
        meta: RecordMeta,
    ) -> Result<MutationResult<Record>, LedgerError> {
        require_positive(amount)?;
        require_trade_no(trade_no)?;
        scope.run(|exec| {
            let account = self.get_account(exec, eid)?;
            self.ledger
                .apply(exec, account.id, trade_no, kind, delta, &meta)
        })
    }

    fn find_account(
        &self,
        executor: &dyn Executor,
        eid: &str,
    ) -> Result<Option<Account>, LedgerError> {
        query_one(
            executor,
            GET_ACCOUNT_SQL,
            &[
                (":ident", SqlValue::from(self.ident.as_str())),
                (":group", SqlValue::from(self.group.as_str())),
                (":eid", SqlValue::from(eid)),
            ],
        )
    }

    fn find_reversal_of(
        &self,
        executor: &dyn Executor,
        account_id: i64,
        ext_no: &str,
        delta: i64,
    ) -> Result<Option<Record>, LedgerError> {
        query_one(
            executor,
            FIND_REVERSAL_SQL,
            &[
                (":owner_id", SqlValue::from(account_id)),
                (":ext_no", SqlValue::from(ext_no)),
                (":change_type", SqlValue::from(ChangeKind::Reverse.code())),
                (":amount", SqlValue::from(delta)),
            ],
        )
    }
}

pub(crate) fn require_eid(eid: &str) -> Result<(), LedgerError> {
    if eid.trim().is_empty() {
        return Err(LedgerError::unsupported_input("eid", eid));
    }
    Ok(())
}
