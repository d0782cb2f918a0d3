//! Capacity ledger
//!
//! Usage packages owned by accounts. Mutations run the same guarded algorithm
//! as balances with [`Capacity`] as the unit.

use crate::core::balance::{require_eid, AccountLedger};
use crate::core::ledger::{now, require_positive, require_trade_no, GuardedLedger};
use crate::core::scope::TxScope;
use crate::core::traits::LedgerUnit;
use crate::db::{query_all, query_one, Executor, SqlValue};
use crate::types::{
    AccountPackage, ChangeKind, LedgerError, MutationResult, NewPackage, Package, PackageRecord,
    PageRequest, RecordMeta, TimeWindow,
};

const GET_PACKAGE_SQL: &str = "SELECT pkg_id, account_id, spkg_id, name, total, daily, expires, capacity, create_time \
     FROM package_info WHERE account_id = :account_id AND spkg_id = :spid";

const INSERT_PACKAGE_SQL: &str = "INSERT OR IGNORE INTO package_info \
     (account_id, spkg_id, name, total, daily, expires, capacity, create_time) \
     VALUES (:account_id, :spid, :name, :total, :daily, :expires, :total, :now)";

const LIST_PACKAGES_SQL: &str = "SELECT a.eid AS eid, p.pkg_id, p.account_id, p.spkg_id, p.name, p.total, p.daily, \
     p.expires, p.capacity, p.create_time \
     FROM package_info p JOIN account_info a ON a.account_id = p.account_id \
     WHERE a.ident = :ident AND a.account_type = :group \
     ORDER BY a.eid, p.spkg_id";

/// Capacity: `package_info.capacity` audited by `package_record`
#[derive(Debug, Clone, Copy)]
pub struct Capacity;

impl LedgerUnit for Capacity {
    type Record = PackageRecord;

    const LABEL: &'static str = "capacity";

    const UPDATE_SQL: &'static str = "UPDATE package_info SET capacity = capacity + :delta \
         WHERE pkg_id = :owner_id AND capacity + :delta >= 0 \
         AND :delta <= 9223372036854775807 - capacity";

    const EXISTS_SQL: &'static str = "SELECT COUNT(0) FROM package_record \
         WHERE pkg_id = :owner_id AND trade_no = :trade_no AND change_type = :change_type \
         AND abs(capacity) >= :threshold";

    const FIND_SQL: &'static str = "SELECT record_id, pkg_id, trade_no, ext_no, trade_type, change_type, capacity, balance, ext, create_time \
         FROM package_record \
         WHERE pkg_id = :owner_id AND trade_no = :trade_no AND change_type = :change_type \
         AND abs(capacity) >= :threshold \
         ORDER BY record_id DESC LIMIT 1";

    const INSERT_RECORD_SQL: &'static str = "INSERT INTO package_record \
         (pkg_id, trade_no, ext_no, trade_type, change_type, capacity, balance, ext, create_time) \
         SELECT t.pkg_id, :trade_no, :ext_no, :trade_type, :change_type, :delta, t.capacity, :ext, :now \
         FROM package_info t WHERE t.pkg_id = :owner_id";

    const QUERY_SQL: &'static str = "SELECT record_id, pkg_id, trade_no, ext_no, trade_type, change_type, capacity, balance, ext, create_time \
         FROM package_record \
         WHERE pkg_id = :owner_id AND create_time >= :start AND create_time < :end \
         ORDER BY record_id DESC LIMIT :limit OFFSET :offset";

    fn insufficient(owner_id: i64, trade_no: &str, delta: i64) -> LedgerError {
        LedgerError::insufficient_capacity(owner_id, trade_no, delta)
    }
}

/// Packages of the accounts in one `(ident, group)` scope
#[derive(Debug, Clone)]
pub struct PackageLedger {
    accounts: AccountLedger,
    ledger: GuardedLedger<Capacity>,
}

impl PackageLedger {
    pub fn new(ident: impl Into<String>, group: impl Into<String>) -> Self {
        PackageLedger {
            accounts: AccountLedger::new(ident, group),
            ledger: GuardedLedger::new(),
        }
    }

    /// Create a package for the account `eid`, or return the existing one
    ///
    /// New packages start with their full `total` capacity.
    ///
    /// # Errors
    ///
    /// * `InvalidAmount` - `total <= 0` or `daily < 0`
    /// * `AccountNotExists` - no account for `eid`
    pub fn create_package(
        &self,
        scope: TxScope<'_>,
        eid: &str,
        package: &NewPackage,
    ) -> Result<MutationResult<Package>, LedgerError> {
        require_eid(eid)?;
        require_positive(package.total)?;
        if package.daily < 0 {
            return Err(LedgerError::invalid_amount(package.daily));
        }
        if package.spid.trim().is_empty() {
            return Err(LedgerError::unsupported_input("spid", &package.spid));
        }

        scope.run(|exec| {
            let account = self.accounts.get_account(exec, eid)?;
            if let Some(existing) = self.find_package(exec, account.id, &package.spid)? {
                tracing::debug!(eid, spid = %package.spid, "Package already exists");
                return Ok(MutationResult::already_exists(existing));
            }

            let inserted = exec.execute(
                INSERT_PACKAGE_SQL,
                &[
                    (":account_id", SqlValue::from(account.id)),
                    (":spid", SqlValue::from(package.spid.as_str())),
                    (":name", SqlValue::from(package.name.as_str())),
                    (":total", SqlValue::from(package.total)),
                    (":daily", SqlValue::from(package.daily)),
                    (":expires", SqlValue::from(package.expires)),
                    (":now", SqlValue::from(now())),
                ],
            )?;
            let created = self
                .find_package(exec, account.id, &package.spid)?
                .ok_or_else(|| LedgerError::package_not_exists(eid, &package.spid))?;

            if inserted == 0 {
                return Ok(MutationResult::already_exists(created));
            }
            tracing::info!(eid, spid = %package.spid, package_id = created.id, total = package.total, "Package created");
            Ok(MutationResult::applied(created))
        })
    }

    /// # Errors
    ///
    /// Returns `AccountNotExists` or `PackageNotExists`.
    pub fn get_package(
        &self,
        executor: &dyn Executor,
        eid: &str,
        spid: &str,
    ) -> Result<Package, LedgerError> {
        let account = self.accounts.get_account(executor, eid)?;
        self.find_package(executor, account.id, spid)?
            .ok_or_else(|| LedgerError::package_not_exists(eid, spid))
    }

    /// All packages in scope ordered by `(eid, spid)`
    pub fn list_packages(&self, executor: &dyn Executor) -> Result<Vec<AccountPackage>, LedgerError> {
        query_all(
            executor,
            LIST_PACKAGES_SQL,
            &[
                (":ident", SqlValue::from(self.accounts.ident())),
                (":group", SqlValue::from(self.accounts.group())),
            ],
        )
    }

    pub fn add_capacity(
        &self,
        scope: TxScope<'_>,
        eid: &str,
        spid: &str,
        trade_no: &str,
        capacity: i64,
        meta: RecordMeta,
    ) -> Result<MutationResult<PackageRecord>, LedgerError> {
        self.guarded(scope, eid, spid, trade_no, capacity, ChangeKind::Add, meta)
    }

    pub fn drawing_capacity(
        &self,
        scope: TxScope<'_>,
        eid: &str,
        spid: &str,
        trade_no: &str,
        capacity: i64,
        meta: RecordMeta,
    ) -> Result<MutationResult<PackageRecord>, LedgerError> {
        self.guarded(scope, eid, spid, trade_no, capacity, ChangeKind::Drawing, meta)
    }

    /// Consume `capacity`; fails with `InsufficientCapacity` rather than go negative
    pub fn deduct_capacity(
        &self,
        scope: TxScope<'_>,
        eid: &str,
        spid: &str,
        trade_no: &str,
        capacity: i64,
        meta: RecordMeta,
    ) -> Result<MutationResult<PackageRecord>, LedgerError> {
        self.guarded(scope, eid, spid, trade_no, capacity, ChangeKind::Deduct, meta)
    }

    /// Return capacity previously added under the same `trade_no`
    pub fn refund_capacity(
        &self,
        scope: TxScope<'_>,
        eid: &str,
        spid: &str,
        trade_no: &str,
        capacity: i64,
        meta: RecordMeta,
    ) -> Result<MutationResult<PackageRecord>, LedgerError> {
        self.guarded(scope, eid, spid, trade_no, capacity, ChangeKind::Refund, meta)
    }

    /// Newest-first page of the package's records created in `[start, end)`
    #[allow(clippy::too_many_arguments)]
    pub fn query_records(
        &self,
        executor: &dyn Executor,
        eid: &str,
        spid: &str,
        start: &str,
        end: &str,
        page_index: usize,
        page_size: usize,
    ) -> Result<Vec<PackageRecord>, LedgerError> {
        let window = TimeWindow::from_dates(start, end)?;
        let page = PageRequest::new(page_index, page_size)?;
        let package = self.get_package(executor, eid, spid)?;
        self.ledger.query(executor, package.id, &window, page)
    }

    #[allow(clippy::too_many_arguments)]
    fn guarded(
        &self,
        scope: TxScope<'_>,
        eid: &str,
        spid: &str,
        trade_no: &str,
        capacity: i64,
        kind: ChangeKind,
        meta: RecordMeta,
    ) -> Result<MutationResult<PackageRecord>, LedgerError> {
        require_positive(capacity)?;
        require_trade_no(trade_no)?;
        scope.run(|exec| {
            let package = self.get_package(exec, eid, spid)?;
            match kind {
                ChangeKind::Refund => self.ledger.refund(exec, package.id, trade_no, capacity, &meta),
                ChangeKind::Add => {
                    self.ledger
                        .apply(exec, package.id, trade_no, kind, capacity, &meta)
                }
                _ => self
                    .ledger
                    .apply(exec, package.id, trade_no, kind, -capacity, &meta),
            }
        })
    }

    fn find_package(
        &self,
        executor: &dyn Executor,
        account_id: i64,
        spid: &str,
    ) -> Result<Option<Package>, LedgerError> {
        query_one(
            executor,
            GET_PACKAGE_SQL,
            &[
                (":account_id", SqlValue::from(account_id)),
                (":spid", SqlValue::from(spid)),
            ],
        )
    }
}
