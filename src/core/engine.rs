//! Ledger command engine
//!
//! [`LedgerEngine`] maps each [`LedgerCommand`] onto one ledger call and runs it
//! in its own self-owned transaction. A failed command leaves no trace in the
//! database; a replayed command reports `AlreadyExists` and changes nothing.

use crate::core::balance::AccountLedger;
use crate::core::capacity::PackageLedger;
use crate::core::scope::TxScope;
use crate::db::Database;
use crate::types::{
    CapacityOp, ChangeKind, LedgerCommand, LedgerError, MoneyOp, MutationStatus, RecordMeta,
};

/// Dispatches batch commands to the balance and capacity ledgers
#[derive(Debug, Clone)]
pub struct LedgerEngine {
    accounts: AccountLedger,
    packages: PackageLedger,
}

impl LedgerEngine {
    /// Create an engine for one `(ident, group)` scope
    pub fn new(ident: impl Into<String>, group: impl Into<String>) -> Self {
        let ident = ident.into();
        let group = group.into();
        LedgerEngine {
            accounts: AccountLedger::new(ident.clone(), group.clone()),
            packages: PackageLedger::new(ident, group),
        }
    }

    pub fn accounts(&self) -> &AccountLedger {
        &self.accounts
    }

    pub fn packages(&self) -> &PackageLedger {
        &self.packages
    }

    /// Apply one command in a private transaction
    ///
    /// # Returns
    ///
    /// * `Ok(MutationStatus::Applied)` if the command changed the ledger
    /// * `Ok(MutationStatus::AlreadyExists)` if it was an idempotent replay
    ///
    /// # Errors
    ///
    /// Returns the ledger error of the call; its transaction is rolled back.
    pub fn process(
        &self,
        database: &dyn Database,
        command: &LedgerCommand,
    ) -> Result<MutationStatus, LedgerError> {
        let scope = TxScope::Owned(database);
        let meta = RecordMeta::default();

        match command {
            LedgerCommand::CreateAccount { eid, name } => self
                .accounts
                .create_account(scope, eid, name)
                .map(|result| result.status),
            LedgerCommand::SetCredit { eid, credit } => self
                .accounts
                .set_credit_amount(scope, eid, *credit)
                .map(|_| MutationStatus::Applied),
            LedgerCommand::Money {
                op,
                eid,
                trade_no,
                amount,
            } => self.process_money(scope, *op, eid, trade_no, *amount, meta),
            LedgerCommand::Reverse {
                eid,
                trade_no,
                ext_no,
                original,
            } => {
                let result = match original {
                    ChangeKind::Add => {
                        self.accounts
                            .reverse_add_amount(scope, eid, trade_no, ext_no, meta)
                    }
                    ChangeKind::Drawing => {
                        self.accounts
                            .reverse_drawing_amount(scope, eid, trade_no, ext_no, meta)
                    }
                    other => self
                        .accounts
                        .reverse_amount(scope, eid, trade_no, ext_no, *other, meta),
                };
                result.map(|result| result.status)
            }
            LedgerCommand::CreatePackage { eid, package } => self
                .packages
                .create_package(scope, eid, package)
                .map(|result| result.status),
            LedgerCommand::Capacity {
                op,
                eid,
                spid,
                trade_no,
                capacity,
            } => {
                let packages = &self.packages;
                let result = match op {
                    CapacityOp::Add => {
                        packages.add_capacity(scope, eid, spid, trade_no, *capacity, meta)
                    }
                    CapacityOp::Drawing => {
                        packages.drawing_capacity(scope, eid, spid, trade_no, *capacity, meta)
                    }
                    CapacityOp::Deduct => {
                        packages.deduct_capacity(scope, eid, spid, trade_no, *capacity, meta)
                    }
                    CapacityOp::Refund => {
                        packages.refund_capacity(scope, eid, spid, trade_no, *capacity, meta)
                    }
                };
                result.map(|result| result.status)
            }
        }
    }

    fn process_money(
        &self,
        scope: TxScope<'_>,
        op: MoneyOp,
        eid: &str,
        trade_no: &str,
        amount: i64,
        meta: RecordMeta,
    ) -> Result<MutationStatus, LedgerError> {
        let accounts = &self.accounts;
        let result = match op {
            MoneyOp::Add => accounts.add_amount(scope, eid, trade_no, amount, meta),
            MoneyOp::Drawing => accounts.drawing_amount(scope, eid, trade_no, amount, meta),
            MoneyOp::Deduct => accounts.deduct_amount(scope, eid, trade_no, amount, meta),
            MoneyOp::Refund => accounts.refund_amount(scope, eid, trade_no, amount, meta),
            MoneyOp::TradeFlat => accounts.trade_flat_amount(scope, eid, trade_no, amount, meta),
            MoneyOp::BalanceFlat => {
                accounts.balance_flat_amount(scope, eid, trade_no, amount, meta)
            }
        };
        result.map(|result| result.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_in_memory;
    use crate::types::{ErrorKind, NewPackage};
    use chrono::NaiveDate;

    fn money(op: MoneyOp, trade_no: &str, amount: i64) -> LedgerCommand {
        LedgerCommand::Money {
            op,
            eid: "alice".to_string(),
            trade_no: trade_no.to_string(),
            amount,
        }
    }

    fn create_alice() -> LedgerCommand {
        LedgerCommand::CreateAccount {
            eid: "alice".to_string(),
            name: "Alice".to_string(),
        }
    }

    #[test]
    fn test_process_money_commands() {
        let conn = open_in_memory().unwrap();
        let engine = LedgerEngine::new("test", "-");

        engine.process(&conn, &create_alice()).unwrap();
        let added = engine.process(&conn, &money(MoneyOp::Add, "T1", 1000)).unwrap();
        let replay = engine.process(&conn, &money(MoneyOp::Add, "T1", 1000)).unwrap();
        engine
            .process(&conn, &money(MoneyOp::Deduct, "T2", 250))
            .unwrap();

        assert_eq!(added, MutationStatus::Applied);
        assert_eq!(replay, MutationStatus::AlreadyExists);
        assert_eq!(engine.accounts().get_balance(&conn, "alice").unwrap(), 750);
    }

    #[test]
    fn test_failed_command_leaves_no_trace() {
        let conn = open_in_memory().unwrap();
        let engine = LedgerEngine::new("test", "-");
        engine.process(&conn, &create_alice()).unwrap();

        let err = engine
            .process(&conn, &money(MoneyOp::Drawing, "T1", 1))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
        assert_eq!(engine.accounts().get_balance(&conn, "alice").unwrap(), 0);
    }

    #[test]
    fn test_process_reverse_command() {
        let conn = open_in_memory().unwrap();
        let engine = LedgerEngine::new("test", "-");
        engine.process(&conn, &create_alice()).unwrap();
        engine.process(&conn, &money(MoneyOp::Add, "T1", 500)).unwrap();

        let status = engine
            .process(
                &conn,
                &LedgerCommand::Reverse {
                    eid: "alice".to_string(),
                    trade_no: "R1".to_string(),
                    ext_no: "T1".to_string(),
                    original: ChangeKind::Add,
                },
            )
            .unwrap();

        assert_eq!(status, MutationStatus::Applied);
        assert_eq!(engine.accounts().get_balance(&conn, "alice").unwrap(), 0);
    }

    #[test]
    fn test_process_capacity_commands() {
        let conn = open_in_memory().unwrap();
        let engine = LedgerEngine::new("test", "-");
        engine.process(&conn, &create_alice()).unwrap();
        engine
            .process(
                &conn,
                &LedgerCommand::CreatePackage {
                    eid: "alice".to_string(),
                    package: NewPackage {
                        spid: "sms".to_string(),
                        name: "SMS".to_string(),
                        total: 10,
                        daily: 0,
                        expires: NaiveDate::from_ymd_opt(2030, 1, 1)
                            .unwrap()
                            .and_hms_opt(0, 0, 0)
                            .unwrap(),
                    },
                },
            )
            .unwrap();

        let capacity = |op: CapacityOp, trade_no: &str, capacity: i64| LedgerCommand::Capacity {
            op,
            eid: "alice".to_string(),
            spid: "sms".to_string(),
            trade_no: trade_no.to_string(),
            capacity,
        };
        engine
            .process(&conn, &capacity(CapacityOp::Deduct, "U1", 4))
            .unwrap();
        let over = engine
            .process(&conn, &capacity(CapacityOp::Deduct, "U2", 7))
            .unwrap_err();

        assert_eq!(over.kind(), ErrorKind::InsufficientCapacity);
        assert_eq!(
            engine
                .packages()
                .get_package(&conn, "alice", "sms")
                .unwrap()
                .capacity,
            6
        );
    }
}
