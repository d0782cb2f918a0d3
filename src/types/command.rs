//! Ledger commands accepted by the batch pipeline
//!
//! A command is one validated input row. The engine maps each command onto a
//! single ledger call executed in its own transaction.

use crate::types::{ChangeKind, NewPackage};

/// Money mutations addressed by trade number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoneyOp {
    Add,
    Drawing,
    Deduct,
    Refund,
    TradeFlat,
    BalanceFlat,
}

/// Capacity mutations addressed by trade number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityOp {
    Add,
    Drawing,
    Deduct,
    Refund,
}

/// One validated input row
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerCommand {
    CreateAccount {
        eid: String,
        name: String,
    },
    SetCredit {
        eid: String,
        credit: i64,
    },
    Money {
        op: MoneyOp,
        eid: String,
        trade_no: String,
        /// Minor units
        amount: i64,
    },
    /// Red-ink reversal of the `original` record with trade number `ext_no`
    Reverse {
        eid: String,
        trade_no: String,
        ext_no: String,
        original: ChangeKind,
    },
    CreatePackage {
        eid: String,
        package: NewPackage,
    },
    Capacity {
        op: CapacityOp,
        eid: String,
        spid: String,
        trade_no: String,
        capacity: i64,
    },
}

impl LedgerCommand {
    /// External id of the account the command touches
    ///
    /// Commands for the same eid must be applied in input order.
    pub fn eid(&self) -> &str {
        match self {
            LedgerCommand::CreateAccount { eid, .. }
            | LedgerCommand::SetCredit { eid, .. }
            | LedgerCommand::Money { eid, .. }
            | LedgerCommand::Reverse { eid, .. }
            | LedgerCommand::CreatePackage { eid, .. }
            | LedgerCommand::Capacity { eid, .. } => eid,
        }
    }
}
