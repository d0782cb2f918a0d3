//! Account-related types for the Rust Ledger Engine
//!
//! This module defines the Account structure: a monetary holder scoped by an
//! owning system identifier and a group tag, keyed externally by `eid`.

use crate::db::{FromRow, Row};
use crate::types::LedgerError;
use chrono::NaiveDateTime;
use serde::Serialize;

/// Surrogate account identifier
pub type AccountId = i64;

/// Monetary account state
///
/// Balances are signed integers in minor units and are never negative
/// after a committed mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    /// Surrogate id
    pub id: AccountId,

    /// Owning system identifier
    pub ident: String,

    /// Group/category tag the account belongs to
    pub group: String,

    /// External id supplied by the owning system
    pub eid: String,

    /// Display name
    pub name: String,

    /// Current balance in minor units
    pub balance: i64,

    /// Credit limit in minor units
    ///
    /// Tracked separately; it does not allow the balance to go negative.
    pub credit: i64,

    pub status: i32,

    pub create_time: NaiveDateTime,
}

impl FromRow for Account {
    fn from_row(row: &Row) -> Result<Self, LedgerError> {
        let status = row.get_i64("status")?;
        Ok(Account {
            id: row.get_i64("account_id")?,
            ident: row.get_string("ident")?,
            group: row.get_string("account_type")?,
            eid: row.get_string("eid")?,
            name: row.get_string("account_name")?,
            balance: row.get_i64("balance")?,
            credit: row.get_i64("credit")?,
            status: i32::try_from(status)
                .map_err(|_| LedgerError::unsupported_input("status", status))?,
            create_time: row.get_datetime("create_time")?,
        })
    }
}
