//! Capacity package types
//!
//! A package is a usage quota owned by an account. It is mutated exactly like a
//! balance, with [`PackageRecord`] as its audit entry.

use crate::db::{FromRow, Row};
use crate::types::record::trade_type_from;
use crate::types::{AccountId, ChangeKind, LedgerError, RecordId, TradeType};
use chrono::NaiveDateTime;
use serde::Serialize;

/// Surrogate package identifier
pub type PackageId = i64;

/// Usage quota for an external service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Package {
    pub id: PackageId,
    pub account_id: AccountId,
    /// External service package id
    pub spid: String,
    pub name: String,
    /// Capacity granted at creation
    pub total: i64,
    /// Daily usage limit
    pub daily: i64,
    pub expires: NaiveDateTime,
    /// Remaining capacity, never negative
    pub capacity: i64,
    pub create_time: NaiveDateTime,
}

impl FromRow for Package {
    fn from_row(row: &Row) -> Result<Self, LedgerError> {
        Ok(Package {
            id: row.get_i64("pkg_id")?,
            account_id: row.get_i64("account_id")?,
            spid: row.get_string("spkg_id")?,
            name: row.get_string("name")?,
            total: row.get_i64("total")?,
            daily: row.get_i64("daily")?,
            expires: row.get_datetime("expires")?,
            capacity: row.get_i64("capacity")?,
            create_time: row.get_datetime("create_time")?,
        })
    }
}

/// Attributes of a package to create
#[derive(Debug, Clone, PartialEq)]
pub struct NewPackage {
    pub spid: String,
    pub name: String,
    pub total: i64,
    pub daily: i64,
    pub expires: NaiveDateTime,
}

/// Immutable audit entry for one capacity mutation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageRecord {
    pub id: RecordId,
    pub package_id: PackageId,
    pub trade_no: String,
    pub ext_no: Option<String>,
    pub trade_type: TradeType,
    pub kind: ChangeKind,
    /// Signed capacity delta
    pub capacity: i64,
    /// Remaining capacity immediately after this mutation
    pub remaining: i64,
    pub ext: serde_json::Value,
    pub create_time: NaiveDateTime,
}

impl FromRow for PackageRecord {
    fn from_row(row: &Row) -> Result<Self, LedgerError> {
        Ok(PackageRecord {
            id: row.get_i64("record_id")?,
            package_id: row.get_i64("pkg_id")?,
            trade_no: row.get_string("trade_no")?,
            ext_no: row.get_opt_string("ext_no")?,
            trade_type: trade_type_from(row.get_i64("trade_type")?)?,
            kind: ChangeKind::from_code(row.get_i64("change_type")?)?,
            capacity: row.get_i64("capacity")?,
            remaining: row.get_i64("balance")?,
            ext: serde_json::from_str(&row.get_string("ext")?)?,
            create_time: row.get_datetime("create_time")?,
        })
    }
}

/// A package together with the external id of its owning account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountPackage {
    pub eid: String,
    pub package: Package,
}

impl FromRow for AccountPackage {
    fn from_row(row: &Row) -> Result<Self, LedgerError> {
        Ok(AccountPackage {
            eid: row.get_string("eid")?,
            package: Package::from_row(row)?,
        })
    }
}
