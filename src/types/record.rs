//! Audit record types for the Rust Ledger Engine
//!
//! Every applied mutation writes exactly one immutable record. This module
//! defines the change kinds, the balance [`Record`], and the result wrapper
//! that distinguishes a fresh application from an idempotent replay.

use crate::db::{FromRow, Row};
use crate::types::{AccountId, LedgerError};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

/// Surrogate id of a record (monotonic per table)
pub type RecordId = i64;

/// Caller-defined business category of a trade
pub type TradeType = i32;

/// Trade type used when the caller does not supply one
pub const DEFAULT_TRADE_TYPE: TradeType = 1;

/// Business meaning of a mutation
///
/// Persisted as a stable integer code in the `change_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Credit
    Add,
    /// Money-out categorized as a withdrawal
    Drawing,
    /// Money-out categorized as a charge
    Deduct,
    /// Return of a previously added amount
    Refund,
    /// Red-ink compensation of a previous record
    Reverse,
    /// Settlement adjustment of a trade
    TradeFlat,
    /// Settlement adjustment of a balance
    BalanceFlat,
}

impl ChangeKind {
    pub fn code(self) -> i64 {
        match self {
            ChangeKind::Add => 1,
            ChangeKind::Drawing => 2,
            ChangeKind::Deduct => 3,
            ChangeKind::Refund => 4,
            ChangeKind::Reverse => 5,
            ChangeKind::TradeFlat => 6,
            ChangeKind::BalanceFlat => 7,
        }
    }

    pub fn from_code(code: i64) -> Result<Self, LedgerError> {
        match code {
            1 => Ok(ChangeKind::Add),
            2 => Ok(ChangeKind::Drawing),
            3 => Ok(ChangeKind::Deduct),
            4 => Ok(ChangeKind::Refund),
            5 => Ok(ChangeKind::Reverse),
            6 => Ok(ChangeKind::TradeFlat),
            7 => Ok(ChangeKind::BalanceFlat),
            other => Err(LedgerError::unsupported_input("change_type", other)),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Add => "add",
            ChangeKind::Drawing => "drawing",
            ChangeKind::Deduct => "deduct",
            ChangeKind::Refund => "refund",
            ChangeKind::Reverse => "reverse",
            ChangeKind::TradeFlat => "trade_flat",
            ChangeKind::BalanceFlat => "balance_flat",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable audit entry for one balance mutation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub id: RecordId,
    pub account_id: AccountId,
    /// Caller-supplied idempotency key
    pub trade_no: String,
    /// Trade number of the record this one compensates (reversals)
    pub ext_no: Option<String>,
    pub trade_type: TradeType,
    pub kind: ChangeKind,
    /// Signed amount in minor units
    pub amount: i64,
    /// Account balance immediately after this mutation
    pub balance: i64,
    /// Caller-defined extension payload
    pub ext: serde_json::Value,
    pub create_time: NaiveDateTime,
}

impl FromRow for Record {
    fn from_row(row: &Row) -> Result<Self, LedgerError> {
        Ok(Record {
            id: row.get_i64("record_id")?,
            account_id: row.get_i64("account_id")?,
            trade_no: row.get_string("trade_no")?,
            ext_no: row.get_opt_string("ext_no")?,
            trade_type: trade_type_from(row.get_i64("trade_type")?)?,
            kind: ChangeKind::from_code(row.get_i64("change_type")?)?,
            amount: row.get_i64("amount")?,
            balance: row.get_i64("balance")?,
            ext: serde_json::from_str(&row.get_string("ext")?)?,
            create_time: row.get_datetime("create_time")?,
        })
    }
}

pub(crate) fn trade_type_from(value: i64) -> Result<TradeType, LedgerError> {
    TradeType::try_from(value).map_err(|_| LedgerError::unsupported_input("trade_type", value))
}

/// Whether a mutation was applied now or found already applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationStatus {
    Applied,
    AlreadyExists,
}

/// Successful outcome of a ledger call
///
/// On `AlreadyExists` the value is the prior entity recorded for the same
/// request; nothing was changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MutationResult<T> {
    pub status: MutationStatus,
    pub value: T,
}

impl<T> MutationResult<T> {
    pub fn applied(value: T) -> Self {
        MutationResult {
            status: MutationStatus::Applied,
            value,
        }
    }

    pub fn already_exists(value: T) -> Self {
        MutationResult {
            status: MutationStatus::AlreadyExists,
            value,
        }
    }

    pub fn is_replay(&self) -> bool {
        self.status == MutationStatus::AlreadyExists
    }
}

/// Descriptive fields persisted alongside a mutation
#[derive(Debug, Clone, PartialEq)]
pub struct RecordMeta {
    pub trade_type: TradeType,
    pub ext_no: Option<String>,
    pub ext: serde_json::Value,
}

impl Default for RecordMeta {
    fn default() -> Self {
        RecordMeta {
            trade_type: DEFAULT_TRADE_TYPE,
            ext_no: None,
            ext: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

impl RecordMeta {
    pub fn with_trade_type(mut self, trade_type: TradeType) -> Self {
        self.trade_type = trade_type;
        self
    }

    pub fn with_ext(mut self, ext: serde_json::Value) -> Self {
        self.ext = ext;
        self
    }

    pub fn with_ext_no(mut self, ext_no: impl Into<String>) -> Self {
        self.ext_no = Some(ext_no.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqlValue;
    use rstest::rstest;

    #[rstest]
    #[case(ChangeKind::Add)]
    #[case(ChangeKind::Drawing)]
    #[case(ChangeKind::Deduct)]
    #[case(ChangeKind::Refund)]
    #[case(ChangeKind::Reverse)]
    #[case(ChangeKind::TradeFlat)]
    #[case(ChangeKind::BalanceFlat)]
    fn test_change_kind_code_is_stable(#[case] kind: ChangeKind) {
        assert_eq!(ChangeKind::from_code(kind.code()).unwrap(), kind);
    }

    #[test]
    fn test_unknown_change_code_is_rejected() {
        let err = ChangeKind::from_code(99).unwrap_err();
        assert!(matches!(err, LedgerError::UnsupportedInput { .. }));
    }

    #[test]
    fn test_record_from_row() {
        let row = Row::new(vec![
            ("record_id".to_string(), SqlValue::Integer(11)),
            ("account_id".to_string(), SqlValue::Integer(2)),
            ("trade_no".to_string(), SqlValue::from("T1")),
            ("ext_no".to_string(), SqlValue::Null),
            ("trade_type".to_string(), SqlValue::Integer(1)),
            ("change_type".to_string(), SqlValue::Integer(1)),
            ("amount".to_string(), SqlValue::Integer(100)),
            ("balance".to_string(), SqlValue::Integer(100)),
            ("ext".to_string(), SqlValue::from(r#"{"channel":"web"}"#)),
            ("create_time".to_string(), SqlValue::from("2024-05-06 07:08:09")),
        ]);

        let record = Record::from_row(&row).unwrap();
        assert_eq!(record.id, 11);
        assert_eq!(record.kind, ChangeKind::Add);
        assert_eq!(record.amount, 100);
        assert_eq!(record.ext["channel"], "web");
        assert_eq!(record.ext_no, None);
    }

    #[test]
    fn test_mutation_result_status() {
        assert!(!MutationResult::applied(1).is_replay());
        assert!(MutationResult::already_exists(1).is_replay());
    }

    #[test]
    fn test_default_meta() {
        let meta = RecordMeta::default();
        assert_eq!(meta.trade_type, DEFAULT_TRADE_TYPE);
        assert_eq!(meta.ext.to_string(), "{}");
    }
}
