//! CSV format handling for ledger commands and reports
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for deserialization
//! - Conversion from CSV records to [`LedgerCommand`]s
//! - Money parsing/formatting between decimal strings and minor units
//! - Account and package report serialization
//!
//! All functions are pure (no file I/O) for easy testing.

use crate::types::{
    Account, AccountPackage, CapacityOp, ChangeKind, LedgerCommand, LedgerError, MoneyOp,
    NewPackage,
};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// Fractional digits of a money amount (minor units per unit = 100)
const MONEY_SCALE: u32 = 2;

/// CSV record structure for deserialization
///
/// Columns: `op,eid,spid,trade_no,amount,ext_no,name,expires,daily`.
/// Every column after `eid` is optional; which ones are required depends on `op`.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct CsvRecord {
    pub op: String,
    pub eid: String,
    #[serde(default)]
    pub spid: Option<String>,
    #[serde(default)]
    pub trade_no: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub ext_no: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub expires: Option<String>,
    #[serde(default)]
    pub daily: Option<String>,
}

/// Convert a CsvRecord to a LedgerCommand
///
/// # Errors
///
/// Returns `InvalidCommand` for an unknown op, a missing required column, or a
/// malformed amount or date.
pub fn convert_csv_record(csv_record: CsvRecord) -> Result<LedgerCommand, LedgerError> {
    let op = csv_record.op.to_lowercase();
    let eid = csv_record.eid.trim().to_string();
    if eid.is_empty() {
        return Err(LedgerError::invalid_command(&op, "missing eid"));
    }

    let command = match op.as_str() {
        "create_account" => {
            let name = present(&csv_record.name).unwrap_or(&eid).to_string();
            LedgerCommand::CreateAccount { eid, name }
        }
        "set_credit" => LedgerCommand::SetCredit {
            credit: parse_money(&op, required(&op, "amount", &csv_record.amount)?)?,
            eid,
        },
        "add" | "drawing" | "deduct" | "refund" | "trade_flat" | "balance_flat" => {
            let money_op = match op.as_str() {
                "add" => MoneyOp::Add,
                "drawing" => MoneyOp::Drawing,
                "deduct" => MoneyOp::Deduct,
                "refund" => MoneyOp::Refund,
                "trade_flat" => MoneyOp::TradeFlat,
                _ => MoneyOp::BalanceFlat,
            };
            LedgerCommand::Money {
                op: money_op,
                trade_no: required(&op, "trade_no", &csv_record.trade_no)?.to_string(),
                amount: parse_money(&op, required(&op, "amount", &csv_record.amount)?)?,
                eid,
            }
        }
        "reverse_add" | "reverse_drawing" => LedgerCommand::Reverse {
            trade_no: required(&op, "trade_no", &csv_record.trade_no)?.to_string(),
            ext_no: required(&op, "ext_no", &csv_record.ext_no)?.to_string(),
            original: if op == "reverse_add" {
                ChangeKind::Add
            } else {
                ChangeKind::Drawing
            },
            eid,
        },
        "create_package" => {
            let spid = required(&op, "spid", &csv_record.spid)?.to_string();
            let name = present(&csv_record.name).unwrap_or(&spid).to_string();
            let daily = match present(&csv_record.daily) {
                Some(daily) => parse_capacity(&op, daily)?,
                None => 0,
            };
            LedgerCommand::CreatePackage {
                package: NewPackage {
                    total: parse_capacity(&op, required(&op, "amount", &csv_record.amount)?)?,
                    expires: parse_expires(&op, required(&op, "expires", &csv_record.expires)?)?,
                    daily,
                    name,
                    spid,
                },
                eid,
            }
        }
        "add_capacity" | "drawing_capacity" | "deduct_capacity" | "refund_capacity" => {
            let capacity_op = match op.as_str() {
                "add_capacity" => CapacityOp::Add,
                "drawing_capacity" => CapacityOp::Drawing,
                "deduct_capacity" => CapacityOp::Deduct,
                _ => CapacityOp::Refund,
            };
            LedgerCommand::Capacity {
                op: capacity_op,
                spid: required(&op, "spid", &csv_record.spid)?.to_string(),
                trade_no: required(&op, "trade_no", &csv_record.trade_no)?.to_string(),
                capacity: parse_capacity(&op, required(&op, "amount", &csv_record.amount)?)?,
                eid,
            }
        }
        _ => {
            return Err(LedgerError::invalid_command(
                &csv_record.op,
                "unknown operation",
            ))
        }
    };

    Ok(command)
}

fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn required<'a>(op: &str, column: &str, value: &'a Option<String>) -> Result<&'a str, LedgerError> {
    present(value).ok_or_else(|| LedgerError::invalid_command(op, format!("requires {}", column)))
}

/// Parse a decimal money string into minor units
///
/// At most two fractional digits are accepted; `"12.5"` is 1250.
pub fn parse_money(op: &str, value: &str) -> Result<i64, LedgerError> {
    let decimal = Decimal::from_str(value.trim())
        .map_err(|_| LedgerError::invalid_command(op, format!("invalid amount '{}'", value)))?;
    if decimal.normalize().scale() > MONEY_SCALE {
        return Err(LedgerError::invalid_command(
            op,
            format!("amount '{}' has more than {} decimal places", value, MONEY_SCALE),
        ));
    }

    decimal
        .checked_mul(Decimal::from(10_i64.pow(MONEY_SCALE)))
        .and_then(|minor| minor.to_i64())
        .ok_or_else(|| LedgerError::invalid_command(op, format!("amount '{}' out of range", value)))
}

/// Format minor units as a decimal money string with two places
pub fn format_money(minor_units: i64) -> String {
    format!("{:.2}", Decimal::new(minor_units, MONEY_SCALE))
}

fn parse_capacity(op: &str, value: &str) -> Result<i64, LedgerError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| LedgerError::invalid_command(op, format!("invalid capacity '{}'", value)))
}

/// `yyyymmdd`, taken at midnight
fn parse_expires(op: &str, value: &str) -> Result<NaiveDateTime, LedgerError> {
    NaiveDate::parse_from_str(value.trim(), "%Y%m%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| LedgerError::invalid_command(op, format!("invalid expires '{}'", value)))
}

/// Write the accounts report
///
/// Columns: `eid,name,balance,credit`, sorted by eid, amounts with two decimals.
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record(["eid", "name", "balance", "credit"])?;

    let mut sorted: Vec<&Account> = accounts.iter().collect();
    sorted.sort_by(|a, b| a.eid.cmp(&b.eid));

    for account in sorted {
        let balance = format_money(account.balance);
        let credit = format_money(account.credit);
        writer.write_record([
            account.eid.as_str(),
            account.name.as_str(),
            balance.as_str(),
            credit.as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Write the packages report
///
/// Columns: `eid,spid,name,total,daily,capacity`, sorted by (eid, spid).
pub fn write_packages_csv(
    packages: &[AccountPackage],
    output: &mut dyn Write,
) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record(["eid", "spid", "name", "total", "daily", "capacity"])?;

    let mut sorted: Vec<&AccountPackage> = packages.iter().collect();
    sorted.sort_by(|a, b| (&a.eid, &a.package.spid).cmp(&(&b.eid, &b.package.spid)));

    for entry in sorted {
        let package = &entry.package;
        writer.write_record(&[
            entry.eid.clone(),
            package.spid.clone(),
            package.name.clone(),
            package.total.to_string(),
            package.daily.to_string(),
            package.capacity.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
