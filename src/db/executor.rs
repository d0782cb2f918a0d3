//! Database executor capability
//!
//! The ledger never talks to a concrete driver. Every operation receives one of
//! the traits below and issues parameterized statements through it:
//!
//! - [`Executor`] - parameterized `execute`, `scalar` and `query`
//! - [`Database`] - an executor that can open a [`Transaction`]
//! - [`Transaction`] - an executor with explicit `commit`/`rollback`
//!
//! Parameters are named (`:account_id`) and carried as [`SqlValue`], so the
//! traits stay object safe and independent of any driver's value types.

use crate::types::LedgerError;
use chrono::NaiveDateTime;

/// Storage format of every timestamp column (UTC)
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single SQL parameter or column value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Integer(i64::from(value))
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(value: NaiveDateTime) -> Self {
        SqlValue::Text(value.format(TIME_FORMAT).to_string())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

impl SqlValue {
    /// Interpret the value as an integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(v) => Some(*v),
            // 2^63 is exact as f64; integral values in [-2^63, 2^63) fit
            SqlValue::Real(v) if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < i64::MAX as f64 => {
                Some(*v as i64)
            }
            SqlValue::Real(_) => None,
            SqlValue::Text(s) => s.trim().parse().ok(),
            SqlValue::Null => None,
        }
    }
}

/// Named parameters of one statement
pub type Params<'a> = [(&'a str, SqlValue)];

/// One result row, addressable by column name
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn new(columns: Vec<(String, SqlValue)>) -> Self {
        Row { columns }
    }

    /// Raw value of a column, if the column is present
    pub fn value(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn get_i64(&self, column: &str) -> Result<i64, LedgerError> {
        self.value(column)
            .and_then(SqlValue::as_i64)
            .ok_or_else(|| column_error(column, "integer"))
    }

    pub fn get_string(&self, column: &str) -> Result<String, LedgerError> {
        match self.value(column) {
            Some(SqlValue::Text(s)) => Ok(s.clone()),
            Some(SqlValue::Integer(v)) => Ok(v.to_string()),
            _ => Err(column_error(column, "text")),
        }
    }

    /// Text column that may be NULL
    pub fn get_opt_string(&self, column: &str) -> Result<Option<String>, LedgerError> {
        match self.value(column) {
            Some(SqlValue::Null) => Ok(None),
            Some(_) => self.get_string(column).map(Some),
            None => Err(column_error(column, "text")),
        }
    }

    pub fn get_datetime(&self, column: &str) -> Result<NaiveDateTime, LedgerError> {
        let text = self.get_string(column)?;
        NaiveDateTime::parse_from_str(&text, TIME_FORMAT)
            .map_err(|_| column_error(column, "timestamp"))
    }
}

fn column_error(column: &str, expected: &str) -> LedgerError {
    LedgerError::storage(format!("column '{}' is missing or not {}", column, expected))
}

/// Types that can be materialized from a result row
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> Result<Self, LedgerError>;
}

/// Parameterized statement execution
///
/// Implemented by plain connections (statements autocommit) and by open
/// transactions (statements join the transaction).
pub trait Executor {
    /// Execute a statement and return the number of affected rows
    fn execute(&self, sql: &str, params: &Params<'_>) -> Result<usize, LedgerError>;

    /// First column of the first row, `None` when the query returns no rows
    fn scalar(&self, sql: &str, params: &Params<'_>) -> Result<Option<SqlValue>, LedgerError>;

    /// All rows returned by the query
    fn query(&self, sql: &str, params: &Params<'_>) -> Result<Vec<Row>, LedgerError>;
}

/// An open transaction
pub trait Transaction: Executor {
    fn as_executor(&self) -> &dyn Executor;

    fn commit(self: Box<Self>) -> Result<(), LedgerError>;

    fn rollback(self: Box<Self>) -> Result<(), LedgerError>;
}

/// An executor that can open transactions
pub trait Database: Executor {
    fn begin(&self) -> Result<Box<dyn Transaction + '_>, LedgerError>;
}

/// Convenience: first row of a query, materialized
pub fn query_one<T: FromRow>(
    executor: &dyn Executor,
    sql: &str,
    params: &Params<'_>,
) -> Result<Option<T>, LedgerError> {
    executor
        .query(sql, params)?
        .first()
        .map(T::from_row)
        .transpose()
}

/// Convenience: all rows of a query, materialized
pub fn query_all<T: FromRow>(
    executor: &dyn Executor,
    sql: &str,
    params: &Params<'_>,
) -> Result<Vec<T>, LedgerError> {
    executor.query(sql, params)?.iter().map(T::from_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::rstest;

    fn sample_row() -> Row {
        Row::new(vec![
            ("id".to_string(), SqlValue::Integer(7)),
            ("name".to_string(), SqlValue::Text("alice".to_string())),
            ("ext_no".to_string(), SqlValue::Null),
            (
                "create_time".to_string(),
                SqlValue::Text("2024-03-01 12:30:00".to_string()),
            ),
        ])
    }

    #[test]
    fn test_row_typed_accessors() {
        let row = sample_row();
        assert_eq!(row.get_i64("id").unwrap(), 7);
        assert_eq!(row.get_string("name").unwrap(), "alice");
        assert_eq!(row.get_opt_string("ext_no").unwrap(), None);
        assert_eq!(
            row.get_datetime("create_time").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(12, 30, 0)
                .unwrap()
        );
    }

    #[rstest]
    #[case::missing_column("balance")]
    #[case::text_not_integer("name")]
    fn test_row_integer_errors(#[case] column: &str) {
        let err = sample_row().get_i64(column).unwrap_err();
        assert!(matches!(err, LedgerError::Storage { .. }));
    }

    #[rstest]
    #[case(SqlValue::Integer(5), Some(5))]
    #[case(SqlValue::Text(" 12 ".to_string()), Some(12))]
    #[case(SqlValue::Null, None)]
    #[case::integral_real(SqlValue::Real(42.0), Some(42))]
    #[case::fractional_real(SqlValue::Real(1.5), None)]
    #[case::real_beyond_i64(SqlValue::Real(9.223372036854775807e18), None)]
    #[case::real_below_i64(SqlValue::Real(-1e19), None)]
    fn test_sql_value_as_i64(#[case] value: SqlValue, #[case] expected: Option<i64>) {
        assert_eq!(value.as_i64(), expected);
    }

    #[test]
    fn test_optional_value_conversion() {
        assert_eq!(SqlValue::from(None::<String>), SqlValue::Null);
        assert_eq!(
            SqlValue::from(Some("T1")),
            SqlValue::Text("T1".to_string())
        );
    }
}
