//! `SQLite` adapter for the executor capability
//!
//! `rusqlite::Connection` implements [`Database`] and `rusqlite::Transaction`
//! implements [`Transaction`]. Transactions are opened IMMEDIATE so the write
//! lock is taken before the idempotency check and held through the guarded
//! update and the audit insert.

use super::executor::{Database, Executor, Params, Row, SqlValue, Transaction};
use crate::types::LedgerError;
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{Connection, TransactionBehavior};
use std::path::Path;
use std::time::Duration;

/// Schema SQL embedded at compile time.
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// How long a connection waits for a competing writer before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Open (or create) a ledger database file and apply the schema
pub fn open(path: impl AsRef<Path>) -> Result<Connection, LedgerError> {
    let conn = open_existing(path)?;
    initialize_schema(&conn)?;
    Ok(conn)
}

/// Open a ledger database file without touching the schema
///
/// Used by worker connections once the schema has been applied.
pub fn open_existing(path: impl AsRef<Path>) -> Result<Connection, LedgerError> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    // WAL lets readers proceed while a writer holds the lock
    let _mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(conn)
}

/// Creates an in-memory ledger database for testing.
pub fn open_in_memory() -> Result<Connection, LedgerError> {
    let conn = Connection::open_in_memory()?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    initialize_schema(&conn)?;
    Ok(conn)
}

/// Create all ledger tables and indexes if they do not exist
pub fn initialize_schema(conn: &Connection) -> Result<(), LedgerError> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Integer(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            SqlValue::Real(v) => ToSqlOutput::Owned(Value::Real(*v)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

fn from_value_ref(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(v) => SqlValue::Integer(v),
        ValueRef::Real(v) => SqlValue::Real(v),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            SqlValue::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

fn bind<'a>(params: &'a Params<'_>) -> Vec<(&'a str, &'a dyn ToSql)> {
    params
        .iter()
        .map(|(name, value)| (*name, value as &dyn ToSql))
        .collect()
}

fn execute_on(conn: &Connection, sql: &str, params: &Params<'_>) -> Result<usize, LedgerError> {
    Ok(conn.execute(sql, bind(params).as_slice())?)
}

fn query_on(conn: &Connection, sql: &str, params: &Params<'_>) -> Result<Vec<Row>, LedgerError> {
    let mut stmt = conn.prepare(sql)?;
    let names: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();

    let mut rows = stmt.query(bind(params).as_slice())?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        let mut columns = Vec::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            columns.push((name.clone(), from_value_ref(row.get_ref(idx)?)));
        }
        result.push(Row::new(columns));
    }
    Ok(result)
}

fn scalar_on(
    conn: &Connection,
    sql: &str,
    params: &Params<'_>,
) -> Result<Option<SqlValue>, LedgerError> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(bind(params).as_slice())?;
    match rows.next()? {
        Some(row) => Ok(Some(from_value_ref(row.get_ref(0)?))),
        None => Ok(None),
    }
}

impl Executor for Connection {
    fn execute(&self, sql: &str, params: &Params<'_>) -> Result<usize, LedgerError> {
        execute_on(self, sql, params)
    }

    fn scalar(&self, sql: &str, params: &Params<'_>) -> Result<Option<SqlValue>, LedgerError> {
        scalar_on(self, sql, params)
    }

    fn query(&self, sql: &str, params: &Params<'_>) -> Result<Vec<Row>, LedgerError> {
        query_on(self, sql, params)
    }
}

impl Database for Connection {
    fn begin(&self) -> Result<Box<dyn Transaction + '_>, LedgerError> {
        let tx = rusqlite::Transaction::new_unchecked(self, TransactionBehavior::Immediate)?;
        Ok(Box::new(tx))
    }
}

impl Executor for rusqlite::Transaction<'_> {
    fn execute(&self, sql: &str, params: &Params<'_>) -> Result<usize, LedgerError> {
        execute_on(self, sql, params)
    }

    fn scalar(&self, sql: &str, params: &Params<'_>) -> Result<Option<SqlValue>, LedgerError> {
        scalar_on(self, sql, params)
    }

    fn query(&self, sql: &str, params: &Params<'_>) -> Result<Vec<Row>, LedgerError> {
        query_on(self, sql, params)
    }
}

impl Transaction for rusqlite::Transaction<'_> {
    fn as_executor(&self) -> &dyn Executor {
        self
    }

    fn commit(self: Box<Self>) -> Result<(), LedgerError> {
        rusqlite::Transaction::commit(*self)?;
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<(), LedgerError> {
        rusqlite::Transaction::rollback(*self)?;
        Ok(())
    }
}
