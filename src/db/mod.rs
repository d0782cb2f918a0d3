//! Database module
//!
//! - `executor` - the executor/transaction capability the ledger is written against
//! - `sqlite` - the `rusqlite` adapter and schema bootstrap

pub mod executor;
pub mod sqlite;

pub use executor::{
    query_all, query_one, Database, Executor, FromRow, Params, Row, SqlValue, Transaction,
    TIME_FORMAT,
};
