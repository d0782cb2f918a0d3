//! Transaction ownership at the call boundary

use crate::db::{Database, Executor};
use crate::types::LedgerError;

/// Who owns the transaction a ledger operation runs in
#[derive(Clone, Copy)]
pub enum TxScope<'a> {
    /// Run inside the caller's open transaction. The operation never commits
    /// or rolls back; the caller decides the outcome of the whole unit of work.
    Joined(&'a dyn Executor),
    /// Begin a private transaction, commit on `Ok`, roll back on `Err`.
    Owned(&'a dyn Database),
}

impl<'a> TxScope<'a> {
    /// Run `work` according to the scope
    ///
    /// # Errors
    ///
    /// Returns the error from `work` (after rollback in `Owned` mode), or a
    /// storage error from `begin`/`commit`.
    pub fn run<T>(
        self,
        work: impl FnOnce(&dyn Executor) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        match self {
            TxScope::Joined(executor) => work(executor),
            TxScope::Owned(database) => {
                let tx = database.begin()?;
                match work(tx.as_executor()) {
                    Ok(value) => {
                        tx.commit()?;
                        Ok(value)
                    }
                    Err(err) => {
                        if let Err(rollback_err) = tx.rollback() {
                            tracing::warn!(error = %rollback_err, cause = %err, "Rollback failed");
                        }
                        Err(err)
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for TxScope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxScope::Joined(_) => f.write_str("TxScope::Joined"),
            TxScope::Owned(_) => f.write_str("TxScope::Owned"),
        }
    }
}
