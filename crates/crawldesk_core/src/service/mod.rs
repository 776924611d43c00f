//! Core use-case services.
//!
//! # Responsibility
//! - Own the unit of work: open a transaction, run repository calls, commit
//!   or roll back.
//! - Turn repository results into response envelopes for outer callers.
//!
//! # Invariants
//! - A failed call never commits; dropping the transaction rolls it back.

pub mod article_service;
pub mod envelope;

use crate::error::RepoResult;
use crate::repo::exec::{execute, DEFAULT_PRESERVE};
use rusqlite::{Connection, Transaction};

/// Runs `action` in one transaction, committing only on success.
pub fn in_transaction<R>(
    conn: &mut Connection,
    action: impl FnOnce(&Transaction<'_>) -> RepoResult<R>,
) -> RepoResult<R> {
    let tx = execute(
        "transaction",
        "failed to begin transaction",
        DEFAULT_PRESERVE,
        move || Ok(conn.transaction()?),
    )?;
    let result = action(&tx)?;
    execute(
        "transaction",
        "failed to commit transaction",
        DEFAULT_PRESERVE,
        move || Ok(tx.commit()?),
    )?;
    Ok(result)
}
