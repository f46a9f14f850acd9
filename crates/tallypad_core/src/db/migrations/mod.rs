//! Ordered schema migrations for the records database.
//!
//! # Responsibility
//! - Describe every schema step this build knows, oldest first.
//! - Bring an opened database up to the newest step in one transaction.
//!
//! # Invariants
//! - `PRAGMA user_version` always matches the last applied step.
//! - A database from a newer build is rejected, never modified.

use crate::db::{DbError, DbResult};
use rusqlite::Connection;

struct Step {
    version: u32,
    sql: &'static str,
}

const STEPS: &[Step] = &[Step {
    version: 1,
    sql: include_str!("0001_init.sql"),
}];

/// Newest schema version shipped with this build.
pub fn latest_version() -> u32 {
    STEPS.last().map_or(0, |step| step.version)
}

/// Brings `conn` to the newest schema version.
///
/// # Errors
/// Returns [`DbError::SchemaTooNew`] when the database reports a version
/// this build does not know.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let found = current_user_version(conn)?;
    let supported = latest_version();

    if found > supported {
        return Err(DbError::SchemaTooNew { found, supported });
    }

    let pending: Vec<&Step> = STEPS.iter().filter(|step| step.version > found).collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in pending {
        tx.execute_batch(step.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", step.version))?;
    }
    tx.commit()?;
    Ok(())
}

fn current_user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}
