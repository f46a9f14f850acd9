//! SQLite connection bootstrap.
//!
//! # Responsibility
//! - Open file-backed or in-memory connections.
//! - Run schema migrations before a connection reaches callers.
//!
//! # Invariants
//! - Every returned connection is fully migrated.
//! - A connection that fails bootstrap is dropped, never returned.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Opens the database file at `path`, migrating it when needed.
///
/// Emits `db_open` events carrying mode, status, and duration.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    finish_open("file", || Connection::open(path))
}

/// Opens a migrated in-memory database.
///
/// Used by tests and by hosts that want a throwaway store.
pub fn open_db_in_memory() -> DbResult<Connection> {
    finish_open("memory", Connection::open_in_memory)
}

fn finish_open(
    mode: &str,
    open: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let outcome = open()
        .map_err(|err| ("db_open_failed", DbError::from(err)))
        .and_then(|mut conn| match prepare_connection(&mut conn) {
            Ok(()) => Ok(conn),
            Err(err) => Err(("db_bootstrap_failed", err)),
        });

    let duration_ms = started_at.elapsed().as_millis();
    match outcome {
        Ok(conn) => {
            info!("event=db_open module=db status=ok mode={mode} duration_ms={duration_ms}");
            Ok(conn)
        }
        Err((code, err)) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={duration_ms} error_code={code} error={err}"
            );
            Err(err)
        }
    }
}

fn prepare_connection(conn: &mut Connection) -> DbResult<()> {
    // A previous app instance may still hold the file briefly.
    conn.busy_timeout(Duration::from_secs(5))?;
    apply_migrations(conn)
}
