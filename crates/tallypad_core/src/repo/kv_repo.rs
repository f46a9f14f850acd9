//! Key-value gateway contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide load/save/clear over the durable `kv_records` table.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Values are opaque text blobs; serialization lives with the caller.
//! - `save` is an upsert: the newest value for a key always wins.
//! - `clear` removes all requested keys in one statement, so a failure
//!   leaves every key untouched.

use crate::db::{self, DbError, DbResult};
use log::info;
use rusqlite::{params, params_from_iter, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic gateway error for persistence operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    Backend(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Backend(message) => write!(f, "storage backend failure: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Backend(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Logical names for the persisted records.
///
/// The storage key carries a version suffix so a future schema change can
/// migrate records by reading the old key and writing the new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKey {
    /// The full groups collection, serialized as a JSON array.
    Groups,
    /// The signed-in user, serialized as a JSON object.
    User,
    /// The grid/list layout preference, serialized as a JSON boolean.
    Layout,
}

impl RecordKey {
    /// All record keys, in load order.
    pub const ALL: [RecordKey; 3] = [RecordKey::Groups, RecordKey::User, RecordKey::Layout];

    /// The durable key this record is stored under.
    pub fn storage_key(self) -> &'static str {
        match self {
            Self::Groups => "tallypad_groups_v1",
            Self::User => "tallypad_session_v1",
            Self::Layout => "tallypad_layout_v1",
        }
    }
}

impl Display for RecordKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.storage_key())
    }
}

/// Gateway interface for persisted record access.
///
/// Implementations perform a single attempt per call and signal failure
/// through the result; retry policy belongs to the caller.
pub trait KvRepository {
    fn load(&self, key: RecordKey) -> RepoResult<Option<String>>;
    fn save(&self, key: RecordKey, value: &str) -> RepoResult<()>;
    fn clear(&self, keys: &[RecordKey]) -> RepoResult<()>;
}

/// SQLite-backed gateway over the `kv_records` table.
///
/// Owns its connection so the store holding it stays free of borrow
/// lifetimes at the FFI boundary.
pub struct SqliteKvRepository {
    conn: Connection,
}

impl SqliteKvRepository {
    /// Opens (and migrates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self {
            conn: db::open_db(path)?,
        })
    }

    /// Opens (and migrates) a throwaway in-memory database.
    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self {
            conn: db::open_db_in_memory()?,
        })
    }

    /// Wraps an already-bootstrapped connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }
}

impl KvRepository for SqliteKvRepository {
    fn load(&self, key: RecordKey) -> RepoResult<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM kv_records WHERE key = ?1;")?;
        let mut rows = stmt.query(params![key.storage_key()])?;

        if let Some(row) = rows.next()? {
            return Ok(Some(row.get(0)?));
        }
        Ok(None)
    }

    fn save(&self, key: RecordKey, value: &str) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO kv_records (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key.storage_key(), value],
        )?;

        info!(
            "event=kv_save module=repo status=ok key={} bytes={}",
            key,
            value.len()
        );
        Ok(())
    }

    fn clear(&self, keys: &[RecordKey]) -> RepoResult<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let placeholders = (1..=keys.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("DELETE FROM kv_records WHERE key IN ({placeholders});");

        self.conn.execute(
            &sql,
            params_from_iter(keys.iter().map(|key| key.storage_key())),
        )?;

        info!(
            "event=kv_clear module=repo status=ok keys={}",
            keys.iter()
                .map(|key| key.storage_key())
                .collect::<Vec<_>>()
                .join(",")
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> SqliteKvRepository {
        SqliteKvRepository::open_in_memory().unwrap()
    }

    #[test]
    fn load_missing_key_returns_none() {
        let repo = repo();
        assert_eq!(repo.load(RecordKey::Groups).unwrap(), None);
    }

    #[test]
    fn save_then_load_round_trips() {
        let repo = repo();
        repo.save(RecordKey::Layout, "true").unwrap();

        assert_eq!(
            repo.load(RecordKey::Layout).unwrap().as_deref(),
            Some("true")
        );
    }

    #[test]
    fn save_overwrites_previous_value() {
        let repo = repo();
        repo.save(RecordKey::Groups, "[]").unwrap();
        repo.save(RecordKey::Groups, "[1]").unwrap();

        assert_eq!(
            repo.load(RecordKey::Groups).unwrap().as_deref(),
            Some("[1]")
        );
    }

    #[test]
    fn clear_removes_only_requested_keys() {
        let repo = repo();
        repo.save(RecordKey::Groups, "[]").unwrap();
        repo.save(RecordKey::User, "{}").unwrap();
        repo.save(RecordKey::Layout, "false").unwrap();

        repo.clear(&[RecordKey::Groups, RecordKey::User]).unwrap();

        assert_eq!(repo.load(RecordKey::Groups).unwrap(), None);
        assert_eq!(repo.load(RecordKey::User).unwrap(), None);
        assert_eq!(
            repo.load(RecordKey::Layout).unwrap().as_deref(),
            Some("false")
        );
    }

    #[test]
    fn clear_with_no_keys_is_a_no_op() {
        let repo = repo();
        repo.save(RecordKey::Groups, "[]").unwrap();

        repo.clear(&[]).unwrap();

        assert!(repo.load(RecordKey::Groups).unwrap().is_some());
    }
}
