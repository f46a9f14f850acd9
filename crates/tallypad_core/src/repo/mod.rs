//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the key-value gateway contract used by the domain store.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - The gateway treats values as opaque serialized blobs; it never parses
//!   or validates domain payloads.
//! - Multi-key clears are atomic: either every key is removed or none is.

pub mod kv_repo;

pub use kv_repo::{KvRepository, RecordKey, RepoError, RepoResult, SqliteKvRepository};
