//! Domain orchestration services.
//!
//! # Responsibility
//! - Own the in-memory state and mediate every persisted read/write.
//! - Drive the debounced, change-detected, lifecycle-aware save policy.
//!
//! # Invariants
//! - The store is the single owner of the mutable groups collection.
//! - Group writes go through the save scheduler; user and layout writes
//!   are immediate.
//!
//! # See also
//! - crate::repo for the gateway contract the store writes through.

pub mod counter_store;
pub mod save_scheduler;

pub use counter_store::{CounterStore, StoreError, StoreResult};
pub use save_scheduler::{SavePhase, SaveScheduler, SaveToken, ScheduleOutcome, DEFAULT_DEBOUNCE_MS};
