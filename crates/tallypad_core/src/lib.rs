//! Core domain logic for TallyPad.
//! This crate is the single source of truth for business invariants.

pub mod clock;
pub mod db;
pub mod lifecycle;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use lifecycle::{AppState, AppStateTransition, LifecycleEvents, Subscription};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::{
    CounterItem, Group, GroupId, ItemId, ItemPatch, MoveDirection, NewItemRequest, User,
    ValidationError,
};
pub use repo::{KvRepository, RecordKey, RepoError, RepoResult, SqliteKvRepository};
pub use service::{CounterStore, SavePhase, StoreError, StoreResult};
pub use session::{
    format_hms, SessionObserver, SessionTimer, SessionTimerHandle, SharedSessionTimer,
    TimerAction, TimerError, TimerEvent, TimerPhase, TransitionRequest,
};

/// Health probe for the FFI wiring; always answers `"pong"`.
pub fn ping() -> &'static str {
    "pong"
}

/// Core crate version as baked in at compile time.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_answers_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn core_version_is_set() {
        assert!(!core_version().is_empty());
    }
}
