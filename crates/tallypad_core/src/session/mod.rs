//! Work session timing.
//!
//! # Responsibility
//! - Track one running session with pause/resume and wall-clock elapsed
//!   time.
//! - Expose the two-phase start/stop protocol hosts use to interpose a
//!   confirmation prompt.
//! - Hand parents a narrow capability handle for forced stops.
//!
//! # Invariants
//! - Elapsed time derives from the clock, never from counted ticks.
//! - Reported durations are whole seconds and never negative.
//!
//! # See also
//! - crate::clock for the injected time source.

pub mod handle;
pub mod timer;

pub use handle::{SessionTimerHandle, SharedSessionTimer};
pub use timer::{
    format_hms, SessionObserver, SessionTimer, TimerAction, TimerError, TimerEvent, TimerPhase,
    TransitionRequest,
};
