//! Session timer state machine.
//!
//! # Responsibility
//! - Implement the `STOPPED`/`RUNNING`/`PAUSED` machine with wall-clock
//!   elapsed computation.
//! - Run the request/commit protocol for user-confirmed start and stop.
//! - Notify an optional observer when sessions begin and end.
//!
//! # Invariants
//! - `elapsed = (now - start - completed pauses - current pause) / 1000`,
//!   clamped at zero; a periodic display refresh only re-reads this, it is
//!   never the source of truth.
//! - Stopping evaluates the formula once and resets every timing field.
//! - A [`TransitionRequest`] is single-use; replacing or forcing a stop
//!   stales any outstanding request.

use crate::clock::Clock;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Timer lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    /// No session in progress.
    Stopped,
    /// Session in progress and accruing time.
    Running,
    /// Session in progress but paused; paused time is excluded.
    Paused,
}

/// The two user-confirmed transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    Start,
    Stop,
}

/// Outcome of a committed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// A new session began.
    Started,
    /// The session ended with its authoritative duration.
    Stopped { duration_seconds: u64 },
}

/// Errors from timer transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// Start requested while a session is already in progress.
    AlreadyRunning,
    /// Stop/pause requested with no session in progress.
    NotRunning,
    /// Pause requested while already paused.
    AlreadyPaused,
    /// Resume requested while not paused.
    NotPaused,
    /// The committed or cancelled request was replaced or invalidated.
    StaleRequest,
}

impl Display for TimerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyRunning => write!(f, "a session is already running"),
            Self::NotRunning => write!(f, "no session is running"),
            Self::AlreadyPaused => write!(f, "the session is already paused"),
            Self::NotPaused => write!(f, "the session is not paused"),
            Self::StaleRequest => write!(f, "the transition request is no longer valid"),
        }
    }
}

impl Error for TimerError {}

/// Single-use handle for a requested start or stop.
///
/// The host obtains one via [`SessionTimer::request`], shows its
/// confirmation prompt, then either commits or cancels it. It cannot be
/// cloned; whoever holds it decides the transition.
#[derive(Debug)]
pub struct TransitionRequest {
    action: TimerAction,
    token: u64,
}

impl TransitionRequest {
    /// The transition this request would perform.
    pub fn action(&self) -> TimerAction {
        self.action
    }
}

/// Callbacks fired when a session starts or ends.
///
/// Methods default to no-ops so implementors override only what they
/// observe.
pub trait SessionObserver {
    fn on_session_started(&mut self) {}
    fn on_session_stopped(&mut self, _duration_seconds: u64) {}
}

/// Wall-clock session timer with two-phase start/stop.
pub struct SessionTimer<C: Clock> {
    clock: C,
    phase: TimerPhase,
    started_at_ms: Option<i64>,
    accumulated_pause_ms: i64,
    pause_started_at_ms: Option<i64>,
    pending_request: Option<u64>,
    next_token: u64,
    observer: Option<Box<dyn SessionObserver + Send>>,
}

impl<C: Clock> SessionTimer<C> {
    /// Creates a stopped timer on the given clock.
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            phase: TimerPhase::Stopped,
            started_at_ms: None,
            accumulated_pause_ms: 0,
            pause_started_at_ms: None,
            pending_request: None,
            next_token: 0,
            observer: None,
        }
    }

    /// Registers the observer notified on session start and stop.
    pub fn set_observer(&mut self, observer: impl SessionObserver + Send + 'static) {
        self.observer = Some(Box::new(observer));
    }

    /// Current machine phase.
    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    /// Whether a session is in progress (running or paused).
    pub fn is_active(&self) -> bool {
        self.phase != TimerPhase::Stopped
    }

    /// Elapsed session time in whole seconds, for display refresh.
    ///
    /// Recomputed from the clock on every call; paused time is excluded
    /// and negative clock skew clamps to zero.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed_ms = self.raw_elapsed_ms(self.clock.now_millis()).max(0);
        u64::try_from(elapsed_ms / 1000).unwrap_or(0)
    }

    /// Opens a two-phase transition.
    ///
    /// # Contract
    /// - Validates the action against the current phase but changes no
    ///   timing state.
    /// - Replaces any outstanding request; the replaced one goes stale.
    ///
    /// # Errors
    /// - [`TimerError::AlreadyRunning`] for `Start` during a session.
    /// - [`TimerError::NotRunning`] for `Stop` with no session.
    pub fn request(&mut self, action: TimerAction) -> Result<TransitionRequest, TimerError> {
        match action {
            TimerAction::Start if self.is_active() => return Err(TimerError::AlreadyRunning),
            TimerAction::Stop if !self.is_active() => return Err(TimerError::NotRunning),
            _ => {}
        }

        self.next_token += 1;
        self.pending_request = Some(self.next_token);
        Ok(TransitionRequest {
            action,
            token: self.next_token,
        })
    }

    /// Abandons a request without performing its transition.
    ///
    /// # Errors
    /// - [`TimerError::StaleRequest`] when the request was already
    ///   replaced or invalidated.
    pub fn cancel_request(&mut self, request: TransitionRequest) -> Result<(), TimerError> {
        self.take_pending(request.token)?;
        Ok(())
    }

    /// Performs a previously requested transition.
    ///
    /// # Contract
    /// - Re-validates against the current phase; a forced stop between
    ///   request and commit surfaces as [`TimerError::StaleRequest`].
    /// - `Start` zeroes all timing state before running.
    /// - `Stop` evaluates the elapsed formula once, reports it through the
    ///   observer and the returned event, then resets to stopped defaults.
    ///
    /// # Errors
    /// - [`TimerError::StaleRequest`], [`TimerError::AlreadyRunning`] or
    ///   [`TimerError::NotRunning`].
    pub fn commit(&mut self, request: TransitionRequest) -> Result<TimerEvent, TimerError> {
        self.take_pending(request.token)?;

        match request.action {
            TimerAction::Start => {
                if self.is_active() {
                    return Err(TimerError::AlreadyRunning);
                }
                self.started_at_ms = Some(self.clock.now_millis());
                self.accumulated_pause_ms = 0;
                self.pause_started_at_ms = None;
                self.phase = TimerPhase::Running;

                info!("event=session_start module=session status=ok");
                if let Some(observer) = self.observer.as_mut() {
                    observer.on_session_started();
                }
                Ok(TimerEvent::Started)
            }
            TimerAction::Stop => {
                if !self.is_active() {
                    return Err(TimerError::NotRunning);
                }
                let duration_seconds = self.finish_session();
                Ok(TimerEvent::Stopped { duration_seconds })
            }
        }
    }

    /// Pauses a running session.
    ///
    /// # Errors
    /// - [`TimerError::NotRunning`] with no session in progress.
    /// - [`TimerError::AlreadyPaused`] when already paused.
    pub fn pause(&mut self) -> Result<(), TimerError> {
        match self.phase {
            TimerPhase::Stopped => Err(TimerError::NotRunning),
            TimerPhase::Paused => Err(TimerError::AlreadyPaused),
            TimerPhase::Running => {
                self.pause_started_at_ms = Some(self.clock.now_millis());
                self.phase = TimerPhase::Paused;
                Ok(())
            }
        }
    }

    /// Resumes a paused session, folding the completed pause interval
    /// into the accumulated total.
    ///
    /// # Errors
    /// - [`TimerError::NotRunning`] with no session in progress.
    /// - [`TimerError::NotPaused`] when not paused.
    pub fn resume(&mut self) -> Result<(), TimerError> {
        match self.phase {
            TimerPhase::Stopped => Err(TimerError::NotRunning),
            TimerPhase::Running => Err(TimerError::NotPaused),
            TimerPhase::Paused => {
                if let Some(pause_started_at_ms) = self.pause_started_at_ms.take() {
                    let pause_ms = self
                        .clock
                        .now_millis()
                        .saturating_sub(pause_started_at_ms)
                        .max(0);
                    self.accumulated_pause_ms = self.accumulated_pause_ms.saturating_add(pause_ms);
                }
                self.phase = TimerPhase::Running;
                Ok(())
            }
        }
    }

    /// Stops immediately without the two-phase confirmation.
    ///
    /// This is the programmatic path for hosts tearing the session down,
    /// e.g. on navigating away. Reports the authoritative duration to the
    /// observer and stales any outstanding request. Returns `None` when no
    /// session was in progress.
    pub fn force_stop(&mut self) -> Option<u64> {
        if !self.is_active() {
            return None;
        }
        self.pending_request = None;
        Some(self.finish_session())
    }

    fn finish_session(&mut self) -> u64 {
        let duration_seconds = self.elapsed_seconds();

        self.phase = TimerPhase::Stopped;
        self.started_at_ms = None;
        self.accumulated_pause_ms = 0;
        self.pause_started_at_ms = None;

        info!("event=session_stop module=session status=ok duration_s={duration_seconds}");
        if let Some(observer) = self.observer.as_mut() {
            observer.on_session_stopped(duration_seconds);
        }
        duration_seconds
    }

    fn take_pending(&mut self, token: u64) -> Result<(), TimerError> {
        if self.pending_request != Some(token) {
            return Err(TimerError::StaleRequest);
        }
        self.pending_request = None;
        Ok(())
    }

    fn raw_elapsed_ms(&self, now_ms: i64) -> i64 {
        let Some(started_at_ms) = self.started_at_ms else {
            return 0;
        };
        let current_pause_ms = self
            .pause_started_at_ms
            .map_or(0, |pause_started_at_ms| {
                now_ms.saturating_sub(pause_started_at_ms).max(0)
            });

        now_ms
            .saturating_sub(started_at_ms)
            .saturating_sub(self.accumulated_pause_ms)
            .saturating_sub(current_pause_ms)
    }
}

/// Formats whole seconds as `HH:MM:SS` with unbounded hours.
pub fn format_hms(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
