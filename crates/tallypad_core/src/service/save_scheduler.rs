//! Debounce state machine for the groups write path.
//!
//! # Responsibility
//! - Decide, from serialized snapshots, whether a durable write is needed.
//! - Hold the single pending-write handle and its due time.
//!
//! # Invariants
//! - A snapshot equal to the last persisted one never schedules a write.
//! - At most one write is pending; scheduling cancels the previous handle
//!   before minting a new one, so the quiescence window always restarts.
//! - The machine is `IDLE` exactly when no write is pending.
//!
//! # See also
//! - crate::service::CounterStore for the flush side of the protocol.

/// Quiescence window between the last qualifying change and the write.
pub const DEFAULT_DEBOUNCE_MS: i64 = 500;

/// Scheduler state as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavePhase {
    /// No write is pending.
    Idle,
    /// A write is scheduled and waiting for its due time or a forced flush.
    Pending,
}

/// Handle identifying one scheduled write.
///
/// Tokens are never reused; a handle kept across a reschedule goes stale
/// and no longer cancels anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveToken(u64);

/// Result of feeding one snapshot into the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// Snapshot matches the last persisted state; nothing was scheduled.
    Unchanged,
    /// A write was scheduled (replacing any previous pending handle).
    Scheduled(SaveToken),
}

#[derive(Debug, Clone, Copy)]
struct PendingSave {
    token: SaveToken,
    due_at_ms: i64,
}

/// Change detector plus single-slot write schedule.
///
/// The scheduler never performs writes itself; the owning store asks for
/// due handles, cancels them, and reports the outcome back through
/// [`SaveScheduler::mark_persisted`] or [`SaveScheduler::mark_failed`].
#[derive(Debug)]
pub struct SaveScheduler {
    debounce_ms: i64,
    baseline: Option<String>,
    pending: Option<PendingSave>,
    next_token: u64,
}

impl SaveScheduler {
    /// Creates a scheduler with the standard quiescence window.
    pub fn new() -> Self {
        Self::with_debounce_ms(DEFAULT_DEBOUNCE_MS)
    }

    /// Creates a scheduler with a custom quiescence window.
    pub fn with_debounce_ms(debounce_ms: i64) -> Self {
        Self {
            debounce_ms,
            baseline: None,
            pending: None,
            next_token: 0,
        }
    }

    /// The configured quiescence window in milliseconds.
    pub fn debounce_ms(&self) -> i64 {
        self.debounce_ms
    }

    /// Current machine phase.
    pub fn phase(&self) -> SavePhase {
        if self.pending.is_some() {
            SavePhase::Pending
        } else {
            SavePhase::Idle
        }
    }

    /// The last persisted snapshot, if any write or load has completed.
    pub fn baseline(&self) -> Option<&str> {
        self.baseline.as_deref()
    }

    /// Returns whether `snapshot` differs from the last persisted state.
    pub fn is_dirty(&self, snapshot: &str) -> bool {
        self.baseline.as_deref() != Some(snapshot)
    }

    /// Feeds one post-mutation snapshot into the machine.
    ///
    /// # Contract
    /// - Equal to baseline: returns [`ScheduleOutcome::Unchanged`] and the
    ///   machine keeps whatever was pending before.
    /// - Different: cancels the pending handle, schedules a fresh write
    ///   `debounce_ms` after `now_ms` and returns its token.
    pub fn observe(&mut self, snapshot: &str, now_ms: i64) -> ScheduleOutcome {
        if !self.is_dirty(snapshot) {
            return ScheduleOutcome::Unchanged;
        }

        if let Some(stale) = self.pending_token() {
            self.cancel(stale);
        }

        self.next_token += 1;
        let token = SaveToken(self.next_token);
        self.pending = Some(PendingSave {
            token,
            due_at_ms: now_ms.saturating_add(self.debounce_ms),
        });
        ScheduleOutcome::Scheduled(token)
    }

    /// The pending handle, due or not.
    pub fn pending_token(&self) -> Option<SaveToken> {
        self.pending.map(|pending| pending.token)
    }

    /// The pending handle, only once its quiescence window has elapsed.
    pub fn due_token(&self, now_ms: i64) -> Option<SaveToken> {
        self.pending
            .filter(|pending| now_ms >= pending.due_at_ms)
            .map(|pending| pending.token)
    }

    /// Cancels a previously issued handle.
    ///
    /// Returns `false` when the handle is stale, i.e. it was already
    /// cancelled or replaced by a newer schedule.
    pub fn cancel(&mut self, token: SaveToken) -> bool {
        match self.pending {
            Some(pending) if pending.token == token => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Records a successful write of `snapshot` and returns to `IDLE`.
    pub fn mark_persisted(&mut self, snapshot: impl Into<String>) {
        self.baseline = Some(snapshot.into());
        self.pending = None;
    }

    /// Records a failed write attempt and returns to `IDLE`.
    ///
    /// The baseline keeps its pre-failure value, so the next qualifying
    /// mutation (or lifecycle flush) schedules the write again.
    pub fn mark_failed(&mut self) {
        self.pending = None;
    }

    /// Replaces the baseline outside the write path, e.g. after the
    /// initial load or a logout reset. Drops any pending write.
    pub fn rebaseline(&mut self, snapshot: impl Into<String>) {
        self.baseline = Some(snapshot.into());
        self.pending = None;
    }
}

impl Default for SaveScheduler {
    fn default() -> Self {
        Self::new()
    }
}
