//! Shared timer ownership and the parent-facing capability handle.
//!
//! # Responsibility
//! - Let a screen own the timer while parents hold a narrow handle for
//!   activity checks and forced stops.
//!
//! # Invariants
//! - The handle is a capability reference, not ownership: it never keeps
//!   a dropped timer alive and degrades to "inactive" once the timer is
//!   gone.

use crate::clock::Clock;
use crate::session::timer::SessionTimer;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Shared owner of a [`SessionTimer`].
///
/// The host screen keeps one of these, locks it for the full timer API,
/// and gives its parent a [`SessionTimerHandle`].
pub struct SharedSessionTimer<C: Clock> {
    inner: Arc<Mutex<SessionTimer<C>>>,
}

impl<C: Clock> SharedSessionTimer<C> {
    /// Wraps a timer for shared access.
    pub fn new(timer: SessionTimer<C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(timer)),
        }
    }

    /// Locks the timer for direct use.
    pub fn lock(&self) -> MutexGuard<'_, SessionTimer<C>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Issues a capability handle for a parent component.
    pub fn handle(&self) -> SessionTimerHandle<C> {
        SessionTimerHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl<C: Clock> Clone for SharedSessionTimer<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Narrow view of a timer: activity check plus forced stop.
///
/// Held by a parent that must tear the session down when the user
/// navigates away, without granting it the rest of the timer API.
pub struct SessionTimerHandle<C: Clock> {
    inner: Weak<Mutex<SessionTimer<C>>>,
}

impl<C: Clock> SessionTimerHandle<C> {
    /// Whether a session is in progress. `false` once the timer is gone.
    pub fn is_active(&self) -> bool {
        match self.inner.upgrade() {
            Some(timer) => timer
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .is_active(),
            None => false,
        }
    }

    /// Stops the session immediately, skipping the two-phase
    /// confirmation, and returns its duration.
    ///
    /// Returns `None` when no session is in progress or the timer has
    /// been dropped.
    pub fn force_stop(&self) -> Option<u64> {
        let timer = self.inner.upgrade()?;
        let mut timer = timer.lock().unwrap_or_else(PoisonError::into_inner);
        timer.force_stop()
    }
}

impl<C: Clock> Clone for SessionTimerHandle<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}
