//! Host application lifecycle signals.
//!
//! # Responsibility
//! - Model the foreground/background states reported by the host shell.
//! - Fan transition events out to subscribed handlers.
//!
//! # Invariants
//! - Reporting the current state again dispatches nothing.
//! - A dropped [`Subscription`] never receives another event.
//! - Handlers must not subscribe or drop subscriptions from inside the
//!   callback; dispatch runs under the registry lock.
//!
//! # See also
//! - crate::service::CounterStore::handle_app_state for the flush rule.

use log::debug;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Host process visibility, as reported by the mobile shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// App is in the foreground and interactive.
    Active,
    /// App is in a transitional non-interactive state, e.g. the task
    /// switcher or an incoming call overlay.
    Inactive,
    /// App is fully backgrounded and may be suspended at any point.
    Background,
}

impl AppState {
    /// Parses the lowercase label used by host shells.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            "background" => Some(Self::Background),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Background => "background",
        }
    }
}

impl Display for AppState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One observed state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppStateTransition {
    pub from: AppState,
    pub to: AppState,
}

impl AppStateTransition {
    /// Returns whether this transition takes the app out of the
    /// foreground, the trigger for flushing pending writes.
    ///
    /// Both `active` and `inactive` count as foreground here, so an
    /// `inactive -> background` hop still triggers exactly one flush.
    pub fn leaves_foreground(&self) -> bool {
        matches!(self.from, AppState::Active | AppState::Inactive)
            && matches!(self.to, AppState::Inactive | AppState::Background)
            && self.from != self.to
    }
}

type Handler = Box<dyn FnMut(AppStateTransition) + Send>;

struct HandlerSlot {
    id: u64,
    handler: Handler,
}

struct Registry {
    current: AppState,
    next_id: u64,
    handlers: Vec<HandlerSlot>,
}

/// Fan-out hub for lifecycle transitions.
///
/// The host shell feeds raw states into [`LifecycleEvents::set_state`];
/// interested components hold a [`Subscription`] for as long as they want
/// events and release it by dropping it.
#[derive(Clone)]
pub struct LifecycleEvents {
    inner: Arc<Mutex<Registry>>,
}

impl LifecycleEvents {
    /// Creates a hub that assumes the app starts in the foreground.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Registry {
                current: AppState::Active,
                next_id: 0,
                handlers: Vec::new(),
            })),
        }
    }

    /// Registers a handler for future transitions.
    ///
    /// The handler stays registered until the returned [`Subscription`]
    /// is dropped.
    pub fn subscribe(&self, handler: impl FnMut(AppStateTransition) + Send + 'static) -> Subscription {
        let mut registry = lock_registry(&self.inner);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.handlers.push(HandlerSlot {
            id,
            handler: Box::new(handler),
        });

        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Reports the latest host state and dispatches the transition.
    ///
    /// Returns the dispatched transition, or `None` when the reported
    /// state matches the current one.
    pub fn set_state(&self, next: AppState) -> Option<AppStateTransition> {
        let mut registry = lock_registry(&self.inner);
        if registry.current == next {
            return None;
        }

        let transition = AppStateTransition {
            from: registry.current,
            to: next,
        };
        registry.current = next;
        debug!(
            "event=app_state module=lifecycle from={} to={}",
            transition.from, transition.to
        );

        for slot in registry.handlers.iter_mut() {
            (slot.handler)(transition);
        }
        Some(transition)
    }

    /// The most recently reported host state.
    pub fn current(&self) -> AppState {
        lock_registry(&self.inner).current
    }
}

impl Default for LifecycleEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped registration handle returned by [`LifecycleEvents::subscribe`].
///
/// Dropping it removes the handler from the hub.
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = lock_registry(&registry);
            registry.handlers.retain(|slot| slot.id != self.id);
        }
    }
}

fn lock_registry(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}
