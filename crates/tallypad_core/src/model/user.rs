//! Operator identity model.
//!
//! # Responsibility
//! - Define the record describing who is counting on this device.
//! - Capture the login instant so sessions can be attributed later.
//!
//! # Invariants
//! - `name` is already trimmed and validated before construction.
//! - `login_at` is set once at login and never mutated afterwards.
//!
//! # See also
//! - crate::service::CounterStore for the login/logout lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The operator currently signed in on this device.
///
/// There is at most one active user at a time; logout removes the record
/// both in memory and from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Display name entered at login, trimmed.
    pub name: String,
    /// Human-readable device label, e.g. `"Pixel 7"`.
    pub device_label: String,
    /// Instant the operator signed in.
    pub login_at: DateTime<Utc>,
}

impl User {
    /// Creates a user record for a fresh login.
    pub fn new(
        name: impl Into<String>,
        device_label: impl Into<String>,
        login_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            device_label: device_label.into(),
            login_at,
        }
    }
}
