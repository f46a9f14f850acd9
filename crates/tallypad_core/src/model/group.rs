//! Counting group model.
//!
//! # Responsibility
//! - Define the group record that owns an ordered list of counter items.
//! - Provide aggregate helpers used by overview surfaces.
//!
//! # Invariants
//! - `id` is stable and never reused for another group.
//! - Group names are unique among siblings under case-insensitive
//!   comparison, enforced at mutation time by the store.
//! - Deleting a group drops all contained items with it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::generate::new_entry_id;
use super::item::CounterItem;
use super::validate::NamedRecord;

/// Stable identifier for a counting group.
pub type GroupId = Uuid;

/// A named collection of counters, e.g. one order or one production batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Stable ID, generated at creation and never reused.
    pub id: GroupId,
    /// Display name, trimmed, unique among sibling groups.
    pub name: String,
    /// Accent color as `#RRGGBB`, drawn from the shared palette.
    pub color: String,
    /// Instant the group was created.
    pub created_at: DateTime<Utc>,
    /// Name of the operator who created the group.
    pub created_by: String,
    /// Device label recorded at creation, for multi-device attribution.
    pub device_label: String,
    /// Ordered counters owned by this group.
    pub items: Vec<CounterItem>,
}

impl Group {
    /// Creates an empty group with a generated stable ID.
    pub fn new(
        name: impl Into<String>,
        color: impl Into<String>,
        created_by: impl Into<String>,
        device_label: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self::with_id(
            new_entry_id(),
            name,
            color,
            created_by,
            device_label,
            created_at,
        )
    }

    /// Creates an empty group with a caller-provided stable ID.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(
        id: GroupId,
        name: impl Into<String>,
        color: impl Into<String>,
        created_by: impl Into<String>,
        device_label: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            color: color.into(),
            created_at,
            created_by: created_by.into(),
            device_label: device_label.into(),
            items: Vec::new(),
        }
    }

    /// Sum of all item tallies in this group.
    pub fn total_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.count)).sum()
    }
}

impl NamedRecord for Group {
    fn record_id(&self) -> Uuid {
        self.id
    }

    fn record_name(&self) -> &str {
        &self.name
    }
}

/// Sum of all item tallies across every group, for overview headers.
pub fn total_count(groups: &[Group]) -> u64 {
    groups.iter().map(Group::total_count).sum()
}
