//! Domain model for worker sessions, groups, and counter items.
//!
//! # Responsibility
//! - Define the canonical records the store owns and persists.
//! - Provide pure validation and item-list operations that callers compute
//!   before committing a replacement through the store.
//!
//! # Invariants
//! - Every group and item carries a stable `Uuid` identity.
//! - Item counts are unsigned; decrement clamps at zero by construction.
//! - Sibling names (groups, and items within one group) stay unique under
//!   case-insensitive comparison; mutation paths enforce it.

pub mod generate;
pub mod group;
pub mod item;
pub mod user;
pub mod validate;

pub use generate::{format_device_label, new_entry_id, random_palette_color, GROUP_PALETTE};
pub use group::{total_count, Group, GroupId};
pub use item::{
    add_item, decrement_item, edit_item, increment_item, move_item, remove_item, reset_item,
    validate_items, CounterItem, ItemId, ItemPatch, MoveDirection, NewItemRequest,
};
pub use user::User;
pub use validate::{name_exists, validate_name, validate_step, NamedRecord, ValidationError};
