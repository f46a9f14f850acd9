//! Counter item model and list operations.
//!
//! # Responsibility
//! - Define the counter record owned by a group.
//! - Provide the pure list transforms (add/edit/count/reorder/remove) that
//!   callers compute before committing the result through the store.
//!
//! # Invariants
//! - `count` never goes negative; decrement clamps at zero.
//! - `step` is always greater than zero.
//! - Item names are unique per group under case-insensitive comparison.
//!
//! # See also
//! - crate::service::CounterStore::replace_items for the commit path.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::generate::new_entry_id;
use super::validate::{
    name_exists, validate_color, validate_name, validate_step, NamedRecord, ValidationError,
};

/// Stable identifier for a counter item.
pub type ItemId = Uuid;

/// A single tallied quantity inside a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterItem {
    /// Stable ID, generated at creation and never reused.
    pub id: ItemId,
    /// Display name, trimmed, unique within the owning group.
    pub name: String,
    /// Current tally. Clamped at zero from below.
    pub count: u32,
    /// Amount added or removed per tap. Always > 0.
    pub step: u32,
    /// Optional goal. Zero means no goal is set.
    pub target: u32,
    /// Optional accent color as `#RRGGBB`, falls back to the group color.
    pub color: Option<String>,
}

impl CounterItem {
    /// Adds one step to the tally, saturating instead of wrapping.
    pub fn increment(&mut self) {
        self.count = self.count.saturating_add(self.step);
    }

    /// Removes one step from the tally, clamping at zero.
    pub fn decrement(&mut self) {
        self.count = self.count.saturating_sub(self.step);
    }

    /// Sets the tally back to zero.
    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// Returns whether a goal has been configured for this item.
    pub fn has_goal(&self) -> bool {
        self.target > 0
    }

    /// Returns whether the configured goal has been met or exceeded.
    pub fn goal_reached(&self) -> bool {
        self.has_goal() && self.count >= self.target
    }
}

impl NamedRecord for CounterItem {
    fn record_id(&self) -> Uuid {
        self.id
    }

    fn record_name(&self) -> &str {
        &self.name
    }
}

/// Input for creating a new item inside a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItemRequest {
    /// Display name, validated and trimmed during `add_item`.
    pub name: String,
    /// Tally step, must be > 0.
    pub step: u32,
    /// Goal, zero for none.
    pub target: u32,
    /// Optional `#RRGGBB` accent color.
    pub color: Option<String>,
}

impl NewItemRequest {
    /// Creates a request with the defaults used by quick-add flows.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            step: 1,
            target: 0,
            color: None,
        }
    }
}

/// Partial update for an existing item. `None` fields are left untouched.
///
/// `color` is doubly optional: the outer `None` means "keep", while
/// `Some(None)` clears the accent color back to the group default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub step: Option<u32>,
    pub target: Option<u32>,
    pub color: Option<Option<String>>,
}

/// Direction for swapping an item with its neighbor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// Returns `items` plus a freshly created item appended at the end.
///
/// # Errors
/// Rejects blank or too-short names, names already used in the list
/// (case-insensitive), a zero step, and malformed colors.
pub fn add_item(
    items: &[CounterItem],
    request: NewItemRequest,
) -> Result<Vec<CounterItem>, ValidationError> {
    let name = validate_name(&request.name)?;
    if name_exists(&name, items, None) {
        return Err(ValidationError::DuplicateName(name));
    }
    let step = validate_step(request.step)?;
    if let Some(color) = request.color.as_deref() {
        validate_color(color)?;
    }

    let mut next: Vec<CounterItem> = items.to_vec();
    next.push(CounterItem {
        id: new_entry_id(),
        name,
        count: 0,
        step,
        target: request.target,
        color: request.color,
    });
    Ok(next)
}

/// Returns `items` with the patch applied to the matching entry.
///
/// An unknown `id` leaves the list unchanged.
///
/// # Errors
/// Same rules as [`add_item`]; the renamed item is excluded from its own
/// duplicate check.
pub fn edit_item(
    items: &[CounterItem],
    id: ItemId,
    patch: ItemPatch,
) -> Result<Vec<CounterItem>, ValidationError> {
    let name = match patch.name.as_deref() {
        Some(raw) => {
            let name = validate_name(raw)?;
            if name_exists(&name, items, Some(id)) {
                return Err(ValidationError::DuplicateName(name));
            }
            Some(name)
        }
        None => None,
    };
    let step = match patch.step {
        Some(raw) => Some(validate_step(raw)?),
        None => None,
    };
    if let Some(Some(color)) = patch.color.as_ref() {
        validate_color(color)?;
    }

    let next = items
        .iter()
        .cloned()
        .map(|mut item| {
            if item.id == id {
                if let Some(name) = name.clone() {
                    item.name = name;
                }
                if let Some(step) = step {
                    item.step = step;
                }
                if let Some(target) = patch.target {
                    item.target = target;
                }
                if let Some(color) = patch.color.clone() {
                    item.color = color;
                }
            }
            item
        })
        .collect();
    Ok(next)
}

/// Returns `items` with one step added to the matching entry.
pub fn increment_item(items: &[CounterItem], id: ItemId) -> Vec<CounterItem> {
    update_item(items, id, CounterItem::increment)
}

/// Returns `items` with one step removed from the matching entry,
/// clamped at zero.
pub fn decrement_item(items: &[CounterItem], id: ItemId) -> Vec<CounterItem> {
    update_item(items, id, CounterItem::decrement)
}

/// Returns `items` with the matching entry's tally back at zero.
pub fn reset_item(items: &[CounterItem], id: ItemId) -> Vec<CounterItem> {
    update_item(items, id, CounterItem::reset)
}

/// Returns `items` without the matching entry. Unknown ids are a no-op.
pub fn remove_item(items: &[CounterItem], id: ItemId) -> Vec<CounterItem> {
    items.iter().filter(|item| item.id != id).cloned().collect()
}

/// Returns `items` with the matching entry swapped one position up or down.
///
/// Moving past either end of the list leaves the order unchanged.
pub fn move_item(items: &[CounterItem], id: ItemId, direction: MoveDirection) -> Vec<CounterItem> {
    let mut next: Vec<CounterItem> = items.to_vec();
    let Some(index) = next.iter().position(|item| item.id == id) else {
        return next;
    };
    match direction {
        MoveDirection::Up if index > 0 => next.swap(index, index - 1),
        MoveDirection::Down if index + 1 < next.len() => next.swap(index, index + 1),
        _ => {}
    }
    next
}

/// Checks a full item list before it is committed into a group.
///
/// # Errors
/// Reports the first invalid name, duplicate pair, zero step or malformed
/// color encountered.
pub fn validate_items(items: &[CounterItem]) -> Result<(), ValidationError> {
    for (index, item) in items.iter().enumerate() {
        let name = validate_name(&item.name)?;
        if name_exists(&name, &items[..index], None) {
            return Err(ValidationError::DuplicateName(name));
        }
        validate_step(item.step)?;
        if let Some(color) = item.color.as_deref() {
            validate_color(color)?;
        }
    }
    Ok(())
}

fn update_item(
    items: &[CounterItem],
    id: ItemId,
    apply: impl Fn(&mut CounterItem),
) -> Vec<CounterItem> {
    items
        .iter()
        .cloned()
        .map(|mut item| {
            if item.id == id {
                apply(&mut item);
            }
            item
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str, count: u32, step: u32) -> CounterItem {
        CounterItem {
            id: new_entry_id(),
            name: name.to_string(),
            count,
            step,
            target: 0,
            color: None,
        }
    }

    #[test]
    fn add_item_appends_with_zero_count() {
        let items = vec![sample("Gloves L", 3, 1)];
        let next = add_item(&items, NewItemRequest::new("Gloves M")).unwrap();

        assert_eq!(next.len(), 2);
        assert_eq!(next[1].name, "Gloves M");
        assert_eq!(next[1].count, 0);
        assert_eq!(next[1].step, 1);
    }

    #[test]
    fn add_item_rejects_case_insensitive_duplicate() {
        let items = vec![sample("Gloves L", 0, 1)];
        let err = add_item(&items, NewItemRequest::new("gloves l")).unwrap_err();

        assert!(matches!(err, ValidationError::DuplicateName(_)));
    }

    #[test]
    fn add_item_rejects_zero_step() {
        let mut request = NewItemRequest::new("Boxes");
        request.step = 0;

        let err = add_item(&[], request).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidStep));
    }

    #[test]
    fn step_five_scenario_counts_up_down_and_resets() {
        let mut items = vec![sample("Trays", 0, 5)];
        let id = items[0].id;

        for _ in 0..3 {
            items = increment_item(&items, id);
        }
        assert_eq!(items[0].count, 15);

        items = decrement_item(&items, id);
        assert_eq!(items[0].count, 10);

        items = reset_item(&items, id);
        assert_eq!(items[0].count, 0);
    }

    #[test]
    fn decrement_clamps_at_zero() {
        let items = vec![sample("Pallets", 2, 5)];
        let id = items[0].id;

        let next = decrement_item(&items, id);
        assert_eq!(next[0].count, 0);

        let again = decrement_item(&next, id);
        assert_eq!(again[0].count, 0);
    }

    #[test]
    fn edit_item_allows_keeping_own_name() {
        let items = vec![sample("Crates", 0, 1)];
        let id = items[0].id;
        let patch = ItemPatch {
            name: Some("Crates".to_string()),
            step: Some(4),
            ..ItemPatch::default()
        };

        let next = edit_item(&items, id, patch).unwrap();
        assert_eq!(next[0].step, 4);
    }

    #[test]
    fn edit_item_clears_color_with_inner_none() {
        let mut items = vec![sample("Bins", 0, 1)];
        items[0].color = Some("#FF5722".to_string());
        let id = items[0].id;
        let patch = ItemPatch {
            color: Some(None),
            ..ItemPatch::default()
        };

        let next = edit_item(&items, id, patch).unwrap();
        assert_eq!(next[0].color, None);
    }

    #[test]
    fn move_item_swaps_adjacent_and_ignores_edges() {
        let items = vec![sample("A", 0, 1), sample("B", 0, 1), sample("C", 0, 1)];
        let first = items[0].id;

        let moved = move_item(&items, first, MoveDirection::Down);
        assert_eq!(moved[0].name, "B");
        assert_eq!(moved[1].name, "A");

        let unchanged = move_item(&items, first, MoveDirection::Up);
        assert_eq!(unchanged[0].name, "A");
    }

    #[test]
    fn remove_item_drops_only_the_match() {
        let items = vec![sample("A", 0, 1), sample("B", 0, 1)];
        let id = items[0].id;

        let next = remove_item(&items, id);
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].name, "B");
    }

    #[test]
    fn validate_items_flags_duplicates_across_the_list() {
        let items = vec![sample("Orders", 0, 1), sample(" ORDERS ", 0, 1)];

        let err = validate_items(&items).unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateName(_)));
    }

    #[test]
    fn goal_helpers_track_target() {
        let mut item = sample("Kits", 0, 5);
        assert!(!item.has_goal());

        item.target = 10;
        assert!(item.has_goal());
        assert!(!item.goal_reached());

        item.increment();
        item.increment();
        assert!(item.goal_reached());
    }
}
