use tallypad_core::model::{add_item, increment_item, NewItemRequest};
use tallypad_core::{
    AppState, AppStateTransition, CounterStore, ManualClock, SqliteKvRepository, StoreError,
    ValidationError,
};

fn background_transition() -> AppStateTransition {
    AppStateTransition {
        from: AppState::Active,
        to: AppState::Background,
    }
}

fn in_memory_store() -> CounterStore<SqliteKvRepository, ManualClock> {
    let repo = SqliteKvRepository::open_in_memory().unwrap();
    let mut store = CounterStore::new(repo, ManualClock::new(1_700_000_000_000));
    store.initialize();
    store
}

#[test]
fn first_launch_starts_with_empty_defaults() {
    let store = in_memory_store();

    assert!(store.groups().is_empty());
    assert!(store.user().is_none());
    assert!(store.is_grid_layout());
    assert!(!store.is_loading());
    assert_eq!(store.total_count(), 0);
}

#[test]
fn mutations_before_initialize_are_rejected() {
    let repo = SqliteKvRepository::open_in_memory().unwrap();
    let mut store = CounterStore::new(repo, ManualClock::new(0));

    assert!(store.is_loading());
    assert!(matches!(
        store.add_group("Orders").unwrap_err(),
        StoreError::NotReady
    ));
    assert!(matches!(
        store.toggle_layout().unwrap_err(),
        StoreError::NotReady
    ));
}

#[test]
fn add_group_requires_a_signed_in_user() {
    let mut store = in_memory_store();

    assert!(matches!(
        store.add_group("Orders").unwrap_err(),
        StoreError::NoActiveUser
    ));
}

#[test]
fn groups_are_prepended_newest_first_and_stamped_with_the_user() {
    let mut store = in_memory_store();
    store.login("Lena", "Pixel 7").unwrap();

    store.add_group("Morning shift").unwrap();
    store.add_group("Evening shift").unwrap();

    let groups = store.groups();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].name, "Evening shift");
    assert_eq!(groups[1].name, "Morning shift");
    assert_eq!(groups[0].created_by, "Lena");
    assert_eq!(groups[0].device_label, "Pixel 7");
    assert!(groups[0].color.starts_with('#'));
}

#[test]
fn duplicate_group_names_are_rejected_case_insensitively() {
    let mut store = in_memory_store();
    store.login("Lena", "Pixel 7").unwrap();

    store.add_group("Orders").unwrap();
    let err = store.add_group("orders").unwrap_err();

    assert!(matches!(
        err,
        StoreError::Validation(ValidationError::DuplicateName(_))
    ));
    assert_eq!(store.groups().len(), 1);
}

#[test]
fn rename_allows_keeping_own_name_but_rejects_siblings() {
    let mut store = in_memory_store();
    store.login("Lena", "Pixel 7").unwrap();
    let orders = store.add_group("Orders").unwrap();
    store.add_group("Returns").unwrap();

    store.rename_group(orders, " Orders ").unwrap();
    assert_eq!(store.groups().iter().filter(|g| g.name == "Orders").count(), 1);

    let err = store.rename_group(orders, "returns").unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(ValidationError::DuplicateName(_))
    ));
}

#[test]
fn rename_and_replace_items_ignore_unknown_ids() {
    let mut store = in_memory_store();
    store.login("Lena", "Pixel 7").unwrap();
    store.add_group("Orders").unwrap();

    let unknown = tallypad_core::model::new_entry_id();
    store.rename_group(unknown, "Ghost").unwrap();
    store.replace_items(unknown, Vec::new()).unwrap();

    assert_eq!(store.groups().len(), 1);
    assert_eq!(store.groups()[0].name, "Orders");
}

#[test]
fn delete_group_reports_whether_something_was_removed() {
    let mut store = in_memory_store();
    store.login("Lena", "Pixel 7").unwrap();
    let orders = store.add_group("Orders").unwrap();

    assert!(store.delete_group(orders).unwrap());
    assert!(!store.delete_group(orders).unwrap());
    assert!(store.groups().is_empty());
}

#[test]
fn replace_items_validates_the_full_list() {
    let mut store = in_memory_store();
    store.login("Lena", "Pixel 7").unwrap();
    let orders = store.add_group("Orders").unwrap();

    let mut items = add_item(&[], NewItemRequest::new("Gloves")).unwrap();
    items = add_item(&items, NewItemRequest::new("Boxes")).unwrap();
    store.replace_items(orders, items.clone()).unwrap();
    assert_eq!(store.groups()[0].items.len(), 2);

    let mut broken = items;
    broken[1].name = "gloves".to_string();
    let err = store.replace_items(orders, broken).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(ValidationError::DuplicateName(_))
    ));
    // The rejected list must not have touched the committed state.
    assert_eq!(store.groups()[0].items[1].name, "Boxes");
}

#[test]
fn total_count_aggregates_across_groups() {
    let mut store = in_memory_store();
    store.login("Lena", "Pixel 7").unwrap();
    let orders = store.add_group("Orders").unwrap();
    let returns = store.add_group("Returns").unwrap();

    let mut items = add_item(&[], NewItemRequest::new("Gloves")).unwrap();
    let gloves = items[0].id;
    items[0].step = 5;
    for _ in 0..3 {
        items = increment_item(&items, gloves);
    }
    store.replace_items(orders, items).unwrap();

    let mut returned = add_item(&[], NewItemRequest::new("Damaged")).unwrap();
    returned = increment_item(&returned, returned[0].id);
    store.replace_items(returns, returned).unwrap();

    assert_eq!(store.total_count(), 16);
}

#[test]
fn full_state_round_trips_across_a_relaunch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tallypad.db");
    let clock = ManualClock::new(1_700_000_000_000);

    let first_groups = {
        let repo = SqliteKvRepository::open(&path).unwrap();
        let mut store = CounterStore::new(repo, clock.clone());
        store.initialize();

        store.login("Lena", "Pixel 7").unwrap();
        store.toggle_layout().unwrap();
        let orders = store.add_group("Orders").unwrap();

        let mut items = add_item(&[], NewItemRequest::new("Gloves L")).unwrap();
        items[0].step = 5;
        let gloves = items[0].id;
        items = increment_item(&items, gloves);
        items = increment_item(&items, gloves);
        store.replace_items(orders, items).unwrap();

        // Backgrounding flushes the pending debounced write synchronously.
        assert!(store.handle_app_state(background_transition()));
        store.groups().to_vec()
    };

    let repo = SqliteKvRepository::open(&path).unwrap();
    let mut store = CounterStore::new(repo, clock);
    store.initialize();

    assert_eq!(store.groups(), first_groups.as_slice());
    assert_eq!(store.groups()[0].items[0].count, 10);
    assert_eq!(store.user().map(|user| user.name.as_str()), Some("Lena"));
    assert!(!store.is_grid_layout());
}

#[test]
fn logout_resets_memory_and_storage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tallypad.db");

    {
        let repo = SqliteKvRepository::open(&path).unwrap();
        let mut store = CounterStore::new(repo, ManualClock::new(0));
        store.initialize();
        store.login("Lena", "Pixel 7").unwrap();
        let orders = store.add_group("Orders").unwrap();
        let items = add_item(&[], NewItemRequest::new("Gloves")).unwrap();
        store.replace_items(orders, items).unwrap();
        store.handle_app_state(background_transition());

        store.logout().unwrap();
        assert!(store.groups().is_empty());
        assert!(store.user().is_none());
        assert!(store.is_grid_layout());
    }

    let repo = SqliteKvRepository::open(&path).unwrap();
    let mut store = CounterStore::new(repo, ManualClock::new(0));
    store.initialize();

    assert!(store.groups().is_empty());
    assert!(store.user().is_none());
    assert!(store.is_grid_layout());
}
