//! Flutter-facing use-case API.
//!
//! # Responsibility
//! - Expose the counting, session, and lifecycle flows to Dart via FRB.
//! - Own the process-wide store, lifecycle hub, and session timer.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Every mutation reports its outcome through a response envelope.
//! - `init_core` builds the shared context at most once per process.

use log::info;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use tallypad_core::model::{
    add_item, decrement_item, edit_item, format_device_label, increment_item, move_item,
    remove_item, reset_item,
};
use tallypad_core::{
    core_version as core_version_inner, format_hms, init_logging as init_logging_inner,
    ping as ping_inner, AppState, CounterItem, CounterStore, Group, ItemPatch, LifecycleEvents,
    MoveDirection, NewItemRequest, SessionTimer, SharedSessionTimer, SqliteKvRepository,
    StoreError, Subscription, SystemClock, TimerAction, TimerError, TimerEvent, TimerPhase,
    TransitionRequest, User, ValidationError,
};
use uuid::Uuid;

type AppStore = CounterStore<SqliteKvRepository, SystemClock>;

/// Process-wide composition of the core components.
///
/// The store is locked per call; the lifecycle hub flushes it on
/// backgrounding through its own subscription, so Dart only has to
/// forward raw state strings.
struct AppCtx {
    store: Arc<Mutex<AppStore>>,
    lifecycle: LifecycleEvents,
    timer: SharedSessionTimer<SystemClock>,
    pending_session: Mutex<Option<TransitionRequest>>,
    _store_flush: Subscription,
}

static APP_CTX: OnceLock<AppCtx> = OnceLock::new();

/// Liveness probe for the bridge wiring.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always answers `"pong"`.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Reports the Rust core crate version to the host.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Starts rolling file logs for the Rust side.
///
/// Input semantics:
/// - `level`: `trace|debug|info|warn|error`, case-insensitive.
/// - `log_dir`: absolute directory the log files are written under.
///
/// # FFI contract
/// - Sync call; creates the directory when missing.
/// - Repeat calls with the same configuration are no-ops.
/// - A conflicting level or directory comes back as an error string.
/// - Never panics; an empty string means success.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Generic action response envelope for command flows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// Action response carrying the ID of a created group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupActionResponse {
    pub ok: bool,
    /// Created group ID in string form.
    pub group_id: Option<String>,
    pub message: String,
}

impl GroupActionResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            group_id: None,
            message: message.into(),
        }
    }
}

/// Action response carrying the ID of a created item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemActionResponse {
    pub ok: bool,
    /// Created item ID in string form.
    pub item_id: Option<String>,
    pub message: String,
}

impl ItemActionResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            item_id: None,
            message: message.into(),
        }
    }
}

/// Layout toggle result with the layout now in effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutResponse {
    pub ok: bool,
    /// `true` for the grid layout, `false` for the list layout.
    pub grid_layout: bool,
    pub message: String,
}

/// One counter item as shown by the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemView {
    pub id: String,
    pub name: String,
    pub count: u32,
    pub step: u32,
    /// Zero means no goal is configured.
    pub target: u32,
    pub color: Option<String>,
    pub goal_reached: bool,
}

/// One counter group with its items and aggregate count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupView {
    pub id: String,
    pub name: String,
    pub color: String,
    pub created_by: String,
    pub device_label: String,
    pub created_at_epoch_ms: i64,
    pub total_count: u64,
    pub items: Vec<ItemView>,
}

/// The signed-in worker session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserView {
    pub name: String,
    pub device_label: String,
    pub login_at_epoch_ms: i64,
}

/// Full store state for one UI render pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub loading: bool,
    pub grid_layout: bool,
    pub total_count: u64,
    pub user: Option<UserView>,
    pub groups: Vec<GroupView>,
}

/// Envelope around [`StoreSnapshot`] so failures stay non-throwing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotResponse {
    pub ok: bool,
    pub snapshot: Option<StoreSnapshot>,
    pub message: String,
}

/// Result of committing a requested session transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEventResponse {
    pub ok: bool,
    /// `true` when a session began, `false` when one ended or on failure.
    pub started: bool,
    /// Authoritative duration in seconds when a session ended.
    pub duration_seconds: Option<u64>,
    pub message: String,
}

impl SessionEventResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            started: false,
            duration_seconds: None,
            message: message.into(),
        }
    }
}

/// Result of a forced session stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStopResponse {
    pub ok: bool,
    /// Duration of the stopped session; `None` when none was running.
    pub duration_seconds: Option<u64>,
    pub message: String,
}

/// Session timer state for one UI render pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStateView {
    pub active: bool,
    /// One of `stopped|running|paused`.
    pub phase: String,
    pub elapsed_seconds: u64,
    /// Elapsed time formatted as `HH:MM:SS`.
    pub display: String,
}

/// Builds the process-wide store, lifecycle hub, and session timer.
///
/// `db_path` is the absolute SQLite file path chosen by the host, e.g.
/// inside the app documents directory.
///
/// # FFI contract
/// - Sync call; opens the database and loads persisted state.
/// - Later calls are no-ops reporting success, whatever their path.
/// - Never panics; failures are reported in the envelope.
#[flutter_rust_bridge::frb(sync)]
pub fn init_core(db_path: String) -> ActionResponse {
    if APP_CTX.get().is_some() {
        return ActionResponse::success("Core already initialized.");
    }
    match build_ctx(db_path.trim()) {
        Ok(ctx) => {
            if APP_CTX.set(ctx).is_err() {
                return ActionResponse::success("Core already initialized.");
            }
            info!("event=ffi_init module=ffi status=ok");
            ActionResponse::success("Core initialized.")
        }
        Err(message) => ActionResponse::failure(format!("init_core failed: {message}")),
    }
}

/// Reads the full store state for rendering.
///
/// # FFI contract
/// - Sync call, in-memory read.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn store_snapshot() -> SnapshotResponse {
    match with_store(build_snapshot) {
        Ok(snapshot) => SnapshotResponse {
            ok: true,
            snapshot: Some(snapshot),
            message: String::new(),
        },
        Err(message) => SnapshotResponse {
            ok: false,
            snapshot: None,
            message: format!("store_snapshot failed: {message}"),
        },
    }
}

/// Signs a worker in, replacing any previous session record.
///
/// The device label is assembled from the host-reported brand and model;
/// both are optional and fall back to a generic label.
///
/// # FFI contract
/// - Sync call; persists the session record immediately.
/// - A failed write is logged and swallowed, the sign-in still succeeds.
#[flutter_rust_bridge::frb(sync)]
pub fn login_user(
    name: String,
    device_brand: Option<String>,
    device_model: Option<String>,
) -> ActionResponse {
    let device_label = format_device_label(device_brand.as_deref(), device_model.as_deref());
    match run_store(|store| store.login(&name, &device_label)) {
        Ok(()) => ActionResponse::success("Signed in."),
        Err(message) => ActionResponse::failure(format!("login_user failed: {message}")),
    }
}

/// Signs the worker out and wipes all persisted records.
///
/// # FFI contract
/// - Sync call; all-or-nothing. A failed wipe leaves state untouched.
/// - A running session is force stopped on success.
#[flutter_rust_bridge::frb(sync)]
pub fn logout_user() -> ActionResponse {
    match run_store(|store| store.logout()) {
        Ok(()) => {
            let _ = session_force_stop();
            ActionResponse::success("Signed out.")
        }
        Err(message) => ActionResponse::failure(format!("logout_user failed: {message}")),
    }
}

/// Flips between the grid and list layout.
///
/// # FFI contract
/// - Sync call; persists the preference immediately, write failures are
///   logged and swallowed.
#[flutter_rust_bridge::frb(sync)]
pub fn toggle_layout() -> LayoutResponse {
    match run_store(|store| store.toggle_layout()) {
        Ok(grid_layout) => LayoutResponse {
            ok: true,
            grid_layout,
            message: String::new(),
        },
        Err(message) => LayoutResponse {
            ok: false,
            grid_layout: false,
            message: format!("toggle_layout failed: {message}"),
        },
    }
}

/// Creates a counter group owned by the signed-in worker.
///
/// # FFI contract
/// - Sync call; requires a signed-in worker.
/// - Returns the created group ID on success.
#[flutter_rust_bridge::frb(sync)]
pub fn group_add(name: String) -> GroupActionResponse {
    match run_store(|store| store.add_group(&name)) {
        Ok(group_id) => GroupActionResponse {
            ok: true,
            group_id: Some(group_id.to_string()),
            message: "Group created.".to_string(),
        },
        Err(message) => GroupActionResponse::failure(format!("group_add failed: {message}")),
    }
}

/// Renames a counter group. An unknown ID is a no-op.
#[flutter_rust_bridge::frb(sync)]
pub fn group_rename(group_id: String, name: String) -> ActionResponse {
    let id = match parse_entry_id(&group_id) {
        Ok(id) => id,
        Err(message) => return ActionResponse::failure(format!("group_rename failed: {message}")),
    };
    match run_store(|store| store.rename_group(id, &name)) {
        Ok(()) => ActionResponse::success("Group renamed."),
        Err(message) => ActionResponse::failure(format!("group_rename failed: {message}")),
    }
}

/// Deletes a counter group together with its items.
#[flutter_rust_bridge::frb(sync)]
pub fn group_delete(group_id: String) -> ActionResponse {
    let id = match parse_entry_id(&group_id) {
        Ok(id) => id,
        Err(message) => return ActionResponse::failure(format!("group_delete failed: {message}")),
    };
    match run_store(|store| store.delete_group(id)) {
        Ok(true) => ActionResponse::success("Group deleted."),
        Ok(false) => ActionResponse::success("Group was already gone."),
        Err(message) => ActionResponse::failure(format!("group_delete failed: {message}")),
    }
}

/// Adds an item to a group. Omitted fields use the quick-add defaults
/// (step 1, no goal, group color).
///
/// # FFI contract
/// - Sync call; validation failures come back in the envelope.
/// - Returns the created item ID on success.
#[flutter_rust_bridge::frb(sync)]
pub fn item_add(
    group_id: String,
    name: String,
    step: Option<u32>,
    target: Option<u32>,
    color: Option<String>,
) -> ItemActionResponse {
    let mut request = NewItemRequest::new(name);
    if let Some(step) = step {
        request.step = step;
    }
    if let Some(target) = target {
        request.target = target;
    }
    request.color = color;

    match rewrite_items(&group_id, |items| add_item(items, request)) {
        Ok(items) => ItemActionResponse {
            ok: true,
            item_id: items.last().map(|item| item.id.to_string()),
            message: "Item added.".to_string(),
        },
        Err(message) => ItemActionResponse::failure(format!("item_add failed: {message}")),
    }
}

/// Applies a partial update to an item. `clear_color` wins over `color`
/// and resets the accent back to the group default.
#[flutter_rust_bridge::frb(sync)]
pub fn item_edit(
    group_id: String,
    item_id: String,
    name: Option<String>,
    step: Option<u32>,
    target: Option<u32>,
    color: Option<String>,
    clear_color: bool,
) -> ActionResponse {
    let id = match parse_entry_id(&item_id) {
        Ok(id) => id,
        Err(message) => return ActionResponse::failure(format!("item_edit failed: {message}")),
    };
    let patch = ItemPatch {
        name,
        step,
        target,
        color: if clear_color { Some(None) } else { color.map(Some) },
    };
    match rewrite_items(&group_id, |items| edit_item(items, id, patch)) {
        Ok(_) => ActionResponse::success("Item updated."),
        Err(message) => ActionResponse::failure(format!("item_edit failed: {message}")),
    }
}

/// Adds one step to an item's tally.
#[flutter_rust_bridge::frb(sync)]
pub fn item_increment(group_id: String, item_id: String) -> ActionResponse {
    match tap_item(&group_id, &item_id, increment_item) {
        Ok(()) => ActionResponse::success("Count updated."),
        Err(message) => ActionResponse::failure(format!("item_increment failed: {message}")),
    }
}

/// Removes one step from an item's tally, clamping at zero.
#[flutter_rust_bridge::frb(sync)]
pub fn item_decrement(group_id: String, item_id: String) -> ActionResponse {
    match tap_item(&group_id, &item_id, decrement_item) {
        Ok(()) => ActionResponse::success("Count updated."),
        Err(message) => ActionResponse::failure(format!("item_decrement failed: {message}")),
    }
}

/// Sets an item's tally back to zero.
#[flutter_rust_bridge::frb(sync)]
pub fn item_reset(group_id: String, item_id: String) -> ActionResponse {
    match tap_item(&group_id, &item_id, reset_item) {
        Ok(()) => ActionResponse::success("Count reset."),
        Err(message) => ActionResponse::failure(format!("item_reset failed: {message}")),
    }
}

/// Removes an item from its group.
#[flutter_rust_bridge::frb(sync)]
pub fn item_remove(group_id: String, item_id: String) -> ActionResponse {
    match tap_item(&group_id, &item_id, remove_item) {
        Ok(()) => ActionResponse::success("Item removed."),
        Err(message) => ActionResponse::failure(format!("item_remove failed: {message}")),
    }
}

/// Swaps an item with its neighbor. `direction` is `up` or `down`;
/// moving past either end of the list is a no-op.
#[flutter_rust_bridge::frb(sync)]
pub fn item_move(group_id: String, item_id: String, direction: String) -> ActionResponse {
    let direction = match direction.trim() {
        "up" => MoveDirection::Up,
        "down" => MoveDirection::Down,
        other => {
            return ActionResponse::failure(format!("item_move failed: unknown direction: {other}"))
        }
    };
    let id = match parse_entry_id(&item_id) {
        Ok(id) => id,
        Err(message) => return ActionResponse::failure(format!("item_move failed: {message}")),
    };
    match rewrite_items(&group_id, |items| Ok(move_item(items, id, direction))) {
        Ok(_) => ActionResponse::success("Item moved."),
        Err(message) => ActionResponse::failure(format!("item_move failed: {message}")),
    }
}

/// Forwards a raw host lifecycle state (`active|inactive|background`).
///
/// Transitions out of the foreground flush any pending write before the
/// process can be suspended.
///
/// # FFI contract
/// - Sync call; may perform one durable write.
/// - Repeating the current state dispatches nothing.
#[flutter_rust_bridge::frb(sync)]
pub fn app_state_changed(state: String) -> ActionResponse {
    let ctx = match app_ctx() {
        Ok(ctx) => ctx,
        Err(message) => {
            return ActionResponse::failure(format!("app_state_changed failed: {message}"))
        }
    };
    let Some(next) = AppState::parse(state.trim()) else {
        return ActionResponse::failure(format!("app_state_changed failed: unknown state: {state}"));
    };
    match ctx.lifecycle.set_state(next) {
        Some(transition) => {
            ActionResponse::success(format!("App state moved to {}.", transition.to))
        }
        None => ActionResponse::success("App state unchanged."),
    }
}

/// Drives the debounced save schedule; the host calls this periodically.
///
/// # FFI contract
/// - Sync call; performs at most one durable write.
/// - Returns whether a write was flushed. `false` before `init_core`.
#[flutter_rust_bridge::frb(sync)]
pub fn pump_saves() -> bool {
    with_store(|store| store.tick()).unwrap_or(false)
}

/// Opens a start transition awaiting user confirmation.
#[flutter_rust_bridge::frb(sync)]
pub fn session_request_start() -> ActionResponse {
    match open_session_request(TimerAction::Start) {
        Ok(()) => ActionResponse::success("Start awaiting confirmation."),
        Err(message) => {
            ActionResponse::failure(format!("session_request_start failed: {message}"))
        }
    }
}

/// Opens a stop transition awaiting user confirmation.
#[flutter_rust_bridge::frb(sync)]
pub fn session_request_stop() -> ActionResponse {
    match open_session_request(TimerAction::Stop) {
        Ok(()) => ActionResponse::success("Stop awaiting confirmation."),
        Err(message) => ActionResponse::failure(format!("session_request_stop failed: {message}")),
    }
}

/// Commits the transition awaiting confirmation.
///
/// # FFI contract
/// - Sync call; fails when nothing is awaiting confirmation or the
///   request went stale, e.g. after a forced stop.
#[flutter_rust_bridge::frb(sync)]
pub fn session_confirm() -> SessionEventResponse {
    let ctx = match app_ctx() {
        Ok(ctx) => ctx,
        Err(message) => {
            return SessionEventResponse::failure(format!("session_confirm failed: {message}"))
        }
    };
    let request = lock_pending(ctx).take();
    let Some(request) = request else {
        return SessionEventResponse::failure(
            "session_confirm failed: nothing awaiting confirmation",
        );
    };
    let committed = ctx.timer.lock().commit(request);
    match committed {
        Ok(TimerEvent::Started) => SessionEventResponse {
            ok: true,
            started: true,
            duration_seconds: None,
            message: "Session started.".to_string(),
        },
        Ok(TimerEvent::Stopped { duration_seconds }) => SessionEventResponse {
            ok: true,
            started: false,
            duration_seconds: Some(duration_seconds),
            message: "Session stopped.".to_string(),
        },
        Err(err) => SessionEventResponse::failure(format!("session_confirm failed: {err}")),
    }
}

/// Abandons the transition awaiting confirmation, leaving the timer as
/// it was. Dismissing with nothing open is a no-op.
#[flutter_rust_bridge::frb(sync)]
pub fn session_dismiss() -> ActionResponse {
    let ctx = match app_ctx() {
        Ok(ctx) => ctx,
        Err(message) => return ActionResponse::failure(format!("session_dismiss failed: {message}")),
    };
    let request = lock_pending(ctx).take();
    let Some(request) = request else {
        return ActionResponse::success("Nothing awaiting confirmation.");
    };
    let cancelled = ctx.timer.lock().cancel_request(request);
    match cancelled {
        Ok(()) => ActionResponse::success("Transition dismissed."),
        Err(err) => ActionResponse::failure(format!("session_dismiss failed: {err}")),
    }
}

/// Pauses the running session; paused time is excluded from the total.
#[flutter_rust_bridge::frb(sync)]
pub fn session_pause() -> ActionResponse {
    match run_timer(|timer| timer.pause()) {
        Ok(()) => ActionResponse::success("Session paused."),
        Err(message) => ActionResponse::failure(format!("session_pause failed: {message}")),
    }
}

/// Resumes the paused session.
#[flutter_rust_bridge::frb(sync)]
pub fn session_resume() -> ActionResponse {
    match run_timer(|timer| timer.resume()) {
        Ok(()) => ActionResponse::success("Session resumed."),
        Err(message) => ActionResponse::failure(format!("session_resume failed: {message}")),
    }
}

/// Stops the session immediately, skipping the confirmation flow.
///
/// The host calls this when the user navigates away from the session
/// screen. With no session in progress this is a successful no-op.
#[flutter_rust_bridge::frb(sync)]
pub fn session_force_stop() -> SessionStopResponse {
    let ctx = match app_ctx() {
        Ok(ctx) => ctx,
        Err(message) => {
            return SessionStopResponse {
                ok: false,
                duration_seconds: None,
                message: format!("session_force_stop failed: {message}"),
            }
        }
    };
    let stopped = ctx.timer.lock().force_stop();
    if stopped.is_some() {
        // Any confirmation dialog still open now refers to a dead session.
        *lock_pending(ctx) = None;
    }
    match stopped {
        Some(duration_seconds) => SessionStopResponse {
            ok: true,
            duration_seconds: Some(duration_seconds),
            message: "Session stopped.".to_string(),
        },
        None => SessionStopResponse {
            ok: true,
            duration_seconds: None,
            message: "No session in progress.".to_string(),
        },
    }
}

/// Reads the session timer for one display refresh.
///
/// # FFI contract
/// - Sync call; re-reads the wall clock, never advances timer state.
/// - Reports a stopped timer before `init_core`.
#[flutter_rust_bridge::frb(sync)]
pub fn session_state() -> SessionStateView {
    let Ok(ctx) = app_ctx() else {
        return SessionStateView {
            active: false,
            phase: phase_label(TimerPhase::Stopped).to_string(),
            elapsed_seconds: 0,
            display: format_hms(0),
        };
    };
    let timer = ctx.timer.lock();
    let elapsed_seconds = timer.elapsed_seconds();
    SessionStateView {
        active: timer.is_active(),
        phase: phase_label(timer.phase()).to_string(),
        elapsed_seconds,
        display: format_hms(elapsed_seconds),
    }
}

fn build_ctx(db_path: &str) -> Result<AppCtx, String> {
    let repo =
        SqliteKvRepository::open(db_path).map_err(|err| format!("store open failed: {err}"))?;
    let mut store = CounterStore::new(repo, SystemClock);
    store.initialize();
    let store = Arc::new(Mutex::new(store));

    let lifecycle = LifecycleEvents::new();
    let flush_target = Arc::clone(&store);
    let store_flush = lifecycle.subscribe(move |transition| {
        let mut store = flush_target.lock().unwrap_or_else(PoisonError::into_inner);
        store.handle_app_state(transition);
    });

    Ok(AppCtx {
        store,
        lifecycle,
        timer: SharedSessionTimer::new(SessionTimer::new(SystemClock)),
        pending_session: Mutex::new(None),
        _store_flush: store_flush,
    })
}

fn app_ctx() -> Result<&'static AppCtx, String> {
    APP_CTX
        .get()
        .ok_or_else(|| "core not initialized; call init_core first".to_string())
}

fn with_store<T>(f: impl FnOnce(&mut AppStore) -> T) -> Result<T, String> {
    let ctx = app_ctx()?;
    let mut store = ctx.store.lock().unwrap_or_else(PoisonError::into_inner);
    Ok(f(&mut store))
}

fn run_store<T>(f: impl FnOnce(&mut AppStore) -> Result<T, StoreError>) -> Result<T, String> {
    with_store(f)?.map_err(|err| err.to_string())
}

fn run_timer<T>(
    f: impl FnOnce(&mut SessionTimer<SystemClock>) -> Result<T, TimerError>,
) -> Result<T, String> {
    let ctx = app_ctx()?;
    let mut timer = ctx.timer.lock();
    f(&mut timer).map_err(|err| err.to_string())
}

fn open_session_request(action: TimerAction) -> Result<(), String> {
    let ctx = app_ctx()?;
    let request = ctx.timer.lock().request(action).map_err(|err| err.to_string())?;
    *lock_pending(ctx) = Some(request);
    Ok(())
}

fn lock_pending(ctx: &AppCtx) -> MutexGuard<'_, Option<TransitionRequest>> {
    ctx.pending_session
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Reads one group's items, applies `rewrite`, and commits the result.
fn rewrite_items(
    group_id: &str,
    rewrite: impl FnOnce(&[CounterItem]) -> Result<Vec<CounterItem>, ValidationError>,
) -> Result<Vec<CounterItem>, String> {
    let id = parse_entry_id(group_id)?;
    with_store(|store| {
        let items = match store.groups().iter().find(|group| group.id == id) {
            Some(group) => group.items.clone(),
            None => return Err(format!("unknown group: {group_id}")),
        };
        let next = rewrite(&items).map_err(|err| err.to_string())?;
        store
            .replace_items(id, next.clone())
            .map_err(|err| err.to_string())?;
        Ok(next)
    })?
}

fn tap_item(
    group_id: &str,
    item_id: &str,
    op: fn(&[CounterItem], Uuid) -> Vec<CounterItem>,
) -> Result<(), String> {
    let id = parse_entry_id(item_id)?;
    rewrite_items(group_id, |items| Ok(op(items, id)))?;
    Ok(())
}

fn parse_entry_id(raw: &str) -> Result<Uuid, String> {
    Uuid::parse_str(raw.trim()).map_err(|_| format!("malformed id: {raw}"))
}

fn build_snapshot(store: &mut AppStore) -> StoreSnapshot {
    StoreSnapshot {
        loading: store.is_loading(),
        grid_layout: store.is_grid_layout(),
        total_count: store.total_count(),
        user: store.user().map(to_user_view),
        groups: store.groups().iter().map(to_group_view).collect(),
    }
}

fn to_user_view(user: &User) -> UserView {
    UserView {
        name: user.name.clone(),
        device_label: user.device_label.clone(),
        login_at_epoch_ms: user.login_at.timestamp_millis(),
    }
}

fn to_group_view(group: &Group) -> GroupView {
    GroupView {
        id: group.id.to_string(),
        name: group.name.clone(),
        color: group.color.clone(),
        created_by: group.created_by.clone(),
        device_label: group.device_label.clone(),
        created_at_epoch_ms: group.created_at.timestamp_millis(),
        total_count: group.total_count(),
        items: group.items.iter().map(to_item_view).collect(),
    }
}

fn to_item_view(item: &CounterItem) -> ItemView {
    ItemView {
        id: item.id.to_string(),
        name: item.name.clone(),
        count: item.count,
        step: item.step,
        target: item.target,
        color: item.color.clone(),
        goal_reached: item.goal_reached(),
    }
}

fn phase_label(phase: TimerPhase) -> &'static str {
    match phase {
        TimerPhase::Stopped => "stopped",
        TimerPhase::Running => "running",
        TimerPhase::Paused => "paused",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};
    use tempfile::TempDir;

    static TEST_DB_DIR: OnceLock<TempDir> = OnceLock::new();

    fn ensure_core() {
        let dir = TEST_DB_DIR.get_or_init(|| tempfile::tempdir().expect("temp dir"));
        let response = init_core(dir.path().join("tallypad.db").display().to_string());
        assert!(response.ok, "{}", response.message);
    }

    fn unique_token(prefix: &str) -> String {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock before unix epoch");
        format!("{prefix}-{}", stamp.as_nanos())
    }

    #[test]
    fn probe_calls_answer_without_a_core() {
        assert_eq!(ping(), "pong");
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_surfaces_bad_input_as_text() {
        let empty_dir = init_logging("info".to_string(), String::new());
        assert!(!empty_dir.is_empty());

        let bad_level = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!bad_level.is_empty());
    }

    #[test]
    fn init_core_reports_success_on_repeat_calls() {
        ensure_core();
        let again = init_core("unused.db".to_string());
        assert!(again.ok, "{}", again.message);
    }

    #[test]
    fn counter_flow_tracks_groups_and_persists_on_background() {
        ensure_core();
        let signed_in = login_user(
            "Lena".to_string(),
            Some("google".to_string()),
            Some("Pixel 7".to_string()),
        );
        assert!(signed_in.ok, "{}", signed_in.message);

        let group_name = unique_token("Shift");
        let created = group_add(group_name.clone());
        assert!(created.ok, "{}", created.message);
        let group_id = created.group_id.clone().expect("created group id");

        let added = item_add(group_id.clone(), "Trays".to_string(), Some(5), None, None);
        assert!(added.ok, "{}", added.message);
        let item_id = added.item_id.clone().expect("created item id");

        for _ in 0..3 {
            let tapped = item_increment(group_id.clone(), item_id.clone());
            assert!(tapped.ok, "{}", tapped.message);
        }
        pump_saves();

        let response = store_snapshot();
        assert!(response.ok, "{}", response.message);
        let snapshot = response.snapshot.expect("snapshot");
        assert!(!snapshot.loading);
        let group = snapshot
            .groups
            .iter()
            .find(|group| group.id == group_id)
            .expect("created group");
        assert_eq!(group.total_count, 15);
        let item = group
            .items
            .iter()
            .find(|item| item.id == item_id)
            .expect("created item");
        assert_eq!(item.count, 15);
        assert_eq!(item.step, 5);
        assert_eq!(
            snapshot.user.as_ref().map(|user| user.device_label.as_str()),
            Some("Google Pixel 7")
        );

        // Backgrounding flushes through the lifecycle subscription.
        let background = app_state_changed("background".to_string());
        assert!(background.ok, "{}", background.message);

        let db_path = TEST_DB_DIR.get().expect("core dir").path().join("tallypad.db");
        let conn = rusqlite::Connection::open(db_path).expect("open db");
        let stored: String = conn
            .query_row(
                "SELECT value FROM kv_records WHERE key = 'tallypad_groups_v1'",
                [],
                |row| row.get(0),
            )
            .expect("groups record");
        assert!(stored.contains(&group_name));

        let restored = app_state_changed("active".to_string());
        assert!(restored.ok, "{}", restored.message);
    }

    #[test]
    fn session_round_trip_confirms_dismisses_and_forces_stop() {
        ensure_core();

        let requested = session_request_start();
        assert!(requested.ok, "{}", requested.message);
        let confirmed = session_confirm();
        assert!(confirmed.ok, "{}", confirmed.message);
        assert!(confirmed.started);

        let state = session_state();
        assert!(state.active);
        assert_eq!(state.phase, "running");
        assert_eq!(state.display.len(), 8);

        assert!(session_pause().ok);
        assert!(session_resume().ok);

        // A dismissed stop confirmation leaves the session running.
        assert!(session_request_stop().ok);
        assert!(session_dismiss().ok);
        assert!(session_state().active);

        let forced = session_force_stop();
        assert!(forced.ok, "{}", forced.message);
        assert!(forced.duration_seconds.is_some());
        assert!(!session_state().active);

        let idle = session_force_stop();
        assert!(idle.ok);
        assert_eq!(idle.duration_seconds, None);

        assert!(!session_confirm().ok);
    }

    #[test]
    fn malformed_identifiers_and_directions_are_rejected() {
        ensure_core();

        let renamed = group_rename("not-a-uuid".to_string(), "Shift".to_string());
        assert!(!renamed.ok);
        assert!(renamed.message.contains("malformed id"));

        let missing = "2e9f0c3a-4d1b-4d2f-9a64-0f0d5b7a1c11".to_string();
        let tapped = item_increment(missing.clone(), missing.clone());
        assert!(!tapped.ok);
        assert!(tapped.message.contains("unknown group"));

        let moved = item_move(missing.clone(), missing, "sideways".to_string());
        assert!(!moved.ok);
        assert!(moved.message.contains("unknown direction"));
    }

    #[test]
    fn app_state_rejects_unknown_labels() {
        ensure_core();
        let response = app_state_changed("warm".to_string());
        assert!(!response.ok);
    }
}
