//! Domain store for groups, user session and layout preference.
//!
//! # Responsibility
//! - Act as the single source of truth for the in-memory state.
//! - Mediate all reads/writes through the key-value gateway.
//! - Apply the debounced, change-detected, lifecycle-aware save policy
//!   to the groups collection.
//!
//! # Invariants
//! - No mutation is accepted before [`CounterStore::initialize`] has run.
//! - Group names stay unique among siblings (case-insensitive).
//! - User and layout writes are immediate; group writes are debounced.
//! - A failed group write is logged and dropped; in-memory state is never
//!   rolled back for it.
//!
//! # See also
//! - crate::service::save_scheduler for the debounce state machine.

use crate::clock::Clock;
use crate::lifecycle::AppStateTransition;
use crate::model::{
    name_exists, random_palette_color, validate_items, validate_name, total_count, CounterItem,
    Group, GroupId, User, ValidationError,
};
use crate::repo::{KvRepository, RecordKey, RepoError};
use crate::service::save_scheduler::{SavePhase, SaveScheduler, ScheduleOutcome};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by store mutations.
#[derive(Debug)]
pub enum StoreError {
    /// [`CounterStore::initialize`] has not completed yet.
    NotReady,
    /// The operation needs a signed-in user.
    NoActiveUser,
    /// Input was rejected before any state changed.
    Validation(ValidationError),
    /// In-memory state could not be serialized.
    Serialize(serde_json::Error),
    /// The persistence gateway reported a failure the caller must see.
    Gateway(RepoError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotReady => write!(f, "store has not finished loading persisted state"),
            Self::NoActiveUser => write!(f, "no user is signed in"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Serialize(err) => write!(f, "state serialization failed: {err}"),
            Self::Gateway(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotReady | Self::NoActiveUser => None,
            Self::Validation(err) => Some(err),
            Self::Serialize(err) => Some(err),
            Self::Gateway(err) => Some(err),
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Gateway(value)
    }
}

#[derive(Debug, Clone, Copy)]
enum FlushReason {
    Debounce,
    Lifecycle,
}

impl FlushReason {
    fn label(self) -> &'static str {
        match self {
            Self::Debounce => "debounce",
            Self::Lifecycle => "lifecycle",
        }
    }
}

/// Single source of truth for groups, user and layout state.
///
/// Construct one per process at the composition point, call
/// [`CounterStore::initialize`] once, then route every mutation through
/// it. The store never spawns tasks; hosts pump [`CounterStore::tick`]
/// from their display timer and forward lifecycle transitions into
/// [`CounterStore::handle_app_state`].
pub struct CounterStore<R: KvRepository, C: Clock> {
    repo: R,
    clock: C,
    scheduler: SaveScheduler,
    groups: Vec<Group>,
    user: Option<User>,
    grid_layout: bool,
    loading: bool,
}

impl<R: KvRepository, C: Clock> CounterStore<R, C> {
    /// Creates a store with the standard save policy.
    pub fn new(repo: R, clock: C) -> Self {
        Self::with_scheduler(repo, clock, SaveScheduler::new())
    }

    /// Creates a store with a caller-configured scheduler, e.g. a shorter
    /// quiescence window.
    pub fn with_scheduler(repo: R, clock: C, scheduler: SaveScheduler) -> Self {
        Self {
            repo,
            clock,
            scheduler,
            groups: Vec::new(),
            user: None,
            grid_layout: true,
            loading: true,
        }
    }

    /// Loads all persisted records and populates in-memory state.
    ///
    /// # Contract
    /// - Each record falls back to its default when missing, unreadable
    ///   or unparsable: empty groups, no user, grid layout on.
    /// - The loaded groups snapshot becomes the scheduler baseline, so
    ///   the load echo never schedules a write.
    /// - Mutations are accepted once this returns.
    pub fn initialize(&mut self) {
        self.groups = self
            .load_record::<Vec<Group>>(RecordKey::Groups)
            .unwrap_or_default();
        self.user = self.load_record::<User>(RecordKey::User);
        self.grid_layout = self.load_record::<bool>(RecordKey::Layout).unwrap_or(true);

        match serde_json::to_string(&self.groups) {
            Ok(snapshot) => self.scheduler.rebaseline(snapshot),
            Err(err) => error!(
                "event=store_init module=service status=error error_code=snapshot_failed error={err}"
            ),
        }
        self.loading = false;

        info!(
            "event=store_init module=service status=ok groups={} has_user={} grid_layout={}",
            self.groups.len(),
            self.user.is_some(),
            self.grid_layout
        );
    }

    /// Signs a user in and persists the session record immediately.
    ///
    /// # Contract
    /// - The in-memory user is replaced even when the write fails; the
    ///   failure is logged and dropped.
    ///
    /// # Errors
    /// - [`StoreError::NotReady`] before initialization.
    /// - [`StoreError::Validation`] for a blank or too-short name.
    pub fn login(&mut self, name: &str, device_label: &str) -> StoreResult<()> {
        self.ensure_ready()?;
        let name = validate_name(name)?;

        let user = User::new(name, device_label, self.now_datetime());
        let payload = serde_json::to_string(&user)?;
        self.user = Some(user);

        if let Err(err) = self.repo.save(RecordKey::User, &payload) {
            warn!("event=login module=service status=save_failed error={err}");
        } else {
            info!("event=login module=service status=ok");
        }
        Ok(())
    }

    /// Clears every persisted record and resets in-memory state.
    ///
    /// # Contract
    /// - All-or-nothing: when the clear fails, in-memory state and the
    ///   persisted records are left exactly as they were.
    /// - On success the scheduler is re-baselined to the empty groups
    ///   snapshot, so the reset itself does not schedule a write.
    ///
    /// # Errors
    /// - [`StoreError::NotReady`] before initialization.
    /// - [`StoreError::Gateway`] when the clear fails.
    pub fn logout(&mut self) -> StoreResult<()> {
        self.ensure_ready()?;

        if let Err(err) = self.repo.clear(&RecordKey::ALL) {
            error!("event=logout module=service status=error error={err}");
            return Err(err.into());
        }

        self.groups.clear();
        self.user = None;
        self.grid_layout = true;
        self.scheduler.rebaseline("[]");

        info!("event=logout module=service status=ok");
        Ok(())
    }

    /// Flips the grid/list preference and persists it immediately.
    ///
    /// Returns the new value. A failed write is logged and dropped.
    ///
    /// # Errors
    /// - [`StoreError::NotReady`] before initialization.
    pub fn toggle_layout(&mut self) -> StoreResult<bool> {
        self.ensure_ready()?;
        self.grid_layout = !self.grid_layout;

        let payload = serde_json::to_string(&self.grid_layout)?;
        if let Err(err) = self.repo.save(RecordKey::Layout, &payload) {
            warn!("event=layout_save module=service status=save_failed error={err}");
        }
        Ok(self.grid_layout)
    }

    /// Creates a group and prepends it to the collection (newest first).
    ///
    /// # Contract
    /// - The group is stamped with the signed-in user's name and device
    ///   label plus the current clock instant, and gets a random palette
    ///   color.
    ///
    /// # Errors
    /// - [`StoreError::NotReady`] before initialization.
    /// - [`StoreError::NoActiveUser`] without a signed-in user.
    /// - [`StoreError::Validation`] for a bad or duplicate name.
    pub fn add_group(&mut self, name: &str) -> StoreResult<GroupId> {
        self.ensure_ready()?;
        let Some(user) = self.user.as_ref() else {
            return Err(StoreError::NoActiveUser);
        };

        let name = validate_name(name)?;
        if name_exists(&name, &self.groups, None) {
            return Err(ValidationError::DuplicateName(name).into());
        }

        let group = Group::new(
            name,
            random_palette_color(),
            user.name.clone(),
            user.device_label.clone(),
            self.now_datetime(),
        );
        let id = group.id;
        self.groups.insert(0, group);
        self.after_groups_change()?;
        Ok(id)
    }

    /// Renames a group in place. Unknown ids are a no-op.
    ///
    /// # Errors
    /// - [`StoreError::NotReady`] before initialization.
    /// - [`StoreError::Validation`] for a bad name or one already used by
    ///   a sibling group; the renamed group is excluded from its own
    ///   duplicate check.
    pub fn rename_group(&mut self, id: GroupId, new_name: &str) -> StoreResult<()> {
        self.ensure_ready()?;
        let Some(index) = self.groups.iter().position(|group| group.id == id) else {
            return Ok(());
        };

        let name = validate_name(new_name)?;
        if name_exists(&name, &self.groups, Some(id)) {
            return Err(ValidationError::DuplicateName(name).into());
        }

        self.groups[index].name = name;
        self.after_groups_change()
    }

    /// Deletes a group and every item it owns.
    ///
    /// Returns whether a group was actually removed.
    ///
    /// # Errors
    /// - [`StoreError::NotReady`] before initialization.
    pub fn delete_group(&mut self, id: GroupId) -> StoreResult<bool> {
        self.ensure_ready()?;
        let before = self.groups.len();
        self.groups.retain(|group| group.id != id);

        if self.groups.len() == before {
            return Ok(false);
        }
        self.after_groups_change()?;
        Ok(true)
    }

    /// Replaces a group's item sequence wholesale.
    ///
    /// This is the single commit path for every item-level operation;
    /// callers compute the new list with the helpers in [`crate::model`]
    /// and commit it here. Unknown group ids are a no-op.
    ///
    /// # Errors
    /// - [`StoreError::NotReady`] before initialization.
    /// - [`StoreError::Validation`] when the new list carries duplicate
    ///   names, blank names, zero steps or malformed colors.
    pub fn replace_items(&mut self, group_id: GroupId, items: Vec<CounterItem>) -> StoreResult<()> {
        self.ensure_ready()?;
        let Some(index) = self.groups.iter().position(|group| group.id == group_id) else {
            return Ok(());
        };

        validate_items(&items)?;
        self.groups[index].items = items;
        self.after_groups_change()
    }

    /// Pumps the save schedule against the current clock.
    ///
    /// Hosts call this from their periodic display tick. Returns whether
    /// a durable write happened.
    pub fn tick(&mut self) -> bool {
        if self.loading {
            return false;
        }
        let Some(token) = self.scheduler.due_token(self.clock.now_millis()) else {
            return false;
        };

        self.scheduler.cancel(token);
        self.flush_groups(FlushReason::Debounce)
    }

    /// Reacts to a host lifecycle transition.
    ///
    /// # Contract
    /// - Leaving the foreground cancels any pending write and flushes
    ///   synchronously, so no data is lost if the process is killed
    ///   right after backgrounding.
    /// - Flushing when nothing changed is a no-op, so double signals are
    ///   harmless.
    ///
    /// Returns whether a durable write happened.
    pub fn handle_app_state(&mut self, transition: AppStateTransition) -> bool {
        if self.loading || !transition.leaves_foreground() {
            return false;
        }

        if let Some(token) = self.scheduler.pending_token() {
            self.scheduler.cancel(token);
        }
        self.flush_groups(FlushReason::Lifecycle)
    }

    /// The groups collection, newest first.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// The signed-in user, if any.
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Current grid/list preference.
    pub fn is_grid_layout(&self) -> bool {
        self.grid_layout
    }

    /// Whether the initial load is still outstanding.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Current save scheduler phase, for hosts that surface sync state.
    pub fn save_phase(&self) -> SavePhase {
        self.scheduler.phase()
    }

    /// Sum of every item tally across all groups.
    pub fn total_count(&self) -> u64 {
        total_count(&self.groups)
    }

    fn ensure_ready(&self) -> StoreResult<()> {
        if self.loading {
            return Err(StoreError::NotReady);
        }
        Ok(())
    }

    fn now_datetime(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(self.clock.now_millis())
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    fn load_record<T: DeserializeOwned>(&self, key: RecordKey) -> Option<T> {
        let text = match self.repo.load(key) {
            Ok(Some(text)) => text,
            Ok(None) => return None,
            Err(err) => {
                warn!("event=store_load module=service status=error key={key} error={err}");
                return None;
            }
        };

        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("event=store_load module=service status=invalid key={key} error={err}");
                None
            }
        }
    }

    fn after_groups_change(&mut self) -> StoreResult<()> {
        let snapshot = serde_json::to_string(&self.groups)?;
        match self.scheduler.observe(&snapshot, self.clock.now_millis()) {
            ScheduleOutcome::Unchanged => {
                debug!("event=save_schedule module=service status=unchanged");
            }
            ScheduleOutcome::Scheduled(_) => {
                debug!(
                    "event=save_schedule module=service status=scheduled due_in_ms={}",
                    self.scheduler.debounce_ms()
                );
            }
        }
        Ok(())
    }

    fn flush_groups(&mut self, reason: FlushReason) -> bool {
        let snapshot = match serde_json::to_string(&self.groups) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.scheduler.mark_failed();
                error!(
                    "event=groups_flush module=service status=error reason={} error_code=snapshot_failed error={err}",
                    reason.label()
                );
                return false;
            }
        };

        if !self.scheduler.is_dirty(&snapshot) {
            return false;
        }

        match self.repo.save(RecordKey::Groups, &snapshot) {
            Ok(()) => {
                info!(
                    "event=groups_flush module=service status=ok reason={} bytes={}",
                    reason.label(),
                    snapshot.len()
                );
                self.scheduler.mark_persisted(snapshot);
                true
            }
            Err(err) => {
                self.scheduler.mark_failed();
                error!(
                    "event=groups_flush module=service status=error reason={} error={err}",
                    reason.label()
                );
                false
            }
        }
    }
}
