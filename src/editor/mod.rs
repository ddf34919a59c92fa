//! Permission matrix editor
//!
//! Owns the catalog and the role state store, and is the only place that
//! mutates them. Remote calls run without holding the state lock, so writes
//! for different roles overlap while state changes stay one at a time.
//!
//! Per role, at most one write is in flight; the role is read-only for
//! toggles until it settles.

mod clone;
mod reconcile;
mod save;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::catalog::{GroupResolver, PermissionCatalog};
use crate::config::EngineConfig;
use crate::error::{PermgridError, Result};
use crate::matrix::{
    self, CloneDiff, GroupChangeCount, PermissionDiff, RolePermissionDraft, RoleSetChange,
    RoleStateStore, RoleSummary,
};
use crate::sync::{ConflictDetector, PermissionStore};
use crate::types::{Conflict, PermissionGroup, RoleId, RolePermissionSnapshot, RoleRef};

/// Where a role stood when a write or refresh was dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WriteTicket {
    generation: u64,
    revision: u64,
}

#[derive(Debug, Default)]
struct EditorState {
    catalog: PermissionCatalog,
    roles: RoleStateStore,
    conflicts: BTreeMap<RoleId, Conflict>,
    in_flight: HashSet<RoleId>,
    /// Bumped on every full rebuild, which resets per-role revisions
    generation: u64,
}

impl EditorState {
    fn ticket(&self, role: &RolePermissionDraft) -> WriteTicket {
        WriteTicket {
            generation: self.generation,
            revision: role.revision,
        }
    }

    /// Apply a confirmed write unless the role moved on since dispatch
    fn apply_confirmed(
        &mut self,
        role_id: &str,
        ticket: WriteTicket,
        snapshot: RolePermissionSnapshot,
    ) -> bool {
        self.catalog.merge_items(snapshot.permissions.iter().cloned());

        let generation = self.generation;
        let Some(role) = self.roles.get_mut(role_id) else {
            debug!("Ignoring write result for departed role {}", role_id);
            return false;
        };
        if generation != ticket.generation || role.revision != ticket.revision {
            warn!(
                "Discarding stale write result for role {} (version {:?})",
                role_id, snapshot.version
            );
            return false;
        }

        let version = snapshot.version_or_default();
        role.apply_confirmed(snapshot.codes().map(String::from).collect(), version);
        self.conflicts.remove(role_id);
        true
    }
}

/// The message a user should see for a failed write
fn failure_message(err: &PermgridError) -> String {
    match err {
        PermgridError::VersionConflict { message, .. } | PermgridError::Remote(message) => {
            message.clone()
        }
        other => other.to_string(),
    }
}

/// Editable permission matrix backed by a [`PermissionStore`]
pub struct PermissionEditor {
    store: Arc<dyn PermissionStore>,
    detector: ConflictDetector,
    state: Mutex<EditorState>,
}

impl std::fmt::Debug for PermissionEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionEditor")
            .field("store", &"[Arc<dyn PermissionStore>]")
            .field("detector", &self.detector)
            .field("state", &self.state)
            .finish()
    }
}

impl PermissionEditor {
    /// Editor with the default group table and conflict markers
    pub fn new(store: Arc<dyn PermissionStore>) -> Self {
        Self {
            store,
            detector: ConflictDetector::default(),
            state: Mutex::new(EditorState::default()),
        }
    }

    pub fn with_config(store: Arc<dyn PermissionStore>, config: &EngineConfig) -> Result<Self> {
        let state = EditorState {
            catalog: PermissionCatalog::new(GroupResolver::from_config(config)),
            ..Default::default()
        };
        Ok(Self {
            store,
            detector: ConflictDetector::new(&config.conflict_markers)?,
            state: Mutex::new(state),
        })
    }

    /// Replace the conflict classifier
    pub fn with_detector(mut self, detector: ConflictDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Follow a new roles list without touching surviving roles
    pub fn set_roles(&self, roles: &[RoleRef]) -> RoleSetChange {
        let mut state = self.state.lock();
        let change = state.roles.reconcile_role_set(roles);
        for id in &change.removed {
            state.conflicts.remove(id);
        }
        if !change.added.is_empty() || !change.removed.is_empty() {
            debug!(
                "Roles list changed: +{} -{}",
                change.added.len(),
                change.removed.len()
            );
        }
        change
    }

    /// Grant or revoke a code in a role's draft.
    ///
    /// Returns false when nothing changed: unknown role, a write in flight
    /// for the role, or the draft already in the requested state.
    pub fn toggle(&self, role_id: &str, code: &str, checked: bool) -> bool {
        let mut state = self.state.lock();
        if state.in_flight.contains(role_id) {
            debug!("Ignoring toggle on role {} while its write is pending", role_id);
            return false;
        }
        state.roles.toggle(role_id, code, checked)
    }

    /// Drop unsaved edits of one role
    pub fn discard(&self, role_id: &str) -> bool {
        let mut state = self.state.lock();
        if state.in_flight.contains(role_id) {
            return false;
        }
        match state.roles.get_mut(role_id) {
            Some(role) if role.is_dirty() => {
                role.discard_draft();
                true
            }
            _ => false,
        }
    }

    pub fn is_dirty(&self, role_id: &str) -> bool {
        self.state.lock().roles.is_dirty(role_id)
    }

    /// Whether a write for the role has not settled yet
    pub fn is_saving(&self, role_id: &str) -> bool {
        self.state.lock().in_flight.contains(role_id)
    }

    pub fn dirty_roles(&self) -> Vec<RoleId> {
        self.state.lock().roles.dirty_roles()
    }

    pub fn role(&self, role_id: &str) -> Option<RolePermissionDraft> {
        self.state.lock().roles.get(role_id).cloned()
    }

    pub fn roles(&self) -> Vec<RoleRef> {
        self.state.lock().roles.roles()
    }

    pub fn diff(&self, role_id: &str) -> Option<PermissionDiff> {
        self.state.lock().roles.get(role_id).map(matrix::diff)
    }

    pub fn groups(&self) -> Vec<PermissionGroup> {
        self.state.lock().catalog.groups()
    }

    /// A copy of the normalized catalog
    pub fn catalog(&self) -> PermissionCatalog {
        self.state.lock().catalog.clone()
    }

    pub fn conflicts(&self) -> Vec<Conflict> {
        self.state.lock().conflicts.values().cloned().collect()
    }

    pub fn conflict(&self, role_id: &str) -> Option<Conflict> {
        self.state.lock().conflicts.get(role_id).cloned()
    }

    pub fn summaries(&self) -> Vec<RoleSummary> {
        let state = self.state.lock();
        matrix::summarize(&state.roles, &state.conflicts)
    }

    pub fn group_change_counts(&self, role_id: &str) -> Vec<GroupChangeCount> {
        let state = self.state.lock();
        match state.roles.get(role_id) {
            Some(role) => matrix::group_change_counts(&state.catalog, role),
            None => Vec::new(),
        }
    }

    /// Catalog groups filtered down to the role's pending changes
    pub fn changed_only(&self, role_id: &str) -> Vec<PermissionGroup> {
        let state = self.state.lock();
        match state.roles.get(role_id) {
            Some(role) => matrix::changed_only(&state.catalog.groups(), role),
            None => Vec::new(),
        }
    }

    /// Preview what cloning `source_role_id` onto `target_role_id` would change
    pub fn preview_clone(&self, target_role_id: &str, source_role_id: &str) -> Option<CloneDiff> {
        let state = self.state.lock();
        let target = state.roles.get(target_role_id)?;
        let source = state.roles.get(source_role_id)?;
        Some(matrix::clone_diff(target, source))
    }
}
