//! Role permission matrix state
//!
//! Provides:
//! - Per-role base/draft/version state
//! - The role state store, one entry per known role
//! - Base/draft and role-to-role diffs
//! - Read-only projections for summaries and filters

mod diff;
mod permissions;
mod state;
mod view;

pub use diff::{clone_diff, diff, diff_sets, diff_within, CloneDiff, PermissionDiff};
pub use permissions::PermissionSet;
pub use state::RolePermissionDraft;
pub use view::{changed_only, group_change_counts, summarize, GroupChangeCount, RoleSummary};

use std::collections::{HashMap, HashSet};

use crate::types::{RoleId, RoleRef, RolePermissionSnapshot};

/// Roles that entered and left the roles list in one reconcile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSetChange {
    pub added: Vec<RoleId>,
    pub removed: Vec<RoleId>,
}

/// Exactly one [`RolePermissionDraft`] per known role, kept in roles-list order
#[derive(Debug, Clone, Default)]
pub struct RoleStateStore {
    order: Vec<RoleId>,
    states: HashMap<RoleId, RolePermissionDraft>,
}

impl RoleStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild every role from a full snapshot. Roles missing from it start empty.
    pub fn initialize(&mut self, roles: &[RoleRef], snapshots: &[RolePermissionSnapshot]) {
        let by_role: HashMap<&str, &RolePermissionSnapshot> =
            snapshots.iter().map(|s| (s.role_id.as_str(), s)).collect();

        self.order.clear();
        self.states.clear();
        for role in roles {
            if self.states.contains_key(&role.id) {
                continue;
            }
            let state = match by_role.get(role.id.as_str()) {
                Some(snapshot) => RolePermissionDraft::confirmed(
                    role.clone(),
                    snapshot.codes().map(String::from).collect(),
                    snapshot.version_or_default(),
                ),
                None => RolePermissionDraft::empty(role.clone()),
            };
            self.order.push(role.id.clone());
            self.states.insert(role.id.clone(), state);
        }
    }

    /// Follow the roles list: add empty state for new roles, drop departed ones.
    ///
    /// Roles present before and after keep their state untouched apart from
    /// the display name.
    pub fn reconcile_role_set(&mut self, roles: &[RoleRef]) -> RoleSetChange {
        let wanted: HashSet<&str> = roles.iter().map(|r| r.id.as_str()).collect();
        let mut change = RoleSetChange::default();

        self.order.retain(|id| {
            let keep = wanted.contains(id.as_str());
            if !keep {
                change.removed.push(id.clone());
            }
            keep
        });
        for id in &change.removed {
            self.states.remove(id);
        }

        let mut order = Vec::with_capacity(roles.len());
        for role in roles {
            if order.contains(&role.id) {
                continue;
            }
            match self.states.get_mut(&role.id) {
                Some(state) => state.role.name = role.name.clone(),
                None => {
                    self.states
                        .insert(role.id.clone(), RolePermissionDraft::empty(role.clone()));
                    change.added.push(role.id.clone());
                }
            }
            order.push(role.id.clone());
        }
        self.order = order;

        change
    }

    /// Edit one role's draft. Unknown roles are ignored.
    pub fn toggle(&mut self, role_id: &str, code: &str, checked: bool) -> bool {
        match self.states.get_mut(role_id) {
            Some(state) => state.toggle(code, checked),
            None => false,
        }
    }

    pub fn is_dirty(&self, role_id: &str) -> bool {
        self.states.get(role_id).is_some_and(|s| s.is_dirty())
    }

    /// Dirty role ids in roles-list order
    pub fn dirty_roles(&self) -> Vec<RoleId> {
        self.iter()
            .filter(|s| s.is_dirty())
            .map(|s| s.role.id.clone())
            .collect()
    }

    pub fn get(&self, role_id: &str) -> Option<&RolePermissionDraft> {
        self.states.get(role_id)
    }

    pub fn get_mut(&mut self, role_id: &str) -> Option<&mut RolePermissionDraft> {
        self.states.get_mut(role_id)
    }

    pub fn contains(&self, role_id: &str) -> bool {
        self.states.contains_key(role_id)
    }

    /// States in roles-list order
    pub fn iter(&self) -> impl Iterator<Item = &RolePermissionDraft> {
        self.order.iter().filter_map(|id| self.states.get(id))
    }

    pub fn roles(&self) -> Vec<RoleRef> {
        self.iter().map(|s| s.role.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
