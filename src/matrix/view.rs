//! Read-only projections over the role state store

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{diff, diff_within, RolePermissionDraft, RoleStateStore};
use crate::catalog::PermissionCatalog;
use crate::types::{Conflict, PermissionGroup, RoleId};

/// One row of the role summary cards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSummary {
    pub role_id: RoleId,
    pub name: String,
    /// Codes granted in the draft
    pub granted: usize,
    pub added: usize,
    pub removed: usize,
    pub dirty: bool,
    pub conflict: bool,
}

/// Pending changes of one role inside one catalog group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupChangeCount {
    pub group: String,
    pub added: usize,
    pub removed: usize,
}

impl GroupChangeCount {
    pub fn total(&self) -> usize {
        self.added + self.removed
    }
}

pub fn summarize(store: &RoleStateStore, conflicts: &BTreeMap<RoleId, Conflict>) -> Vec<RoleSummary> {
    store
        .iter()
        .map(|state| {
            let d = diff(state);
            RoleSummary {
                role_id: state.role.id.clone(),
                name: state.role.name.clone(),
                granted: state.draft.len(),
                added: d.added.len(),
                removed: d.removed.len(),
                dirty: !d.is_empty(),
                conflict: conflicts.contains_key(&state.role.id),
            }
        })
        .collect()
}

/// Per-group change counters in display order
pub fn group_change_counts(
    catalog: &PermissionCatalog,
    state: &RolePermissionDraft,
) -> Vec<GroupChangeCount> {
    catalog
        .groups()
        .into_iter()
        .map(|group| {
            let scope: BTreeSet<String> = group.items.iter().map(|i| i.code.clone()).collect();
            let d = diff_within(state, &scope);
            GroupChangeCount {
                group: group.group,
                added: d.added.len(),
                removed: d.removed.len(),
            }
        })
        .collect()
}

/// Only the items whose draft membership differs from the base; empty groups dropped
pub fn changed_only(groups: &[PermissionGroup], state: &RolePermissionDraft) -> Vec<PermissionGroup> {
    groups
        .iter()
        .filter_map(|group| {
            let items: Vec<_> = group
                .items
                .iter()
                .filter(|i| state.base.contains(&i.code) != state.draft.contains(&i.code))
                .cloned()
                .collect();
            if items.is_empty() {
                None
            } else {
                Some(PermissionGroup {
                    group: group.group.clone(),
                    items,
                })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::PermissionSet;
    use crate::types::{PermissionCatalogItem, RoleRef, RolePermissionSnapshot};

    fn catalog() -> PermissionCatalog {
        let mut catalog = PermissionCatalog::default();
        catalog.replace_grouped(vec![
            PermissionGroup {
                group: "Users".to_string(),
                items: vec![
                    PermissionCatalogItem::new("user:read", "", ""),
                    PermissionCatalogItem::new("user:write", "", ""),
                ],
            },
            PermissionGroup {
                group: "Roles".to_string(),
                items: vec![PermissionCatalogItem::new("role:read", "", "")],
            },
        ]);
        catalog
    }

    fn store() -> RoleStateStore {
        let mut store = RoleStateStore::new();
        store.initialize(
            &[RoleRef::new("r1", "Manager"), RoleRef::new("r2", "Staff")],
            &[RolePermissionSnapshot {
                role_id: "r1".to_string(),
                permissions: vec![PermissionCatalogItem::new("user:read", "", "")],
                version: Some("1".to_string()),
            }],
        );
        store.toggle("r1", "user:read", false);
        store.toggle("r1", "user:write", true);
        store.toggle("r1", "role:read", true);
        store
    }

    #[test]
    fn test_summarize() {
        let store = store();
        let mut conflicts = BTreeMap::new();
        conflicts.insert("r2".to_string(), Conflict::new("r2", "409"));

        let summaries = summarize(&store, &conflicts);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].granted, 2);
        assert_eq!(summaries[0].added, 2);
        assert_eq!(summaries[0].removed, 1);
        assert!(summaries[0].dirty);
        assert!(!summaries[0].conflict);
        assert!(!summaries[1].dirty);
        assert!(summaries[1].conflict);
    }

    #[test]
    fn test_group_change_counts() {
        let store = store();
        let counts = group_change_counts(&catalog(), store.get("r1").unwrap());
        assert_eq!(counts[0].group, "Users");
        assert_eq!(counts[0].total(), 2);
        assert_eq!(counts[1].group, "Roles");
        assert_eq!(counts[1].added, 1);
    }

    #[test]
    fn test_changed_only() {
        let mut store = store();
        store.get_mut("r1").unwrap().draft = PermissionSet::from_codes(["user:read", "role:read"]);
        let groups = changed_only(&catalog().groups(), store.get("r1").unwrap());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].group, "Roles");
        assert_eq!(groups[0].items[0].code, "role:read");
    }
}
