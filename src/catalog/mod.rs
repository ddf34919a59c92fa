//! Permission catalog
//!
//! Provides:
//! - Normalization of raw and grouped catalog entries
//! - Prefix-based group inference
//! - An append-only catalog that remembers group display order

mod groups;
mod normalize;

pub use groups::{compare_labels, infer_group, GroupResolver};
pub use normalize::{
    extend_group_order, flatten_groups, group_items, merge_item, normalize_entries,
};

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use crate::types::{PermissionCatalogItem, PermissionGroup, RawCatalogEntry};

/// The normalized catalog of every permission code seen this session.
///
/// Codes are never removed once merged; only a full [`replace_grouped`]
/// starts over.
///
/// [`replace_grouped`]: PermissionCatalog::replace_grouped
#[derive(Debug, Clone, Default)]
pub struct PermissionCatalog {
    resolver: GroupResolver,
    items: BTreeMap<String, PermissionCatalogItem>,
    group_order: Vec<String>,
}

impl PermissionCatalog {
    pub fn new(resolver: GroupResolver) -> Self {
        Self {
            resolver,
            items: BTreeMap::new(),
            group_order: Vec::new(),
        }
    }

    pub fn resolver(&self) -> &GroupResolver {
        &self.resolver
    }

    /// Rebuild from a grouped catalog response, adopting its group order
    pub fn replace_grouped(&mut self, groups: Vec<PermissionGroup>) {
        let (entries, order) = flatten_groups(groups);
        let items = normalize_entries(entries, &self.resolver);
        self.group_order = extend_group_order(&order, &items);
        self.items = items.into_iter().map(|i| (i.code.clone(), i)).collect();
    }

    /// Union raw entries into the catalog. Returns the number of new codes.
    pub fn merge_entries<I>(&mut self, entries: I) -> usize
    where
        I: IntoIterator<Item = RawCatalogEntry>,
    {
        let normalized = normalize_entries(entries, &self.resolver);
        let mut added = 0;
        for item in normalized {
            match self.items.entry(item.code.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(item);
                    added += 1;
                }
                Entry::Occupied(mut slot) => merge_item(slot.get_mut(), item),
            }
        }
        if added > 0 {
            let items: Vec<PermissionCatalogItem> = self.items.values().cloned().collect();
            self.group_order = extend_group_order(&self.group_order, &items);
        }
        added
    }

    /// Union already-shaped items, e.g. those carried by a role snapshot
    pub fn merge_items<I>(&mut self, items: I) -> usize
    where
        I: IntoIterator<Item = PermissionCatalogItem>,
    {
        self.merge_entries(items.into_iter().map(RawCatalogEntry::from))
    }

    pub fn get(&self, code: &str) -> Option<&PermissionCatalogItem> {
        self.items.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.items.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in code order
    pub fn items(&self) -> impl Iterator<Item = &PermissionCatalogItem> {
        self.items.values()
    }

    pub fn group_order(&self) -> &[String] {
        &self.group_order
    }

    /// Display groups in remembered order
    pub fn groups(&self) -> Vec<PermissionGroup> {
        let items: Vec<PermissionCatalogItem> = self.items.values().cloned().collect();
        group_items(&items, &self.group_order)
    }

    /// Codes belonging to one group
    pub fn codes_in_group(&self, group: &str) -> BTreeSet<String> {
        self.items
            .values()
            .filter(|i| i.group == group)
            .map(|i| i.code.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grouped() -> Vec<PermissionGroup> {
        vec![
            PermissionGroup {
                group: "Roles".to_string(),
                items: vec![PermissionCatalogItem::new("role:read", "Read roles", "")],
            },
            PermissionGroup {
                group: "Users".to_string(),
                items: vec![
                    PermissionCatalogItem::new("user:write", "", ""),
                    PermissionCatalogItem::new("user:read", "Read users", ""),
                ],
            },
        ]
    }

    #[test]
    fn test_replace_grouped_keeps_server_order() {
        let mut catalog = PermissionCatalog::default();
        catalog.replace_grouped(grouped());

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.group_order(), &["Roles".to_string(), "Users".to_string()]);
        let groups = catalog.groups();
        assert_eq!(groups[0].group, "Roles");
        assert_eq!(groups[1].items[0].code, "user:read");
    }

    #[test]
    fn test_merge_is_append_only() {
        let mut catalog = PermissionCatalog::default();
        catalog.replace_grouped(grouped());

        let added = catalog.merge_items(vec![
            PermissionCatalogItem::new("user:write", "Edit users", ""),
            PermissionCatalogItem::new("billing:view", "", ""),
        ]);
        assert_eq!(added, 1);
        assert_eq!(catalog.get("user:write").unwrap().description, "Edit users");
        assert_eq!(catalog.get("billing:view").unwrap().group, "Other");
        assert_eq!(
            catalog.group_order(),
            &["Roles".to_string(), "Users".to_string(), "Other".to_string()]
        );

        // merging nothing new leaves everything in place
        assert_eq!(catalog.merge_items(Vec::new()), 0);
        assert_eq!(catalog.len(), 4);
    }

    #[test]
    fn test_codes_in_group() {
        let mut catalog = PermissionCatalog::default();
        catalog.replace_grouped(grouped());
        let codes = catalog.codes_in_group("Users");
        assert_eq!(codes.len(), 2);
        assert!(codes.contains("user:read"));
        assert!(catalog.codes_in_group("Nope").is_empty());
    }
}
