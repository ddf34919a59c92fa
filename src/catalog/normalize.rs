//! Catalog normalization: dedup, group labeling and ordering

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};

use super::groups::{compare_labels, GroupResolver};
use crate::types::{PermissionCatalogItem, PermissionGroup, RawCatalogEntry};

/// Normalize raw entries into a deduplicated catalog sorted by code.
///
/// Entries without a code are dropped. Duplicates are merged keeping the
/// first non-empty description and group.
pub fn normalize_entries<I>(entries: I, resolver: &GroupResolver) -> Vec<PermissionCatalogItem>
where
    I: IntoIterator<Item = RawCatalogEntry>,
{
    let mut merged: BTreeMap<String, PermissionCatalogItem> = BTreeMap::new();

    for entry in entries {
        let code = match entry.code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => code.to_string(),
            _ => {
                tracing::debug!("Dropping catalog entry without code: {:?}", entry);
                continue;
            }
        };
        let group = resolver.resolve(&code, entry.group.as_deref());
        let description = entry
            .description
            .map(|d| d.trim().to_string())
            .unwrap_or_default();

        let item = PermissionCatalogItem {
            code,
            description,
            group,
        };
        match merged.entry(item.code.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(item);
            }
            Entry::Occupied(mut slot) => merge_item(slot.get_mut(), item),
        }
    }

    merged.into_values().collect()
}

/// Fill empty fields of `existing` from `incoming`
pub fn merge_item(existing: &mut PermissionCatalogItem, incoming: PermissionCatalogItem) {
    if existing.description.is_empty() && !incoming.description.is_empty() {
        existing.description = incoming.description;
    }
    if existing.group.is_empty() && !incoming.group.is_empty() {
        existing.group = incoming.group;
    }
}

/// Flatten grouped catalog entries, returning them with the group order they came in.
///
/// Items without a group of their own take the label of the group they sit in.
pub fn flatten_groups(groups: Vec<PermissionGroup>) -> (Vec<RawCatalogEntry>, Vec<String>) {
    let mut order = Vec::with_capacity(groups.len());
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for group in groups {
        let label = group.group.trim().to_string();
        if !label.is_empty() && seen.insert(label.clone()) {
            order.push(label.clone());
        }
        for item in group.items {
            let explicit = if item.group.trim().is_empty() {
                label.clone()
            } else {
                item.group
            };
            entries.push(RawCatalogEntry {
                code: Some(item.code),
                description: Some(item.description),
                group: Some(explicit),
            });
        }
    }

    (entries, order)
}

/// Extend `known` with labels from `items` it does not contain yet, sorted.
///
/// Returns the full order: known labels first, in caller order, then new ones.
pub fn extend_group_order(known: &[String], items: &[PermissionCatalogItem]) -> Vec<String> {
    let mut order: Vec<String> = Vec::with_capacity(known.len());
    let mut seen: HashSet<&str> = HashSet::new();
    for label in known {
        if seen.insert(label.as_str()) {
            order.push(label.clone());
        }
    }

    let mut discovered: Vec<&str> = items
        .iter()
        .map(|i| i.group.as_str())
        .filter(|g| !seen.contains(g))
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    discovered.sort_by(|a, b| compare_labels(a, b));

    order.extend(discovered.into_iter().map(String::from));
    order
}

/// Bucket catalog items into display groups.
///
/// Groups follow `known_order` then newly discovered labels sorted; groups
/// without items are omitted. Items inside a group are sorted by code.
pub fn group_items(items: &[PermissionCatalogItem], known_order: &[String]) -> Vec<PermissionGroup> {
    let order = extend_group_order(known_order, items);

    let mut buckets: BTreeMap<&str, Vec<PermissionCatalogItem>> = BTreeMap::new();
    for item in items {
        buckets
            .entry(item.group.as_str())
            .or_default()
            .push(item.clone());
    }

    order
        .iter()
        .filter_map(|label| {
            buckets.remove(label.as_str()).map(|mut items| {
                items.sort_by(|a, b| a.code.cmp(&b.code));
                PermissionGroup {
                    group: label.clone(),
                    items,
                }
            })
        })
        .collect()
}
