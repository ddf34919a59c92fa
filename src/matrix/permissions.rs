//! Permission code sets

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::PermissionCode;

/// An ordered set of permission codes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet {
    codes: BTreeSet<PermissionCode>,
}

impl PermissionSet {
    /// Create an empty permission set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a permission set from a list of codes
    pub fn from_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PermissionCode>,
    {
        Self {
            codes: codes.into_iter().map(Into::into).collect(),
        }
    }

    /// Add a code. Returns true if it was not present.
    pub fn add(&mut self, code: impl Into<PermissionCode>) -> bool {
        self.codes.insert(code.into())
    }

    /// Remove a code. Returns true if it was present.
    pub fn remove(&mut self, code: &str) -> bool {
        self.codes.remove(code)
    }

    /// Add or remove depending on `checked`. Returns true if the set changed.
    pub fn set(&mut self, code: &str, checked: bool) -> bool {
        if checked {
            self.add(code)
        } else {
            self.remove(code)
        }
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PermissionCode> {
        self.codes.iter()
    }

    /// Set equality with a size check up front
    pub fn same_as(&self, other: &PermissionSet) -> bool {
        if self.codes.len() != other.codes.len() {
            return false;
        }
        self.codes.iter().all(|c| other.codes.contains(c))
    }

    /// Codes in `self` but not in `other`, in code order
    pub fn difference(&self, other: &PermissionSet) -> Vec<PermissionCode> {
        self.codes.difference(&other.codes).cloned().collect()
    }

    /// Keep only codes that are also in `scope`
    pub fn restricted_to(&self, scope: &BTreeSet<PermissionCode>) -> PermissionSet {
        Self {
            codes: self.codes.intersection(scope).cloned().collect(),
        }
    }

    /// Merge another permission set into this one
    pub fn merge(&mut self, other: &PermissionSet) {
        self.codes.extend(other.codes.iter().cloned());
    }

    /// Get all codes as a vector
    pub fn to_vec(&self) -> Vec<PermissionCode> {
        self.codes.iter().cloned().collect()
    }
}

impl FromIterator<PermissionCode> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = PermissionCode>>(iter: T) -> Self {
        Self {
            codes: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a PermissionSet {
    type Item = &'a PermissionCode;
    type IntoIter = std::collections::btree_set::Iter<'a, PermissionCode>;

    fn into_iter(self) -> Self::IntoIter {
        self.codes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_set_basic() {
        let mut set = PermissionSet::new();
        assert!(set.add("user:read"));
        assert!(!set.add("user:read"));

        assert!(set.contains("user:read"));
        assert!(!set.contains("user:write"));
        assert!(set.remove("user:read"));
        assert!(set.is_empty());
    }

    #[test]
    fn test_set_toggle() {
        let mut set = PermissionSet::from_codes(["a"]);
        assert!(set.set("b", true));
        assert!(!set.set("b", true));
        assert!(set.set("a", false));
        assert_eq!(set.to_vec(), vec!["b".to_string()]);
    }

    #[test]
    fn test_same_as_ignores_insert_order() {
        let a = PermissionSet::from_codes(["x", "y", "z"]);
        let b = PermissionSet::from_codes(["z", "x", "y"]);
        let c = PermissionSet::from_codes(["x", "y", "w"]);
        assert!(a.same_as(&b));
        assert!(!a.same_as(&c));
        assert!(!a.same_as(&PermissionSet::from_codes(["x"])));
    }

    #[test]
    fn test_difference_and_restrict() {
        let a = PermissionSet::from_codes(["a", "b", "c"]);
        let b = PermissionSet::from_codes(["b", "d"]);
        assert_eq!(a.difference(&b), vec!["a".to_string(), "c".to_string()]);

        let scope: BTreeSet<String> = ["a".to_string(), "d".to_string()].into_iter().collect();
        assert_eq!(a.restricted_to(&scope).to_vec(), vec!["a".to_string()]);
    }

    #[test]
    fn test_merge() {
        let mut set1 = PermissionSet::from_codes(["a"]);
        set1.merge(&PermissionSet::from_codes(["b"]));
        assert!(set1.contains("a"));
        assert!(set1.contains("b"));
    }

    #[test]
    fn test_serialization() {
        let set = PermissionSet::from_codes(["user:write", "user:read"]);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["user:read","user:write"]"#);
        let restored: PermissionSet = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, set);
    }
}
