//! Per-role editable state

use serde::{Deserialize, Serialize};

use super::PermissionSet;
use crate::types::{RoleRef, VersionToken, DEFAULT_VERSION};

/// The `(base, draft, version)` triple for one role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermissionDraft {
    pub role: RoleRef,
    /// Last set confirmed by the store
    pub base: PermissionSet,
    /// Locally edited working set
    pub draft: PermissionSet,
    /// Token that must accompany the next write
    pub version: VersionToken,
    /// Local counter bumped whenever `base`/`version` change
    pub revision: u64,
}

impl RolePermissionDraft {
    /// State for a role the store has not reported on
    pub fn empty(role: RoleRef) -> Self {
        Self {
            role,
            base: PermissionSet::new(),
            draft: PermissionSet::new(),
            version: DEFAULT_VERSION.to_string(),
            revision: 0,
        }
    }

    pub fn confirmed(role: RoleRef, base: PermissionSet, version: VersionToken) -> Self {
        Self {
            role,
            draft: base.clone(),
            base,
            version,
            revision: 0,
        }
    }

    pub fn is_dirty(&self) -> bool {
        !self.draft.same_as(&self.base)
    }

    /// Edit the draft. Returns true if the draft changed.
    pub fn toggle(&mut self, code: &str, checked: bool) -> bool {
        self.draft.set(code, checked)
    }

    /// Throw away local edits
    pub fn discard_draft(&mut self) {
        self.draft = self.base.clone();
    }

    /// Adopt a set the store confirmed for a write (save or clone)
    pub fn apply_confirmed(&mut self, base: PermissionSet, version: VersionToken) {
        self.draft = base.clone();
        self.base = base;
        self.version = version;
        self.revision += 1;
    }

    /// Adopt freshly fetched state, optionally keeping the current draft
    pub fn apply_refresh(&mut self, base: PermissionSet, version: VersionToken, preserve_draft: bool) {
        if !preserve_draft {
            self.draft = base.clone();
        }
        self.base = base;
        self.version = version;
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role() -> RoleRef {
        RoleRef::new("r1", "Manager")
    }

    #[test]
    fn test_empty_defaults() {
        let state = RolePermissionDraft::empty(role());
        assert!(state.base.is_empty());
        assert!(state.draft.is_empty());
        assert_eq!(state.version, "0");
        assert!(!state.is_dirty());
    }

    #[test]
    fn test_toggle_marks_dirty() {
        let mut state = RolePermissionDraft::confirmed(
            role(),
            PermissionSet::from_codes(["user:read"]),
            "1".to_string(),
        );
        assert!(state.toggle("user:write", true));
        assert!(state.is_dirty());
        assert!(state.toggle("user:write", false));
        assert!(!state.is_dirty());
    }

    #[test]
    fn test_apply_confirmed_resets_draft() {
        let mut state = RolePermissionDraft::empty(role());
        state.toggle("a", true);
        state.apply_confirmed(PermissionSet::from_codes(["a", "b"]), "2".to_string());
        assert_eq!(state.draft, state.base);
        assert_eq!(state.version, "2");
        assert_eq!(state.revision, 1);
    }

    #[test]
    fn test_apply_refresh_preserves_draft() {
        let mut state = RolePermissionDraft::empty(role());
        state.toggle("a", true);

        state.apply_refresh(PermissionSet::from_codes(["b"]), "5".to_string(), true);
        assert_eq!(state.draft, PermissionSet::from_codes(["a"]));
        assert_eq!(state.base, PermissionSet::from_codes(["b"]));

        state.apply_refresh(PermissionSet::from_codes(["c"]), "6".to_string(), false);
        assert_eq!(state.draft, PermissionSet::from_codes(["c"]));
        assert_eq!(state.revision, 2);
    }
}
