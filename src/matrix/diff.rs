//! Set differences between base and draft, and between roles

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{PermissionSet, RolePermissionDraft};
use crate::types::PermissionCode;

/// Local edits of one role relative to its confirmed base
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDiff {
    /// In the draft, not in the base
    pub added: Vec<PermissionCode>,
    /// In the base, not in the draft
    pub removed: Vec<PermissionCode>,
}

impl PermissionDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Total number of changed codes
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len()
    }

    /// Replay the diff on top of `base`
    pub fn apply_to(&self, base: &PermissionSet) -> PermissionSet {
        let mut result = base.clone();
        for code in &self.added {
            result.add(code.as_str());
        }
        for code in &self.removed {
            result.remove(code);
        }
        result
    }
}

/// What committing a clone would change on the target role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneDiff {
    /// Granted by the source, missing on the target
    pub additions: Vec<PermissionCode>,
    /// Granted on the target, missing on the source
    pub removals: Vec<PermissionCode>,
}

impl CloneDiff {
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty()
    }
}

pub fn diff_sets(base: &PermissionSet, draft: &PermissionSet) -> PermissionDiff {
    PermissionDiff {
        added: draft.difference(base),
        removed: base.difference(draft),
    }
}

/// Draft changes of a role
pub fn diff(state: &RolePermissionDraft) -> PermissionDiff {
    diff_sets(&state.base, &state.draft)
}

/// Draft changes restricted to the codes in `scope`, e.g. one catalog group
pub fn diff_within(state: &RolePermissionDraft, scope: &BTreeSet<PermissionCode>) -> PermissionDiff {
    diff_sets(&state.base.restricted_to(scope), &state.draft.restricted_to(scope))
}

/// Compare confirmed sets only; drafts play no part in cloning
pub fn clone_diff(target: &RolePermissionDraft, source: &RolePermissionDraft) -> CloneDiff {
    CloneDiff {
        additions: source.base.difference(&target.base),
        removals: target.base.difference(&source.base),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RoleRef;

    fn state(id: &str, base: &[&str], draft: &[&str]) -> RolePermissionDraft {
        let mut s = RolePermissionDraft::confirmed(
            RoleRef::new(id, id),
            PermissionSet::from_codes(base.iter().copied()),
            "1".to_string(),
        );
        s.draft = PermissionSet::from_codes(draft.iter().copied());
        s
    }

    #[test]
    fn test_diff_added_removed() {
        let s = state("r1", &["a", "b"], &["b", "c", "d"]);
        let d = diff(&s);
        assert_eq!(d.added, vec!["c".to_string(), "d".to_string()]);
        assert_eq!(d.removed, vec!["a".to_string()]);
        assert_eq!(d.len(), 3);
        assert_eq!(d.apply_to(&s.base), s.draft);
    }

    #[test]
    fn test_diff_clean_role() {
        let s = state("r1", &["a"], &["a"]);
        assert!(diff(&s).is_empty());
    }

    #[test]
    fn test_diff_within_group() {
        let s = state("r1", &["user:read", "role:read"], &["user:write", "role:read", "role:write"]);
        let scope: BTreeSet<String> = ["user:read".to_string(), "user:write".to_string()]
            .into_iter()
            .collect();
        let d = diff_within(&s, &scope);
        assert_eq!(d.added, vec!["user:write".to_string()]);
        assert_eq!(d.removed, vec!["user:read".to_string()]);
    }

    #[test]
    fn test_clone_diff_uses_base_sets() {
        let target = state("r1", &["a", "c"], &["a", "c", "z"]);
        let source = state("r2", &["a", "b"], &[]);
        let d = clone_diff(&target, &source);
        assert_eq!(d.additions, vec!["b".to_string()]);
        assert_eq!(d.removals, vec!["c".to_string()]);
    }
}
