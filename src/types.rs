//! Core types for Permgrid

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PermgridError, Result};

/// Identifier of a role as issued by the permission store
pub type RoleId = String;

/// Opaque permission code, e.g. `"user:read"`
pub type PermissionCode = String;

/// Opaque optimistic-concurrency token returned by the store
pub type VersionToken = String;

/// Version assumed for a role the store has never reported on
pub const DEFAULT_VERSION: &str = "0";

/// A role as it appears in the roles list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRef {
    pub id: RoleId,
    #[serde(default)]
    pub name: String,
}

impl RoleRef {
    pub fn new(id: impl Into<RoleId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A single grantable capability in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionCatalogItem {
    /// Unique key
    pub code: PermissionCode,
    #[serde(default)]
    pub description: String,
    /// Display group label
    #[serde(default)]
    pub group: String,
}

impl PermissionCatalogItem {
    pub fn new(
        code: impl Into<PermissionCode>,
        description: impl Into<String>,
        group: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            group: group.into(),
        }
    }
}

/// A catalog entry as received, before normalization. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCatalogEntry {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
}

impl From<PermissionCatalogItem> for RawCatalogEntry {
    fn from(item: PermissionCatalogItem) -> Self {
        Self {
            code: Some(item.code),
            description: Some(item.description),
            group: Some(item.group),
        }
    }
}

/// Catalog items under one display group, sorted by code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGroup {
    pub group: String,
    #[serde(default)]
    pub items: Vec<PermissionCatalogItem>,
}

/// Server-confirmed permissions of one role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermissionSnapshot {
    pub role_id: RoleId,
    #[serde(default)]
    pub permissions: Vec<PermissionCatalogItem>,
    #[serde(default)]
    pub version: Option<VersionToken>,
}

impl RolePermissionSnapshot {
    /// Permission codes carried by this snapshot
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.permissions.iter().map(|p| p.code.as_str())
    }

    /// Version token, falling back to [`DEFAULT_VERSION`]
    pub fn version_or_default(&self) -> VersionToken {
        self.version
            .clone()
            .unwrap_or_else(|| DEFAULT_VERSION.to_string())
    }
}

/// Body of a replace-permissions write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacePermissionsInput {
    pub permissions: Vec<PermissionCode>,
    pub version: VersionToken,
}

/// Body of a clone-permissions write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClonePermissionsInput {
    pub from_role_id: RoleId,
}

/// A write rejected because the submitted version was stale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub role_id: RoleId,
    pub message: String,
    pub detected_at: DateTime<Utc>,
}

impl Conflict {
    pub fn new(role_id: impl Into<RoleId>, message: impl Into<String>) -> Self {
        Self {
            role_id: role_id.into(),
            message: message.into(),
            detected_at: Utc::now(),
        }
    }
}

/// A role whose write failed in a batch save
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleFailure {
    pub role_id: RoleId,
    pub message: String,
    /// Whether the failure was classified as a version conflict
    pub conflict: bool,
}

/// Outcome of one batch save
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveResultSummary {
    pub success_count: usize,
    pub failure_count: usize,
    #[serde(default)]
    pub failures: Vec<RoleFailure>,
}

impl SaveResultSummary {
    /// Nothing was submitted
    pub fn is_empty(&self) -> bool {
        self.success_count == 0 && self.failure_count == 0
    }

    /// Some roles were saved and some were not
    pub fn is_partial(&self) -> bool {
        self.success_count > 0 && self.failure_count > 0
    }

    /// Ids of roles whose write hit a version conflict
    pub fn conflicted_roles(&self) -> Vec<&str> {
        self.failures
            .iter()
            .filter(|f| f.conflict)
            .map(|f| f.role_id.as_str())
            .collect()
    }

    /// Err listing the failed roles if any write failed
    pub fn ensure_saved(&self) -> Result<()> {
        if self.failure_count == 0 {
            return Ok(());
        }
        Err(PermgridError::SaveFailed(
            self.failures.iter().map(|f| f.role_id.clone()).collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_version_default() {
        let snapshot = RolePermissionSnapshot {
            role_id: "r1".to_string(),
            permissions: vec![PermissionCatalogItem::new("user:read", "", "")],
            version: None,
        };
        assert_eq!(snapshot.version_or_default(), "0");
        assert_eq!(snapshot.codes().collect::<Vec<_>>(), vec!["user:read"]);
    }

    #[test]
    fn test_snapshot_deserialize_partial() {
        let snapshot: RolePermissionSnapshot =
            serde_json::from_str(r#"{"role_id":"r1","permissions":[{"code":"a"}]}"#).unwrap();
        assert_eq!(snapshot.permissions[0].description, "");
        assert!(snapshot.version.is_none());
    }

    #[test]
    fn test_summary_helpers() {
        let summary = SaveResultSummary {
            success_count: 1,
            failure_count: 2,
            failures: vec![
                RoleFailure {
                    role_id: "r2".to_string(),
                    message: "409 conflict".to_string(),
                    conflict: true,
                },
                RoleFailure {
                    role_id: "r3".to_string(),
                    message: "timeout".to_string(),
                    conflict: false,
                },
            ],
        };
        assert!(summary.is_partial());
        assert!(!summary.is_empty());
        assert_eq!(summary.conflicted_roles(), vec!["r2"]);
        assert!(SaveResultSummary::default().is_empty());

        let err = summary.ensure_saved().unwrap_err();
        assert_eq!(err.code(), "save_failed");
        assert_eq!(err.to_string(), "Failed to save role(s): r2, r3");
    }

    #[test]
    fn test_ensure_saved_ok_without_failures() {
        let summary = SaveResultSummary {
            success_count: 3,
            failure_count: 0,
            failures: Vec::new(),
        };
        assert!(summary.ensure_saved().is_ok());
        assert!(SaveResultSummary::default().ensure_saved().is_ok());
    }
}
