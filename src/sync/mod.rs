//! Permission store boundary
//!
//! The editor talks to the remote permission store only through
//! [`PermissionStore`]. Transport and authentication live behind it.
//!
//! The in-memory store implements the same compare-and-swap rules the remote
//! applies and backs the CLI and the tests.

mod conflict;
mod memory;

pub use conflict::ConflictDetector;
pub use memory::{InMemoryPermissionStore, RoleFixture, StoreFixture};

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    ClonePermissionsInput, PermissionGroup, ReplacePermissionsInput, RolePermissionSnapshot,
};

/// Remote operations the editor depends on
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Full catalog, already grouped
    async fn fetch_catalog_grouped(&self) -> Result<Vec<PermissionGroup>>;

    /// Confirmed permissions of every role
    async fn fetch_all_role_permissions(&self) -> Result<Vec<RolePermissionSnapshot>>;

    /// Confirmed permissions of one role
    async fn fetch_role_permissions(&self, role_id: &str) -> Result<RolePermissionSnapshot>;

    /// Replace a role's permissions if `input.version` is still current
    async fn replace_role_permissions(
        &self,
        role_id: &str,
        input: ReplacePermissionsInput,
    ) -> Result<RolePermissionSnapshot>;

    /// Copy the confirmed permissions of `input.from_role_id` onto `target_role_id`
    async fn clone_role_permissions(
        &self,
        target_role_id: &str,
        input: ClonePermissionsInput,
    ) -> Result<RolePermissionSnapshot>;
}
