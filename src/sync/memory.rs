//! In-memory permission store with compare-and-swap writes

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::PermissionStore;
use crate::error::{PermgridError, Result};
use crate::types::{
    ClonePermissionsInput, PermissionCatalogItem, PermissionGroup, ReplacePermissionsInput,
    RoleId, RolePermissionSnapshot, RoleRef,
};

fn default_version() -> u64 {
    1
}

/// One role as persisted in a fixture file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleFixture {
    pub role_id: RoleId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default = "default_version")]
    pub version: u64,
}

/// On-disk layout of the in-memory store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreFixture {
    #[serde(default)]
    pub catalog: Vec<PermissionGroup>,
    #[serde(default)]
    pub roles: Vec<RoleFixture>,
}

#[derive(Debug, Clone)]
struct StoredRole {
    name: String,
    permissions: BTreeSet<String>,
    version: u64,
}

#[derive(Debug, Default)]
struct Inner {
    catalog: Vec<PermissionGroup>,
    /// Insertion order of roles, for stable listing
    order: Vec<RoleId>,
    roles: HashMap<RoleId, StoredRole>,
}

impl Inner {
    fn item_lookup(&self) -> BTreeMap<&str, &PermissionCatalogItem> {
        self.catalog
            .iter()
            .flat_map(|g| g.items.iter())
            .map(|i| (i.code.as_str(), i))
            .collect()
    }

    fn snapshot(&self, role_id: &str) -> Result<RolePermissionSnapshot> {
        let role = self
            .roles
            .get(role_id)
            .ok_or_else(|| PermgridError::NotFound(role_id.to_string()))?;
        let lookup = self.item_lookup();
        let permissions = role
            .permissions
            .iter()
            .map(|code| match lookup.get(code.as_str()) {
                Some(item) => (*item).clone(),
                None => PermissionCatalogItem::new(code.as_str(), "", ""),
            })
            .collect();
        Ok(RolePermissionSnapshot {
            role_id: role_id.to_string(),
            permissions,
            version: Some(role.version.to_string()),
        })
    }

    fn unknown_codes<'a>(&self, codes: &'a [String]) -> Vec<&'a str> {
        if self.catalog.is_empty() {
            return Vec::new();
        }
        let lookup = self.item_lookup();
        codes
            .iter()
            .map(String::as_str)
            .filter(|c| !lookup.contains_key(c))
            .collect()
    }
}

/// A permission store held in memory.
///
/// Writes follow the remote contract: `replace` only succeeds when the
/// submitted version matches, and every successful write bumps the version.
#[derive(Debug, Default)]
pub struct InMemoryPermissionStore {
    inner: RwLock<Inner>,
}

impl InMemoryPermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: StoreFixture) -> Self {
        let mut inner = Inner {
            catalog: fixture.catalog,
            ..Default::default()
        };
        for role in fixture.roles {
            if !inner.roles.contains_key(&role.role_id) {
                inner.order.push(role.role_id.clone());
            }
            inner.roles.insert(
                role.role_id,
                StoredRole {
                    name: role.name,
                    permissions: role.permissions.into_iter().collect(),
                    version: role.version,
                },
            );
        }
        Self {
            inner: RwLock::new(inner),
        }
    }

    /// Load a JSON fixture file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let fixture: StoreFixture = serde_json::from_str(&content)?;
        Ok(Self::from_fixture(fixture))
    }

    pub fn to_fixture(&self) -> StoreFixture {
        let inner = self.inner.read();
        StoreFixture {
            catalog: inner.catalog.clone(),
            roles: inner
                .order
                .iter()
                .filter_map(|id| {
                    inner.roles.get(id).map(|r| RoleFixture {
                        role_id: id.clone(),
                        name: r.name.clone(),
                        permissions: r.permissions.iter().cloned().collect(),
                        version: r.version,
                    })
                })
                .collect(),
        }
    }

    /// Write the current contents back as a JSON fixture
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.to_fixture())?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// The roles list, in fixture order
    pub fn roles(&self) -> Vec<RoleRef> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.roles.get(id).map(|r| RoleRef::new(id.clone(), r.name.clone())))
            .collect()
    }

    /// Add or overwrite a role outside the CAS path, as another client would
    pub fn put_role<I, S>(&self, role: RoleRef, permissions: I) -> u64
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut inner = self.inner.write();
        let permissions: BTreeSet<String> = permissions.into_iter().map(Into::into).collect();
        if !inner.roles.contains_key(&role.id) {
            inner.order.push(role.id.clone());
        }
        let entry = inner.roles.entry(role.id).or_insert(StoredRole {
            name: role.name.clone(),
            permissions: BTreeSet::new(),
            version: 0,
        });
        entry.name = role.name;
        entry.permissions = permissions;
        entry.version += 1;
        entry.version
    }

    pub fn set_catalog(&self, catalog: Vec<PermissionGroup>) {
        self.inner.write().catalog = catalog;
    }

    pub fn version_of(&self, role_id: &str) -> Option<u64> {
        self.inner.read().roles.get(role_id).map(|r| r.version)
    }
}

#[async_trait]
impl PermissionStore for InMemoryPermissionStore {
    async fn fetch_catalog_grouped(&self) -> Result<Vec<PermissionGroup>> {
        Ok(self.inner.read().catalog.clone())
    }

    async fn fetch_all_role_permissions(&self) -> Result<Vec<RolePermissionSnapshot>> {
        let inner = self.inner.read();
        inner.order.iter().map(|id| inner.snapshot(id)).collect()
    }

    async fn fetch_role_permissions(&self, role_id: &str) -> Result<RolePermissionSnapshot> {
        self.inner.read().snapshot(role_id)
    }

    async fn replace_role_permissions(
        &self,
        role_id: &str,
        input: ReplacePermissionsInput,
    ) -> Result<RolePermissionSnapshot> {
        let mut inner = self.inner.write();

        let unknown = inner.unknown_codes(&input.permissions);
        if !unknown.is_empty() {
            return Err(PermgridError::Remote(format!(
                "422 unknown permission codes: {}",
                unknown.join(", ")
            )));
        }

        let role = inner
            .roles
            .get_mut(role_id)
            .ok_or_else(|| PermgridError::NotFound(role_id.to_string()))?;
        if role.version.to_string() != input.version {
            return Err(PermgridError::VersionConflict {
                role_id: role_id.to_string(),
                message: format!(
                    "409 conflict: role was modified (current version {}, submitted {})",
                    role.version, input.version
                ),
            });
        }
        role.permissions = input.permissions.into_iter().collect();
        role.version += 1;

        inner.snapshot(role_id)
    }

    async fn clone_role_permissions(
        &self,
        target_role_id: &str,
        input: ClonePermissionsInput,
    ) -> Result<RolePermissionSnapshot> {
        let mut inner = self.inner.write();

        let source = inner
            .roles
            .get(&input.from_role_id)
            .map(|r| r.permissions.clone())
            .ok_or_else(|| PermgridError::NotFound(input.from_role_id.clone()))?;
        let target = inner
            .roles
            .get_mut(target_role_id)
            .ok_or_else(|| PermgridError::NotFound(target_role_id.to_string()))?;
        target.permissions = source;
        target.version += 1;

        inner.snapshot(target_role_id)
    }
}
