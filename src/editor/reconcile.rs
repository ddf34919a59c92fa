//! Refreshing confirmed state from the store

use tracing::{debug, info, instrument, warn};

use super::PermissionEditor;
use crate::error::Result;
use crate::matrix::PermissionSet;
use crate::types::RoleRef;

impl PermissionEditor {
    /// Adopt a roles list and rebuild everything from the store
    pub async fn load(&self, roles: &[RoleRef]) -> Result<()> {
        self.set_roles(roles);
        self.reconcile_all().await
    }

    /// Re-fetch one role's confirmed permissions and version.
    ///
    /// Local edits are dropped unless `preserve_draft` is set. Clears the
    /// role's recorded conflict. Unknown roles are ignored, and so is a
    /// response that arrives after the role's confirmed state moved on.
    #[instrument(skip(self))]
    pub async fn reconcile(&self, role_id: &str, preserve_draft: bool) -> Result<()> {
        self.refresh_role(role_id, preserve_draft, true).await
    }

    pub(super) async fn refresh_role(
        &self,
        role_id: &str,
        preserve_draft: bool,
        clear_conflict: bool,
    ) -> Result<()> {
        let ticket = {
            let state = self.state.lock();
            match state.roles.get(role_id) {
                Some(role) => state.ticket(role),
                None => {
                    debug!("Not refreshing unknown role {}", role_id);
                    return Ok(());
                }
            }
        };

        let snapshot = self.store.fetch_role_permissions(role_id).await?;

        let mut state = self.state.lock();
        state
            .catalog
            .merge_items(snapshot.permissions.iter().cloned());
        let base: PermissionSet = snapshot.codes().map(String::from).collect();
        let version = snapshot.version_or_default();
        let generation = state.generation;
        let Some(role) = state.roles.get_mut(role_id) else {
            return Ok(());
        };
        if generation != ticket.generation || role.revision != ticket.revision {
            warn!(
                "Discarding stale refresh for role {} (version {:?})",
                role_id, snapshot.version
            );
            return Ok(());
        }
        role.apply_refresh(base, version, preserve_draft);
        if clear_conflict {
            state.conflicts.remove(role_id);
        }

        info!(
            "Refreshed role {} (version {:?}, draft {})",
            role_id,
            snapshot.version,
            if preserve_draft { "kept" } else { "reset" }
        );
        Ok(())
    }

    /// Rebuild catalog and all role state from the store.
    ///
    /// Every draft is reset to its base and all conflicts are cleared.
    #[instrument(skip(self))]
    pub async fn reconcile_all(&self) -> Result<()> {
        let (groups, snapshots) = futures::try_join!(
            self.store.fetch_catalog_grouped(),
            self.store.fetch_all_role_permissions()
        )?;

        let mut state = self.state.lock();
        state.catalog.replace_grouped(groups);
        for snapshot in &snapshots {
            state
                .catalog
                .merge_items(snapshot.permissions.iter().cloned());
        }
        let roles = state.roles.roles();
        state.roles.initialize(&roles, &snapshots);
        state.conflicts.clear();
        state.generation += 1;

        info!(
            "Reloaded {} role(s), {} catalog code(s)",
            state.roles.len(),
            state.catalog.len()
        );
        Ok(())
    }
}
