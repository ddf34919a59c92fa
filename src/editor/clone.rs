//! Cloning one role's confirmed permissions onto another

use tracing::{info, instrument};

use super::PermissionEditor;
use crate::error::{PermgridError, Result};
use crate::types::ClonePermissionsInput;

impl PermissionEditor {
    /// Copy the source role's confirmed permissions onto the target.
    ///
    /// On success the target's base and draft are both replaced, so unsaved
    /// edits on the target are gone. Failures go through the same conflict
    /// handling as a save.
    #[instrument(skip(self))]
    pub async fn commit_clone(&self, target_role_id: &str, source_role_id: &str) -> Result<()> {
        if target_role_id == source_role_id {
            return Err(PermgridError::InvalidInput(format!(
                "Cannot clone role {} onto itself",
                target_role_id
            )));
        }

        let ticket = {
            let mut state = self.state.lock();
            if !state.roles.contains(source_role_id) {
                return Err(PermgridError::NotFound(source_role_id.to_string()));
            }
            let Some(target) = state.roles.get(target_role_id) else {
                return Err(PermgridError::NotFound(target_role_id.to_string()));
            };
            if state.in_flight.contains(target_role_id) {
                return Err(PermgridError::Busy(target_role_id.to_string()));
            }
            let ticket = state.ticket(target);
            state.in_flight.insert(target_role_id.to_string());
            ticket
        };

        let result = self
            .store
            .clone_role_permissions(
                target_role_id,
                ClonePermissionsInput {
                    from_role_id: source_role_id.to_string(),
                },
            )
            .await;

        self.settle_write(target_role_id, ticket, result).await?;
        info!("Cloned role {} onto {}", source_role_id, target_role_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{fixture_store, loaded_editor};
    use crate::error::PermgridError;
    use crate::matrix::PermissionSet;

    #[tokio::test]
    async fn test_preview_then_commit() {
        let store = fixture_store();
        let editor = loaded_editor(store.clone()).await;
        editor.toggle("r1", "evaluation:approve", true);

        let preview = editor.preview_clone("r1", "r2").unwrap();
        assert_eq!(preview.additions, vec!["user:write".to_string()]);
        assert_eq!(preview.removals, vec!["evaluation:read".to_string()]);

        editor.commit_clone("r1", "r2").await.unwrap();
        let r1 = editor.role("r1").unwrap();
        assert_eq!(r1.base, PermissionSet::from_codes(["user:read", "user:write"]));
        assert_eq!(r1.draft, r1.base);
        assert_eq!(r1.version, "2");
        assert!(editor.preview_clone("r1", "r2").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_validation() {
        let editor = loaded_editor(fixture_store()).await;

        assert!(matches!(
            editor.commit_clone("r1", "r1").await,
            Err(PermgridError::InvalidInput(_))
        ));
        assert!(matches!(
            editor.commit_clone("r1", "ghost").await,
            Err(PermgridError::NotFound(ref id)) if id == "ghost"
        ));
        assert!(matches!(
            editor.commit_clone("ghost", "r1").await,
            Err(PermgridError::NotFound(ref id)) if id == "ghost"
        ));
        assert!(editor.preview_clone("ghost", "r1").is_none());

        editor.state.lock().in_flight.insert("r1".to_string());
        assert!(matches!(
            editor.commit_clone("r1", "r2").await,
            Err(PermgridError::Busy(_))
        ));
    }
}
