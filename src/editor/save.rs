//! Concurrent batch save

use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use super::{failure_message, PermissionEditor, WriteTicket};
use crate::error::Result;
use crate::types::{
    Conflict, ReplacePermissionsInput, RoleFailure, RoleId, RolePermissionSnapshot,
    SaveResultSummary,
};

struct SaveJob {
    role_id: RoleId,
    input: ReplacePermissionsInput,
    ticket: WriteTicket,
}

impl PermissionEditor {
    /// Save every dirty role
    pub async fn save_all(&self) -> SaveResultSummary {
        let dirty = self.dirty_roles();
        self.save(&dirty).await
    }

    /// Submit the drafts of the dirty roles among `role_ids`, all at once.
    ///
    /// Each role succeeds or fails on its own. A conflicted role is refreshed
    /// with its draft kept so the user can retry.
    #[instrument(skip(self, role_ids), fields(requested = role_ids.len()))]
    pub async fn save(&self, role_ids: &[RoleId]) -> SaveResultSummary {
        let jobs = self.collect_save_jobs(role_ids);
        if jobs.is_empty() {
            debug!("Nothing to save");
            return SaveResultSummary::default();
        }

        let outcomes = join_all(jobs.into_iter().map(|job| self.save_one(job))).await;

        let mut summary = SaveResultSummary::default();
        for outcome in outcomes {
            match outcome {
                Ok(()) => summary.success_count += 1,
                Err(failure) => {
                    summary.failure_count += 1;
                    summary.failures.push(failure);
                }
            }
        }

        info!(
            "Saved {} role(s), {} failed",
            summary.success_count, summary.failure_count
        );
        summary
    }

    fn collect_save_jobs(&self, role_ids: &[RoleId]) -> Vec<SaveJob> {
        let mut state = self.state.lock();
        let mut jobs = Vec::new();

        for role_id in role_ids {
            if state.in_flight.contains(role_id) {
                debug!("Skipping role {}: write already pending", role_id);
                continue;
            }
            let Some(role) = state.roles.get(role_id) else {
                continue;
            };
            if !role.is_dirty() {
                continue;
            }
            let job = SaveJob {
                role_id: role_id.clone(),
                input: ReplacePermissionsInput {
                    permissions: role.draft.to_vec(),
                    version: role.version.clone(),
                },
                ticket: state.ticket(role),
            };
            state.in_flight.insert(role_id.clone());
            jobs.push(job);
        }

        if !jobs.is_empty() {
            state.conflicts.clear();
        }
        jobs
    }

    async fn save_one(&self, job: SaveJob) -> std::result::Result<(), RoleFailure> {
        let result = self
            .store
            .replace_role_permissions(&job.role_id, job.input)
            .await;

        self.settle_write(&job.role_id, job.ticket, result)
            .await
            .map_err(|err| RoleFailure {
                role_id: job.role_id.clone(),
                message: failure_message(&err),
                conflict: self.detector.is_conflict(&err),
            })
    }

    /// Finish a replace or clone write and release the role.
    ///
    /// On a conflict the role is refreshed with its draft preserved before it
    /// is released; the conflict stays recorded.
    pub(super) async fn settle_write(
        &self,
        role_id: &str,
        ticket: WriteTicket,
        result: Result<RolePermissionSnapshot>,
    ) -> Result<()> {
        match result {
            Ok(snapshot) => {
                let mut state = self.state.lock();
                state.in_flight.remove(role_id);
                if state.apply_confirmed(role_id, ticket, snapshot) {
                    debug!("Role {} confirmed", role_id);
                }
                Ok(())
            }
            Err(err) => {
                if self.detector.is_conflict(&err) {
                    warn!("Version conflict on role {}: {}", role_id, err);
                    {
                        let mut state = self.state.lock();
                        if state.roles.contains(role_id) {
                            state.conflicts.insert(
                                role_id.to_string(),
                                Conflict::new(role_id, failure_message(&err)),
                            );
                        } else {
                            debug!("Not recording conflict for departed role {}", role_id);
                        }
                    }

                    if let Err(refresh_err) = self.refresh_role(role_id, true, false).await {
                        warn!(
                            "Could not refresh role {} after conflict: {}",
                            role_id, refresh_err
                        );
                    }
                } else {
                    warn!("Write for role {} failed: {}", role_id, err);
                }
                self.state.lock().in_flight.remove(role_id);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{fixture_store, loaded_editor};
    use crate::matrix::PermissionSet;
    use crate::types::RoleRef;

    #[tokio::test]
    async fn test_save_round_trip() {
        let store = fixture_store();
        let editor = loaded_editor(store.clone()).await;

        editor.toggle("r1", "user:write", true);
        let summary = editor.save_all().await;

        assert_eq!(summary.success_count, 1);
        assert_eq!(summary.failure_count, 0);
        let r1 = editor.role("r1").unwrap();
        assert!(!r1.is_dirty());
        assert!(r1.base.contains("user:write"));
        assert_eq!(r1.version, "2");
        assert_eq!(store.version_of("r1"), Some(2));
        assert!(!editor.is_saving("r1"));
    }

    #[tokio::test]
    async fn test_save_nothing_dirty_is_noop() {
        let store = fixture_store();
        let editor = loaded_editor(store.clone()).await;

        let summary = editor.save(&["r1".to_string(), "ghost".to_string()]).await;
        assert!(summary.is_empty());
        assert_eq!(store.version_of("r1"), Some(1));
    }

    #[tokio::test]
    async fn test_save_conflict_keeps_draft() {
        let store = fixture_store();
        let editor = loaded_editor(store.clone()).await;

        editor.toggle("r1", "user:write", true);
        // another client writes first
        store.put_role(RoleRef::new("r1", "Manager"), ["evaluation:approve"]);

        let summary = editor.save_all().await;
        assert_eq!(summary.failure_count, 1);
        assert_eq!(summary.conflicted_roles(), vec!["r1"]);

        let conflict = editor.conflict("r1").unwrap();
        assert!(conflict.message.contains("409"));

        let r1 = editor.role("r1").unwrap();
        assert_eq!(r1.base, PermissionSet::from_codes(["evaluation:approve"]));
        assert_eq!(r1.version, "2");
        assert_eq!(
            r1.draft,
            PermissionSet::from_codes(["user:read", "user:write", "evaluation:read"])
        );

        // retry goes through against the fresh version and clears the conflict
        let retry = editor.save_all().await;
        assert_eq!(retry.success_count, 1);
        assert!(editor.conflicts().is_empty());
        assert_eq!(store.version_of("r1"), Some(3));
    }

    #[tokio::test]
    async fn test_save_non_conflict_failure() {
        let store = fixture_store();
        let editor = loaded_editor(store.clone()).await;

        editor.toggle("r1", "made:up", true);
        editor.toggle("r2", "user:write", false);
        let summary = editor.save_all().await;

        assert!(summary.is_partial());
        assert_eq!(summary.failures[0].role_id, "r1");
        assert!(!summary.failures[0].conflict);
        assert!(editor.conflicts().is_empty());
        assert!(editor.is_dirty("r1"));
        assert!(!editor.is_dirty("r2"));
    }
}
