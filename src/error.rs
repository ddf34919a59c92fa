//! Error types for Permgrid

use thiserror::Error;

use crate::types::RoleId;

/// Result type alias for Permgrid operations
pub type Result<T> = std::result::Result<T, PermgridError>;

/// Main error type for Permgrid
#[derive(Error, Debug)]
pub enum PermgridError {
    /// The store rejected a write because the submitted version is stale
    #[error("Version conflict for role {role_id}: {message}")]
    VersionConflict { role_id: RoleId, message: String },

    /// Transport failure or unexpected exception reported by the store
    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Role not found: {0}")]
    NotFound(RoleId),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Role {0} has a write in flight")]
    Busy(RoleId),

    /// A batch save finished with failed roles
    #[error("Failed to save role(s): {}", .0.join(", "))]
    SaveFailed(Vec<RoleId>),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PermgridError {
    /// Check if the error came from talking to the store, as opposed to local validation
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            PermgridError::VersionConflict { .. } | PermgridError::Remote(_)
        )
    }

    /// Short machine-readable code, stable across message changes
    pub fn code(&self) -> &'static str {
        match self {
            PermgridError::VersionConflict { .. } => "version_conflict",
            PermgridError::Remote(_) => "remote",
            PermgridError::NotFound(_) => "not_found",
            PermgridError::InvalidInput(_) => "invalid_input",
            PermgridError::Busy(_) => "busy",
            PermgridError::SaveFailed(_) => "save_failed",
            PermgridError::Config(_) | PermgridError::Toml(_) => "config",
            PermgridError::Serialization(_) => "serialization",
            PermgridError::Io(_) => "io",
            PermgridError::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let err = PermgridError::VersionConflict {
            role_id: "r1".to_string(),
            message: "stale".to_string(),
        };
        assert_eq!(err.code(), "version_conflict");
        assert!(err.is_remote());
        assert!(!PermgridError::Busy("r1".to_string()).is_remote());
        assert_eq!(
            PermgridError::NotFound("r9".to_string()).to_string(),
            "Role not found: r9"
        );
    }
}
