//! Permgrid - permission matrix engine
//!
//! Keeps an editable draft of permission codes per role, diffs drafts
//! against the store-confirmed base, saves many roles concurrently under
//! optimistic concurrency control, and recovers from version conflicts.

pub mod catalog;
pub mod config;
pub mod editor;
pub mod error;
pub mod matrix;
pub mod sync;
pub mod types;

pub use catalog::PermissionCatalog;
pub use config::EngineConfig;
pub use editor::PermissionEditor;
pub use error::{PermgridError, Result};
pub use matrix::{PermissionSet, RolePermissionDraft, RoleStateStore};
pub use sync::{InMemoryPermissionStore, PermissionStore};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
