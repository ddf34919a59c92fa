//! Engine configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PermgridError, Result};

/// Label used for codes whose prefix is not in the table
pub const DEFAULT_OTHER_GROUP: &str = "Other";

/// Default prefix → group label table
pub const DEFAULT_GROUP_PREFIXES: &[(&str, &str)] = &[
    ("user", "Users"),
    ("role", "Roles"),
    ("permission", "Permissions"),
    ("department", "Departments"),
    ("employee", "Employees"),
    ("evaluation", "Evaluations"),
    ("stage", "Evaluation Stages"),
    ("goal", "Goals"),
    ("competency", "Competencies"),
    ("dashboard", "Dashboard"),
    ("report", "Reports"),
    ("setting", "Settings"),
];

/// Substrings that mark an untyped store error as a version conflict
pub const DEFAULT_CONFLICT_MARKERS: &[&str] = &["409", "conflict", "競合", "refresh"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Group label for codes with an unmapped prefix
    pub other_group_label: String,
    /// Code prefix (text before the first `:`) → group label
    pub group_prefixes: BTreeMap<String, String>,
    /// Case-insensitive markers for the conflict fallback classifier
    pub conflict_markers: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            other_group_label: DEFAULT_OTHER_GROUP.to_string(),
            group_prefixes: DEFAULT_GROUP_PREFIXES
                .iter()
                .map(|(p, l)| (p.to_string(), l.to_string()))
                .collect(),
            conflict_markers: DEFAULT_CONFLICT_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Default config location (`<config dir>/permgrid/config.toml`)
    pub fn default_path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|d| d.join("permgrid").join("config.toml"))
    }

    fn validate(&self) -> Result<()> {
        if self.other_group_label.trim().is_empty() {
            return Err(PermgridError::Config(
                "other_group_label cannot be empty".to_string(),
            ));
        }
        if self.conflict_markers.iter().any(|m| m.is_empty()) {
            return Err(PermgridError::Config(
                "conflict_markers cannot contain empty strings".to_string(),
            ));
        }
        Ok(())
    }
}
