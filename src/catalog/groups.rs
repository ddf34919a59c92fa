//! Prefix-based group inference

use std::cmp::Ordering;
use std::collections::BTreeMap;

use once_cell::sync::Lazy;

use crate::config::EngineConfig;

static DEFAULT_RESOLVER: Lazy<GroupResolver> =
    Lazy::new(|| GroupResolver::from_config(&EngineConfig::default()));

/// Maps a permission code to its display group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupResolver {
    prefixes: BTreeMap<String, String>,
    other: String,
}

impl Default for GroupResolver {
    fn default() -> Self {
        DEFAULT_RESOLVER.clone()
    }
}

impl GroupResolver {
    pub fn new(prefixes: BTreeMap<String, String>, other: impl Into<String>) -> Self {
        Self {
            prefixes,
            other: other.into(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.group_prefixes.clone(), config.other_group_label.clone())
    }

    /// The sentinel label for unmapped prefixes
    pub fn other_label(&self) -> &str {
        &self.other
    }

    /// Infer a group from the text before the first `:` of `code`
    pub fn infer(&self, code: &str) -> &str {
        let prefix = code.split(':').next().unwrap_or(code);
        self.prefixes
            .get(prefix)
            .map(String::as_str)
            .unwrap_or(self.other.as_str())
    }

    /// Explicit non-empty label wins, otherwise infer
    pub fn resolve(&self, code: &str, explicit: Option<&str>) -> String {
        match explicit.map(str::trim) {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => self.infer(code).to_string(),
        }
    }
}

/// Infer a group with the default prefix table
pub fn infer_group(code: &str) -> &'static str {
    DEFAULT_RESOLVER.infer(code)
}

/// Ordering for newly discovered group labels.
///
/// Case-insensitive first so "admin" and "Audit" sort together the way a
/// collator would, then byte order to keep the result total.
pub fn compare_labels(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_known_prefix() {
        assert_eq!(infer_group("user:read"), "Users");
        assert_eq!(infer_group("evaluation:approve"), "Evaluations");
    }

    #[test]
    fn test_infer_unknown_prefix() {
        assert_eq!(infer_group("billing:view"), "Other");
        assert_eq!(infer_group("nocolon"), "Other");
        assert_eq!(infer_group(""), "Other");
    }

    #[test]
    fn test_prefix_without_colon_matches_whole_code() {
        assert_eq!(infer_group("dashboard"), "Dashboard");
    }

    #[test]
    fn test_explicit_overrides_inference() {
        let resolver = GroupResolver::default();
        assert_eq!(resolver.resolve("user:read", Some("Admin")), "Admin");
        assert_eq!(resolver.resolve("user:read", Some("  ")), "Users");
        assert_eq!(resolver.resolve("user:read", None), "Users");
    }

    #[test]
    fn test_custom_table() {
        let mut prefixes = BTreeMap::new();
        prefixes.insert("audit".to_string(), "Audit".to_string());
        let resolver = GroupResolver::new(prefixes, "Misc");
        assert_eq!(resolver.infer("audit:read"), "Audit");
        assert_eq!(resolver.infer("user:read"), "Misc");
    }

    #[test]
    fn test_compare_labels() {
        let mut labels = vec!["beta", "Alpha", "alpha", "Gamma"];
        labels.sort_by(|a, b| compare_labels(a, b));
        assert_eq!(labels, vec!["Alpha", "alpha", "beta", "Gamma"]);
    }
}
