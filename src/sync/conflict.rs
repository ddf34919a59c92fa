//! Version conflict classification
//!
//! A store that reports [`PermgridError::VersionConflict`] is classified
//! exactly. Untyped remote errors fall back to matching the message against
//! configured markers ("409", "conflict", "競合", "refresh").

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::DEFAULT_CONFLICT_MARKERS;
use crate::error::{PermgridError, Result};

static DEFAULT_MARKERS: Lazy<Regex> =
    Lazy::new(|| marker_regex(DEFAULT_CONFLICT_MARKERS.iter().copied()).unwrap());

fn marker_regex<'a, I>(markers: I) -> std::result::Result<Regex, regex::Error>
where
    I: IntoIterator<Item = &'a str>,
{
    let alternation = markers
        .into_iter()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("(?i)(?:{})", alternation))
}

/// Decides whether a failed write was rejected for a stale version
#[derive(Debug, Clone)]
pub struct ConflictDetector {
    /// `None` disables the message fallback
    markers: Option<Regex>,
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self {
            markers: Some(DEFAULT_MARKERS.clone()),
        }
    }
}

impl ConflictDetector {
    /// Build a detector from marker substrings, matched case-insensitively
    pub fn new<S: AsRef<str>>(markers: &[S]) -> Result<Self> {
        if markers.is_empty() {
            return Ok(Self::structured_only());
        }
        // an empty alternative would match every message
        if markers.iter().any(|m| m.as_ref().is_empty()) {
            return Err(PermgridError::Config(
                "Conflict markers cannot be empty".to_string(),
            ));
        }
        let regex = marker_regex(markers.iter().map(|m| m.as_ref()))
            .map_err(|e| PermgridError::Config(format!("Invalid conflict marker: {}", e)))?;
        Ok(Self {
            markers: Some(regex),
        })
    }

    /// Only trust [`PermgridError::VersionConflict`]
    pub fn structured_only() -> Self {
        Self { markers: None }
    }

    pub fn is_conflict(&self, err: &PermgridError) -> bool {
        match err {
            PermgridError::VersionConflict { .. } => true,
            PermgridError::Remote(message) => self.message_matches(message),
            _ => false,
        }
    }

    /// Fallback heuristic for untyped messages
    pub fn message_matches(&self, message: &str) -> bool {
        self.markers
            .as_ref()
            .is_some_and(|re| re.is_match(message))
    }
}
