//! Decides which operations the rules leave out.

use crate::canonical::Path;
use crate::error::{BrakeError, Result};
use tracing::debug;

/// Skips beta operations and operations under an excluded path prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathSkipper {
    excluded: Vec<String>,
}

impl PathSkipper {
    /// Normalizes the excluded prefixes once.
    ///
    /// # Errors
    ///
    /// [`BrakeError::BlankExcludedPath`] for a blank prefix.
    pub fn new<I, S>(excluded: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let excluded = excluded
            .into_iter()
            .map(|prefix| normalize_path(prefix.as_ref()).ok_or(BrakeError::BlankExcludedPath))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { excluded })
    }

    /// Beta operations and operations under an excluded prefix.
    pub fn should_skip(&self, path: &Path) -> bool {
        if path.beta_api {
            debug!(%path, "skipping beta API");
            return true;
        }
        self.is_excluded(path)
    }

    /// Operations under an excluded prefix, whatever their beta marker.
    pub fn is_excluded(&self, path: &Path) -> bool {
        let Some(normalized) = normalize_path(&path.path) else {
            return false;
        };
        let excluded = self
            .excluded
            .iter()
            .any(|prefix| normalized.starts_with(prefix.as_str()));
        if excluded {
            debug!(%path, "skipping excluded path");
        }
        excluded
    }
}

/// Canonical form of a path: leading slash, no trailing slash. `None` for
/// blank input.
pub fn normalize_path(path: &str) -> Option<String> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut normalized = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    };
    while normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    Some(normalized)
}
