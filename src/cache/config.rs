//! Configuration for a stale file

use chrono::Duration;
use std::path::PathBuf;

/// Max age used by `StaleFile::new` and `StaleFileConfig::new` (24 seconds)
pub const DEFAULT_MAX_AGE: Duration = Duration::seconds(24);

/// Path and age policy for a `StaleFile`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleFileConfig {
    /// Location of the cached file
    pub path: PathBuf,
    /// Allowed time since last modification before the file is stale.
    /// Zero or negative means always stale.
    pub max_age: Duration,
}

impl StaleFileConfig {
    /// Creates a config for `path` with `DEFAULT_MAX_AGE`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_age: DEFAULT_MAX_AGE,
        }
    }

    /// Replaces the max age
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }
}
