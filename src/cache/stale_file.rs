//! A single on-disk file kept fresh by modification time
//!
//! `StaleFile` compares a file's mtime plus a max age against the current
//! time. When the file is stale, `get` runs the configured refresher before
//! opening the file, so a handle is only ever returned for a file that is
//! fresh or that the caller chose never to refresh.

use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use serde::Serialize;
use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, warn};

use super::config::{StaleFileConfig, DEFAULT_MAX_AGE};
use super::refresher::{BoxError, Refresher};

/// Errors returned when fetching or refreshing a stale file
#[derive(Debug, Error)]
pub enum StaleFileError {
    /// The refresher failed. Displays exactly as the refresher's own error.
    #[error(transparent)]
    Refresh(BoxError),

    /// The file could not be opened after the freshness check
    #[error(transparent)]
    Open(io::Error),
}

impl StaleFileError {
    /// Returns the refresher's error, if this is a refresh failure
    pub fn refresh_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            StaleFileError::Refresh(err) => Some(&**err),
            _ => None,
        }
    }

    /// Unwraps the refresher's original error, if this is a refresh failure
    pub fn into_refresh_error(self) -> Option<BoxError> {
        match self {
            StaleFileError::Refresh(err) => Some(err),
            _ => None,
        }
    }
}

/// Point-in-time view of a stale file, for display or JSON output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileStatus {
    pub path: PathBuf,
    /// Last modification time, `None` if the file cannot be stat'd
    pub modified_at: Option<DateTime<Utc>>,
    /// When the file becomes stale, `None` if unknown
    pub expires_at: Option<DateTime<Utc>>,
    pub max_age_secs: i64,
    pub expired: bool,
    pub has_refresher: bool,
}

/// A file on disk with a max age and an optional refresher
///
/// The file is stale when it cannot be stat'd, when the max age is zero or
/// negative, or when more than `max_age` has passed since it was last
/// modified. Nothing is cached in memory; every call looks at the filesystem.
///
/// There is no locking. Concurrent callers may run the refresher more than
/// once and may read a partially written file unless the refresher writes to
/// a temporary file and renames it into place. Callers that need exclusion
/// must wrap the `StaleFile` in a mutex or take a file lock themselves.
pub struct StaleFile {
    path: PathBuf,
    max_age: Duration,
    refresher: Option<Box<dyn Refresher>>,
}

impl fmt::Debug for StaleFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaleFile")
            .field("path", &self.path)
            .field("max_age", &self.max_age)
            .field("has_refresher", &self.refresher.is_some())
            .finish()
    }
}

impl StaleFile {
    /// Creates a StaleFile with `DEFAULT_MAX_AGE` and no refresher
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_policy(path, DEFAULT_MAX_AGE, None)
    }

    /// Creates a StaleFile with an explicit max age and optional refresher
    ///
    /// # Arguments
    /// * `path` - Location of the cached file
    /// * `max_age` - Allowed time since last modification; zero or negative is always stale
    /// * `refresher` - Called to regenerate the file when stale; `None` reads whatever is there
    pub fn with_policy(
        path: impl Into<PathBuf>,
        max_age: Duration,
        refresher: Option<Box<dyn Refresher>>,
    ) -> Self {
        Self {
            path: path.into(),
            max_age,
            refresher,
        }
    }

    /// Creates a StaleFile from a config value, without a refresher
    pub fn from_config(config: StaleFileConfig) -> Self {
        Self::with_policy(config.path, config.max_age, None)
    }

    /// Creates a StaleFile named `file_name` inside the XDG cache directory
    ///
    /// Uses `~/.cache/stalefile/` on Linux, or the platform equivalent.
    /// Returns `None` if the cache directory cannot be determined.
    pub fn in_cache_dir(file_name: impl AsRef<Path>) -> Option<Self> {
        let dir = cache_dir()?;
        Some(Self::new(dir.join(file_name)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub fn has_refresher(&self) -> bool {
        self.refresher.is_some()
    }

    /// Returns the current path and max age as a config value
    pub fn config(&self) -> StaleFileConfig {
        StaleFileConfig {
            path: self.path.clone(),
            max_age: self.max_age,
        }
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = path.into();
    }

    pub fn set_max_age(&mut self, max_age: Duration) {
        self.max_age = max_age;
    }

    /// Attaches a refresher, replacing any existing one
    pub fn set_refresher(&mut self, refresher: impl Refresher + 'static) {
        self.refresher = Some(Box::new(refresher));
    }

    /// Removes the refresher; stale files are then read as-is
    pub fn clear_refresher(&mut self) {
        self.refresher = None;
    }

    /// Returns the file's last modification time, or `None` if it cannot be stat'd
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        let modified = fs::metadata(&self.path).ok()?.modified().ok()?;
        to_utc(modified)
    }

    /// Returns the time after which the file is stale
    ///
    /// `None` if the file cannot be stat'd or the sum is out of range.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.modified_at()?.checked_add_signed(self.max_age)
    }

    /// Whether the file needs refreshing
    ///
    /// A file that cannot be stat'd for any reason is expired, so a missing
    /// file gets populated by the refresher on the first `get`.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(self.modified_at())
    }

    /// Applies the expiry rules to an already-read mtime
    fn is_expired_at(&self, modified: Option<DateTime<Utc>>) -> bool {
        let Some(modified) = modified else {
            debug!(path = %self.path.display(), "stat failed, treating file as expired");
            return true;
        };

        if self.max_age <= Duration::zero() {
            return true;
        }

        match modified.checked_add_signed(self.max_age) {
            Some(expires_at) => {
                let expired = Utc::now() > expires_at;
                debug!(path = %self.path.display(), %expires_at, expired, "checked file age");
                expired
            }
            // Too far in the future to represent
            None => false,
        }
    }

    /// Runs the refresher, if any
    ///
    /// Succeeds without doing anything when no refresher is configured.
    /// Refresher errors are returned unchanged inside `StaleFileError::Refresh`.
    pub fn refresh(&self) -> Result<(), StaleFileError> {
        let Some(refresher) = &self.refresher else {
            return Ok(());
        };

        debug!(path = %self.path.display(), "refreshing file");
        refresher.refresh(&self.path).map_err(|err| {
            warn!(path = %self.path.display(), error = %err, "refresh failed");
            StaleFileError::Refresh(err)
        })
    }

    /// Opens the file for reading, refreshing it first if it is stale
    ///
    /// # Returns
    /// * `Ok(File)` opened read-only at the configured path
    /// * `Err(StaleFileError::Refresh)` if the file was stale and the refresher failed;
    ///   the file is not opened in that case
    /// * `Err(StaleFileError::Open)` if the file cannot be opened
    pub fn get(&self) -> Result<File, StaleFileError> {
        if self.is_expired() {
            self.refresh()?;
        }

        File::open(&self.path).map_err(StaleFileError::Open)
    }

    /// Returns a snapshot of the file's freshness without refreshing it
    pub fn status(&self) -> FileStatus {
        let modified_at = self.modified_at();
        FileStatus {
            path: self.path.clone(),
            modified_at,
            expires_at: modified_at.and_then(|m| m.checked_add_signed(self.max_age)),
            max_age_secs: self.max_age.num_seconds(),
            expired: self.is_expired_at(modified_at),
            has_refresher: self.has_refresher(),
        }
    }
}

/// Converts an mtime to UTC, or `None` if chrono cannot represent it
fn to_utc(time: SystemTime) -> Option<DateTime<Utc>> {
    match time.duration_since(UNIX_EPOCH) {
        Ok(since) => {
            DateTime::from_timestamp(i64::try_from(since.as_secs()).ok()?, since.subsec_nanos())
        }
        Err(err) => {
            let before = err.duration();
            let secs = i64::try_from(before.as_secs()).ok()?.checked_neg()?;
            match before.subsec_nanos() {
                0 => DateTime::from_timestamp(secs, 0),
                nanos => DateTime::from_timestamp(secs.checked_sub(1)?, 1_000_000_000 - nanos),
            }
        }
    }
}

/// Returns the XDG cache directory used by `StaleFile::in_cache_dir`
pub fn cache_dir() -> Option<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "stalefile")?;
    Some(project_dirs.cache_dir().to_path_buf())
}
