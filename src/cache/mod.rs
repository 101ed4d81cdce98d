//! Staleness-checked access to a single cached file
//!
//! This module provides `StaleFile`, which decides from a file's modification
//! time whether it needs regenerating, runs a caller-supplied `Refresher` when
//! it does, and then hands back a readable handle. A missing or unreadable
//! file counts as stale, so the refresher also performs the initial write.

mod config;
mod refresher;
mod stale_file;

pub use config::{StaleFileConfig, DEFAULT_MAX_AGE};
pub use refresher::{BoxError, CommandRefresher, RefreshCommandError, Refresher, PATH_ENV_VAR};
pub use stale_file::{cache_dir, FileStatus, StaleFile, StaleFileError};
