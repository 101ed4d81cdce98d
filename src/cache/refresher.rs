//! Refresh functions for stale files
//!
//! A `Refresher` regenerates the file at a given path. Any closure of the
//! right shape is a refresher; `CommandRefresher` runs a shell command instead.

use std::path::Path;
use std::process::{Command, ExitStatus};

use thiserror::Error;
use tracing::debug;

/// Boxed error type returned by refresh functions
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Environment variable holding the target path for `CommandRefresher`
pub const PATH_ENV_VAR: &str = "STALEFILE_PATH";

/// Regenerates the contents of a cached file
///
/// Implementations are expected to leave an updated file at `path` when they
/// return `Ok(())`. Nothing checks that they do.
pub trait Refresher: Send + Sync {
    fn refresh(&self, path: &Path) -> Result<(), BoxError>;
}

impl<F> Refresher for F
where
    F: Fn(&Path) -> Result<(), BoxError> + Send + Sync,
{
    fn refresh(&self, path: &Path) -> Result<(), BoxError> {
        self(path)
    }
}

/// Errors produced by `CommandRefresher`
#[derive(Debug, Error)]
pub enum RefreshCommandError {
    /// The shell could not be started
    #[error("Failed to run refresh command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The command ran but exited unsuccessfully
    #[error("Refresh command '{command}' failed with {status}")]
    Failed { command: String, status: ExitStatus },
}

/// Refreshes a file by running a shell command
///
/// The command is run with `sh -c`. The target path is passed as `$1` and in
/// the `STALEFILE_PATH` environment variable. Output is inherited from the
/// calling process except stdout, which is discarded so it cannot mix with
/// the file contents the CLI prints.
#[derive(Debug, Clone)]
pub struct CommandRefresher {
    command: String,
}

impl CommandRefresher {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// The shell command this refresher runs
    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Refresher for CommandRefresher {
    fn refresh(&self, path: &Path) -> Result<(), BoxError> {
        debug!(command = %self.command, path = %path.display(), "running refresh command");

        let status = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .arg("stalefile-refresh")
            .arg(path)
            .env(PATH_ENV_VAR, path)
            .stdout(std::process::Stdio::null())
            .status()
            .map_err(|source| RefreshCommandError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        if !status.success() {
            return Err(RefreshCommandError::Failed {
                command: self.command.clone(),
                status,
            }
            .into());
        }

        Ok(())
    }
}
