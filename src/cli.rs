//! Command-line interface parsing for stalefile
//!
//! This module handles parsing of CLI arguments using clap, resolving them
//! into a `RunConfig`, and running a single fetch or status check.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use chrono::Duration;
use clap::Parser;
use thiserror::Error;

use crate::cache::{cache_dir, CommandRefresher, StaleFile, StaleFileConfig, DEFAULT_MAX_AGE};

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// Neither PATH nor --cache-file was given
    #[error("No file given. Pass a PATH or --cache-file <NAME>")]
    MissingPath,

    /// --cache-file was given but there is no user cache directory
    #[error("Could not determine the user cache directory")]
    NoCacheDir,

    /// The max age does not fit in a duration
    #[error("Invalid max age: {0} seconds is out of range")]
    InvalidMaxAge(i64),
}

/// stalefile - print a cached file, refreshing it first when it is stale
#[derive(Parser, Debug)]
#[command(name = "stalefile")]
#[command(about = "Print a cached file, refreshing it first when it is older than its max age")]
#[command(version)]
pub struct Cli {
    /// Path of the cached file
    #[arg(value_name = "PATH", conflicts_with = "cache_file")]
    pub path: Option<PathBuf>,

    /// Keep the file under this name in the user cache directory instead of PATH
    #[arg(long, value_name = "NAME")]
    pub cache_file: Option<String>,

    /// Seconds since last modification before the file is stale
    ///
    /// Zero or a negative value makes the file always stale.
    #[arg(
        long,
        value_name = "SECONDS",
        default_value_t = DEFAULT_MAX_AGE.num_seconds(),
        allow_negative_numbers = true
    )]
    pub max_age: i64,

    /// Shell command that regenerates the file
    ///
    /// Runs with `sh -c`. The file path is passed as $1 and in STALEFILE_PATH.
    ///
    /// Example:
    ///   stalefile feed.json --max-age 600 --refresh 'curl -sfo "$1" https://example.com/feed.json'
    #[arg(long, value_name = "COMMAND")]
    pub refresh: Option<String>,

    /// Print the file's freshness as JSON instead of its contents
    #[arg(long)]
    pub status: bool,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Path and max age of the cached file
    pub file: StaleFileConfig,
    /// Shell command used as the refresher, if any
    pub refresh_command: Option<String>,
    /// Report status instead of printing contents
    pub status_only: bool,
    /// Create the file's directory before fetching (set for --cache-file)
    pub create_dir: bool,
}

impl RunConfig {
    /// Creates a RunConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(RunConfig)` with the resolved path and max age
    /// * `Err(CliError)` if no file was named or the max age is out of range
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let path = match (&cli.path, &cli.cache_file) {
            (Some(path), _) => path.clone(),
            (None, Some(name)) => cache_dir().ok_or(CliError::NoCacheDir)?.join(name),
            (None, None) => return Err(CliError::MissingPath),
        };

        let max_age =
            Duration::try_seconds(cli.max_age).ok_or(CliError::InvalidMaxAge(cli.max_age))?;

        Ok(RunConfig {
            file: StaleFileConfig::new(path).with_max_age(max_age),
            refresh_command: cli.refresh.clone(),
            status_only: cli.status,
            create_dir: cli.path.is_none(),
        })
    }

    /// Builds the StaleFile this configuration describes
    pub fn build(&self) -> StaleFile {
        let mut file = StaleFile::from_config(self.file.clone());
        if let Some(command) = &self.refresh_command {
            file.set_refresher(CommandRefresher::new(command.as_str()));
        }
        file
    }
}

/// Fetches the file (or its status) and writes it to `out`
pub fn run<W: Write>(config: &RunConfig, out: &mut W) -> Result<(), Box<dyn std::error::Error>> {
    let file = config.build();

    if config.status_only {
        serde_json::to_writer_pretty(&mut *out, &file.status())?;
        writeln!(out)?;
        return Ok(());
    }

    if config.create_dir {
        if let Some(parent) = config.file.path.parent() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut handle = file.get()?;
    io::copy(&mut handle, out)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_cli_parse_path_only() {
        let cli = Cli::parse_from(["stalefile", "data.json"]);
        assert_eq!(cli.path, Some(PathBuf::from("data.json")));
        assert_eq!(cli.max_age, DEFAULT_MAX_AGE.num_seconds());
        assert!(cli.refresh.is_none());
        assert!(!cli.status);
    }

    #[test]
    fn test_cli_parse_negative_max_age() {
        let cli = Cli::parse_from(["stalefile", "data.json", "--max-age", "-5"]);
        assert_eq!(cli.max_age, -5);
    }

    #[test]
    fn test_cli_path_conflicts_with_cache_file() {
        let result = Cli::try_parse_from(["stalefile", "data.json", "--cache-file", "feed"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_run_config_from_cli_no_path() {
        let cli = Cli::parse_from(["stalefile"]);
        let err = RunConfig::from_cli(&cli).unwrap_err();
        assert!(matches!(err, CliError::MissingPath));
        assert!(err.to_string().contains("No file given"));
    }

    #[test]
    fn test_run_config_from_cli_full() {
        let cli = Cli::parse_from([
            "stalefile",
            "data.json",
            "--max-age",
            "90",
            "--refresh",
            "touch \"$1\"",
            "--status",
        ]);
        let config = RunConfig::from_cli(&cli).unwrap();
        assert_eq!(config.file.path, PathBuf::from("data.json"));
        assert_eq!(config.file.max_age, Duration::seconds(90));
        assert_eq!(config.refresh_command.as_deref(), Some("touch \"$1\""));
        assert!(config.status_only);
        assert!(!config.create_dir);
        assert!(config.build().has_refresher());
    }

    #[test]
    fn test_run_config_from_cli_out_of_range_max_age() {
        let cli = Cli::parse_from(["stalefile", "data.json", "--max-age", &i64::MAX.to_string()]);
        let err = RunConfig::from_cli(&cli).unwrap_err();
        assert!(matches!(err, CliError::InvalidMaxAge(_)));
    }

    #[test]
    fn test_run_config_from_cli_cache_file() {
        let cli = Cli::parse_from(["stalefile", "--cache-file", "feed.json"]);
        match RunConfig::from_cli(&cli) {
            Ok(config) => {
                assert!(config.file.path.ends_with("feed.json"));
                assert!(config.create_dir);
            }
            Err(err) => assert!(matches!(err, CliError::NoCacheDir)),
        }
    }

    #[test]
    fn test_run_prints_refreshed_contents() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("out.txt");
        let path_arg = path.to_str().expect("Temp path should be UTF-8");
        let cli = Cli::parse_from(["stalefile", path_arg, "--refresh", "printf fresh > \"$1\""]);
        let config = RunConfig::from_cli(&cli).unwrap();

        let mut out = Vec::new();
        run(&config, &mut out).expect("Run should succeed");

        assert_eq!(out, b"fresh");
        assert_eq!(fs::read_to_string(&path).unwrap(), "fresh");
    }

    #[test]
    fn test_run_creates_directory_when_asked() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("cache").join("feed.txt");
        let config = RunConfig {
            file: StaleFileConfig::new(&path),
            refresh_command: Some("printf feed > \"$1\"".to_string()),
            status_only: false,
            create_dir: true,
        };

        let mut out = Vec::new();
        run(&config, &mut out).expect("Run should succeed");

        assert_eq!(out, b"feed");
    }

    #[test]
    fn test_run_status_does_not_refresh() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("never.txt");
        let config = RunConfig {
            file: StaleFileConfig::new(&path),
            refresh_command: Some("printf x > \"$1\"".to_string()),
            status_only: true,
            create_dir: false,
        };

        let mut out = Vec::new();
        run(&config, &mut out).expect("Run should succeed");

        let status: serde_json::Value = serde_json::from_slice(&out).expect("Should be JSON");
        assert_eq!(status["expired"], serde_json::Value::Bool(true));
        assert!(status["modified_at"].is_null());
        assert!(!path.exists(), "Status should not refresh the file");
    }
}
