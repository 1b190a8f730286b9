//! Runtime configuration read from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `RURALHEALTH_DB_PATH` | `ruralhealth.db` |
//! | `RURALHEALTH_LOG_MODE` | `stderr` (`stderr` or `file`) |
//! | `RURALHEALTH_LOG_FILE` | `ruralhealth.log` |
//! | `RURALHEALTH_INSIGHTS` | `true` |
//! | `RURALHEALTH_INSIGHTS_MODEL` | `template-v1` |

use std::fs::{File, OpenOptions};
use std::path::PathBuf;

use crate::adapters::insights::InsightConfig;
use crate::ScreeningError;

const DB_PATH_ENV: &str = "RURALHEALTH_DB_PATH";
const LOG_MODE_ENV: &str = "RURALHEALTH_LOG_MODE";
const LOG_FILE_ENV: &str = "RURALHEALTH_LOG_FILE";
const INSIGHTS_ENV: &str = "RURALHEALTH_INSIGHTS";
const INSIGHTS_MODEL_ENV: &str = "RURALHEALTH_INSIGHTS_MODEL";

/// Where log output goes. Stdout is reserved for command output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    Stderr,
    File,
}

/// Settings for the `ruralhealth` binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
    pub insights: InsightConfig,
}

impl AppConfig {
    /// Read the configuration from the process environment.
    ///
    /// # Errors
    /// Returns `ScreeningError::Config` if a variable holds an unsupported value.
    pub fn from_env() -> Result<Self, ScreeningError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    /// Returns `ScreeningError::Config` if a variable holds an unsupported value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ScreeningError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let log_mode = match lookup(LOG_MODE_ENV).as_deref().map(str::trim) {
            None | Some("") | Some("stderr") => LogMode::Stderr,
            Some("file") => LogMode::File,
            Some(other) => {
                return Err(ScreeningError::Config(format!(
                    "{LOG_MODE_ENV} must be 'stderr' or 'file', got '{other}'"
                )))
            }
        };

        let enabled = match lookup(INSIGHTS_ENV) {
            None => true,
            Some(v) => parse_flag(INSIGHTS_ENV, &v)?,
        };

        let defaults = InsightConfig::default();
        Ok(Self {
            db_path: lookup(DB_PATH_ENV)
                .map_or_else(|| PathBuf::from("ruralhealth.db"), PathBuf::from),
            log_mode,
            log_file: lookup(LOG_FILE_ENV)
                .map_or_else(|| PathBuf::from("ruralhealth.log"), PathBuf::from),
            insights: InsightConfig {
                enabled,
                model: lookup(INSIGHTS_MODEL_ENV).unwrap_or(defaults.model),
            },
        })
    }

    /// Open the log file for appending, creating missing parent directories.
    ///
    /// # Errors
    /// Returns the I/O error from creating the directory or opening the file.
    pub fn open_log_file(&self) -> std::io::Result<File> {
        if let Some(parent) = self.log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, ScreeningError> {
    match value.trim() {
        "1" | "true" | "TRUE" | "yes" | "YES" => Ok(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Ok(false),
        other => Err(ScreeningError::Config(format!(
            "{name} must be a boolean, got '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ScreeningError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).expect("Should build config");
        assert_eq!(config.db_path, PathBuf::from("ruralhealth.db"));
        assert_eq!(config.log_mode, LogMode::Stderr);
        assert!(config.insights.enabled);
        assert_eq!(config.insights.model, "template-v1");
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            (DB_PATH_ENV, "/data/screenings.db"),
            (LOG_MODE_ENV, "file"),
            (LOG_FILE_ENV, "/data/ruralhealth.log"),
            (INSIGHTS_ENV, "no"),
        ])
        .expect("Should build config");

        assert_eq!(config.db_path, PathBuf::from("/data/screenings.db"));
        assert_eq!(config.log_mode, LogMode::File);
        assert_eq!(config.log_file, PathBuf::from("/data/ruralhealth.log"));
        assert!(!config.insights.enabled);
    }

    #[test]
    fn test_open_log_file_creates_directories() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let path = dir.path().join("logs/nested/ruralhealth.log");
        let mut config = config(&[]).expect("Should build config");
        config.log_file = path.clone();

        config.open_log_file().expect("Should open log file");
        assert!(path.exists());
    }

    #[test]
    fn test_open_log_file_reports_directory_failure() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").expect("Should write file");

        let mut config = config(&[]).expect("Should build config");
        config.log_file = blocker.join("ruralhealth.log");
        assert!(config.open_log_file().is_err());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            config(&[(LOG_MODE_ENV, "syslog")]),
            Err(ScreeningError::Config(_))
        ));
        assert!(matches!(
            config(&[(INSIGHTS_ENV, "maybe")]),
            Err(ScreeningError::Config(_))
        ));
    }
}
