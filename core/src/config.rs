//! Tracker configuration.
//!
//! Loaded from JSON, with `CHANGEPLAN_CONFIG` naming a config file and
//! `CHANGEPLAN_STALENESS_MS` overriding the debounce window.

use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackerConfig {
    /// Minimum interval between two re-parses of one file. `0` disables debouncing.
    pub staleness_window_ms: u64,
    /// Upper bound on a single indexer call.
    pub parse_timeout_ms: u64,
    /// How many files are re-parsed at once while building a plan.
    pub max_concurrent_parses: usize,
    /// Bound on the number of files with stored snapshots. `None` is unbounded.
    pub max_tracked_files: Option<usize>,
    /// Glob patterns for files that are never tracked.
    pub ignored_paths: Vec<String>,
    /// Root passed to indexers and used to resolve relative paths.
    pub working_directory: PathBuf,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            staleness_window_ms: 2000,
            parse_timeout_ms: 10_000,
            max_concurrent_parses: 4,
            max_tracked_files: None,
            ignored_paths: vec![
                "**/node_modules/**".to_owned(),
                "**/target/**".to_owned(),
                "**/.git/**".to_owned(),
            ],
            working_directory: PathBuf::from("."),
        }
    }
}

impl TrackerConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: TrackerConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, then `CHANGEPLAN_CONFIG`, then `CHANGEPLAN_STALENESS_MS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("CHANGEPLAN_CONFIG") {
            Ok(path) => Self::load(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        if let Ok(ms) = std::env::var("CHANGEPLAN_STALENESS_MS") {
            config.staleness_window_ms = ms.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("CHANGEPLAN_STALENESS_MS is not a number: {ms}"))
            })?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_parses == 0 {
            return Err(ConfigError::Invalid(
                "maxConcurrentParses must be at least 1".to_owned(),
            ));
        }
        if self.parse_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "parseTimeoutMs must be at least 1".to_owned(),
            ));
        }
        if self.max_tracked_files == Some(0) {
            return Err(ConfigError::Invalid(
                "maxTrackedFiles must be at least 1".to_owned(),
            ));
        }
        for pattern in &self.ignored_paths {
            Pattern::new(pattern).map_err(|e| {
                ConfigError::Invalid(format!("bad ignoredPaths pattern {pattern:?}: {e}"))
            })?;
        }
        Ok(())
    }

    pub fn staleness_window(&self) -> Duration {
        Duration::from_millis(self.staleness_window_ms)
    }

    pub fn parse_timeout(&self) -> Duration {
        Duration::from_millis(self.parse_timeout_ms)
    }

    /// Compiled `ignored_paths`. Invalid patterns are skipped; `validate`
    /// reports them.
    pub fn ignore_patterns(&self) -> Vec<Pattern> {
        self.ignored_paths
            .iter()
            .filter_map(|p| Pattern::new(p).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serializes tests that modify CHANGEPLAN_* env vars.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::default();
        assert_eq!(config.staleness_window(), Duration::from_millis(2000));
        assert!(config.validate().is_ok());
        assert_eq!(config.ignore_patterns().len(), 3);
    }

    #[test]
    fn test_load_partial_json_fills_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("changeplan.json");
        fs::write(&path, r#"{"stalenessWindowMs": 500, "maxTrackedFiles": 10}"#).unwrap();

        let config = TrackerConfig::load(&path).unwrap();
        assert_eq!(config.staleness_window_ms, 500);
        assert_eq!(config.max_tracked_files, Some(10));
        assert_eq!(config.max_concurrent_parses, 4);
    }

    #[test]
    fn test_validate_rejects_zero_bounds_and_bad_globs() {
        let config = TrackerConfig {
            max_concurrent_parses: 0,
            ..TrackerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = TrackerConfig {
            max_tracked_files: Some(0),
            ..TrackerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = TrackerConfig {
            ignored_paths: vec!["[".to_owned()],
            ..TrackerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_reports_json_errors() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(TrackerConfig::load(&path), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_from_env_overrides() {
        let _lock = ENV_LOCK.lock().unwrap();
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("changeplan.json");
        fs::write(&path, r#"{"parseTimeoutMs": 50}"#).unwrap();

        std::env::set_var("CHANGEPLAN_CONFIG", &path);
        std::env::set_var("CHANGEPLAN_STALENESS_MS", "250");
        let config = TrackerConfig::from_env();
        std::env::remove_var("CHANGEPLAN_CONFIG");
        std::env::remove_var("CHANGEPLAN_STALENESS_MS");

        let config = config.unwrap();
        assert_eq!(config.parse_timeout(), Duration::from_millis(50));
        assert_eq!(config.staleness_window_ms, 250);
    }

    #[test]
    fn test_from_env_rejects_non_numeric_window() {
        let _lock = ENV_LOCK.lock().unwrap();
        std::env::set_var("CHANGEPLAN_STALENESS_MS", "soon");
        let result = TrackerConfig::from_env();
        std::env::remove_var("CHANGEPLAN_STALENESS_MS");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
