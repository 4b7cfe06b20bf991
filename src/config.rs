use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_QUERY_TIMEOUT_MS, DEFAULT_UPDATE_INTERVAL_MS,
    DEFAULT_WATCH_EXCLUDE, MAX_PERIODIC_MS, MIN_PERIODIC_MS,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MIN_QUERY_TIMEOUT_MS: u64 = 100;

/// where the label sits on the status line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    #[default]
    Left,
    Right,
}

/// which roots are counted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// every tracked folder, summed
    #[default]
    All,
    /// only the selected repository
    Selected,
}

/// user settings, read from a json file with camelCase keys
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// when false the indicator shows zero without running git
    pub enabled: bool,

    /// debounce for file changes in ms, also drives the periodic refresh
    pub update_interval: u64,

    /// show "0" rather than hiding the indicator when nothing changed
    pub show_when_zero: bool,

    /// per-category label instead of just the total
    pub show_details: bool,

    pub position: Position,

    pub scope: Scope,

    /// git status timeout in ms
    pub query_timeout: u64,

    /// directory names the watcher skips
    pub watch_exclude: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            update_interval: DEFAULT_UPDATE_INTERVAL_MS,
            show_when_zero: true,
            show_details: true,
            position: Position::Left,
            scope: Scope::All,
            query_timeout: DEFAULT_QUERY_TIMEOUT_MS,
            watch_exclude: DEFAULT_WATCH_EXCLUDE.iter().map(ToString::to_string).collect(),
        }
    }
}

impl Settings {
    /// read settings from `path`, a missing file gives the defaults
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text)
                .with_context(|| format!("invalid settings in {}", path.display())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(text)?)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.update_interval)
    }

    /// twice the update interval, clamped to 1-10 seconds
    pub fn periodic(&self) -> Duration {
        let ms = self
            .update_interval
            .saturating_mul(2)
            .clamp(MIN_PERIODIC_MS, MAX_PERIODIC_MS);
        Duration::from_millis(ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout.max(MIN_QUERY_TIMEOUT_MS))
    }
}

/// `<config dir>/git-change-count/config.json`, if the platform has a config dir
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.enabled);
        assert!(settings.show_when_zero);
        assert!(settings.show_details);
        assert_eq!(settings.debounce(), Duration::from_millis(500));
        assert_eq!(settings.periodic(), Duration::from_millis(1000));
        assert_eq!(settings.query_timeout(), Duration::from_millis(2000));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings =
            Settings::parse(r#"{ "showDetails": false, "position": "right", "scope": "selected" }"#)
                .unwrap();
        assert!(!settings.show_details);
        assert_eq!(settings.position, Position::Right);
        assert_eq!(settings.scope, Scope::Selected);
        assert!(settings.enabled);
        assert_eq!(settings.update_interval, DEFAULT_UPDATE_INTERVAL_MS);
    }

    #[test]
    fn test_periodic_is_clamped() {
        let mut settings = Settings::default();
        settings.update_interval = 100;
        assert_eq!(settings.periodic(), Duration::from_millis(1000));
        settings.update_interval = 3000;
        assert_eq!(settings.periodic(), Duration::from_millis(6000));
        settings.update_interval = 60_000;
        assert_eq!(settings.periodic(), Duration::from_millis(10_000));
        settings.update_interval = u64::MAX;
        assert_eq!(settings.periodic(), Duration::from_millis(10_000));
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(Settings::parse("{ not json").is_err());
        assert!(Settings::parse(r#"{ "position": "middle" }"#).is_err());
    }

    #[test]
    fn test_load_missing_and_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        assert_eq!(Settings::load(&path).unwrap(), Settings::default());

        fs::write(&path, "  \n").unwrap();
        assert_eq!(Settings::load(&path).unwrap(), Settings::default());

        fs::write(&path, r#"{ "updateInterval": 2000 }"#).unwrap();
        assert_eq!(Settings::load(&path).unwrap().update_interval, 2000);
    }
}
