use crate::Result;
use mcmc_tailer::{DEFAULT_EXCLUDED_PREFIX_THRESHOLD, TailerConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Monitor config looked up in the watched root when no path is given.
pub const CONFIG_FILE_NAME: &str = "mcmc-monitor.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TailerSettings {
    pub min_update_interval_ms: u64,
    pub in_progress_poll_interval_ms: u64,
    pub excluded_prefix_threshold: usize,
}

impl Default for TailerSettings {
    fn default() -> Self {
        Self {
            min_update_interval_ms: 5000,
            in_progress_poll_interval_ms: 50,
            excluded_prefix_threshold: DEFAULT_EXCLUDED_PREFIX_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub verbose: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub tailer: TailerSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

impl MonitorConfig {
    /// Load from `explicit` if given, else from `mcmc-monitor.toml` in
    /// `root`, else defaults. An explicit path must exist.
    pub fn resolve(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                Ok(toml::from_str(&content)?)
            }
            None => Self::load_from(&root.join(CONFIG_FILE_NAME)),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: MonitorConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn tailer_config(&self) -> TailerConfig {
        TailerConfig {
            min_update_interval: Duration::from_millis(self.tailer.min_update_interval_ms),
            in_progress_poll_interval: Duration::from_millis(
                self.tailer.in_progress_poll_interval_ms,
            ),
            excluded_prefix_threshold: self.tailer.excluded_prefix_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default_matches_tailer_default() {
        let config = MonitorConfig::default();
        assert_eq!(config.tailer_config(), TailerConfig::default());
        assert!(!config.server.verbose);
    }

    #[test]
    fn test_config_save_and_load() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("nested/mcmc-monitor.toml");

        let mut config = MonitorConfig::default();
        config.tailer.min_update_interval_ms = 250;
        config.server.verbose = true;
        config.save_to(&config_path)?;

        let loaded = MonitorConfig::load_from(&config_path)?;
        assert_eq!(loaded, config);
        assert_eq!(
            loaded.tailer_config().min_update_interval,
            Duration::from_millis(250)
        );
        Ok(())
    }

    #[test]
    fn test_partial_file_fills_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        std::fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            "[tailer]\nexcluded_prefix_threshold = 20\n",
        )?;

        let config = MonitorConfig::resolve(temp_dir.path(), None)?;
        assert_eq!(config.tailer.excluded_prefix_threshold, 20);
        assert_eq!(config.tailer.min_update_interval_ms, 5000);
        assert_eq!(config.tailer.in_progress_poll_interval_ms, 50);
        Ok(())
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.toml");
        assert!(MonitorConfig::resolve(temp_dir.path(), Some(&missing)).is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[tailer\n")?;

        let err = MonitorConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
        Ok(())
    }
}
