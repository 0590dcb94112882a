use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::warn;

use crate::Result;

/// Per-run configuration file, looked up next to the chain files.
pub const RUN_CONFIG_FILE_NAME: &str = "mcmc-run.yaml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    /// Columns to keep even when their prefix group is excluded.
    #[serde(default)]
    pub include_variables: Vec<String>,
}

impl RunConfig {
    /// Location of the run config governing the chain file at `chain_path`.
    pub fn path_for(chain_path: &Path) -> PathBuf {
        chain_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(RUN_CONFIG_FILE_NAME)
    }

    pub fn parse(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str::<Option<RunConfig>>(yaml)?.unwrap_or_default())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }
}

/// What a tailer last saw of its run config: the parsed content plus the
/// modification time used to detect edits. `modified` is `None` when the
/// file was absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ObservedRunConfig {
    pub config: RunConfig,
    pub present: bool,
    pub modified: Option<SystemTime>,
}

impl ObservedRunConfig {
    /// Stat and parse the run config at `path`. A file that exists but
    /// cannot be read or parsed is still tracked by its mtime, with an empty
    /// configuration.
    pub async fn observe(path: &Path) -> Self {
        let Ok(metadata) = tokio::fs::metadata(path).await else {
            return Self::default();
        };

        let loaded = match tokio::fs::read_to_string(path).await {
            Ok(content) => RunConfig::parse(&content),
            Err(e) => Err(e.into()),
        };
        let config = match loaded {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable run config");
                RunConfig::default()
            }
        };

        Self {
            config,
            present: true,
            modified: metadata.modified().ok(),
        }
    }

    /// Describe how the file at `path` differs from this observation, if it
    /// does.
    pub async fn change_reason(&self, path: &Path) -> Option<&'static str> {
        match (tokio::fs::metadata(path).await, self.present) {
            (Ok(_), false) => Some("New run config file"),
            (Err(_), true) => Some("Run config file has been deleted"),
            (Ok(metadata), true) if metadata.modified().ok() != self.modified => {
                Some("Run config file has been modified")
            }
            _ => None,
        }
    }
}
