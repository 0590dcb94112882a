use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mcmc_tailer::{ChainSnapshot, ChainTailer, RunConfig, TailerConfig};
use mcmc_types::{Chain, Run};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::discovery::{is_safe_id, list_chain_files, list_run_ids};
use crate::{Error, Result};

/// One [`ChainTailer`] per `runId/chainId` under a monitored root.
///
/// Tailers are created on first reference and live until their file
/// disappears from a chain listing. The map lock is only held to look up
/// or insert a tailer, never across a read.
pub struct ChainRegistry {
    root: PathBuf,
    config: TailerConfig,
    tailers: Mutex<HashMap<String, Arc<ChainTailer>>>,
}

fn registry_key(run_id: &str, chain_id: &str) -> String {
    format!("{}/{}", run_id, chain_id)
}

impl ChainRegistry {
    pub fn new(root: impl Into<PathBuf>, config: TailerConfig) -> Self {
        Self {
            root: root.into(),
            config,
            tailers: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &TailerConfig {
        &self.config
    }

    fn lock_tailers(&self) -> MutexGuard<'_, HashMap<String, Arc<ChainTailer>>> {
        self.tailers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of live tailers across all runs.
    pub fn tailer_count(&self) -> usize {
        self.lock_tailers().len()
    }

    pub fn list_runs(&self) -> Result<Vec<Run>> {
        Ok(list_run_ids(&self.root)?.into_iter().map(Run::new).collect())
    }

    /// Run config of `run_id`, or the default when the run has none.
    pub fn run_config(&self, run_id: &str) -> Result<RunConfig> {
        if !is_safe_id(run_id) {
            return Err(Error::InvalidRequest(format!("bad run id: {:?}", run_id)));
        }
        let path = self.root.join(run_id).join(mcmc_tailer::RUN_CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(RunConfig::default());
        }
        Ok(RunConfig::load_from(&path)?)
    }

    fn tailer_for(&self, run_id: &str, chain_id: &str, path: &Path) -> Arc<ChainTailer> {
        let key = registry_key(run_id, chain_id);
        let mut tailers = self.lock_tailers();
        if let Some(tailer) = tailers.get(&key)
            && tailer.path() == path
        {
            return Arc::clone(tailer);
        }
        debug!(chain = %key, path = %path.display(), "Creating chain tailer");
        let tailer = Arc::new(ChainTailer::new(path, chain_id, self.config.clone()));
        tailers.insert(key, Arc::clone(&tailer));
        tailer
    }

    /// Update every chain of `run_id` and report its metadata, sorted by
    /// chain id. A run directory that does not exist has no chains.
    pub async fn chain_snapshots(&self, run_id: &str) -> Result<Vec<ChainSnapshot>> {
        if !is_safe_id(run_id) {
            return Err(Error::InvalidRequest(format!("bad run id: {:?}", run_id)));
        }
        let files = list_chain_files(&self.root.join(run_id))?;

        let prefix = format!("{}/", run_id);
        self.lock_tailers().retain(|key, _| {
            !key.starts_with(&prefix)
                || files
                    .iter()
                    .any(|(chain_id, _)| key[prefix.len()..] == **chain_id)
        });

        let mut updates = JoinSet::new();
        for (chain_id, path) in &files {
            let tailer = self.tailer_for(run_id, chain_id, path);
            updates.spawn(async move {
                tailer.update().await;
                tailer.snapshot()
            });
        }

        let mut snapshots = Vec::with_capacity(files.len());
        while let Some(result) = updates.join_next().await {
            match result {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => warn!(run = %run_id, error = %e, "Chain update task failed"),
            }
        }
        snapshots.sort_by(|a, b| a.chain_id.cmp(&b.chain_id));
        Ok(snapshots)
    }

    /// Chain listing in wire form.
    pub async fn get_chains_for_run(&self, run_id: &str) -> Result<Vec<Chain>> {
        let snapshots = self.chain_snapshots(run_id).await?;
        Ok(snapshots
            .into_iter()
            .map(|s| Chain {
                run_id: run_id.to_string(),
                chain_id: s.chain_id,
                variable_names: s.variable_names,
                raw_header: Some(s.raw_header),
                raw_footer: Some(s.raw_footer),
                variable_prefixes_excluded: s.variable_prefixes_excluded,
                excluded_initial_iteration_count: s.excluded_initial_iteration_count,
                last_change_timestamp: s.last_change_timestamp,
            })
            .collect())
    }

    /// Path of the chain file for `chain_id`: `<chainId>.csv` if present,
    /// else the first CSV whose derived chain id matches.
    pub fn chain_path(&self, run_id: &str, chain_id: &str) -> Option<PathBuf> {
        if !is_safe_id(run_id) || !is_safe_id(chain_id) {
            return None;
        }
        let run_dir = self.root.join(run_id);
        let direct = run_dir.join(format!("{}.csv", chain_id));
        if direct.is_file() {
            return Some(direct);
        }
        list_chain_files(&run_dir)
            .ok()?
            .into_iter()
            .find(|(id, _)| id == chain_id)
            .map(|(_, path)| path)
    }

    /// Values of one variable from row `start` on, after pulling whatever
    /// is new. Empty when the run, chain or variable is unknown.
    pub async fn get_sequence_data(
        &self,
        run_id: &str,
        chain_id: &str,
        variable_name: &str,
        start: usize,
    ) -> Vec<f64> {
        let Some(path) = self.chain_path(run_id, chain_id) else {
            return Vec::new();
        };
        let tailer = self.tailer_for(run_id, chain_id, &path);
        tailer.update().await;
        tailer.sequence_data(variable_name, start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registry_with(files: &[(&str, &str)]) -> std::io::Result<(TempDir, ChainRegistry)> {
        let dir = TempDir::new()?;
        for (relative, content) in files {
            let path = dir.path().join(relative);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, content)?;
        }
        let registry = ChainRegistry::new(dir.path(), TailerConfig::immediate());
        Ok((dir, registry))
    }

    #[tokio::test]
    async fn test_missing_run_has_no_chains() -> anyhow::Result<()> {
        let (_dir, registry) = registry_with(&[])?;
        assert!(registry.get_chains_for_run("nope").await?.is_empty());
        assert!(registry.get_sequence_data("nope", "c", "x", 0).await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_unsafe_run_id_is_rejected() -> anyhow::Result<()> {
        let (_dir, registry) = registry_with(&[])?;
        let err = registry.get_chains_for_run("../etc").await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
        assert!(registry.chain_path("run", "../x").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_fallback_path_lookup() -> anyhow::Result<()> {
        let (dir, registry) = registry_with(&[("r/output_3.csv", "a\n1\n2\n")])?;

        assert_eq!(
            registry.chain_path("r", "chain_3"),
            Some(dir.path().join("r/output_3.csv"))
        );
        assert_eq!(
            registry.get_sequence_data("r", "chain_3", "a", 1).await,
            vec![2.0]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_vanished_chain_is_evicted() -> anyhow::Result<()> {
        let (dir, registry) =
            registry_with(&[("r/chain_1.csv", "a\n1\n"), ("r/chain_2.csv", "a\n1\n")])?;

        assert_eq!(registry.get_chains_for_run("r").await?.len(), 2);
        assert_eq!(registry.tailer_count(), 2);

        std::fs::remove_file(dir.path().join("r/chain_2.csv"))?;
        let chains = registry.get_chains_for_run("r").await?;
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].chain_id, "chain_1");
        assert_eq!(registry.tailer_count(), 1);
        Ok(())
    }

    #[test]
    fn test_run_config_defaults_when_absent() -> anyhow::Result<()> {
        let (_dir, registry) =
            registry_with(&[("r2/mcmc-run.yaml", "includeVariables: [z.1]\n")])?;
        assert!(registry.run_config("r1")?.include_variables.is_empty());
        assert_eq!(registry.run_config("r2")?.include_variables, vec!["z.1"]);
        Ok(())
    }
}
