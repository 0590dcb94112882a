use crate::types::OutputFormat;
use anyhow::{Context, Result};
use mcmc_runtime::{ChainRegistry, HandlerOptions, MonitorConfig, TailerConfig};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub struct ExecutionContext {
    root: PathBuf,
    config: MonitorConfig,
    pub format: OutputFormat,
    pub verbose: bool,
}

impl ExecutionContext {
    pub fn new(
        root: PathBuf,
        config_path: Option<&Path>,
        format: OutputFormat,
        verbose: bool,
    ) -> Result<Self> {
        let config = MonitorConfig::resolve(&root, config_path)
            .with_context(|| format!("Failed to load monitor config for {}", root.display()))?;

        Ok(Self {
            root,
            config,
            format,
            verbose,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Registry for a long-running server, rate limited per the config.
    pub fn server_registry(&self) -> ChainRegistry {
        ChainRegistry::new(&self.root, self.config.tailer_config())
    }

    /// Registry for one-shot commands: the first update reads everything.
    pub fn oneshot_registry(&self) -> ChainRegistry {
        let config = TailerConfig {
            min_update_interval: Duration::ZERO,
            ..self.config.tailer_config()
        };
        ChainRegistry::new(&self.root, config)
    }

    pub fn handler_options(&self, proxy: bool) -> HandlerOptions {
        HandlerOptions {
            verbose: self.verbose || self.config.server.verbose,
            proxy: Some(proxy),
        }
    }
}
