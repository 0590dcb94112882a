//! TestWorld pattern for declarative integration test setup.
//!
//! Provides a fluent interface for:
//! - Creating an isolated monitored root
//! - Writing and growing chain files the way a sampler would
//! - Editing per-run `mcmc-run.yaml` files
//! - Executing CLI commands against the root

use anyhow::Result;
use assert_cmd::Command;
use filetime::FileTime;
use mcmc_runtime::{ChainRegistry, TailerConfig};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const RUN_CONFIG_FILE_NAME: &str = "mcmc-run.yaml";

/// Declarative test environment builder.
///
/// # Example
/// ```no_run
/// use mcmc_testing::{ChainCsv, TestWorld};
///
/// let world = TestWorld::new().with_run("run-a");
/// world
///     .write_chain("run-a", "chain_1.csv", &ChainCsv::new(&["lp__"]).with_draws(3).render())
///     .unwrap();
///
/// let result = world.run(&["chains", "run-a"]).unwrap();
/// assert!(result.success());
/// ```
pub struct TestWorld {
    temp_dir: TempDir,
    root: PathBuf,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorld {
    /// Create a new isolated test environment with an empty root.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().join("output");
        std::fs::create_dir_all(&root).expect("Failed to create monitored root");

        Self {
            temp_dir,
            root,
        }
    }

    /// The monitored directory: one subdirectory per run.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the temp directory root (parent of the monitored root).
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root.join(run_id)
    }

    pub fn chain_path(&self, run_id: &str, file_name: &str) -> PathBuf {
        self.run_dir(run_id).join(file_name)
    }

    /// Create a run directory.
    pub fn with_run(self, run_id: &str) -> Self {
        std::fs::create_dir_all(self.run_dir(run_id)).expect("Failed to create run dir");
        self
    }

    /// Write (or replace) a chain file.
    pub fn write_chain(&self, run_id: &str, file_name: &str, content: &str) -> Result<PathBuf> {
        let path = self.chain_path(run_id, file_name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Append to a chain file, creating it if needed.
    pub fn append_chain(&self, run_id: &str, file_name: &str, content: &str) -> Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.chain_path(run_id, file_name))?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    pub fn write_run_config(&self, run_id: &str, yaml: &str) -> Result<PathBuf> {
        let path = self.run_dir(run_id).join(RUN_CONFIG_FILE_NAME);
        std::fs::write(&path, yaml)?;
        Ok(path)
    }

    /// Set the run config's mtime, as an editor save would.
    pub fn touch_run_config(&self, run_id: &str, unix_seconds: i64) -> Result<()> {
        let path = self.run_dir(run_id).join(RUN_CONFIG_FILE_NAME);
        filetime::set_file_mtime(path, FileTime::from_unix_time(unix_seconds, 0))?;
        Ok(())
    }

    pub fn remove_run_config(&self, run_id: &str) -> Result<()> {
        std::fs::remove_file(self.run_dir(run_id).join(RUN_CONFIG_FILE_NAME))?;
        Ok(())
    }

    /// A registry over this world's root.
    pub fn registry(&self, config: TailerConfig) -> ChainRegistry {
        ChainRegistry::new(&self.root, config)
    }

    /// Configure a CLI command with this test environment's settings.
    ///
    /// The caller must provide the base command (e.g., from `cargo_bin_cmd!("mcmc-monitor")`).
    pub fn configure_command<'a>(&self, cmd: &'a mut Command) -> &'a mut Command {
        cmd.arg("--dir")
            .arg(&self.root)
            .arg("--format")
            .arg("plain");

        cmd.current_dir(self.temp_dir.path());
        cmd.env_remove("RUST_LOG");

        cmd
    }

    /// A configured command for the monitor binary.
    #[allow(deprecated)]
    pub fn command(&self) -> Result<Command> {
        let mut cmd = Command::cargo_bin("mcmc-monitor")
            .map_err(|e| anyhow::anyhow!("Failed to find mcmc-monitor binary: {}", e))?;
        self.configure_command(&mut cmd);
        Ok(cmd)
    }

    /// Execute the monitor binary with `args` and collect its output.
    pub fn run(&self, args: &[&str]) -> Result<CliResult> {
        let mut cmd = self.command()?;
        cmd.args(args);

        let output = cmd.output()?;

        Ok(CliResult {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Result of a CLI command execution.
#[derive(Debug)]
pub struct CliResult {
    pub status: std::process::ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CliResult {
    /// Check if the command succeeded.
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Parse stdout as JSON.
    pub fn json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.stdout)?)
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }
}
