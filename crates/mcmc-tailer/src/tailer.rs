use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant, SystemTime};

use chrono::Utc;
use tracing::{debug, warn};

use crate::columns::DEFAULT_EXCLUDED_PREFIX_THRESHOLD;
use crate::parser::ChainContents;
use crate::run_config::{ObservedRunConfig, RunConfig};
use crate::segmenter::read_new_lines;

/// Timing and column-selection knobs shared by every tailer of a monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailerConfig {
    /// Reads closer together than this are skipped.
    pub min_update_interval: Duration,
    /// How often a caller re-checks a concurrent update it is waiting on.
    pub in_progress_poll_interval: Duration,
    /// Prefix groups larger than this are excluded unless force-included.
    pub excluded_prefix_threshold: usize,
}

impl Default for TailerConfig {
    fn default() -> Self {
        Self {
            min_update_interval: Duration::from_millis(5000),
            in_progress_poll_interval: Duration::from_millis(50),
            excluded_prefix_threshold: DEFAULT_EXCLUDED_PREFIX_THRESHOLD,
        }
    }
}

impl TailerConfig {
    /// No rate limiting: every `update()` reads whatever is new.
    pub fn immediate() -> Self {
        Self {
            min_update_interval: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// A consistent view of a chain's metadata, taken under one lock.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainSnapshot {
    pub chain_id: String,
    pub variable_names: Vec<String>,
    pub raw_header: String,
    pub raw_footer: String,
    pub variable_prefixes_excluded: Option<Vec<String>>,
    pub excluded_initial_iteration_count: Option<usize>,
    pub last_change_timestamp: i64,
    pub row_count: usize,
}

#[derive(Debug, Default)]
struct TailerState {
    contents: ChainContents,
    byte_offset: u64,
    last_attempt: Option<Instant>,
    last_change_timestamp: i64,
    file_created: Option<SystemTime>,
    /// `None` until the first `update()` finds the chain file.
    run_config: Option<ObservedRunConfig>,
}

impl TailerState {
    /// Fresh state for the file at `path`, recording its creation time and
    /// the current run config.
    async fn observe(path: &Path, file_created: Option<SystemTime>) -> Self {
        Self {
            file_created,
            run_config: Some(ObservedRunConfig::observe(&RunConfig::path_for(path)).await),
            ..Self::default()
        }
    }
}

/// Incremental reader for one growing chain file.
///
/// `update()` pulls whatever complete lines were appended since the last
/// read. Only one update runs at a time per tailer; concurrent callers wait
/// for it instead of reading themselves. Accessors may be called at any time
/// and only ever see fully ingested rows.
pub struct ChainTailer {
    path: PathBuf,
    chain_id: String,
    config: TailerConfig,
    updating: AtomicBool,
    state: RwLock<TailerState>,
}

/// Clears the in-progress flag however `update()` exits, stamping the
/// attempt time if a read was made.
struct UpdateGuard<'a> {
    tailer: &'a ChainTailer,
    attempted: bool,
}

impl Drop for UpdateGuard<'_> {
    fn drop(&mut self) {
        if self.attempted {
            self.tailer.write_state().last_attempt = Some(Instant::now());
        }
        self.tailer.updating.store(false, Ordering::Release);
    }
}

impl ChainTailer {
    pub fn new(path: impl Into<PathBuf>, chain_id: impl Into<String>, config: TailerConfig) -> Self {
        Self {
            path: path.into(),
            chain_id: chain_id.into(),
            config,
            updating: AtomicBool::new(false),
            state: RwLock::new(TailerState::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    fn read_state(&self) -> RwLockReadGuard<'_, TailerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, TailerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn variable_names(&self) -> Vec<String> {
        self.read_state().contents.variable_names().to_vec()
    }

    pub fn raw_header(&self) -> String {
        self.read_state().contents.raw_header()
    }

    pub fn raw_footer(&self) -> String {
        self.read_state().contents.raw_footer()
    }

    pub fn variable_prefixes_excluded(&self) -> Option<Vec<String>> {
        self.read_state()
            .contents
            .variable_prefixes_excluded()
            .map(<[String]>::to_vec)
    }

    pub fn excluded_initial_iteration_count(&self) -> Option<usize> {
        self.read_state().contents.excluded_initial_iteration_count()
    }

    pub fn last_change_timestamp(&self) -> i64 {
        self.read_state().last_change_timestamp
    }

    pub fn row_count(&self) -> usize {
        self.read_state().contents.rows().len()
    }

    pub fn byte_offset(&self) -> u64 {
        self.read_state().byte_offset
    }

    pub fn is_updating(&self) -> bool {
        self.updating.load(Ordering::Acquire)
    }

    /// Values of `variable_name` from row `start` on.
    pub fn sequence_data(&self, variable_name: &str, start: usize) -> Vec<f64> {
        self.read_state().contents.sequence_data(variable_name, start)
    }

    pub fn snapshot(&self) -> ChainSnapshot {
        let state = self.read_state();
        ChainSnapshot {
            chain_id: self.chain_id.clone(),
            variable_names: state.contents.variable_names().to_vec(),
            raw_header: state.contents.raw_header(),
            raw_footer: state.contents.raw_footer(),
            variable_prefixes_excluded: state
                .contents
                .variable_prefixes_excluded()
                .map(<[String]>::to_vec),
            excluded_initial_iteration_count: state.contents.excluded_initial_iteration_count(),
            last_change_timestamp: state.last_change_timestamp,
            row_count: state.contents.rows().len(),
        }
    }

    /// Pull newly appended lines from the chain file.
    ///
    /// Never fails: a missing file is a no-op, and read errors are logged and
    /// retried from the same offset on the next call.
    pub async fn update(&self) {
        if self
            .updating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            while self.updating.load(Ordering::Acquire) {
                tokio::time::sleep(self.config.in_progress_poll_interval).await;
            }
            return;
        }
        let mut guard = UpdateGuard {
            tailer: self,
            attempted: false,
        };

        let metadata = match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Problem checking chain file");
                return;
            }
        };

        self.check_configuration(&metadata).await;

        let offset = {
            let state = self.read_state();
            if state
                .last_attempt
                .is_some_and(|t| t.elapsed() < self.config.min_update_interval)
            {
                return;
            }
            state.byte_offset
        };

        guard.attempted = true;
        match read_new_lines(&self.path, offset).await {
            Ok(chunk) if !chunk.is_empty() => {
                let mut state = self.write_state();
                let state = &mut *state;
                let include = state
                    .run_config
                    .as_ref()
                    .map(|observed| observed.config.include_variables.as_slice())
                    .unwrap_or_default();
                state.contents.ingest(
                    &chunk.text,
                    include,
                    self.config.excluded_prefix_threshold,
                );
                state.byte_offset += chunk.bytes_consumed;
                state.last_change_timestamp = Utc::now().timestamp_millis();
                debug!(
                    path = %self.path.display(),
                    bytes = chunk.bytes_consumed,
                    rows = state.contents.rows().len(),
                    "Ingested chain data"
                );
            }
            Ok(_) => {}
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Problem updating chain file");
            }
        }
    }

    /// Record the file and run config on first sight. Afterwards, reset in
    /// place when the chain file was replaced or its run config appeared,
    /// disappeared or changed.
    async fn check_configuration(&self, metadata: &Metadata) {
        let created = metadata.created().ok();
        let (file_created, byte_offset, observed) = {
            let state = self.read_state();
            (state.file_created, state.byte_offset, state.run_config.clone())
        };

        if let Some(observed) = observed {
            let reason = if created != file_created {
                Some("File creation date changed")
            } else if created.is_none() && metadata.len() < byte_offset {
                // no birth time on this platform; a shrunken file stands in for a new one
                Some("File shrank below read offset")
            } else {
                observed
                    .change_reason(&RunConfig::path_for(&self.path))
                    .await
            };
            let Some(reason) = reason else {
                return;
            };
            warn!(path = %self.path.display(), reason, "Resetting chain");
        }

        let fresh = TailerState::observe(&self.path, created).await;
        *self.write_state() = fresh;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RUN_CONFIG_FILE_NAME;
    use filetime::FileTime;
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn append(path: &Path, text: &str) -> std::io::Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        file.write_all(text.as_bytes())
    }

    #[tokio::test]
    async fn test_end_to_end_chain() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("chain_1.csv");
        append(&path, "#comment\na,b,c\n1,2,3\n4,5,6\n#\n# Adaptation terminated\n")?;

        let tailer = ChainTailer::new(&path, "chain_1", TailerConfig::immediate());
        tailer.update().await;

        assert_eq!(tailer.variable_names(), vec!["a", "b", "c"]);
        assert_eq!(tailer.row_count(), 2);
        assert_eq!(tailer.excluded_initial_iteration_count(), Some(2));
        assert_eq!(tailer.raw_header(), "#comment");
        assert!(tailer.raw_footer().contains("#\n# Adaptation terminated"));
        assert!(tailer.last_change_timestamp() > 0);
        assert!(!tailer.is_updating());
        Ok(())
    }

    #[tokio::test]
    async fn test_partial_line_waits_for_newline() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("c.csv");
        append(&path, "x,y\n1,2\n3,")?;

        let tailer = ChainTailer::new(&path, "c", TailerConfig::immediate());
        tailer.update().await;
        assert_eq!(tailer.row_count(), 1);
        assert_eq!(tailer.byte_offset(), 8);

        append(&path, "4\n")?;
        tailer.update().await;
        assert_eq!(tailer.sequence_data("y", 0), vec![2.0, 4.0]);
        assert_eq!(tailer.byte_offset(), 12);
        Ok(())
    }

    #[tokio::test]
    async fn test_no_new_lines_keeps_change_timestamp() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("c.csv");
        append(&path, "x\n1\n")?;

        let tailer = ChainTailer::new(&path, "c", TailerConfig::immediate());
        tailer.update().await;
        let stamp = tailer.last_change_timestamp();

        tokio::time::sleep(Duration::from_millis(5)).await;
        tailer.update().await;
        assert_eq!(tailer.last_change_timestamp(), stamp);
        Ok(())
    }

    #[tokio::test]
    async fn test_rate_limit_skips_reads() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("c.csv");
        append(&path, "x\n1\n")?;

        let config = TailerConfig {
            min_update_interval: Duration::from_secs(60),
            ..TailerConfig::default()
        };
        let tailer = ChainTailer::new(&path, "c", config);
        tailer.update().await;
        assert_eq!(tailer.row_count(), 1);

        append(&path, "2\n")?;
        tailer.update().await;
        assert_eq!(tailer.row_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_is_noop() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("later.csv");

        let tailer = ChainTailer::new(&path, "later", TailerConfig::immediate());
        tailer.update().await;
        assert!(tailer.variable_names().is_empty());
        assert_eq!(tailer.last_change_timestamp(), 0);
        assert!(!tailer.is_updating());

        append(&path, "a\n1\n")?;
        tailer.update().await;
        assert_eq!(tailer.sequence_data("a", 0), vec![1.0]);
        Ok(())
    }

    #[tokio::test]
    async fn test_run_config_edit_resets_and_reingests() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("c.csv");
        let run_config = dir.path().join(RUN_CONFIG_FILE_NAME);
        std::fs::write(&run_config, "includeVariables: [z.1]\n")?;
        filetime::set_file_mtime(&run_config, FileTime::from_unix_time(1_600_000_000, 0))?;
        append(&path, "# h\nlp__,z.1,z.2,z.3\n0,1,2,3\n10,11,12,13\n#\n# f\n")?;

        let config = TailerConfig {
            excluded_prefix_threshold: 2,
            ..TailerConfig::immediate()
        };
        let tailer = ChainTailer::new(&path, "c", config);
        tailer.update().await;
        assert_eq!(tailer.variable_names(), vec!["lp__", "z.1"]);
        let stamp = tailer.last_change_timestamp();

        // same length, so only the mtime tells the edit apart
        std::fs::write(&run_config, "includeVariables: [z.2]\n")?;
        filetime::set_file_mtime(&run_config, FileTime::from_unix_time(1_700_000_000, 0))?;
        tokio::time::sleep(Duration::from_millis(5)).await;
        tailer.update().await;

        assert_eq!(tailer.variable_names(), vec!["lp__", "z.2"]);
        assert_eq!(tailer.sequence_data("z.2", 0), vec![2.0, 12.0]);
        assert!(tailer.last_change_timestamp() > stamp);
        assert_eq!(tailer.row_count(), 2);
        assert_eq!(tailer.raw_header(), "# h");
        assert_eq!(tailer.raw_footer(), "#\n# f");
        Ok(())
    }

    #[tokio::test]
    async fn test_run_config_touch_alone_resets() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("c.csv");
        let run_config = dir.path().join(RUN_CONFIG_FILE_NAME);
        std::fs::write(&run_config, "includeVariables: []\n")?;
        filetime::set_file_mtime(&run_config, FileTime::from_unix_time(1_600_000_000, 0))?;
        append(&path, "a\n1\n2\n")?;

        let tailer = ChainTailer::new(&path, "c", TailerConfig::immediate());
        tailer.update().await;
        let stamp = tailer.last_change_timestamp();

        tokio::time::sleep(Duration::from_millis(5)).await;
        tailer.update().await;
        assert_eq!(tailer.last_change_timestamp(), stamp);

        filetime::set_file_mtime(&run_config, FileTime::from_unix_time(1_700_000_000, 0))?;
        tailer.update().await;
        assert!(tailer.last_change_timestamp() > stamp);
        assert_eq!(tailer.sequence_data("a", 0), vec![1.0, 2.0]);
        Ok(())
    }

    #[tokio::test]
    async fn test_new_run_config_changes_columns() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("c.csv");
        let header: Vec<String> = std::iter::once("lp__".to_string())
            .chain((1..=101).map(|i| format!("z.{}", i)))
            .collect();
        let row: Vec<String> = (0..102).map(|i| i.to_string()).collect();
        append(&path, &format!("{}\n{}\n", header.join(","), row.join(",")))?;

        let tailer = ChainTailer::new(&path, "c", TailerConfig::immediate());
        tailer.update().await;
        assert_eq!(tailer.variable_names(), vec!["lp__"]);
        assert_eq!(tailer.variable_prefixes_excluded(), Some(vec!["z".to_string()]));

        std::fs::write(
            dir.path().join(RUN_CONFIG_FILE_NAME),
            "includeVariables:\n  - z.5\n",
        )?;
        tailer.update().await;

        assert_eq!(tailer.variable_names(), vec!["lp__", "z.5"]);
        assert_eq!(tailer.sequence_data("z.5", 0), vec![5.0]);
        assert_eq!(tailer.row_count(), 1);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_ingest_once() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("c.csv");
        let mut text = String::from("x\n");
        for i in 0..5000 {
            text.push_str(&format!("{}\n", i));
        }
        append(&path, &text)?;

        let tailer = Arc::new(ChainTailer::new(&path, "c", TailerConfig::immediate()));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let tailer = Arc::clone(&tailer);
                tokio::spawn(async move { tailer.update().await })
            })
            .collect();
        for handle in handles {
            handle.await?;
        }

        assert_eq!(tailer.row_count(), 5000);
        assert!(!tailer.is_updating());
        let data = tailer.sequence_data("x", 4998);
        assert_eq!(data, vec![4998.0, 4999.0]);
        Ok(())
    }

    #[tokio::test]
    async fn test_offset_is_monotonic_between_resets() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("c.csv");
        append(&path, "x\n")?;

        let tailer = ChainTailer::new(&path, "c", TailerConfig::immediate());
        let mut last_offset = 0;
        let mut last_rows = 0;
        for i in 0..10 {
            append(&path, &format!("{}\n", i))?;
            tailer.update().await;
            assert!(tailer.byte_offset() >= last_offset);
            assert!(tailer.row_count() >= last_rows);
            last_offset = tailer.byte_offset();
            last_rows = tailer.row_count();
        }
        assert_eq!(last_rows, 10);
        Ok(())
    }
}
