use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use mcmc_types::{Chain, MonitorRequest, Run, Sequence, SequenceKey, SequenceRequest, SequenceUpdate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::merge::append_data;

/// Warmup draws excluded from stats before anything has been requested or
/// detected.
pub const DEFAULT_INITIAL_DRAWS_TO_EXCLUDE: usize = 20;

/// Requested warmup count meaning "use what the chain files report".
pub const DETECT_INITIAL_DRAWS: i64 = -1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataRefreshMode {
    Auto,
    #[default]
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralOpts {
    pub data_refresh_mode: DataRefreshMode,
    pub data_refresh_interval_sec: u64,
    /// Draws to skip when computing stats; [`DETECT_INITIAL_DRAWS`] defers
    /// to the chains' detected warmup count.
    pub requested_initial_draws_to_exclude: i64,
}

impl Default for GeneralOpts {
    fn default() -> Self {
        Self {
            data_refresh_mode: DataRefreshMode::Manual,
            data_refresh_interval_sec: 5,
            requested_initial_draws_to_exclude: DETECT_INITIAL_DRAWS,
        }
    }
}

impl GeneralOpts {
    /// Pause between automatic refresh rounds, never below one second.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.data_refresh_interval_sec.max(1))
    }
}

/// Per-chain stats for one variable. Values are computed elsewhere; the
/// cache only tracks whether they are current.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceStats {
    pub mean: Option<f64>,
    pub stdev: Option<f64>,
    pub count: Option<usize>,
    pub ess: Option<f64>,
    pub acor: Option<Vec<f64>>,
    pub is_up_to_date: bool,
}

/// Stats for one variable pooled across the chains of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableStats {
    pub mean: Option<f64>,
    pub stdev: Option<f64>,
    pub count: Option<usize>,
    pub ess: Option<f64>,
    pub rhat: Option<f64>,
    pub is_up_to_date: bool,
}

trait Stale {
    fn mark_stale(&mut self);
}

impl Stale for SequenceStats {
    fn mark_stale(&mut self) {
        self.is_up_to_date = false;
    }
}

impl Stale for VariableStats {
    fn mark_stale(&mut self) {
        self.is_up_to_date = false;
    }
}

/// Mark one entry stale, or every entry when `key` is `None`. A key with
/// no entry yet is left alone.
fn invalidate<T: Stale>(stats: &mut HashMap<String, T>, key: Option<&str>) {
    match key {
        None => stats.values_mut().for_each(Stale::mark_stale),
        Some(key) => {
            if let Some(entry) = stats.get_mut(key) {
                entry.mark_stale();
            }
        }
    }
}

/// Everything a viewer holds about one monitor service.
///
/// Single-threaded: one owner mutates it between sync rounds.
#[derive(Debug, Clone)]
pub struct MonitorCache {
    protocol_version: Option<String>,
    using_proxy: Option<bool>,
    runs: Vec<Run>,
    chains: Vec<Chain>,
    sequences: BTreeMap<SequenceKey, Sequence>,
    sequence_stats: HashMap<String, SequenceStats>,
    variable_stats: HashMap<String, VariableStats>,
    general_opts: GeneralOpts,
    effective_initial_draws_to_exclude: usize,
}

impl Default for MonitorCache {
    fn default() -> Self {
        Self {
            protocol_version: None,
            using_proxy: None,
            runs: Vec::new(),
            chains: Vec::new(),
            sequences: BTreeMap::new(),
            sequence_stats: HashMap::new(),
            variable_stats: HashMap::new(),
            general_opts: GeneralOpts::default(),
            effective_initial_draws_to_exclude: DEFAULT_INITIAL_DRAWS_TO_EXCLUDE,
        }
    }
}

impl MonitorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn protocol_version(&self) -> Option<&str> {
        self.protocol_version.as_deref()
    }

    pub fn using_proxy(&self) -> Option<bool> {
        self.using_proxy
    }

    pub fn set_service_info(&mut self, protocol_version: String, using_proxy: Option<bool>) {
        self.protocol_version = Some(protocol_version);
        self.using_proxy = using_proxy;
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    pub fn chains_for_run<'a>(&'a self, run_id: &'a str) -> impl Iterator<Item = &'a Chain> + 'a {
        self.chains.iter().filter(move |c| c.run_id == run_id)
    }

    pub fn sequence(&self, key: &SequenceKey) -> Option<&Sequence> {
        self.sequences.get(key)
    }

    pub fn sequences(&self) -> impl Iterator<Item = &Sequence> {
        self.sequences.values()
    }

    pub fn sequence_stats(&self, key: &SequenceKey) -> Option<&SequenceStats> {
        self.sequence_stats.get(&key.sequence_stats_key())
    }

    pub fn variable_stats(&self, run_id: &str, variable_name: &str) -> Option<&VariableStats> {
        self.variable_stats
            .get(&format!("{}/{}", run_id, variable_name))
    }

    pub fn general_opts(&self) -> &GeneralOpts {
        &self.general_opts
    }

    pub fn effective_initial_draws_to_exclude(&self) -> usize {
        self.effective_initial_draws_to_exclude
    }

    /// Replace the run list, forgetting chains of runs that went away.
    pub fn set_runs(&mut self, runs: Vec<Run>) {
        self.chains
            .retain(|c| runs.iter().any(|r| r.run_id == c.run_id));
        self.runs = runs;
    }

    /// Replace the chains of `run_id` unconditionally.
    pub fn set_chains_for_run(&mut self, run_id: &str, chains: Vec<Chain>) {
        self.chains.retain(|c| c.run_id != run_id);
        self.chains.extend(chains);
        self.refresh_effective_warmup();
    }

    /// Replace the chains of `run_id` if any of `chains` is new or has
    /// changed since it was cached. Returns whether anything was replaced.
    pub fn update_chains_for_run(&mut self, run_id: &str, chains: Vec<Chain>) -> bool {
        if !self.chains_were_updated(&chains) {
            return false;
        }
        self.set_chains_for_run(run_id, chains);
        true
    }

    fn chains_were_updated(&self, incoming: &[Chain]) -> bool {
        incoming.iter().any(|chain| {
            let known = self
                .chains
                .iter()
                .find(|c| c.run_id == chain.run_id && c.chain_id == chain.chain_id)
                .map_or(-1, |c| c.last_change_timestamp);
            chain.last_change_timestamp > known
        })
    }

    /// Flag a sequence for the next sync round, creating it empty if it is
    /// not cached yet.
    pub fn request_sequence(&mut self, key: SequenceKey) {
        self.sequences
            .entry(key.clone())
            .or_insert_with(|| Sequence::empty(key))
            .update_requested = true;
    }

    /// Flag every cached sequence of `run_id`.
    pub fn request_run_sequences(&mut self, run_id: &str) {
        for sequence in self.sequences.values_mut() {
            if sequence.key.run_id == run_id {
                sequence.update_requested = true;
            }
        }
    }

    /// A `getSequencesRequest` for every flagged sequence, each asking for
    /// rows past its cached length. `None` when nothing is flagged.
    pub fn pending_sequences_request(&self) -> Option<MonitorRequest> {
        let sequences: Vec<SequenceRequest> = self
            .sequences
            .values()
            .filter(|s| s.update_requested)
            .map(|s| SequenceRequest::new(&s.key, s.len()))
            .collect();
        if sequences.is_empty() {
            return None;
        }
        Some(MonitorRequest::GetSequencesRequest { sequences })
    }

    /// Merge deltas into cached sequences and clear their flags. Stats of a
    /// sequence that grew are marked stale. Deltas for sequences that are
    /// not cached are dropped. Returns how many sequences grew.
    pub fn apply_sequence_updates(&mut self, updates: &[SequenceUpdate]) -> usize {
        let mut grown = 0;
        for update in updates {
            let key = update.key();
            let Some(sequence) = self.sequences.get_mut(&key) else {
                debug!(sequence = %key, "Dropping update for uncached sequence");
                continue;
            };

            let merged = append_data(&sequence.data, update.position, &update.data);
            if merged.len() > sequence.data.len() {
                sequence.data = merged;
                grown += 1;
                invalidate(&mut self.sequence_stats, Some(&key.sequence_stats_key()));
                invalidate(&mut self.variable_stats, Some(&key.variable_stats_key()));
            }
            sequence.update_requested = false;
        }
        grown
    }

    pub fn set_general_opts(&mut self, opts: GeneralOpts) {
        self.general_opts = opts;
        self.refresh_effective_warmup();
    }

    pub fn set_sequence_stats(&mut self, key: &SequenceKey, stats: SequenceStats) {
        self.sequence_stats.insert(key.sequence_stats_key(), stats);
    }

    pub fn set_variable_stats(&mut self, run_id: &str, variable_name: &str, stats: VariableStats) {
        self.variable_stats
            .insert(format!("{}/{}", run_id, variable_name), stats);
    }

    /// Warmup count reported by the first chain that has one.
    pub fn detected_warmup_iteration_count(&self) -> Option<usize> {
        self.chains
            .iter()
            .find_map(|c| c.excluded_initial_iteration_count)
    }

    fn compute_effective_warmup(&self) -> usize {
        match usize::try_from(self.general_opts.requested_initial_draws_to_exclude) {
            Ok(requested) => requested,
            Err(_) => self.detected_warmup_iteration_count().unwrap_or(0),
        }
    }

    // Stats computed with a different warmup cut are stale.
    fn refresh_effective_warmup(&mut self) {
        let effective = self.compute_effective_warmup();
        if effective != self.effective_initial_draws_to_exclude {
            self.effective_initial_draws_to_exclude = effective;
            invalidate(&mut self.sequence_stats, None);
            invalidate(&mut self.variable_stats, None);
        }
    }
}
