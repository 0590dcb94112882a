//! Client side of the sequence sync protocol.
//!
//! A viewer keeps a [`MonitorCache`] of chains and sequences. Each sync
//! round asks the service only for rows past what is cached
//! ([`MonitorCache::pending_sequences_request`]) and folds the answers back
//! in with [`append_data`], which never duplicates or overwrites a row.
//! [`auto_refresh`] repeats those rounds on a timer while the cache's
//! refresh mode is [`DataRefreshMode::Auto`].

pub mod cache;
pub mod error;
pub mod merge;
pub mod sync;

pub use cache::{
    DEFAULT_INITIAL_DRAWS_TO_EXCLUDE, DETECT_INITIAL_DRAWS, DataRefreshMode, GeneralOpts,
    MonitorCache, SequenceStats, VariableStats,
};
pub use error::{Error, Result};
pub use merge::append_data;
pub use sync::{
    LocalTransport, Transport, auto_refresh, probe, refresh_run, sync_chains, sync_runs,
    sync_sequences,
};
