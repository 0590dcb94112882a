//! Incremental tailing of MCMC chain output files.
//!
//! A sampler appends to its CSV output while the monitor reads it. The
//! pieces here, leaves first:
//! - [`segmenter`]: reads the bytes past the last offset and keeps only
//!   complete lines
//! - [`columns`]: picks which columns to keep, dropping oversized
//!   "nuisance" parameter groups
//! - [`run_config`]: the optional per-run `mcmc-run.yaml`
//! - [`parser`]: the header/body/footer state machine over decoded lines
//! - [`tailer`]: one [`ChainTailer`] per file, with single-flight,
//!   rate-limited `update()` and in-place resets

pub mod columns;
pub mod error;
pub mod parser;
pub mod run_config;
pub mod segmenter;
pub mod tailer;

pub use columns::{ColumnSelection, DEFAULT_EXCLUDED_PREFIX_THRESHOLD, select_columns};
pub use error::{Error, Result};
pub use parser::{ADAPTATION_TERMINATED_SENTINEL, ChainContents, Row, Segment};
pub use run_config::{RUN_CONFIG_FILE_NAME, RunConfig};
pub use segmenter::{LineChunk, complete_line_boundary, read_new_lines};
pub use tailer::{ChainSnapshot, ChainTailer, TailerConfig};
