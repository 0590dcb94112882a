//! Testing infrastructure for mcmc-monitor integration tests.
//!
//! - `TestWorld`: an isolated monitored root with runs and chain files
//! - `fixtures`: Stan-like chain CSV generation
//! - `process`: a `start` server driven over stdin/stdout

pub mod fixtures;
pub mod process;
pub mod world;

pub use fixtures::ChainCsv;
pub use world::{CliResult, TestWorld};
