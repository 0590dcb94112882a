pub mod chains;
pub mod export;
pub mod runs;
pub mod sequence;
pub mod start;
pub mod watch;
