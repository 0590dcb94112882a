//! Logging setup for the monitor binary.
//!
//! Logs go to stderr; stdout carries protocol responses and command output.
//! `RUST_LOG` takes precedence over `--log-level`.

use crate::types::LogLevel;
use tracing_subscriber::EnvFilter;

const WORKSPACE_CRATES: [&str; 4] = ["mcmc_tailer", "mcmc_runtime", "mcmc_client", "mcmc_monitor"];

/// Filter directive for `level`, raised to `debug` for this workspace's
/// crates when `verbose` is set.
pub fn filter_directive(level: LogLevel, verbose: bool) -> String {
    if !verbose || level >= LogLevel::Debug {
        return level.to_string();
    }
    let mut directive = level.to_string();
    for krate in WORKSPACE_CRATES {
        directive.push_str(&format!(",{}=debug", krate));
    }
    directive
}

pub fn init_logging(level: LogLevel, verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(level, verbose)));

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_level() {
        assert_eq!(filter_directive(LogLevel::Warn, false), "warn");
        assert_eq!(filter_directive(LogLevel::Trace, true), "trace");
    }

    #[test]
    fn test_verbose_raises_workspace_crates() {
        let directive = filter_directive(LogLevel::Info, true);
        assert!(directive.starts_with("info,"));
        assert!(directive.contains("mcmc_tailer=debug"));
        assert!(directive.contains("mcmc_monitor=debug"));
    }
}
