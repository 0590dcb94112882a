use crate::types::{LogLevel, OutputFormat};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mcmc-monitor")]
#[command(about = "Monitor MCMC sampler output while it is being written", long_about = None)]
#[command(version)]
#[command(args_override_self = true)]
pub struct Cli {
    /// Directory holding one sub-directory per run
    #[arg(long, default_value = ".", global = true)]
    pub dir: PathBuf,

    /// Monitor config file (defaults to mcmc-monitor.toml in --dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, default_value = "plain", global = true)]
    pub format: OutputFormat,

    #[arg(long, default_value = "info", global = true)]
    pub log_level: LogLevel,

    /// Log every request and chain ingestion
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve protocol requests as JSON lines on stdin/stdout
    Start {
        /// Report the service as reached through a proxy in probe responses
        #[arg(long)]
        proxy: bool,
    },

    /// List runs
    Runs,

    /// List the chains of a run
    Chains { run_id: String },

    /// Print a variable's values from a row position on
    Sequence {
        run_id: String,
        chain_id: String,
        variable_name: String,

        /// Rows already known; only later rows are printed
        #[arg(long, default_value = "0")]
        position: usize,
    },

    /// Write a chain's retained columns as CSV
    Export {
        run_id: String,
        chain_id: String,

        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Comma-separated subset of variables (default: all)
        #[arg(long, value_delimiter = ',')]
        variables: Vec<String>,
    },

    /// Report chains of a run as they change, until Ctrl-C
    Watch {
        run_id: String,

        #[arg(long, default_value = "500")]
        poll_interval_ms: u64,
    },
}
