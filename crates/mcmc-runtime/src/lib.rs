pub mod config;
pub mod discovery;
pub mod error;
pub mod handler;
pub mod registry;

pub use config::{MonitorConfig, ServerSettings, TailerSettings, CONFIG_FILE_NAME};
pub use discovery::{chain_id_from_csv_file_name, list_chain_files, list_run_ids};
pub use error::{Error, Result};
pub use handler::{HandlerOptions, handle_request};
pub use registry::ChainRegistry;

pub use mcmc_tailer::{ChainSnapshot, TailerConfig};
