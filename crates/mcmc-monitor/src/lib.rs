mod args;
mod commands;
pub mod context;
mod handlers;
pub mod logging;
pub mod server;
pub mod types;

pub use args::{Cli, Commands};
pub use commands::run;
