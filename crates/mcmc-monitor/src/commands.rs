use super::args::{Cli, Commands};
use super::handlers;
use crate::context::ExecutionContext;
use crate::logging::init_logging;
use anyhow::Result;

pub fn run(cli: Cli) -> Result<()> {
    init_logging(cli.log_level, cli.verbose);

    let ctx = ExecutionContext::new(cli.dir, cli.config.as_deref(), cli.format, cli.verbose)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match cli.command {
        Commands::Start { proxy } => runtime.block_on(handlers::start::handle(&ctx, proxy)),

        Commands::Runs => handlers::runs::handle(&ctx),

        Commands::Chains { run_id } => runtime.block_on(handlers::chains::handle(&ctx, &run_id)),

        Commands::Sequence {
            run_id,
            chain_id,
            variable_name,
            position,
        } => runtime.block_on(handlers::sequence::handle(
            &ctx,
            &run_id,
            &chain_id,
            &variable_name,
            position,
        )),

        Commands::Export {
            run_id,
            chain_id,
            output,
            variables,
        } => runtime.block_on(handlers::export::handle(
            &ctx, &run_id, &chain_id, output, variables,
        )),

        Commands::Watch {
            run_id,
            poll_interval_ms,
        } => handlers::watch::handle(&ctx, &runtime, &run_id, poll_interval_ms),
    }
}
