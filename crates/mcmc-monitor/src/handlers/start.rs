use crate::context::ExecutionContext;
use crate::server;
use anyhow::Result;

pub async fn handle(ctx: &ExecutionContext, proxy: bool) -> Result<()> {
    let registry = ctx.server_registry();
    let options = ctx.handler_options(proxy);
    server::run_server(&registry, &options).await
}
