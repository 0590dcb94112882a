use crate::context::ExecutionContext;
use crate::types::OutputFormat;
use anyhow::{Context, Result};

pub fn handle(ctx: &ExecutionContext) -> Result<()> {
    let runs = ctx
        .oneshot_registry()
        .list_runs()
        .with_context(|| format!("Failed to list runs in {}", ctx.root().display()))?;

    match ctx.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&runs)?),
        OutputFormat::Plain => {
            if runs.is_empty() {
                eprintln!("No runs found in {}", ctx.root().display());
            }
            for run in &runs {
                println!("{}", run.run_id);
            }
        }
    }
    Ok(())
}
