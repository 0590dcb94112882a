use crate::context::ExecutionContext;
use crate::types::OutputFormat;
use anyhow::Result;
use mcmc_types::SequenceUpdate;

pub async fn handle(
    ctx: &ExecutionContext,
    run_id: &str,
    chain_id: &str,
    variable_name: &str,
    position: usize,
) -> Result<()> {
    let registry = ctx.oneshot_registry();
    let data = registry
        .get_sequence_data(run_id, chain_id, variable_name, position)
        .await;

    match ctx.format {
        OutputFormat::Json => {
            let update = SequenceUpdate {
                run_id: run_id.to_string(),
                chain_id: chain_id.to_string(),
                variable_name: variable_name.to_string(),
                position,
                data,
            };
            println!("{}", serde_json::to_string(&update)?);
        }
        OutputFormat::Plain => {
            for value in data {
                println!("{}", value);
            }
        }
    }
    Ok(())
}
