use crate::context::ExecutionContext;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::PathBuf;

pub async fn handle(
    ctx: &ExecutionContext,
    run_id: &str,
    chain_id: &str,
    output: Option<PathBuf>,
    variables: Vec<String>,
) -> Result<()> {
    let registry = ctx.oneshot_registry();
    let snapshots = registry.chain_snapshots(run_id).await?;
    let snapshot = snapshots
        .into_iter()
        .find(|s| s.chain_id == chain_id)
        .with_context(|| format!("Chain not found: {}/{}", run_id, chain_id))?;

    let columns = if variables.is_empty() {
        snapshot.variable_names.clone()
    } else {
        for name in &variables {
            if !snapshot.variable_names.contains(name) {
                anyhow::bail!("Unknown variable for {}/{}: {}", run_id, chain_id, name);
            }
        }
        variables
    };

    let mut data = Vec::with_capacity(columns.len());
    for name in &columns {
        data.push(registry.get_sequence_data(run_id, chain_id, name, 0).await);
    }
    // columns are read one after another; keep only rows every column has
    let rows = data.iter().map(Vec::len).min().unwrap_or(0);

    let writer: Box<dyn Write> = match &output {
        Some(path) => Box::new(
            std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout().lock()),
    };
    write_csv(writer, &columns, &data, rows)?;

    if let Some(path) = output {
        eprintln!("Exported {} rows of {}/{} to {}", rows, run_id, chain_id, path.display());
    }
    Ok(())
}

fn write_csv<W: Write>(writer: W, columns: &[String], data: &[Vec<f64>], rows: usize) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(columns)?;
    for row in 0..rows {
        csv_writer.write_record(data.iter().map(|column| column[row].to_string()))?;
    }
    csv_writer.flush()?;
    Ok(())
}
