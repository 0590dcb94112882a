use crate::context::ExecutionContext;
use crate::types::OutputFormat;
use anyhow::{Context, Result};
use is_terminal::IsTerminal;
use mcmc_runtime::ChainSnapshot;
use owo_colors::OwoColorize;
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChainView<'a> {
    run_id: &'a str,
    chain_id: &'a str,
    row_count: usize,
    variable_names: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    variable_prefixes_excluded: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    excluded_initial_iteration_count: Option<usize>,
    last_change_timestamp: i64,
}

pub async fn handle(ctx: &ExecutionContext, run_id: &str) -> Result<()> {
    let registry = ctx.oneshot_registry();
    let snapshots = registry
        .chain_snapshots(run_id)
        .await
        .with_context(|| format!("Failed to list chains of run {}", run_id))?;

    match ctx.format {
        OutputFormat::Json => {
            let views: Vec<ChainView<'_>> = snapshots
                .iter()
                .map(|s| ChainView {
                    run_id,
                    chain_id: &s.chain_id,
                    row_count: s.row_count,
                    variable_names: &s.variable_names,
                    variable_prefixes_excluded: s.variable_prefixes_excluded.as_deref(),
                    excluded_initial_iteration_count: s.excluded_initial_iteration_count,
                    last_change_timestamp: s.last_change_timestamp,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&views)?);
        }
        OutputFormat::Plain => {
            if snapshots.is_empty() {
                eprintln!("No chains found for run {}", run_id);
            }
            let color = std::io::stdout().is_terminal();
            for snapshot in &snapshots {
                println!("{}", format_chain_line(snapshot, color));
            }
            let include = registry.run_config(run_id)?.include_variables;
            if !include.is_empty() {
                println!("force-included: {}", include.join(", "));
            }
        }
    }
    Ok(())
}

pub(crate) fn format_timestamp(millis: i64) -> String {
    if millis == 0 {
        return "never".to_string();
    }
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}

pub(crate) fn format_chain_line(snapshot: &ChainSnapshot, color: bool) -> String {
    let mut line = if color {
        format!("{}", snapshot.chain_id.bold())
    } else {
        snapshot.chain_id.clone()
    };
    line.push_str(&format!(
        "  rows={}  variables={}",
        snapshot.row_count,
        snapshot.variable_names.len()
    ));
    if let Some(warmup) = snapshot.excluded_initial_iteration_count {
        line.push_str(&format!("  warmup={}", warmup));
    }
    if let Some(prefixes) = snapshot
        .variable_prefixes_excluded
        .as_ref()
        .filter(|p| !p.is_empty())
    {
        let excluded = format!("excluded={}", prefixes.join(","));
        if color {
            line.push_str(&format!("  {}", excluded.yellow()));
        } else {
            line.push_str(&format!("  {}", excluded));
        }
    }
    line.push_str(&format!(
        "  changed={}",
        format_timestamp(snapshot.last_change_timestamp)
    ));
    line
}
