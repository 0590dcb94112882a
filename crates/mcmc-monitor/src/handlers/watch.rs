use crate::context::ExecutionContext;
use crate::handlers::chains::format_chain_line;
use crate::types::OutputFormat;
use anyhow::{Context, Result};
use is_terminal::IsTerminal;
use mcmc_runtime::{ChainRegistry, ChainSnapshot};
use notify::{Event, EventKind, PollWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{RecvTimeoutError, channel};
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{debug, warn};

/// Snapshots that are new or whose change stamp moved past `seen`, which is
/// updated to the latest stamps.
pub(crate) fn changed_chains(
    seen: &mut HashMap<String, i64>,
    snapshots: Vec<ChainSnapshot>,
) -> Vec<ChainSnapshot> {
    let mut changed = Vec::new();
    for snapshot in snapshots {
        let previous = seen.get(&snapshot.chain_id).copied();
        if previous.is_none_or(|stamp| snapshot.last_change_timestamp > stamp) {
            seen.insert(snapshot.chain_id.clone(), snapshot.last_change_timestamp);
            changed.push(snapshot);
        }
    }
    changed
}

fn report(ctx: &ExecutionContext, run_id: &str, snapshots: &[ChainSnapshot]) -> Result<()> {
    let color = std::io::stdout().is_terminal();
    for snapshot in snapshots {
        match ctx.format {
            OutputFormat::Json => {
                let line = serde_json::json!({
                    "runId": run_id,
                    "chainId": snapshot.chain_id,
                    "rowCount": snapshot.row_count,
                    "lastChangeTimestamp": snapshot.last_change_timestamp,
                });
                println!("{}", line);
            }
            OutputFormat::Plain => println!("{}", format_chain_line(snapshot, color)),
        }
    }
    Ok(())
}

fn refresh(
    ctx: &ExecutionContext,
    runtime: &Runtime,
    registry: &ChainRegistry,
    run_id: &str,
    seen: &mut HashMap<String, i64>,
) -> Result<()> {
    let snapshots = runtime.block_on(registry.chain_snapshots(run_id))?;
    report(ctx, run_id, &changed_chains(seen, snapshots))
}

pub fn handle(
    ctx: &ExecutionContext,
    runtime: &Runtime,
    run_id: &str,
    poll_interval_ms: u64,
) -> Result<()> {
    let run_dir = ctx.root().join(run_id);
    if !run_dir.is_dir() {
        anyhow::bail!("Run not found: {}", run_dir.display());
    }

    let registry = ctx.oneshot_registry();
    let mut seen = HashMap::new();
    refresh(ctx, runtime, &registry, run_id, &mut seen)?;

    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        stop_flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to install Ctrl-C handler")?;

    let (tx, rx) = channel();
    let config = notify::Config::default()
        .with_poll_interval(Duration::from_millis(poll_interval_ms))
        .with_compare_contents(false);
    let mut watcher = PollWatcher::new(
        move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                let _ = tx.send(event);
            }
        },
        config,
    )?;
    watcher.watch(&run_dir, RecursiveMode::NonRecursive)?;
    debug!(run = %run_id, "Watching run directory");

    while !stop.load(Ordering::SeqCst) {
        match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(event) => {
                if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                    continue;
                }
                // coalesce a burst of events into one refresh
                while rx.try_recv().is_ok() {}
                if let Err(e) = refresh(ctx, runtime, &registry, run_id, &mut seen) {
                    warn!(run = %run_id, error = %e, "Failed to refresh chains");
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    Ok(())
}
