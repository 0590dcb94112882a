use std::future::Future;
use std::sync::Arc;

use mcmc_runtime::{ChainRegistry, HandlerOptions, handle_request};
use mcmc_types::{MonitorRequest, MonitorResponse};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info};

use crate::cache::{DataRefreshMode, MonitorCache};
use crate::{Error, Result};

/// Delivers one request to a monitor service and returns its answer.
pub trait Transport {
    fn post(&self, request: MonitorRequest)
    -> impl Future<Output = Result<MonitorResponse>> + Send;
}

/// Serves requests in-process from a [`ChainRegistry`].
#[derive(Clone)]
pub struct LocalTransport {
    registry: Arc<ChainRegistry>,
    options: HandlerOptions,
}

impl LocalTransport {
    pub fn new(registry: Arc<ChainRegistry>) -> Self {
        Self {
            registry,
            options: HandlerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: HandlerOptions) -> Self {
        self.options = options;
        self
    }
}

impl Transport for LocalTransport {
    async fn post(&self, request: MonitorRequest) -> Result<MonitorResponse> {
        Ok(handle_request(&self.registry, request, &self.options).await)
    }
}

fn unexpected(expected: &'static str, response: MonitorResponse) -> Error {
    match response {
        MonitorResponse::ErrorResponse { error } => Error::Transport(error),
        other => Error::UnexpectedResponse {
            expected,
            got: other.kind().to_string(),
        },
    }
}

/// Ask the service for its protocol version and record it.
pub async fn probe<T: Transport>(transport: &T, cache: &mut MonitorCache) -> Result<()> {
    match transport.post(MonitorRequest::ProbeRequest).await? {
        MonitorResponse::ProbeResponse {
            protocol_version,
            proxy,
        } => {
            cache.set_service_info(protocol_version, proxy);
            Ok(())
        }
        other => Err(unexpected("probe", other)),
    }
}

pub async fn sync_runs<T: Transport>(transport: &T, cache: &mut MonitorCache) -> Result<()> {
    match transport.post(MonitorRequest::GetRunsRequest).await? {
        MonitorResponse::GetRunsResponse { runs } => {
            cache.set_runs(runs);
            Ok(())
        }
        other => Err(unexpected("getRuns", other)),
    }
}

/// Refresh the chains of `run_id`. Returns whether the cache changed.
pub async fn sync_chains<T: Transport>(
    transport: &T,
    cache: &mut MonitorCache,
    run_id: &str,
) -> Result<bool> {
    let request = MonitorRequest::GetChainsForRunRequest {
        run_id: run_id.to_string(),
    };
    match transport.post(request).await? {
        MonitorResponse::GetChainsForRunResponse { chains } => {
            Ok(cache.update_chains_for_run(run_id, chains))
        }
        other => Err(unexpected("getChainsForRun", other)),
    }
}

/// Fetch the missing rows of every flagged sequence and merge them.
/// Returns how many sequences grew.
pub async fn sync_sequences<T: Transport>(transport: &T, cache: &mut MonitorCache) -> Result<usize> {
    let Some(request) = cache.pending_sequences_request() else {
        return Ok(0);
    };
    match transport.post(request).await? {
        MonitorResponse::GetSequencesResponse { sequences } => {
            let grown = cache.apply_sequence_updates(&sequences);
            debug!(updates = sequences.len(), grown, "Applied sequence updates");
            Ok(grown)
        }
        other => Err(unexpected("getSequences", other)),
    }
}

/// One refresh round for a run: re-read its chains and, when any of them
/// changed, pull the new rows of every cached sequence of the run.
/// Returns how many sequences grew.
pub async fn refresh_run<T: Transport>(
    transport: &T,
    cache: &mut MonitorCache,
    run_id: &str,
) -> Result<usize> {
    if sync_chains(transport, cache, run_id).await? {
        cache.request_run_sequences(run_id);
    }
    sync_sequences(transport, cache).await
}

/// Refresh `run_id` every [`GeneralOpts::refresh_interval`] while the
/// cache's refresh mode is [`DataRefreshMode::Auto`].
///
/// The cache is only locked for the duration of a round. Returns the number
/// of completed rounds once the mode is switched to manual, or once `stop`
/// changes or its sender is dropped.
///
/// [`GeneralOpts::refresh_interval`]: crate::GeneralOpts::refresh_interval
pub async fn auto_refresh<T: Transport>(
    transport: &T,
    cache: &Mutex<MonitorCache>,
    run_id: &str,
    mut stop: watch::Receiver<bool>,
) -> Result<usize> {
    let mut rounds = 0;
    loop {
        let interval = {
            let mut cache = cache.lock().await;
            let opts = cache.general_opts().clone();
            if opts.data_refresh_mode != DataRefreshMode::Auto {
                info!(run_id, rounds, "Automatic refresh disabled");
                return Ok(rounds);
            }
            let grown = refresh_run(transport, &mut cache, run_id).await?;
            debug!(run_id, grown, "Refresh round done");
            opts.refresh_interval()
        };
        rounds += 1;

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = stop.changed() => return Ok(rounds),
        }
    }
}
