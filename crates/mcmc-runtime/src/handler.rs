use mcmc_types::{MonitorRequest, MonitorResponse, PROTOCOL_VERSION, SequenceUpdate};
use tracing::{debug, info};

use crate::registry::ChainRegistry;

/// Per-server switches that shape responses.
#[derive(Debug, Clone, Default)]
pub struct HandlerOptions {
    /// Log every request at info level instead of debug.
    pub verbose: bool,
    /// Reported in probe responses when the service sits behind a proxy.
    pub proxy: Option<bool>,
}

/// Answer one protocol request against `registry`.
///
/// Failures come back as `errorResponse` rather than an `Err`, so a caller
/// can always write something back to the requester.
pub async fn handle_request(
    registry: &ChainRegistry,
    request: MonitorRequest,
    options: &HandlerOptions,
) -> MonitorResponse {
    if options.verbose {
        info!(request = request.kind(), "Handling request");
    } else {
        debug!(request = request.kind(), "Handling request");
    }

    match request {
        MonitorRequest::ProbeRequest => MonitorResponse::ProbeResponse {
            protocol_version: PROTOCOL_VERSION.to_string(),
            proxy: options.proxy,
        },
        MonitorRequest::GetRunsRequest => match registry.list_runs() {
            Ok(runs) => MonitorResponse::GetRunsResponse { runs },
            Err(e) => MonitorResponse::ErrorResponse {
                error: e.to_string(),
            },
        },
        MonitorRequest::GetChainsForRunRequest { run_id } => {
            match registry.get_chains_for_run(&run_id).await {
                Ok(chains) => MonitorResponse::GetChainsForRunResponse { chains },
                Err(e) => MonitorResponse::ErrorResponse {
                    error: e.to_string(),
                },
            }
        }
        MonitorRequest::GetSequencesRequest { sequences } => {
            // each tuple is resolved on its own against the tailer's current state
            let mut updates = Vec::with_capacity(sequences.len());
            for s in sequences {
                let data = registry
                    .get_sequence_data(&s.run_id, &s.chain_id, &s.variable_name, s.position)
                    .await;
                updates.push(SequenceUpdate {
                    run_id: s.run_id,
                    chain_id: s.chain_id,
                    variable_name: s.variable_name,
                    position: s.position,
                    data,
                });
            }
            MonitorResponse::GetSequencesResponse { sequences: updates }
        }
    }
}
