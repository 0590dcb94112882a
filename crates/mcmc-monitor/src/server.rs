use anyhow::Result;
use mcmc_runtime::{ChainRegistry, HandlerOptions, handle_request};
use mcmc_types::{MonitorRequest, MonitorResponse};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{info, warn};

/// Answer one JSON request per input line with one JSON response line,
/// until the input ends. Blank lines are skipped; a line that is not a
/// valid request gets an `errorResponse`.
pub async fn serve_lines<R, W>(
    registry: &ChainRegistry,
    options: &HandlerOptions,
    reader: R,
    mut writer: W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<MonitorRequest>(trimmed) {
            Ok(request) => handle_request(registry, request, options).await,
            Err(e) => {
                warn!(error = %e, "Malformed request");
                MonitorResponse::ErrorResponse {
                    error: format!("Parse error: {}", e),
                }
            }
        };

        let mut response_json = serde_json::to_string(&response)?;
        response_json.push('\n');
        writer.write_all(response_json.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}

pub async fn run_server(registry: &ChainRegistry, options: &HandlerOptions) -> Result<()> {
    info!(root = %registry.root().display(), "Serving requests on stdin");
    let stdin = BufReader::new(tokio::io::stdin());
    serve_lines(registry, options, stdin, tokio::io::stdout()).await
}
