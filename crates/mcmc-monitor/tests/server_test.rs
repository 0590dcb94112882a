use mcmc_testing::process::ServerProcess;
use mcmc_testing::{ChainCsv, TestWorld};
use serde_json::json;

#[test]
fn test_stdio_server_session() -> anyhow::Result<()> {
    let world = TestWorld::new().with_run("run-a");
    let csv = ChainCsv::new(&["lp__", "theta"]).with_header_comment("model = m");
    world.write_chain("run-a", "chain_1.csv", &csv.render_header())?;
    world.append_chain("run-a", "chain_1.csv", &csv.render_rows(0..4))?;

    let mut server = ServerProcess::start(world.root(), &[])?;

    let probe = server.request(&json!({"type": "probeRequest"}))?;
    assert_eq!(probe, json!({"type": "probeResponse", "protocolVersion": "0.1.3", "proxy": false}));

    let chains = server.request(&json!({"type": "getChainsForRunRequest", "runId": "run-a"}))?;
    assert_eq!(chains["type"], "getChainsForRunResponse");
    assert_eq!(chains["chains"][0]["chainId"], "chain_1");
    assert_eq!(chains["chains"][0]["rawHeader"], "# model = m");

    let sequences = server.request(&json!({
        "type": "getSequencesRequest",
        "sequences": [
            {"runId": "run-a", "chainId": "chain_1", "variableName": "theta", "position": 2},
            {"runId": "run-a", "chainId": "chain_1", "variableName": "theta", "position": 4}
        ]
    }))?;
    assert_eq!(sequences["sequences"][0]["data"], json!([2001.0, 3001.0]));
    assert_eq!(sequences["sequences"][1]["data"], json!([]));

    let error = server.send_line("{not json")?;
    assert_eq!(error["type"], "errorResponse");

    let status = server.finish()?;
    assert!(status.success());
    Ok(())
}

#[test]
fn test_server_reports_proxy_flag() -> anyhow::Result<()> {
    let world = TestWorld::new();
    let mut server = ServerProcess::start(world.root(), &["--proxy"])?;

    let probe = server.request(&json!({"type": "probeRequest"}))?;
    assert_eq!(probe["proxy"], true);
    Ok(())
}
