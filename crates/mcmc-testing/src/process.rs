//! A `start` server spawned as a child process and driven one JSON line
//! at a time.

use anyhow::{Context, Result};
use serde_json::Value;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

/// A running `mcmc-monitor start` process.
pub struct ServerProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl ServerProcess {
    /// Start a server over `root` with the given extra CLI arguments.
    #[allow(deprecated)]
    pub fn start(root: &Path, extra_args: &[&str]) -> Result<Self> {
        let binary = assert_cmd::cargo::cargo_bin("mcmc-monitor");
        let mut command = Command::new(binary);
        command
            .arg("start")
            .arg("--dir")
            .arg(root)
            .args(extra_args)
            .env_remove("RUST_LOG")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = command.spawn()?;
        let stdin = child.stdin.take().context("server stdin not captured")?;
        let stdout = child.stdout.take().context("server stdout not captured")?;

        Ok(Self {
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
        })
    }

    /// Send a raw line and read one response line.
    pub fn send_line(&mut self, line: &str) -> Result<Value> {
        let stdin = self.stdin.as_mut().context("server stdin already closed")?;
        writeln!(stdin, "{}", line)?;
        stdin.flush()?;

        let mut response = String::new();
        let read = self.stdout.read_line(&mut response)?;
        if read == 0 {
            anyhow::bail!("server closed stdout");
        }
        Ok(serde_json::from_str(response.trim())?)
    }

    /// Send one request object and read its response.
    pub fn request(&mut self, request: &Value) -> Result<Value> {
        self.send_line(&serde_json::to_string(request)?)
    }

    /// Close stdin and wait for the server to exit.
    pub fn finish(mut self) -> Result<std::process::ExitStatus> {
        self.stdin.take();
        Ok(self.child.wait()?)
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        // Ensure process is killed when dropped
        let _ = self.child.kill();
    }
}
