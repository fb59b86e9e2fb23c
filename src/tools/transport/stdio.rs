//! Local process transport
//!
//! Spawns the server as a child process and speaks newline-delimited
//! JSON-RPC over its stdin/stdout. A reader task routes responses to their
//! waiters; stderr is forwarded to the debug log.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::core::{Result, StewardError};
use crate::tools::protocol::{parse_incoming, JsonRpcRequest, PendingRequests};

pub struct StdioTransport {
    name: String,
    stdin: Mutex<ChildStdin>,
    child: Mutex<Child>,
    pending: Arc<PendingRequests>,
    reader: JoinHandle<()>,
}

impl StdioTransport {
    /// Spawn the server process
    pub fn spawn(
        name: &str,
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> Result<Self> {
        let mut child = Command::new(command)
            .args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                StewardError::connection(format!(
                    "Failed to start tool server '{}' ({}): {}",
                    name, command, e
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| StewardError::connection("child stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| StewardError::connection("child stdout unavailable"))?;

        if let Some(stderr) = child.stderr.take() {
            let server = name.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(server = %server, "{}", line);
                }
            });
        }

        let pending = Arc::new(PendingRequests::new());
        let reader = {
            let pending = Arc::clone(&pending);
            let server = name.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if line.trim().is_empty() {
                        continue;
                    }
                    if let Some(response) = parse_incoming(&line) {
                        pending.resolve(response);
                    }
                }
                info!(server = %server, "tool server stdout closed");
                pending.fail_all();
            })
        };

        Ok(Self {
            name: name.to_string(),
            stdin: Mutex::new(stdin),
            child: Mutex::new(child),
            pending,
            reader,
        })
    }

    async fn write_frame(&self, frame: &JsonRpcRequest) -> Result<()> {
        let mut line = serde_json::to_string(frame)?;
        line.push('\n');

        let mut stdin = self.stdin.lock().await;
        let written = match stdin.write_all(line.as_bytes()).await {
            Ok(()) => stdin.flush().await,
            Err(e) => Err(e),
        };
        written.map_err(|e| {
            StewardError::connection(format!("Tool server '{}' stdin: {}", self.name, e))
        })
    }

    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let waiter = self.pending.register();
        self.write_frame(&JsonRpcRequest::request(waiter.id(), method, params))
            .await?;
        waiter.wait(&self.name, method).await
    }

    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        self.write_frame(&JsonRpcRequest::notification(method, params))
            .await
    }

    pub async fn close(&self) {
        self.reader.abort();
        self.pending.fail_all();
        let mut child = self.child.lock().await;
        if let Err(e) = child.kill().await {
            debug!(server = %self.name, error = %e, "tool server already exited");
        }
    }
}

impl Drop for StdioTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
