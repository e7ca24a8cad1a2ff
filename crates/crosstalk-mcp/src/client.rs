//! Client side of the stdio tool-server pipe.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};

use crosstalk_types::{Meta, ToolClient, ToolDescriptor, ToolError, ToolResult};

use crate::error::McpError;
use crate::protocol::{
    CallToolParams, InitializeParams, InitializeResult, ListToolsResult, Notification, PeerInfo,
    Request, Response, METHOD_CALL_TOOL, METHOD_INITIALIZE, METHOD_INITIALIZED, METHOD_LIST_TOOLS,
    PROTOCOL_VERSION,
};

/// Default per-request deadline.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How long `shutdown` waits for the server to exit after stdin closes
/// before killing it.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

type PendingMap = Arc<Mutex<HashMap<i64, oneshot::Sender<Response>>>>;

/// How to launch a stdio tool server.
#[derive(Debug, Clone)]
pub struct StdioServerParams {
    /// Executable to run.
    pub command: String,
    /// Arguments passed to the executable.
    pub args: Vec<String>,
    /// Extra environment variables for the child process.
    pub env: Vec<(String, String)>,
    /// Deadline applied to every request, the handshake included.
    pub request_timeout: Duration,
}

impl StdioServerParams {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: Vec::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// A tool server running as a child process, driven over its stdio pipe.
///
/// One background task reads the server's stdout and routes responses to
/// whoever sent the matching request, so calls may be issued concurrently.
/// The child is killed if the client is dropped without [`shutdown`].
///
/// [`shutdown`]: StdioToolClient::shutdown
pub struct StdioToolClient {
    child: Mutex<Child>,
    stdin: Mutex<Option<ChildStdin>>,
    pending: PendingMap,
    next_id: AtomicI64,
    request_timeout: Duration,
    server_info: PeerInfo,
}

impl StdioToolClient {
    /// Spawns the server process and performs the initialize handshake.
    pub async fn spawn(params: StdioServerParams) -> Result<Self, McpError> {
        let mut command = Command::new(&params.command);
        command
            .args(&params.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &params.env {
            command.env(key, value);
        }

        let mut child = command
            .spawn()
            .map_err(|e| McpError::Spawn(format!("{}: {e}", params.command)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::Spawn("failed to open tool server stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::Spawn("failed to open tool server stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| McpError::Spawn("failed to open tool server stderr".to_string()))?;

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        tokio::spawn(route_responses(stdout, pending.clone()));
        tokio::spawn(forward_stderr(stderr));

        let mut client = Self {
            child: Mutex::new(child),
            stdin: Mutex::new(Some(stdin)),
            pending,
            next_id: AtomicI64::new(1),
            request_timeout: params.request_timeout,
            server_info: PeerInfo {
                name: String::new(),
                version: String::new(),
            },
        };

        client.server_info = client.initialize().await?;
        info!(
            "tool server '{}' v{} ready",
            client.server_info.name, client.server_info.version
        );
        Ok(client)
    }

    /// Identity the server reported during the handshake.
    pub fn server_info(&self) -> &PeerInfo {
        &self.server_info
    }

    /// Closes the server's stdin and waits for it to exit, killing it if it
    /// does not go quietly.
    pub async fn shutdown(&self) -> Result<(), McpError> {
        self.stdin.lock().await.take();
        let mut child = self.child.lock().await;
        match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
            Ok(Ok(status)) => {
                debug!("tool server exited with {status}");
                Ok(())
            }
            Ok(Err(e)) => Err(McpError::Transport(format!(
                "failed to reap tool server: {e}"
            ))),
            Err(_) => {
                warn!("tool server did not exit after stdin close; killing it");
                child
                    .kill()
                    .await
                    .map_err(|e| McpError::Transport(format!("failed to kill tool server: {e}")))
            }
        }
    }

    async fn initialize(&self) -> Result<PeerInfo, McpError> {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: serde_json::json!({}),
            client_info: PeerInfo {
                name: "crosstalk".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };
        let params =
            serde_json::to_value(&params).map_err(|e| McpError::Protocol(e.to_string()))?;
        let result = self.request(METHOD_INITIALIZE, Some(params)).await?;
        let result: InitializeResult = serde_json::from_value(result)
            .map_err(|e| McpError::Protocol(format!("malformed initialize result: {e}")))?;
        if result.protocol_version != PROTOCOL_VERSION {
            warn!(
                "tool server speaks protocol revision {} (ours is {}), continuing anyway",
                result.protocol_version, PROTOCOL_VERSION
            );
        }
        self.notify(METHOD_INITIALIZED).await?;
        Ok(result.server_info)
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let message = match serde_json::to_string(&Request::new(id, method, params)) {
            Ok(message) => message,
            Err(e) => {
                self.pending.lock().await.remove(&id);
                return Err(McpError::Protocol(e.to_string()));
            }
        };
        if let Err(e) = self.send_line(&message).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        let response = match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(response)) => response,
            // The reader task dropped our sender: the pipe is gone.
            Ok(Err(_)) => return Err(McpError::Closed),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                return Err(McpError::Timeout(self.request_timeout.as_secs()));
            }
        };

        if let Some(error) = response.error {
            return Err(McpError::Server {
                code: error.code,
                message: error.message,
            });
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    async fn notify(&self, method: &str) -> Result<(), McpError> {
        let message = serde_json::to_string(&Notification::new(method))
            .map_err(|e| McpError::Protocol(e.to_string()))?;
        self.send_line(&message).await
    }

    async fn send_line(&self, line: &str) -> Result<(), McpError> {
        let mut guard = self.stdin.lock().await;
        let stdin = guard.as_mut().ok_or(McpError::Closed)?;
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| McpError::Transport(format!("failed to write to tool server: {e}")))?;
        stdin
            .write_all(b"\n")
            .await
            .map_err(|e| McpError::Transport(format!("failed to write to tool server: {e}")))?;
        stdin
            .flush()
            .await
            .map_err(|e| McpError::Transport(format!("failed to flush tool server stdin: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl ToolClient for StdioToolClient {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        let result = self.request(METHOD_LIST_TOOLS, None).await?;
        let decoded: ListToolsResult = serde_json::from_value(result)
            .map_err(|e| ToolError::Protocol(format!("malformed tools/list result: {e}")))?;
        Ok(decoded.tools)
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Meta>,
    ) -> Result<ToolResult, ToolError> {
        let params = CallToolParams {
            name: name.to_string(),
            arguments,
        };
        let params = serde_json::to_value(&params)
            .map_err(|e| ToolError::Protocol(format!("unencodable tool arguments: {e}")))?;
        let result = self.request(METHOD_CALL_TOOL, Some(params)).await?;
        serde_json::from_value(result)
            .map_err(|e| ToolError::Protocol(format!("malformed tools/call result: {e}")))
    }
}

/// Reads the server's stdout and completes pending requests by id.
async fn route_responses(stdout: ChildStdout, pending: PendingMap) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<Response>(line) {
                    Ok(response) if response.result.is_some() || response.error.is_some() => {
                        match pending.lock().await.remove(&response.id) {
                            Some(tx) => {
                                let _ = tx.send(response);
                            }
                            None => warn!("tool server answered unknown request id {}", response.id),
                        }
                    }
                    _ => debug!("ignoring non-response line from tool server: {line}"),
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("tool server stdout read failed: {e}");
                break;
            }
        }
    }
    // Drop all waiting senders so in-flight requests observe the close.
    pending.lock().await.clear();
}

async fn forward_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!("tool server: {line}");
    }
}
