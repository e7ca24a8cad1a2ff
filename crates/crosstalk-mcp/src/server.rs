//! Registry-based tool server and its stdio pump.

use std::future::Future;
use std::pin::Pin;

use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crosstalk_trace::MetaContextExt;
use crosstalk_types::{Meta, ToolDescriptor, ToolResult, META_KEY};

use crate::error::McpError;
use crate::protocol::{
    CallToolParams, InitializeResult, ListToolsResult, Notification, PeerInfo, Request, Response,
    INTERNAL_ERROR, INVALID_PARAMS, METHOD_CALL_TOOL, METHOD_INITIALIZE, METHOD_LIST_TOOLS,
    METHOD_NOT_FOUND, PROTOCOL_VERSION,
};

type HandlerFuture = Pin<Box<dyn Future<Output = Result<ToolResult, String>> + Send>>;
type ToolHandler = Box<dyn Fn(Meta) -> HandlerFuture + Send + Sync>;

struct RegisteredTool {
    descriptor: ToolDescriptor,
    handler: ToolHandler,
}

/// A tool server: a set of named handlers behind the JSON-RPC dispatch.
///
/// Build one, register tools, then either pump messages through
/// [`handle_message`] directly or hand the process over to
/// [`serve_stdio`].
///
/// [`handle_message`]: ToolServer::handle_message
/// [`serve_stdio`]: ToolServer::serve_stdio
pub struct ToolServer {
    info: PeerInfo,
    tools: Vec<RegisteredTool>,
}

impl ToolServer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            info: PeerInfo {
                name: name.into(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            tools: Vec::new(),
        }
    }

    /// Registers a tool.
    ///
    /// Handlers receive the call's arguments object with the reserved
    /// `_meta` entry already stripped out; the trace context it carried is
    /// active for the duration of the handler. Returning `Err` produces a
    /// tool-level failure result, not a protocol error.
    pub fn register<F, Fut>(&mut self, descriptor: ToolDescriptor, handler: F)
    where
        F: Fn(Meta) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResult, String>> + Send + 'static,
    {
        let handler: ToolHandler = Box::new(move |arguments| Box::pin(handler(arguments)));
        self.tools.push(RegisteredTool { descriptor, handler });
    }

    /// Dispatches one decoded message, returning the encoded response for
    /// requests and `None` for notifications and noise.
    pub async fn handle_message(&self, message: Value) -> Option<Value> {
        let request: Request = match serde_json::from_value(message.clone()) {
            Ok(request) => request,
            Err(_) => {
                match serde_json::from_value::<Notification>(message) {
                    Ok(notification) => debug!("notification: {}", notification.method),
                    Err(e) => warn!("unreadable message from client: {e}"),
                }
                return None;
            }
        };

        let response = match request.method.as_str() {
            METHOD_INITIALIZE => self.handle_initialize(request.id),
            METHOD_LIST_TOOLS => self.handle_list_tools(request.id),
            METHOD_CALL_TOOL => self.handle_call_tool(request.id, request.params).await,
            other => Response::failure(
                request.id,
                METHOD_NOT_FOUND,
                format!("unknown method: {other}"),
            ),
        };
        serde_json::to_value(&response).ok()
    }

    /// Serves requests from stdin until it closes, writing responses to
    /// stdout. Logging goes to stderr; stdout belongs to the protocol.
    pub async fn serve_stdio(self) -> Result<(), McpError> {
        info!("tool server '{}' serving on stdio", self.info.name);
        let mut stdout = tokio::io::stdout();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            let line = lines
                .next_line()
                .await
                .map_err(|e| McpError::Transport(format!("stdin read failed: {e}")))?;
            let Some(line) = line else { break };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let message: Value = match serde_json::from_str(line) {
                Ok(message) => message,
                Err(e) => {
                    warn!("skipping unparseable line: {e}");
                    continue;
                }
            };

            if let Some(response) = self.handle_message(message).await {
                let encoded = serde_json::to_string(&response)
                    .map_err(|e| McpError::Protocol(e.to_string()))?;
                stdout
                    .write_all(encoded.as_bytes())
                    .await
                    .map_err(|e| McpError::Transport(format!("stdout write failed: {e}")))?;
                stdout
                    .write_all(b"\n")
                    .await
                    .map_err(|e| McpError::Transport(format!("stdout write failed: {e}")))?;
                stdout
                    .flush()
                    .await
                    .map_err(|e| McpError::Transport(format!("stdout flush failed: {e}")))?;
            }
        }

        info!("stdin closed; tool server '{}' exiting", self.info.name);
        Ok(())
    }

    fn handle_initialize(&self, id: i64) -> Response {
        success(
            id,
            InitializeResult {
                protocol_version: PROTOCOL_VERSION.to_string(),
                capabilities: serde_json::json!({"tools": {}}),
                server_info: self.info.clone(),
            },
        )
    }

    fn handle_list_tools(&self, id: i64) -> Response {
        let tools = self
            .tools
            .iter()
            .map(|tool| tool.descriptor.clone())
            .collect();
        success(id, ListToolsResult { tools })
    }

    async fn handle_call_tool(&self, id: i64, params: Option<Value>) -> Response {
        let params: CallToolParams = match params.map(serde_json::from_value).transpose() {
            Ok(Some(params)) => params,
            Ok(None) => return Response::failure(id, INVALID_PARAMS, "tools/call requires params"),
            Err(e) => {
                return Response::failure(id, INVALID_PARAMS, format!("bad tools/call params: {e}"))
            }
        };

        let Some(tool) = self
            .tools
            .iter()
            .find(|tool| tool.descriptor.name == params.name)
        else {
            return Response::failure(
                id,
                INVALID_PARAMS,
                format!("unknown tool: {}", params.name),
            );
        };

        let mut arguments = params.arguments.unwrap_or_default();
        let meta = match arguments.remove(META_KEY) {
            Some(Value::Object(meta)) => Some(meta),
            _ => None,
        };

        debug!("calling tool '{}'", params.name);
        let outcome = (tool.handler)(arguments)
            .with_meta_context(meta.as_ref())
            .await;
        let result = match outcome {
            Ok(result) => result,
            Err(message) => ToolResult::from_error_text(message),
        };
        success(id, result)
    }
}

fn success(id: i64, result: impl Serialize) -> Response {
    match serde_json::to_value(result) {
        Ok(value) => Response::success(id, value),
        Err(e) => Response::failure(id, INTERNAL_ERROR, format!("unencodable result: {e}")),
    }
}
