//! Shared types and error definitions for the Crosstalk platform.
//!
//! This crate provides the foundational tool-calling contract used across all
//! Crosstalk crates: the [`ToolClient`] trait implemented by anything that can
//! invoke remote tools, the wire shapes tool servers advertise and return, and
//! the domain error type (via `thiserror`).
//!
//! No crate in the workspace depends on anything *except* `crosstalk-types`
//! for cross-cutting type definitions. This keeps the dependency graph clean
//! and prevents circular dependencies.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reserved key inside a tool call's arguments object.
///
/// The value is a JSON object used as an out-of-band side channel for
/// metadata that is not part of the tool's declared input schema, such as
/// distributed-tracing headers. Servers that do not understand `_meta`
/// ignore it.
pub const META_KEY: &str = "_meta";

/// A JSON object, as used for tool arguments and the `_meta` side channel.
pub type Meta = serde_json::Map<String, Value>;

/// A callable tool as advertised by a tool server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique tool name within the advertising server.
    pub name: String,
    /// Human-readable description, shown to the model when selecting tools.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the tool's arguments object.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// One block of tool output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolContent {
    /// Plain text output.
    Text {
        /// The text payload.
        text: String,
    },
}

/// The outcome of a tool invocation.
///
/// `is_error = true` marks a failure the tool itself reported (bad input,
/// nothing found). Transport and protocol failures surface as [`ToolError`]
/// instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Output blocks in presentation order.
    pub content: Vec<ToolContent>,
    /// Whether the tool reported the invocation as failed.
    #[serde(default, rename = "isError")]
    pub is_error: bool,
}

impl ToolResult {
    /// Builds a successful result holding a single text block.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Builds a tool-reported failure holding a single text block.
    pub fn from_error_text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: true,
        }
    }

    /// Concatenates all text blocks into one string.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for block in &self.content {
            let ToolContent::Text { text } = block;
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(text);
        }
        out
    }
}

/// Errors surfaced by tool clients.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The transport to the tool server failed (process died, pipe closed).
    #[error("tool transport failure: {0}")]
    Transport(String),

    /// The server sent something that violates the protocol.
    #[error("tool protocol violation: {0}")]
    Protocol(String),

    /// The server rejected the request with a protocol-level error.
    #[error("tool call rejected (code {code}): {message}")]
    Rejected {
        /// Protocol error code.
        code: i64,
        /// Server-provided message.
        message: String,
    },

    /// The call did not complete within the configured deadline.
    #[error("tool call timed out after {0}s")]
    Timeout(u64),
}

/// A collaborator capable of listing and invoking tools.
///
/// This is the seam between the agent loop and whatever actually executes
/// tools: a spawned stdio server, an in-process registry, or a decorator
/// that enriches calls on the way out.
#[async_trait]
pub trait ToolClient: Send + Sync {
    /// Lists the tools the server currently advertises.
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError>;

    /// Invokes `name` with the given arguments object.
    ///
    /// `None` means the caller has no arguments to pass; implementations
    /// decide whether to send an empty object or omit the field.
    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Meta>,
    ) -> Result<ToolResult, ToolError>;
}

mod voice;
pub use voice::{VoiceModel, VoiceProfile};
