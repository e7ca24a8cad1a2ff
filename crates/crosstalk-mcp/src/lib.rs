//! Stdio tool-server plumbing for the Crosstalk platform.
//!
//! Tool servers are separate processes speaking newline-delimited JSON-RPC
//! 2.0 over stdin/stdout, with the tool vocabulary (`initialize`,
//! `tools/list`, `tools/call`) layered on top. This crate provides both
//! sides of that pipe:
//!
//! - [`StdioToolClient`] spawns a server process, performs the handshake,
//!   and exposes it through the [`crosstalk_types::ToolClient`] trait;
//! - [`ToolServer`] is a registry-based dispatcher for building servers,
//!   used by the bundled `crosstalk-toolbox` binary.
//!
//! Trace context travels through the reserved `_meta` entry of call
//! arguments; the server side activates it around every handler so tool
//! work lands in the caller's trace.

pub mod client;
pub mod error;
pub mod protocol;
pub mod server;

pub use client::{StdioServerParams, StdioToolClient};
pub use error::McpError;
pub use server::ToolServer;
