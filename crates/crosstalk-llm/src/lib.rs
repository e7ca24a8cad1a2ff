//! Chat completion client for the Crosstalk platform.
//!
//! Talks to any OpenAI-compatible `chat/completions` endpoint over HTTPS,
//! with tool definitions mapped from [`crosstalk_types::ToolDescriptor`]
//! and assistant tool-call requests decoded back into structured values.
//! Streaming is not supported; agent turns consume whole completions.

pub mod client;
pub mod config;
pub mod error;

pub use client::{ChatMessage, ChatOutcome, FinishReason, LlmClient, ToolCall, Usage};
pub use config::LlmConfig;
pub use error::LlmError;
