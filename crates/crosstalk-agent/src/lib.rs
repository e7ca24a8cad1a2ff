//! Tool-using agent: a chat completion loop that can call remote tools.
//!
//! The [`Agent`] owns the conversation with the model. When the model
//! requests tool calls it executes them through a [`ToolClient`] and feeds
//! the results back, repeating until the model produces a final answer or
//! the step limit trips. Runs execute under an OpenTelemetry span, so a
//! trace-propagating tool client carries each run's context into the tool
//! server process.
//!
//! [`ToolClient`]: crosstalk_types::ToolClient

pub mod agent;
pub mod config;
pub mod error;

pub use agent::{Agent, AgentReply, ToolStep};
pub use config::{load_config, Config, ConfigError};
pub use error::AgentError;
