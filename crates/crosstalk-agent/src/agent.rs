//! The tool-using conversation loop.

use std::sync::Arc;

use opentelemetry::trace::{FutureExt, Span, Status, TraceContextExt, Tracer};
use opentelemetry::{global, Context, KeyValue};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crosstalk_llm::{ChatMessage, LlmClient, ToolCall};
use crosstalk_types::{ToolClient, ToolDescriptor};

use crate::error::AgentError;

/// One complete answer from [`Agent::run`].
#[derive(Debug, Clone)]
pub struct AgentReply {
    pub conversation_id: Uuid,
    /// The model's final text answer.
    pub answer: String,
    /// Tool invocations made on the way to the answer, in order.
    pub steps: Vec<ToolStep>,
}

/// Record of one tool invocation during a run.
#[derive(Debug, Clone)]
pub struct ToolStep {
    pub tool: String,
    pub arguments: Value,
    pub output: String,
    pub is_error: bool,
}

/// Drives an LLM conversation that may call tools.
///
/// The tool client, when present, is handed in already decorated (the
/// caller decides whether calls carry trace context); the agent only
/// decides *when* to call and feeds results back to the model.
pub struct Agent {
    llm: LlmClient,
    instructions: String,
    tools: Option<Arc<dyn ToolClient>>,
    descriptors: Vec<ToolDescriptor>,
    max_steps: usize,
}

impl Agent {
    /// Builds an agent, fetching the tool catalog once up front.
    ///
    /// Tooling is best effort: when the client cannot list its tools, the
    /// failure is logged and the agent runs without any.
    pub async fn new(
        llm: LlmClient,
        instructions: impl Into<String>,
        tools: Option<Arc<dyn ToolClient>>,
        max_steps: usize,
    ) -> Self {
        let (tools, descriptors) = match tools {
            Some(client) => match client.list_tools().await {
                Ok(descriptors) => {
                    info!("agent loaded {} tools", descriptors.len());
                    (Some(client), descriptors)
                }
                Err(e) => {
                    warn!("failed to list tools, continuing without them: {e}");
                    (None, Vec::new())
                }
            },
            None => (None, Vec::new()),
        };

        Self {
            llm,
            instructions: instructions.into(),
            tools,
            descriptors,
            max_steps,
        }
    }

    /// Names of the tools available to the model.
    pub fn tool_names(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.name.as_str()).collect()
    }

    /// Answers one question, calling tools as the model requests them.
    ///
    /// The whole run executes under an `agent.run` span, which is what gives
    /// outbound tool calls a live ambient context to carry across process
    /// boundaries.
    pub async fn run(&self, question: &str) -> Result<AgentReply, AgentError> {
        let conversation_id = Uuid::new_v4();
        let tracer = global::tracer("crosstalk-agent");
        let mut span = tracer.start("agent.run");
        span.set_attribute(KeyValue::new(
            "conversation.id",
            conversation_id.to_string(),
        ));
        let cx = Context::current_with_span(span);
        self.drive(question, conversation_id).with_context(cx).await
    }

    async fn drive(
        &self,
        question: &str,
        conversation_id: Uuid,
    ) -> Result<AgentReply, AgentError> {
        let mut messages = vec![
            ChatMessage::system(&self.instructions),
            ChatMessage::user(question),
        ];
        let mut steps: Vec<ToolStep> = Vec::new();

        for _ in 0..self.max_steps {
            let outcome = self.llm.chat(&messages, &self.descriptors).await?;

            if outcome.tool_calls.is_empty() {
                Context::current()
                    .span()
                    .set_attribute(KeyValue::new("agent.steps", steps.len() as i64));
                return Ok(AgentReply {
                    conversation_id,
                    answer: outcome.content.unwrap_or_default(),
                    steps,
                });
            }

            messages.push(outcome.assistant_message());
            for call in &outcome.tool_calls {
                let (output, is_error) = self.execute_tool(call).await;
                messages.push(ChatMessage::tool(&call.id, output.clone()));
                steps.push(ToolStep {
                    tool: call.name.clone(),
                    arguments: call.arguments.clone(),
                    output,
                    is_error,
                });
            }
        }

        Context::current()
            .span()
            .set_status(Status::error("step limit reached"));
        Err(AgentError::StepLimit(self.max_steps))
    }

    /// Runs one requested tool call. Failures never abort the run; they are
    /// reported back to the model as the call's output.
    async fn execute_tool(&self, call: &ToolCall) -> (String, bool) {
        let Some(client) = &self.tools else {
            return (format!("Tool '{}' is not available.", call.name), true);
        };

        let arguments = match &call.arguments {
            Value::Object(map) => Some(map.clone()),
            Value::Null => None,
            other => {
                warn!(
                    "model sent non-object arguments for '{}': {other}",
                    call.name
                );
                return (
                    format!("Tool '{}' requires an object of arguments.", call.name),
                    true,
                );
            }
        };

        info!("calling tool '{}'", call.name);
        match client.call_tool(&call.name, arguments).await {
            Ok(result) => (result.text(), result.is_error),
            Err(e) => {
                warn!("tool '{}' failed: {e}", call.name);
                (format!("Tool call failed: {e}"), true)
            }
        }
    }
}
