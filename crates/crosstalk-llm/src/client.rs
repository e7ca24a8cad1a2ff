//! OpenAI-compatible chat completion client.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crosstalk_types::ToolDescriptor;

use crate::config::LlmConfig;
use crate::error::LlmError;

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatMessage {
    /// Instructions that frame the whole conversation.
    System { content: String },
    /// Something the user said.
    User { content: String },
    /// A model reply; may carry tool-call requests instead of (or besides)
    /// text.
    Assistant {
        content: Option<String>,
        tool_calls: Vec<ToolCall>,
    },
    /// The result of one tool call, answering an assistant request.
    Tool {
        tool_call_id: String,
        content: String,
    },
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Tool {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    /// Provider-assigned id, echoed back with the tool's result.
    pub id: String,
    /// Tool name as advertised to the model.
    pub name: String,
    /// Decoded arguments object.
    pub arguments: Value,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Other,
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// One complete, non-streamed model reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatOutcome {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: FinishReason,
    pub usage: Option<Usage>,
}

impl ChatOutcome {
    /// Re-encodes this reply as a conversation message, for appending to
    /// the transcript before tool results.
    pub fn assistant_message(&self) -> ChatMessage {
        ChatMessage::Assistant {
            content: self.content.clone(),
            tool_calls: self.tool_calls.clone(),
        }
    }
}

/// Client for an OpenAI-compatible `chat/completions` endpoint.
pub struct LlmClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| LlmError::Config("api key contains invalid header characters".into()))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| LlmError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self { http, config })
    }

    /// The configured model identifier.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Requests one completion for `messages`, advertising `tools` to the
    /// model when any are given.
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDescriptor],
    ) -> Result<ChatOutcome, LlmError> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages: messages.iter().map(OutboundMessage::from).collect(),
            tools: if tools.is_empty() {
                None
            } else {
                Some(tools.iter().map(OutboundTool::from).collect())
            },
            temperature: self.config.temperature,
        };

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        debug!(
            "requesting completion: {} messages, {} tools",
            messages.len(),
            tools.len()
        );

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: truncate_body(&body),
            });
        }

        let decoded: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Decode(e.to_string()))?;
        let choice = decoded
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyChoices)?;

        let mut tool_calls = Vec::new();
        for call in choice.message.tool_calls.unwrap_or_default() {
            tool_calls.push(ToolCall {
                id: call.id,
                name: call.function.name,
                arguments: decode_arguments(&call.function.arguments)?,
            });
        }

        let finish_reason =
            map_finish_reason(choice.finish_reason.as_deref(), !tool_calls.is_empty());
        Ok(ChatOutcome {
            content: choice.message.content,
            tool_calls,
            finish_reason,
            usage: decoded.usage,
        })
    }
}

fn map_finish_reason(reason: Option<&str>, has_tool_calls: bool) -> FinishReason {
    match reason {
        Some("stop") => FinishReason::Stop,
        Some("length") => FinishReason::Length,
        Some("tool_calls") => FinishReason::ToolCalls,
        Some("content_filter") => FinishReason::ContentFilter,
        None if has_tool_calls => FinishReason::ToolCalls,
        _ => FinishReason::Other,
    }
}

fn decode_arguments(raw: &str) -> Result<Value, LlmError> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(raw)
        .map_err(|e| LlmError::Decode(format!("tool call arguments are not valid JSON: {e}")))
}

fn truncate_body(body: &str) -> String {
    let mut out: String = body.chars().take(300).collect();
    if out.len() < body.len() {
        out.push_str("...");
    }
    out
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<OutboundMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OutboundTool<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct OutboundMessage<'a> {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OutboundToolCall<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
}

impl<'a> From<&'a ChatMessage> for OutboundMessage<'a> {
    fn from(message: &'a ChatMessage) -> Self {
        match message {
            ChatMessage::System { content } => Self {
                role: "system",
                content: Some(content),
                tool_calls: None,
                tool_call_id: None,
            },
            ChatMessage::User { content } => Self {
                role: "user",
                content: Some(content),
                tool_calls: None,
                tool_call_id: None,
            },
            ChatMessage::Assistant {
                content,
                tool_calls,
            } => Self {
                role: "assistant",
                content: content.as_deref(),
                tool_calls: if tool_calls.is_empty() {
                    None
                } else {
                    Some(tool_calls.iter().map(OutboundToolCall::from).collect())
                },
                tool_call_id: None,
            },
            ChatMessage::Tool {
                tool_call_id,
                content,
            } => Self {
                role: "tool",
                content: Some(content),
                tool_calls: None,
                tool_call_id: Some(tool_call_id),
            },
        }
    }
}

#[derive(Serialize)]
struct OutboundToolCall<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    function: OutboundFunctionCall<'a>,
}

#[derive(Serialize)]
struct OutboundFunctionCall<'a> {
    name: &'a str,
    arguments: String,
}

impl<'a> From<&'a ToolCall> for OutboundToolCall<'a> {
    fn from(call: &'a ToolCall) -> Self {
        Self {
            id: &call.id,
            kind: "function",
            function: OutboundFunctionCall {
                name: &call.name,
                arguments: call.arguments.to_string(),
            },
        }
    }
}

#[derive(Serialize)]
struct OutboundTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: OutboundFunction<'a>,
}

#[derive(Serialize)]
struct OutboundFunction<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    parameters: &'a Value,
}

impl<'a> From<&'a ToolDescriptor> for OutboundTool<'a> {
    fn from(descriptor: &'a ToolDescriptor) -> Self {
        Self {
            kind: "function",
            function: OutboundFunction {
                name: &descriptor.name,
                description: descriptor.description.as_deref(),
                parameters: &descriptor.input_schema,
            },
        }
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<InboundChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct InboundChoice {
    message: InboundMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct InboundMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<InboundToolCall>>,
}

#[derive(Deserialize)]
struct InboundToolCall {
    #[serde(default)]
    id: String,
    function: InboundFunctionCall,
}

#[derive(Deserialize)]
struct InboundFunctionCall {
    name: String,
    arguments: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> LlmClient {
        let config = LlmConfig::new("test-key").with_base_url(server.uri());
        LlmClient::new(config).unwrap()
    }

    fn search_descriptor() -> ToolDescriptor {
        ToolDescriptor {
            name: "search_docs".to_string(),
            description: Some("Search the documentation.".to_string()),
            input_schema: json!({"type": "object", "properties": {"query": {"type": "string"}}}),
        }
    }

    #[tokio::test]
    async fn sends_request_and_decodes_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({"model": "gpt-4o-mini"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {"role": "assistant", "content": "Hello there."},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let outcome = client
            .chat(&[ChatMessage::user("Say hello")], &[])
            .await
            .unwrap();

        assert_eq!(outcome.content.as_deref(), Some("Hello there."));
        assert!(outcome.tool_calls.is_empty());
        assert_eq!(outcome.finish_reason, FinishReason::Stop);
        assert_eq!(outcome.usage.unwrap().total_tokens, 16);
    }

    #[tokio::test]
    async fn decodes_tool_calls_with_string_arguments() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [{
                            "id": "call_1",
                            "type": "function",
                            "function": {
                                "name": "search_docs",
                                "arguments": "{\"query\": \"voice rooms\"}"
                            }
                        }]
                    },
                    "finish_reason": "tool_calls"
                }]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let outcome = client
            .chat(&[ChatMessage::user("how do rooms work?")], &[search_descriptor()])
            .await
            .unwrap();

        assert_eq!(outcome.finish_reason, FinishReason::ToolCalls);
        assert_eq!(outcome.tool_calls.len(), 1);
        let call = &outcome.tool_calls[0];
        assert_eq!(call.id, "call_1");
        assert_eq!(call.name, "search_docs");
        assert_eq!(call.arguments, json!({"query": "voice rooms"}));
    }

    #[tokio::test]
    async fn serializes_tools_and_tool_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {"role": "assistant", "content": "Done."},
                    "finish_reason": "stop"
                }]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let assistant = ChatMessage::Assistant {
            content: None,
            tool_calls: vec![ToolCall {
                id: "call_1".to_string(),
                name: "search_docs".to_string(),
                arguments: json!({"query": "rooms"}),
            }],
        };
        let messages = [
            ChatMessage::user("how do rooms work?"),
            assistant,
            ChatMessage::tool("call_1", "voice-rooms: Voice rooms"),
        ];
        client
            .chat(&messages, &[search_descriptor()])
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();

        assert_eq!(body["tools"][0]["type"], json!("function"));
        assert_eq!(body["tools"][0]["function"]["name"], json!("search_docs"));

        let sent = body["messages"].as_array().unwrap();
        assert_eq!(sent[1]["role"], json!("assistant"));
        assert_eq!(
            sent[1]["tool_calls"][0]["function"]["name"],
            json!("search_docs")
        );
        assert_eq!(sent[2]["role"], json!("tool"));
        assert_eq!(sent[2]["tool_call_id"], json!("call_1"));
        assert_eq!(sent[2]["content"], json!("voice-rooms: Voice rooms"));
    }

    #[tokio::test]
    async fn api_error_is_surfaced_with_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(429).set_body_string("rate limit exceeded"),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .chat(&[ChatMessage::user("hi")], &[])
            .await
            .unwrap_err();
        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 429);
                assert!(message.contains("rate limit"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .chat(&[ChatMessage::user("hi")], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::EmptyChoices));
    }
}
