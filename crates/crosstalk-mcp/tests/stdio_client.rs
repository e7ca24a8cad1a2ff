//! Drives the real `crosstalk-toolbox` binary over its stdio pipe.

use std::time::Duration;

use serde_json::json;

use crosstalk_mcp::{McpError, StdioServerParams, StdioToolClient};
use crosstalk_trace::{install_propagator, MetaContextExt, Traced};
use crosstalk_types::{Meta, ToolClient, ToolError};

fn toolbox_params() -> StdioServerParams {
    StdioServerParams::new(env!("CARGO_BIN_EXE_crosstalk-toolbox"))
}

fn sample_meta() -> Meta {
    let mut meta = Meta::new();
    meta.insert(
        "traceparent".to_string(),
        json!("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"),
    );
    meta
}

#[tokio::test]
async fn handshake_lists_and_calls_tools() {
    let client = StdioToolClient::spawn(toolbox_params())
        .await
        .expect("toolbox spawns");
    assert_eq!(client.server_info().name, "crosstalk-toolbox");

    let tools = client.list_tools().await.unwrap();
    let names: Vec<&str> = tools.iter().map(|tool| tool.name.as_str()).collect();
    assert!(names.contains(&"search_docs"));
    assert!(names.contains(&"read_doc"));

    let mut arguments = Meta::new();
    arguments.insert("query".to_string(), json!("trace propagation"));
    let result = client
        .call_tool("search_docs", Some(arguments))
        .await
        .unwrap();
    assert!(!result.is_error);
    assert!(result.text().contains("trace-propagation"));

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn traced_calls_cross_the_process_boundary() {
    install_propagator();
    let client = StdioToolClient::spawn(toolbox_params())
        .await
        .expect("toolbox spawns");
    let traced = Traced::new(client);
    let meta = sample_meta();

    // No arguments at all: the wrapper materializes an arguments object
    // carrying `_meta`, and the server still runs its own validation
    // (missing `query` is a tool-level failure, not a protocol error).
    let result = async { traced.call_tool("search_docs", None).await }
        .with_meta_context(Some(&meta))
        .await
        .unwrap();
    assert!(result.is_error);
    assert!(result.text().contains("query"));

    let mut arguments = Meta::new();
    arguments.insert("slug".to_string(), json!("voice-rooms"));
    let result = async { traced.call_tool("read_doc", Some(arguments)).await }
        .with_meta_context(Some(&meta))
        .await
        .unwrap();
    assert!(!result.is_error);
    assert!(result.text().contains("LiveKit"));

    traced.into_inner().shutdown().await.unwrap();
}

#[tokio::test]
async fn unknown_tool_is_rejected() {
    let client = StdioToolClient::spawn(toolbox_params())
        .await
        .expect("toolbox spawns");

    let err = client.call_tool("summon_demons", None).await.unwrap_err();
    assert!(matches!(err, ToolError::Rejected { .. }));

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn unresponsive_server_times_out() {
    let params = StdioServerParams::new("sleep")
        .with_args(["5"])
        .with_request_timeout(Duration::from_millis(200));
    let err = StdioToolClient::spawn(params)
        .await
        .err()
        .expect("handshake cannot succeed");
    assert!(matches!(err, McpError::Timeout(_)));
}

#[tokio::test]
async fn missing_binary_is_a_spawn_error() {
    let params = StdioServerParams::new("crosstalk-no-such-binary");
    let err = StdioToolClient::spawn(params).await.err().unwrap();
    assert!(matches!(err, McpError::Spawn(_)));
}
