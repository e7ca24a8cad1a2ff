//! Interactive documentation agent.
//!
//! Reads questions from stdin, answers them with a chat model that can call
//! documentation tools, and prints answers to stdout. Spawns the configured
//! tool server as a child process and wraps it so every tool call carries
//! the current trace context.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crosstalk_agent::{load_config, Agent};
use crosstalk_llm::LlmClient;
use crosstalk_mcp::{StdioServerParams, StdioToolClient};
use crosstalk_trace::{init_tracing, install_propagator, Traced};
use crosstalk_types::ToolClient;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("CROSSTALK_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("agent.toml"));

    let config = load_config(selected_config_path)
        .expect("failed to load configuration — the agent cannot start without valid config");

    // Logs go to stderr; stdout belongs to the conversation.
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    install_propagator();
    let provider = config
        .tracing
        .enabled
        .then(|| init_tracing(&config.tracing.service_name));

    let llm = LlmClient::new(config.llm.clone())
        .expect("failed to build LLM client — check [llm] in config");

    // Tooling is best effort: a tool server that will not start leaves the
    // agent answering from the model alone.
    let toolbox = if config.tools.enabled {
        let params = StdioServerParams::new(&config.tools.command)
            .with_args(config.tools.args.clone())
            .with_request_timeout(Duration::from_secs(config.tools.request_timeout_seconds));
        match StdioToolClient::spawn(params).await {
            Ok(client) => Some(Arc::new(Traced::new(client))),
            Err(e) => {
                warn!("failed to start tool server, continuing without tools: {e}");
                None
            }
        }
    } else {
        None
    };
    let tools = toolbox
        .clone()
        .map(|traced| traced as Arc<dyn ToolClient>);

    let agent = Agent::new(
        llm,
        &config.agent.instructions,
        tools,
        config.agent.max_steps,
    )
    .await;
    info!("available tools: {:?}", agent.tool_names());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n\nEnter your question (or 'exit' to quit): ");
        std::io::stdout()
            .flush()
            .expect("failed to flush stdout");

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("failed to read stdin: {e}");
                break;
            }
        };

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("q") {
            break;
        }

        println!("Running: {question}");
        match agent.run(question).await {
            Ok(reply) => println!("{}", reply.answer),
            Err(e) => error!("agent run failed: {e}"),
        }
    }

    if let Some(traced) = toolbox {
        if let Err(e) = traced.inner().shutdown().await {
            warn!("tool server shutdown failed: {e}");
        }
    }
    if let Some(provider) = provider {
        if let Err(e) = provider.shutdown() {
            warn!("tracer provider shutdown failed: {e}");
        }
    }
    info!("crosstalk agent shut down");
}
