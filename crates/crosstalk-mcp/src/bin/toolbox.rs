//! Bundled documentation tool server.
//!
//! Speaks the stdio tool protocol on stdin/stdout and logs to stderr. The
//! agent and bot binaries spawn it as their default tool server; it also
//! runs standalone for poking at with a raw JSON-RPC client.

use opentelemetry::trace::{Span, Tracer};
use opentelemetry::{global, KeyValue};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use crosstalk_mcp::ToolServer;
use crosstalk_trace::{init_tracing, install_propagator};
use crosstalk_types::{Meta, ToolDescriptor, ToolResult};

/// Environment flag that turns on span recording for this process.
const TRACING_ENV: &str = "CROSSTALK_TRACING";

/// Longest snippet returned per search hit.
const SNIPPET_CHARS: usize = 200;

struct Doc {
    slug: &'static str,
    title: &'static str,
    body: &'static str,
}

const CORPUS: &[Doc] = &[
    Doc {
        slug: "voice-rooms",
        title: "Voice rooms",
        body: "Crosstalk voice conversations happen in LiveKit rooms. The bot \
               joins a room with a server-minted token, subscribes to incoming \
               audio, and publishes synthesized speech on its own track. \
               Clients obtain the room URL, a join token, and the ICE server \
               list from the bot's /connect endpoint.",
    },
    Doc {
        slug: "agents",
        title: "Agents and turns",
        body: "An agent turn starts from a user utterance and runs a chat \
               completion loop: the model either answers directly or requests \
               tool calls, whose results are appended to the conversation \
               before the model is consulted again. Turns are bounded by a \
               configurable step limit so a confused model cannot loop \
               forever.",
    },
    Doc {
        slug: "tool-servers",
        title: "Tool servers",
        body: "Tools live in separate processes that speak newline-delimited \
               JSON-RPC over stdio. After an initialize handshake the client \
               may list tools and call them by name with a JSON arguments \
               object. Servers advertise each tool's input schema so the \
               model knows how to fill in arguments.",
    },
    Doc {
        slug: "trace-propagation",
        title: "Trace propagation",
        body: "Distributed traces cross the tool-server boundary through the \
               reserved _meta entry of a call's arguments. The client injects \
               W3C traceparent, tracestate, and baggage headers; the server \
               extracts them and activates the context around the handler, so \
               tool work shows up under the caller's trace. Propagation is \
               best effort and never fails a call.",
    },
    Doc {
        slug: "configuration",
        title: "Configuration",
        body: "Binaries read a TOML config file given as the first argument, \
               falling back to built-in defaults. Every setting can also be \
               overridden through CROSSTALK_* environment variables, which \
               take precedence over the file. Secrets are redacted from debug \
               output.",
    },
    Doc {
        slug: "voice-profiles",
        title: "Voice profiles",
        body: "A voice profile names a TTS model and its parameters: model \
               path, speed, and optionally a speaker id for multi-speaker \
               models. The synthesizer renders text through the profile's \
               engine and returns raw PCM audio ready for publishing.",
    },
];

fn search_descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: "search_docs".to_string(),
        description: Some(
            "Search the Crosstalk documentation. Returns the best matching \
             documents with a snippet of each."
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "Search terms"},
                "limit": {"type": "integer", "description": "Maximum results, default 3"}
            },
            "required": ["query"]
        }),
    }
}

fn read_descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: "read_doc".to_string(),
        description: Some("Read one documentation page in full by its slug.".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "slug": {"type": "string", "description": "Document slug from search results"}
            },
            "required": ["slug"]
        }),
    }
}

fn search_docs(arguments: Meta) -> Result<ToolResult, String> {
    let query = arguments
        .get("query")
        .and_then(|value| value.as_str())
        .ok_or("search_docs requires a string 'query' argument")?;
    let limit = arguments
        .get("limit")
        .and_then(|value| value.as_u64())
        .unwrap_or(3) as usize;

    let tracer = global::tracer("crosstalk-toolbox");
    let mut span = tracer.start("search_docs");
    span.set_attribute(KeyValue::new("query", query.to_string()));

    let terms: Vec<String> = query
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect();

    let mut scored: Vec<(usize, &Doc)> = CORPUS
        .iter()
        .filter_map(|doc| {
            let title = doc.title.to_lowercase();
            let body = doc.body.to_lowercase();
            let score: usize = terms
                .iter()
                .map(|term| {
                    title.matches(term.as_str()).count() * 3
                        + body.matches(term.as_str()).count()
                        + usize::from(doc.slug.contains(term.as_str())) * 3
                })
                .sum();
            (score > 0).then_some((score, doc))
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    span.set_attribute(KeyValue::new("hits", scored.len() as i64));
    span.end();

    if scored.is_empty() {
        return Ok(ToolResult::from_text(format!(
            "No documents matched '{query}'."
        )));
    }

    let listing = scored
        .iter()
        .take(limit.max(1))
        .map(|(_, doc)| {
            let snippet: String = doc.body.chars().take(SNIPPET_CHARS).collect();
            format!("{}: {}\n{}", doc.slug, doc.title, snippet)
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    Ok(ToolResult::from_text(listing))
}

fn read_doc(arguments: Meta) -> Result<ToolResult, String> {
    let slug = arguments
        .get("slug")
        .and_then(|value| value.as_str())
        .ok_or("read_doc requires a string 'slug' argument")?;

    match CORPUS.iter().find(|doc| doc.slug == slug) {
        Some(doc) => Ok(ToolResult::from_text(format!("{}\n\n{}", doc.title, doc.body))),
        None => Err(format!("no document with slug '{slug}'")),
    }
}

#[tokio::main]
async fn main() {
    // Stdout carries the protocol, so all logging goes to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    install_propagator();
    let provider = match std::env::var(TRACING_ENV).ok().as_deref() {
        Some("1") | Some("true") => Some(init_tracing("crosstalk-toolbox")),
        _ => None,
    };

    let mut server = ToolServer::new("crosstalk-toolbox");
    server.register(search_descriptor(), |arguments| async move {
        search_docs(arguments)
    });
    server.register(read_descriptor(), |arguments| async move {
        read_doc(arguments)
    });

    if let Err(e) = server.serve_stdio().await {
        tracing::error!("tool server failed: {e}");
        std::process::exit(1);
    }

    if let Some(provider) = provider {
        if let Err(e) = provider.shutdown() {
            tracing::warn!("tracer provider shutdown failed: {e}");
        }
    }
}
