//! Crosstalk bot binary — a voice assistant living in a LiveKit room.
//!
//! Creates the room, joins it, and answers transcribed speech with a
//! tool-using agent, speaking replies back through the synthesizer. Also
//! serves a small HTTP API so clients can fetch join tokens, with graceful
//! shutdown on SIGTERM/SIGINT.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crosstalk_agent::Agent;
use crosstalk_bot::{app, load_config, AppState, Config, VoiceBot};
use crosstalk_llm::LlmClient;
use crosstalk_mcp::{StdioServerParams, StdioToolClient};
use crosstalk_trace::{init_tracing, install_propagator, Traced};
use crosstalk_types::ToolClient;
use crosstalk_voice::{RoomSession, RoomTransport, Synthesizer, Transcriber};

/// The parts that only exist once the bot has joined its room.
struct VoiceRuntime {
    session: Arc<RoomSession>,
    bot: Arc<VoiceBot>,
    loop_task: JoinHandle<()>,
    toolbox: Option<Arc<Traced<StdioToolClient>>>,
}

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
    let selected_config_path = resolved_config_path.as_deref().or(Some("bot.toml"));

    let config = load_config(selected_config_path)
        .expect("failed to load configuration — the bot cannot start without valid config");

    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
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

    let transport = Arc::new(RoomTransport::new(config.livekit.clone()));

    let voice = if transport.is_enabled() {
        Some(start_voice(&config, &transport).await)
    } else {
        warn!("LiveKit is not configured; serving the join API only");
        None
    };

    let app = app(AppState {
        transport: transport.clone(),
        room_name: config.bot.room.clone(),
    });
    let addr = SocketAddr::new(config.server.host, config.server.port);

    info!(%addr, "starting crosstalk bot");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address — is another process using this port?");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    if let Some(voice) = voice {
        voice.loop_task.abort();
        voice.session.disconnect().await;

        let transcript = voice.bot.transcript().await;
        info!("conversation transcript ({} lines)", transcript.len());
        for line in &transcript {
            info!("[{}] {}: {}", line.at.to_rfc3339(), line.speaker, line.text);
        }

        if let Some(traced) = voice.toolbox {
            if let Err(e) = traced.inner().shutdown().await {
                warn!("tool server shutdown failed: {e}");
            }
        }
    }
    if let Some(provider) = provider {
        if let Err(e) = provider.shutdown() {
            warn!("tracer provider shutdown failed: {e}");
        }
    }
    info!("crosstalk bot shut down");
}

/// Creates the room, joins it, greets, and spawns the conversation loop.
async fn start_voice(config: &Config, transport: &Arc<RoomTransport>) -> VoiceRuntime {
    let room = transport
        .create_room(&config.bot.room)
        .await
        .expect("failed to create LiveKit room — check [livekit] in config");
    info!(room = %room.name, sid = %room.sid, "room ready");

    let token = transport
        .mint_join_token(&room.name, "crosstalk-bot", &config.bot.name)
        .expect("failed to mint the bot's join token");

    let transcriber = Arc::new(Transcriber::new(
        &config.stt.model_path,
        &config.stt.binary_path,
    ));
    let session = Arc::new(
        RoomSession::connect(transport.url(), &token, &room.name, transcriber)
            .await
            .expect("failed to join LiveKit room"),
    );

    let synthesizer = Synthesizer::new(&config.tts.voices_dir, &config.tts.piper_binary);
    for profile in &config.tts.profiles {
        synthesizer.add_profile(profile.clone()).await;
    }

    let llm = LlmClient::new(config.llm.clone())
        .expect("failed to build LLM client — check [llm] in config");

    // Tooling is best effort: a tool server that will not start leaves the
    // bot answering from the model alone.
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
    let tools = toolbox.clone().map(|traced| traced as Arc<dyn ToolClient>);

    let agent = Agent::new(llm, &config.bot.instructions, tools, config.bot.max_steps).await;
    info!("available tools: {:?}", agent.tool_names());

    let bot = Arc::new(VoiceBot::new(
        agent,
        synthesizer,
        session.clone(),
        &config.tts.default_profile,
        &config.bot.name,
    ));
    bot.greet(&config.bot.greeting).await;

    let loop_task = tokio::spawn({
        let bot = bot.clone();
        async move { bot.run().await }
    });

    VoiceRuntime {
        session,
        bot,
        loop_task,
        toolbox,
    }
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
