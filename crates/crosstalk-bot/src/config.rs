//! Bot configuration loading from file and environment variables.

use crosstalk_agent::config::ToolsConfig;
use crosstalk_llm::LlmConfig;
use crosstalk_types::VoiceProfile;
use crosstalk_voice::LiveKitConfig;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level bot configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// HTTP server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Distributed tracing settings.
    #[serde(default)]
    pub tracing: TracingConfig,

    /// LiveKit room transport settings.
    #[serde(default)]
    pub livekit: LiveKitConfig,

    /// Speech-to-text settings.
    #[serde(default)]
    pub stt: SttConfig,

    /// Text-to-speech settings.
    #[serde(default)]
    pub tts: TtsConfig,

    /// Chat completion provider settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Tool server settings.
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Conversation settings.
    #[serde(default)]
    pub bot: BotSettings,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "crosstalk_bot=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Distributed tracing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TracingConfig {
    /// Whether to record spans for conversation turns and tool calls.
    #[serde(default)]
    pub enabled: bool,

    /// Service name stamped on exported spans.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

/// Speech-to-text configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SttConfig {
    /// Path to the whisper model file.
    #[serde(default = "default_stt_model_path")]
    pub model_path: String,

    /// Whisper executable to invoke for transcription.
    #[serde(default = "default_stt_binary")]
    pub binary_path: String,
}

/// Text-to-speech configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TtsConfig {
    /// Directory holding voice model files.
    #[serde(default = "default_voices_dir")]
    pub voices_dir: String,

    /// Piper executable to invoke for synthesis.
    #[serde(default = "default_piper_binary")]
    pub piper_binary: String,

    /// Profile the bot speaks with.
    #[serde(default = "default_profile_id")]
    pub default_profile: String,

    /// Voice profiles to register at startup.
    #[serde(default = "default_profiles")]
    pub profiles: Vec<VoiceProfile>,
}

/// Conversation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotSettings {
    /// Room the bot joins and answers in.
    #[serde(default = "default_room")]
    pub room: String,

    /// Display name the bot joins with.
    #[serde(default = "default_bot_name")]
    pub name: String,

    /// Line spoken into the room once the bot has joined.
    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// System instructions framing every conversation turn.
    #[serde(default = "default_instructions")]
    pub instructions: String,

    /// Maximum chat/tool round trips per heard utterance.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "crosstalk-bot".to_string()
}

fn default_stt_model_path() -> String {
    "models/ggml-base.en.bin".to_string()
}

fn default_stt_binary() -> String {
    "whisper".to_string()
}

fn default_voices_dir() -> String {
    "assets/voices".to_string()
}

fn default_piper_binary() -> String {
    "piper".to_string()
}

fn default_profile_id() -> String {
    "default".to_string()
}

fn default_profiles() -> Vec<VoiceProfile> {
    vec![VoiceProfile::default()]
}

fn default_room() -> String {
    "crosstalk".to_string()
}

fn default_bot_name() -> String {
    "Crosstalk Bot".to_string()
}

fn default_greeting() -> String {
    "Hi! I'm the Crosstalk assistant. Ask me anything about rooms, agents, or tool servers."
        .to_string()
}

fn default_instructions() -> String {
    "You are the Crosstalk voice assistant, an expert on running voice rooms, agents, and \
     tool servers. Search the documentation before answering a question; if the results are \
     incomplete, search again with different terms or say you do not know. Your answers are \
     spoken aloud, so be very concise and skip markdown, lists, and code blocks."
        .to_string()
}

fn default_max_steps() -> usize {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            service_name: default_service_name(),
        }
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model_path: default_stt_model_path(),
            binary_path: default_stt_binary(),
        }
    }
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            voices_dir: default_voices_dir(),
            piper_binary: default_piper_binary(),
            default_profile: default_profile_id(),
            profiles: default_profiles(),
        }
    }
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            room: default_room(),
            name: default_bot_name(),
            greeting: default_greeting(),
            instructions: default_instructions(),
            max_steps: default_max_steps(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `CROSSTALK_HOST` overrides `server.host`
/// - `CROSSTALK_PORT` overrides `server.port`
/// - `CROSSTALK_LOG_LEVEL` overrides `logging.level`
/// - `CROSSTALK_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `CROSSTALK_TRACING` overrides `tracing.enabled`
/// - `CROSSTALK_LIVEKIT_URL` overrides `livekit.url`
/// - `CROSSTALK_LIVEKIT_API_KEY` overrides `livekit.api_key`
/// - `CROSSTALK_LIVEKIT_API_SECRET` overrides `livekit.api_secret`
/// - `CROSSTALK_OPENAI_API_KEY` (or `OPENAI_API_KEY`) overrides `llm.api_key`
/// - `CROSSTALK_OPENAI_BASE_URL` overrides `llm.base_url`
/// - `CROSSTALK_MODEL` overrides `llm.model`
/// - `CROSSTALK_TOOLBOX_COMMAND` overrides `tools.command`
/// - `CROSSTALK_ROOM` overrides `bot.room`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    // Environment variable overrides
    if let Ok(host) = std::env::var("CROSSTALK_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("CROSSTALK_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(level) = std::env::var("CROSSTALK_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("CROSSTALK_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Ok(enabled) = std::env::var("CROSSTALK_TRACING") {
        config.tracing.enabled = enabled == "true" || enabled == "1";
    }
    if let Ok(url) = std::env::var("CROSSTALK_LIVEKIT_URL") {
        config.livekit.url = url;
    }
    if let Ok(key) = std::env::var("CROSSTALK_LIVEKIT_API_KEY") {
        config.livekit.api_key = key;
    }
    if let Ok(secret) = std::env::var("CROSSTALK_LIVEKIT_API_SECRET") {
        config.livekit.api_secret = secret;
    }
    if let Ok(key) = std::env::var("CROSSTALK_OPENAI_API_KEY") {
        config.llm.api_key = key;
    } else if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        config.llm.api_key = key;
    }
    if let Ok(base_url) = std::env::var("CROSSTALK_OPENAI_BASE_URL") {
        config.llm.base_url = base_url;
    }
    if let Ok(model) = std::env::var("CROSSTALK_MODEL") {
        config.llm.model = model;
    }
    if let Ok(command) = std::env::var("CROSSTALK_TOOLBOX_COMMAND") {
        config.tools.command = command;
    }
    if let Ok(room) = std::env::var("CROSSTALK_ROOM") {
        config.bot.room = room;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosstalk_types::VoiceModel;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.level, "info");
        assert!(!config.tracing.enabled);
        assert_eq!(config.tracing.service_name, "crosstalk-bot");
        assert!(config.livekit.url.is_empty());
        assert_eq!(config.stt.binary_path, "whisper");
        assert_eq!(config.tts.default_profile, "default");
        assert_eq!(config.tts.profiles.len(), 1);
        assert_eq!(config.bot.room, "crosstalk");
        assert_eq!(config.bot.max_steps, 10);
        assert!(config.bot.instructions.contains("very concise"));
    }

    #[test]
    fn sections_parse_from_toml() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 9090

            [livekit]
            url = "ws://localhost:7880"
            api_key = "devkey"
            api_secret = "devsecret"

            [stt]
            model_path = "models/ggml-small.en.bin"

            [tts]
            default_profile = "narrator"

            [[tts.profiles]]
            id = "narrator"
            name = "Narrator"
            model = "piper"
            model_path = "en_GB-alan-low.onnx"
            speed = 0.9

            [llm]
            api_key = "sk-test"

            [bot]
            room = "support"
            greeting = "Hello there."
            max_steps = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.livekit.url, "ws://localhost:7880");
        assert_eq!(config.stt.model_path, "models/ggml-small.en.bin");
        assert_eq!(config.tts.default_profile, "narrator");
        assert_eq!(config.tts.profiles[0].model, VoiceModel::Piper);
        assert_eq!(config.tts.profiles[0].speed, 0.9);
        assert!(config.tts.profiles[0].speaker_id.is_none());
        assert_eq!(config.bot.room, "support");
        assert_eq!(config.bot.greeting, "Hello there.");
        assert_eq!(config.bot.max_steps, 4);
    }

    // The one test that goes through load_config and the environment; other
    // tests parse TOML directly so they cannot race these variables.
    #[test]
    fn load_config_applies_env_overrides() {
        std::env::set_var("CROSSTALK_PORT", "9999");
        std::env::set_var("CROSSTALK_LIVEKIT_URL", "ws://livekit:7880");
        let config = load_config(None).unwrap();
        std::env::remove_var("CROSSTALK_PORT");
        std::env::remove_var("CROSSTALK_LIVEKIT_URL");

        assert_eq!(config.server.port, 9999);
        assert_eq!(config.livekit.url, "ws://livekit:7880");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_config(Some("/nonexistent/bot.toml")).unwrap();
        assert_eq!(config.bot.room, "crosstalk");
        assert_eq!(config.tools.command, "crosstalk-toolbox");
    }
}
