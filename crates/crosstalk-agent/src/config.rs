//! Agent configuration loading from file and environment variables.

use crosstalk_llm::LlmConfig;
use serde::Deserialize;
use thiserror::Error;

/// Top-level agent configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Distributed tracing settings.
    #[serde(default)]
    pub tracing: TracingConfig,

    /// Chat completion provider settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Tool server settings.
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Agent loop settings.
    #[serde(default)]
    pub agent: AgentSettings,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "crosstalk_agent=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Distributed tracing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TracingConfig {
    /// Whether to record spans for agent runs and tool calls.
    #[serde(default)]
    pub enabled: bool,

    /// Service name stamped on exported spans.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

/// Tool server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsConfig {
    /// Whether to spawn a tool server at all.
    #[serde(default = "default_tools_enabled")]
    pub enabled: bool,

    /// Executable to spawn as the stdio tool server.
    #[serde(default = "default_tools_command")]
    pub command: String,

    /// Arguments passed to the tool server executable.
    #[serde(default)]
    pub args: Vec<String>,

    /// Per-request deadline for tool calls, in seconds.
    #[serde(default = "default_tools_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

/// Agent loop configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSettings {
    /// System instructions framing every conversation.
    #[serde(default = "default_instructions")]
    pub instructions: String,

    /// Maximum chat/tool round trips per question.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "crosstalk-agent".to_string()
}

fn default_tools_enabled() -> bool {
    true
}

fn default_tools_command() -> String {
    "crosstalk-toolbox".to_string()
}

fn default_tools_timeout_seconds() -> u64 {
    30
}

fn default_instructions() -> String {
    "Use the tools to answer the users question.".to_string()
}

fn default_max_steps() -> usize {
    10
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

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enabled: default_tools_enabled(),
            command: default_tools_command(),
            args: Vec::new(),
            request_timeout_seconds: default_tools_timeout_seconds(),
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
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
/// - `CROSSTALK_LOG_LEVEL` overrides `logging.level`
/// - `CROSSTALK_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `CROSSTALK_TRACING` overrides `tracing.enabled`
/// - `CROSSTALK_OPENAI_API_KEY` (or `OPENAI_API_KEY`) overrides `llm.api_key`
/// - `CROSSTALK_OPENAI_BASE_URL` overrides `llm.base_url`
/// - `CROSSTALK_MODEL` overrides `llm.model`
/// - `CROSSTALK_TOOLBOX_COMMAND` overrides `tools.command`
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
    if let Ok(level) = std::env::var("CROSSTALK_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("CROSSTALK_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Ok(enabled) = std::env::var("CROSSTALK_TRACING") {
        config.tracing.enabled = enabled == "true" || enabled == "1";
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

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
        assert!(!config.tracing.enabled);
        assert!(config.tools.enabled);
        assert_eq!(config.tools.command, "crosstalk-toolbox");
        assert_eq!(config.agent.max_steps, 10);
        assert_eq!(
            config.agent.instructions,
            "Use the tools to answer the users question."
        );
    }

    #[test]
    fn sections_parse_from_toml() {
        let config: Config = toml::from_str(
            r#"
            [logging]
            level = "debug"
            json = true

            [tracing]
            enabled = true
            service_name = "docs-agent"

            [llm]
            api_key = "sk-test"
            model = "gpt-4o"

            [tools]
            command = "./target/debug/crosstalk-toolbox"
            args = ["--verbose"]
            request_timeout_seconds = 10

            [agent]
            max_steps = 4
            "#,
        )
        .unwrap();

        assert!(config.logging.json);
        assert_eq!(config.tracing.service_name, "docs-agent");
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.tools.args, vec!["--verbose"]);
        assert_eq!(config.tools.request_timeout_seconds, 10);
        assert_eq!(config.agent.max_steps, 4);
    }

    // The one test that goes through load_config and the environment; other
    // tests parse TOML directly so they cannot race these variables.
    #[test]
    fn load_config_applies_env_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.toml");
        std::fs::write(
            &path,
            r#"
            [llm]
            api_key = "from-file"
            model = "gpt-4o-mini"
            "#,
        )
        .unwrap();

        std::env::set_var("CROSSTALK_MODEL", "gpt-4o");
        std::env::set_var("CROSSTALK_LOG_LEVEL", "trace");
        let config = load_config(path.to_str()).unwrap();
        std::env::remove_var("CROSSTALK_MODEL");
        std::env::remove_var("CROSSTALK_LOG_LEVEL");

        assert_eq!(config.llm.api_key, "from-file");
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_config(Some("/nonexistent/agent.toml")).unwrap();
        assert_eq!(config.tools.command, "crosstalk-toolbox");
    }
}
