use serde::{Deserialize, Serialize};
use std::fmt;

fn default_token_ttl_seconds() -> u64 {
    3600
}

fn default_ice_servers() -> Vec<IceServer> {
    vec![IceServer {
        urls: vec![
            "stun:stun.l.google.com:19302".to_string(),
            "stun:stun1.l.google.com:19302".to_string(),
        ],
        username: String::new(),
        credential: String::new(),
    }]
}

/// One ICE (STUN/TURN) server handed to WebRTC clients for NAT traversal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IceServer {
    pub urls: Vec<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub credential: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LiveKitConfig {
    pub url: String,
    /// Browser-facing URL when the internal `url` is not reachable from
    /// outside. Empty means `url` is used for both.
    #[serde(default)]
    pub public_url: String,
    pub api_key: String,
    #[serde(skip_serializing)]
    pub api_secret: String,
    /// JWT token TTL in seconds for LiveKit join tokens. Default: 3600 (1 hour).
    #[serde(default = "default_token_ttl_seconds")]
    pub token_ttl_seconds: u64,
    #[serde(default = "default_ice_servers")]
    pub ice_servers: Vec<IceServer>,
}

impl Default for LiveKitConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            public_url: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            token_ttl_seconds: default_token_ttl_seconds(),
            ice_servers: default_ice_servers(),
        }
    }
}

impl fmt::Debug for LiveKitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveKitConfig")
            .field("url", &self.url)
            .field("public_url", &self.public_url)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .field("ice_servers", &self.ice_servers)
            .finish()
    }
}

impl LiveKitConfig {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_api_secret() {
        let config = LiveKitConfig::new("ws://localhost:7880", "devkey", "supersecret");
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("supersecret"));
    }

    #[test]
    fn serialization_skips_api_secret() {
        let config = LiveKitConfig::new("ws://localhost:7880", "devkey", "supersecret");
        let json = serde_json::to_value(&config).unwrap();
        assert!(json.get("api_secret").is_none());
        assert_eq!(json["api_key"], "devkey");
    }

    #[test]
    fn missing_ice_servers_fall_back_to_stun_defaults() {
        let config: LiveKitConfig = toml::from_str(
            r#"
            url = "ws://localhost:7880"
            api_key = "key"
            api_secret = "secret"
            "#,
        )
        .unwrap();
        assert!(!config.ice_servers.is_empty());
        assert!(config.ice_servers[0].urls[0].starts_with("stun:"));
        assert_eq!(config.token_ttl_seconds, 3600);
    }
}
