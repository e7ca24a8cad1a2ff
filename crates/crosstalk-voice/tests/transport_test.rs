use crosstalk_voice::{IceServer, LiveKitConfig, RoomTransport};

const DEV_URL: &str = "http://localhost:7880";
const DEV_KEY: &str = "devkey";
const DEV_SECRET: &str = "secret";

#[test]
fn mint_join_token_returns_signed_jwt() {
    let config = LiveKitConfig::new(DEV_URL, DEV_KEY, DEV_SECRET);
    let transport = RoomTransport::new(config);

    let token = transport
        .mint_join_token("demo-room", "user-123", "Demo User")
        .expect("token minting should succeed");
    assert!(!token.is_empty());
    assert_eq!(token.split('.').count(), 3, "JWT should have three parts");
}

#[test]
fn join_token_grants_publish_and_subscribe() {
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
    use serde::Deserialize;

    let config = LiveKitConfig::new(DEV_URL, DEV_KEY, DEV_SECRET);
    let transport = RoomTransport::new(config);
    let token = transport
        .mint_join_token("perm-room", "user-perm", "Perm User")
        .expect("token minting should succeed");

    #[derive(Deserialize)]
    struct Claims {
        video: VideoClaims,
    }

    #[derive(Deserialize)]
    struct VideoClaims {
        room: String,
        #[serde(rename = "roomJoin")]
        room_join: bool,
        #[serde(rename = "canPublish")]
        can_publish: bool,
        #[serde(rename = "canSubscribe")]
        can_subscribe: bool,
    }

    let validation = Validation::new(Algorithm::HS256);
    let key = DecodingKey::from_secret(DEV_SECRET.as_bytes());
    let decoded = decode::<Claims>(&token, &key, &validation).expect("token should decode");

    assert_eq!(decoded.claims.video.room, "perm-room");
    assert!(decoded.claims.video.room_join);
    assert!(decoded.claims.video.can_publish);
    assert!(decoded.claims.video.can_subscribe);
}

#[test]
fn transport_disabled_without_url() {
    let transport = RoomTransport::new(LiveKitConfig::default());
    assert!(!transport.is_enabled());
}

#[test]
fn public_url_falls_back_to_internal_url() {
    let config = LiveKitConfig::new(DEV_URL, DEV_KEY, DEV_SECRET);
    let transport = RoomTransport::new(config);
    assert_eq!(transport.public_url(), DEV_URL);

    let mut config = LiveKitConfig::new(DEV_URL, DEV_KEY, DEV_SECRET);
    config.public_url = "wss://voice.example.com".to_string();
    let transport = RoomTransport::new(config);
    assert_eq!(transport.public_url(), "wss://voice.example.com");
}

#[test]
fn ice_servers_surface_through_transport() {
    let mut config = LiveKitConfig::new(DEV_URL, DEV_KEY, DEV_SECRET);
    config.ice_servers = vec![
        IceServer {
            urls: vec!["stun:stun.example.com:3478".into()],
            username: String::new(),
            credential: String::new(),
        },
        IceServer {
            urls: vec!["turn:turn.example.com:3478".into()],
            username: "user".into(),
            credential: "pass".into(),
        },
    ];
    let transport = RoomTransport::new(config);

    let servers = transport.ice_servers();
    assert_eq!(servers.len(), 2);
    assert_eq!(servers[0].urls[0], "stun:stun.example.com:3478");
    assert_eq!(servers[1].username, "user");
}

#[test]
fn config_parses_explicit_ice_servers_from_toml() {
    let config: LiveKitConfig = toml::from_str(
        r#"
        url = "ws://localhost:7880"
        api_key = "key"
        api_secret = "secret"

        [[ice_servers]]
        urls = ["stun:stun.l.google.com:19302"]

        [[ice_servers]]
        urls = ["turn:turn.example.com:3478"]
        username = "user"
        credential = "pass"
        "#,
    )
    .expect("TOML config should parse");

    assert_eq!(config.ice_servers.len(), 2);
    assert_eq!(config.ice_servers[1].credential, "pass");
}
