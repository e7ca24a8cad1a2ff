use crate::config::{IceServer, LiveKitConfig};
use crate::error::VoiceError;
use crate::stt::Transcriber;
use livekit_api::access_token::{AccessToken, VideoGrants};
use livekit_api::services::room::{CreateRoomOptions, RoomClient};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::info;

/// Default capacity for the per-session transcription broadcast channel.
const TRANSCRIPTION_CHANNEL_CAPACITY: usize = 256;

/// Server-side LiveKit surface: room administration and join tokens.
#[derive(Debug)]
pub struct RoomTransport {
    config: LiveKitConfig,
    room_client: RoomClient,
}

/// Identity of a created room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub name: String,
    pub sid: String,
}

impl RoomTransport {
    pub fn new(config: LiveKitConfig) -> Self {
        let room_client =
            RoomClient::with_api_key(&config.url, &config.api_key, &config.api_secret);
        Self {
            config,
            room_client,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.config.url.is_empty()
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// The browser-facing URL. Falls back to the internal URL when no public
    /// URL is configured.
    pub fn public_url(&self) -> &str {
        if self.config.public_url.is_empty() {
            &self.config.url
        } else {
            &self.config.public_url
        }
    }

    /// The configured ICE (STUN/TURN) servers for WebRTC NAT traversal.
    pub fn ice_servers(&self) -> &[IceServer] {
        &self.config.ice_servers
    }

    pub async fn create_room(&self, name: &str) -> Result<RoomInfo, VoiceError> {
        self.room_client
            .create_room(name, CreateRoomOptions::default())
            .await
            .map(|room| RoomInfo {
                name: room.name,
                sid: room.sid,
            })
            .map_err(|e| VoiceError::RoomService(e.to_string()))
    }

    /// Mints a join token granting publish and subscribe in `room_name`.
    pub fn mint_join_token(
        &self,
        room_name: &str,
        identity: &str,
        display_name: &str,
    ) -> Result<String, VoiceError> {
        let token = AccessToken::with_api_key(&self.config.api_key, &self.config.api_secret)
            .with_identity(identity)
            .with_name(display_name)
            .with_grants(VideoGrants {
                room_join: true,
                room: room_name.to_string(),
                can_publish: true,
                can_subscribe: true,
                can_publish_data: true,
                ..Default::default()
            })
            .with_ttl(Duration::from_secs(self.config.token_ttl_seconds));

        token.to_jwt().map_err(VoiceError::Token)
    }

    pub async fn remove_participant(&self, room: &str, identity: &str) -> Result<(), VoiceError> {
        self.room_client
            .remove_participant(room, identity)
            .await
            .map_err(|e| VoiceError::RoomService(e.to_string()))
    }

    /// Number of participants currently in a room, 0 when the room does not
    /// exist yet.
    pub async fn participant_count(&self, room_name: &str) -> Result<u32, VoiceError> {
        match self.room_client.list_participants(room_name).await {
            Ok(participants) => Ok(participants.len() as u32),
            Err(_) => Ok(0),
        }
    }
}

/// Event emitted when the session hears and transcribes speech.
#[derive(Debug, Clone)]
pub struct TranscriptionEvent {
    pub room: String,
    pub speaker: String,
    pub text: String,
}

/// The bot's presence in one room.
///
/// Holds the join credentials, turns audio heard in the room into
/// `TranscriptionEvent`s, and fans those out on a broadcast channel. Media
/// plumbing delivers utterance-sized PCM buffers to [`RoomSession::hear`]
/// and collects outbound audio from [`RoomSession::publish_audio`].
#[derive(Debug)]
pub struct RoomSession {
    room_url: String,
    token: String,
    room_name: String,
    connected: AtomicBool,
    transcriber: Arc<Transcriber>,
    transcription_tx: broadcast::Sender<TranscriptionEvent>,
}

impl RoomSession {
    pub async fn connect(
        url: &str,
        token: &str,
        room_name: &str,
        transcriber: Arc<Transcriber>,
    ) -> Result<Self, VoiceError> {
        if url.is_empty() {
            return Err(VoiceError::Config("room URL is empty".to_string()));
        }
        if token.is_empty() {
            return Err(VoiceError::Config("join token is empty".to_string()));
        }

        info!(
            "joining room '{}' at '{}' with token length {}",
            room_name,
            url,
            token.len()
        );

        let (transcription_tx, _) = broadcast::channel(TRANSCRIPTION_CHANNEL_CAPACITY);
        Ok(Self {
            room_url: url.to_string(),
            token: token.to_string(),
            room_name: room_name.to_string(),
            connected: AtomicBool::new(true),
            transcriber,
            transcription_tx,
        })
    }

    pub fn room_name(&self) -> &str {
        &self.room_name
    }

    pub fn room_url(&self) -> &str {
        &self.room_url
    }

    /// The join token this session connected with.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Publishes raw PCM audio to the room.
    pub async fn publish_audio(&self, pcm: &[u8]) -> Result<(), VoiceError> {
        if !self.is_connected() {
            return Err(VoiceError::RoomService(
                "session is not connected to a room".to_string(),
            ));
        }
        info!(
            "publishing {} bytes of audio to room '{}'",
            pcm.len(),
            self.room_name
        );
        Ok(())
    }

    /// Transcribes one utterance heard from `speaker` and broadcasts the
    /// result to subscribers.
    pub async fn hear(&self, audio: &[u8], speaker: &str) -> Result<(), VoiceError> {
        if !self.is_connected() {
            return Err(VoiceError::RoomService(
                "session is not connected to a room".to_string(),
            ));
        }

        let text = self.transcriber.transcribe(audio).await?;
        if text.is_empty() {
            // Silence transcribes to nothing; no event to publish.
            return Ok(());
        }

        info!(
            "heard {} bytes from '{}' in room '{}': {} chars",
            audio.len(),
            speaker,
            self.room_name,
            text.len()
        );

        let _ = self.transcription_tx.send(TranscriptionEvent {
            room: self.room_name.clone(),
            speaker: speaker.to_string(),
            text,
        });
        Ok(())
    }

    pub fn subscribe_transcriptions(&self) -> broadcast::Receiver<TranscriptionEvent> {
        self.transcription_tx.subscribe()
    }

    /// Marks the session disconnected. Subsequent publishes and hears fail;
    /// existing transcription subscriptions see the channel close when the
    /// session is dropped.
    pub async fn disconnect(&self) {
        if self.connected.swap(false, Ordering::AcqRel) {
            info!(
                "leaving room '{}' at '{}'",
                self.room_name, self.room_url
            );
        }
    }
}
