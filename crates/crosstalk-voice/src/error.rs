use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Access token error: {0}")]
    Token(#[from] livekit_api::access_token::AccessTokenError),

    #[error("Room service error: {0}")]
    RoomService(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Voice profile not found: {0}")]
    ProfileNotFound(String),
}
