//! Voice infrastructure for the crosstalk bot.
//!
//! Integrates with LiveKit for WebRTC room transport, renders the bot's
//! replies to audio with a local TTS subprocess, and transcribes human
//! speech back to text with a local STT subprocess.
//!
//! The split of concerns: humans speak over WebRTC, the bot answers in
//! text, and this crate converts between the two at the room boundary.
//! Utterance segmentation happens upstream of `RoomSession::hear`; the
//! rest of the system consumes finished `TranscriptionEvent`s.

pub mod config;
pub mod error;
pub mod stt;
pub mod transport;
pub mod tts;

pub use config::{IceServer, LiveKitConfig};
pub use error::VoiceError;
pub use stt::Transcriber;
pub use transport::{RoomInfo, RoomSession, RoomTransport, TranscriptionEvent};
pub use tts::Synthesizer;
