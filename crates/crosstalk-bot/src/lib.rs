//! Voice bot service library logic.
//!
//! Wires the pieces together: a LiveKit room session feeding transcriptions
//! to a tool-using agent, a synthesizer speaking the answers back, and a
//! small HTTP API for clients to join the room.

pub mod api;
pub mod bot;
pub mod config;

pub use api::{app, AppState};
pub use bot::{TranscriptLine, VoiceBot};
pub use config::{load_config, Config, ConfigError};
