//! The conversation loop: hear a line, think, speak the answer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use opentelemetry::trace::{FutureExt, Span, TraceContextExt, Tracer};
use opentelemetry::{global, Context, KeyValue};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crosstalk_agent::Agent;
use crosstalk_voice::{RoomSession, Synthesizer, TranscriptionEvent};

/// One line of the conversation, kept for the shutdown transcript.
#[derive(Debug, Clone)]
pub struct TranscriptLine {
    pub at: DateTime<Utc>,
    pub speaker: String,
    pub text: String,
}

/// A tool-using agent wired to a room: transcriptions in, synthesized
/// speech out.
///
/// Turns are strictly sequential. The bot finishes answering one heard
/// utterance before pulling the next from the transcription channel, so a
/// busy room backs up into the channel rather than into interleaved
/// replies.
pub struct VoiceBot {
    agent: Agent,
    synthesizer: Synthesizer,
    session: Arc<RoomSession>,
    voice_profile: String,
    name: String,
    transcript: Mutex<Vec<TranscriptLine>>,
}

impl VoiceBot {
    pub fn new(
        agent: Agent,
        synthesizer: Synthesizer,
        session: Arc<RoomSession>,
        voice_profile: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            agent,
            synthesizer,
            session,
            voice_profile: voice_profile.into(),
            name: name.into(),
            transcript: Mutex::new(Vec::new()),
        }
    }

    /// Speaks the greeting into the room so participants know the bot is
    /// listening.
    pub async fn greet(&self, greeting: &str) {
        self.record(&self.name, greeting).await;
        self.speak(greeting).await;
    }

    /// Runs one conversation turn for a heard utterance.
    ///
    /// The agent run and any tool calls it makes happen under a
    /// `conversation.turn` span, so a turn shows up as one trace from
    /// transcription to answer. Synthesis and publishing are best effort:
    /// a dead speaker pipeline still leaves the answer in the transcript.
    pub async fn handle(&self, event: &TranscriptionEvent) {
        info!(
            room = %event.room,
            speaker = %event.speaker,
            "heard: {}",
            event.text
        );
        self.record(&event.speaker, &event.text).await;

        let tracer = global::tracer("crosstalk-bot");
        let mut span = tracer.start("conversation.turn");
        span.set_attribute(KeyValue::new("room.name", event.room.clone()));
        span.set_attribute(KeyValue::new("speaker", event.speaker.clone()));
        let cx = Context::current_with_span(span);

        let reply = match self.agent.run(&event.text).with_context(cx).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("conversation turn failed: {}", e);
                return;
            }
        };

        info!(
            conversation_id = %reply.conversation_id,
            tool_steps = reply.steps.len(),
            "answering: {}",
            reply.answer
        );
        self.record(&self.name, &reply.answer).await;
        self.speak(&reply.answer).await;
    }

    /// Consumes transcription events until the session's channel closes.
    pub async fn run(&self) {
        let mut events = self.session.subscribe_transcriptions();
        loop {
            match events.recv().await {
                Ok(event) => self.handle(&event).await,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "transcription events dropped while answering");
                }
                Err(RecvError::Closed) => break,
            }
        }
        info!("conversation loop ended");
    }

    /// Snapshot of every line spoken or heard so far.
    pub async fn transcript(&self) -> Vec<TranscriptLine> {
        self.transcript.lock().await.clone()
    }

    async fn record(&self, speaker: &str, text: &str) {
        self.transcript.lock().await.push(TranscriptLine {
            at: Utc::now(),
            speaker: speaker.to_string(),
            text: text.to_string(),
        });
    }

    /// Renders `text` with the configured voice and publishes it to the room.
    async fn speak(&self, text: &str) {
        let pcm = match self.synthesizer.synthesize(text, &self.voice_profile).await {
            Ok(pcm) => pcm,
            Err(e) => {
                error!("failed to synthesize reply: {}", e);
                return;
            }
        };
        if let Err(e) = self.session.publish_audio(&pcm).await {
            error!("failed to publish audio: {}", e);
        }
    }
}
