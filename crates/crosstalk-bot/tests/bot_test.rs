use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crosstalk_agent::Agent;
use crosstalk_bot::VoiceBot;
use crosstalk_llm::{LlmClient, LlmConfig};
use crosstalk_types::VoiceProfile;
use crosstalk_voice::{RoomSession, Synthesizer, Transcriber, TranscriptionEvent};

const BOT_NAME: &str = "Crosstalk Bot";

fn answer_response(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }]
    }))
}

async fn agent_for(server: &MockServer) -> Agent {
    let config = LlmConfig::new("test-key").with_base_url(server.uri());
    let llm = LlmClient::new(config).unwrap();
    Agent::new(llm, "Answer briefly.", None, 4).await
}

// A synthesizer whose pipeline is broken on purpose: the registered profile
// points at a model file that does not exist, so every synthesis fails.
async fn broken_synthesizer() -> Synthesizer {
    let synthesizer = Synthesizer::new("/nonexistent/voices", "/nonexistent/piper");
    synthesizer.add_profile(VoiceProfile::default()).await;
    synthesizer
}

async fn connected_session() -> Arc<RoomSession> {
    let transcriber = Arc::new(Transcriber::new(
        "/nonexistent/model.bin",
        "/nonexistent/whisper",
    ));
    Arc::new(
        RoomSession::connect("ws://localhost:7880", "test-token", "test-room", transcriber)
            .await
            .unwrap(),
    )
}

fn heard(speaker: &str, text: &str) -> TranscriptionEvent {
    TranscriptionEvent {
        room: "test-room".to_string(),
        speaker: speaker.to_string(),
        text: text.to_string(),
    }
}

#[tokio::test]
async fn turn_records_user_line_and_spoken_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(answer_response("Rooms are created on demand."))
        .mount(&server)
        .await;

    let bot = VoiceBot::new(
        agent_for(&server).await,
        broken_synthesizer().await,
        connected_session().await,
        "default",
        BOT_NAME,
    );

    bot.handle(&heard("alice", "How are rooms created?")).await;

    // The answer makes it into the transcript even though synthesis failed.
    let transcript = bot.transcript().await;
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].speaker, "alice");
    assert_eq!(transcript[0].text, "How are rooms created?");
    assert_eq!(transcript[1].speaker, BOT_NAME);
    assert_eq!(transcript[1].text, "Rooms are created on demand.");
    assert!(transcript[0].at <= transcript[1].at);
}

#[tokio::test]
async fn greeting_lands_in_the_transcript() {
    // The greeting never reaches the model, so no mock server is needed.
    let llm = LlmClient::new(LlmConfig::new("test-key")).unwrap();
    let agent = Agent::new(llm, "Answer briefly.", None, 4).await;
    let bot = VoiceBot::new(
        agent,
        broken_synthesizer().await,
        connected_session().await,
        "default",
        BOT_NAME,
    );

    bot.greet("Hi! Ask me anything.").await;

    let transcript = bot.transcript().await;
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].speaker, BOT_NAME);
    assert_eq!(transcript[0].text, "Hi! Ask me anything.");
}

#[tokio::test]
async fn failed_turn_keeps_only_the_user_line() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let bot = VoiceBot::new(
        agent_for(&server).await,
        broken_synthesizer().await,
        connected_session().await,
        "default",
        BOT_NAME,
    );

    bot.handle(&heard("bob", "Is anyone there?")).await;

    let transcript = bot.transcript().await;
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].speaker, "bob");
}

#[tokio::test]
async fn consecutive_turns_stay_ordered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(answer_response("Yes."))
        .mount(&server)
        .await;

    let bot = VoiceBot::new(
        agent_for(&server).await,
        broken_synthesizer().await,
        connected_session().await,
        "default",
        BOT_NAME,
    );

    bot.handle(&heard("alice", "First question?")).await;
    bot.handle(&heard("bob", "Second question?")).await;

    let transcript = bot.transcript().await;
    let speakers: Vec<String> = transcript.iter().map(|line| line.speaker.clone()).collect();
    assert_eq!(speakers, vec!["alice", BOT_NAME, "bob", BOT_NAME]);
}
