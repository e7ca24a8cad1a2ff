use crosstalk_types::{VoiceModel, VoiceProfile};
use crosstalk_voice::{Synthesizer, VoiceError};

fn piper_profile(id: &str, model_path: &str, speed: f32) -> VoiceProfile {
    VoiceProfile {
        id: id.to_string(),
        name: format!("{id} voice"),
        model: VoiceModel::Piper,
        model_path: model_path.to_string(),
        config_path: None,
        speed,
        speaker_id: None,
    }
}

#[tokio::test]
async fn profile_registry_round_trip() {
    let synthesizer = Synthesizer::new("assets/voices", "piper");

    let profile = piper_profile("narrator", "narrator.onnx", 1.0);
    synthesizer.add_profile(profile.clone()).await;

    assert_eq!(synthesizer.get_profile("narrator").await, Some(profile));
    assert_eq!(synthesizer.get_profile("missing").await, None);
}

#[tokio::test]
async fn re_registering_a_profile_replaces_it() {
    let synthesizer = Synthesizer::new("assets/voices", "piper");

    synthesizer
        .add_profile(piper_profile("narrator", "old.onnx", 1.0))
        .await;
    synthesizer
        .add_profile(piper_profile("narrator", "new.onnx", 1.5))
        .await;

    let profile = synthesizer.get_profile("narrator").await.unwrap();
    assert_eq!(profile.model_path, "new.onnx");
    assert_eq!(profile.speed, 1.5);
}

#[tokio::test]
async fn unknown_profile_is_reported() {
    let synthesizer = Synthesizer::new("assets/voices", "piper");

    let result = synthesizer.synthesize("Hello", "non-existent").await;
    match result {
        Err(VoiceError::ProfileNotFound(id)) => assert_eq!(id, "non-existent"),
        other => panic!("expected ProfileNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_model_file_is_reported() {
    let temp_dir = tempfile::tempdir().unwrap();
    let synthesizer = Synthesizer::new(temp_dir.path(), "piper");

    synthesizer
        .add_profile(piper_profile("ghost", "missing.onnx", 1.0))
        .await;

    let result = synthesizer.synthesize("Hello", "ghost").await;
    match result {
        Err(VoiceError::Synthesis(msg)) => {
            assert!(msg.contains("model file not found"), "got: {msg}")
        }
        other => panic!("expected Synthesis error, got {other:?}"),
    }
}

#[tokio::test]
async fn out_of_range_speed_is_rejected() {
    let temp_dir = tempfile::tempdir().unwrap();
    // A dummy model file so the existence check passes.
    std::fs::File::create(temp_dir.path().join("test.onnx")).unwrap();

    let synthesizer = Synthesizer::new(temp_dir.path(), "piper");

    for speed in [0.0, 0.001, 100.0] {
        let id = format!("speed-{speed}");
        synthesizer
            .add_profile(piper_profile(&id, "test.onnx", speed))
            .await;

        let result = synthesizer.synthesize("Hello", &id).await;
        match result {
            Err(VoiceError::Config(msg)) => {
                assert!(msg.contains("between 0.1 and 10.0"), "got: {msg}")
            }
            other => panic!("expected Config error for speed {speed}, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn oversized_text_is_rejected_before_profile_lookup() {
    let synthesizer = Synthesizer::new("assets/voices", "piper");

    let text = "a".repeat(64 * 1024 + 1);
    let result = synthesizer.synthesize(&text, "unregistered").await;
    match result {
        Err(VoiceError::Synthesis(msg)) => {
            assert!(msg.contains("maximum size"), "got: {msg}")
        }
        other => panic!("expected size error, got {other:?}"),
    }
}
