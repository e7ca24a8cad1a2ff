use crate::error::VoiceError;
use crosstalk_types::{VoiceModel, VoiceProfile};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::RwLock;

/// Maximum text input size (64 KiB). Synthesis requests above this are
/// rejected up front.
const MAX_TEXT_INPUT_BYTES: usize = 64 * 1024;

/// Timeout for one synthesis run.
const SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(60);

/// Size of the WAV header espeak-ng writes before PCM samples.
const WAV_HEADER_BYTES: usize = 44;

/// Text-to-speech over local subprocesses, keyed by voice profile.
///
/// Piper profiles run the configured piper binary with an ONNX model from
/// `voices_dir`; `VoiceModel::System` profiles fall back to `espeak-ng`.
/// Output is raw PCM (s16le, sample rate per model).
#[derive(Debug, Clone)]
pub struct Synthesizer {
    profiles: Arc<RwLock<HashMap<String, VoiceProfile>>>,
    voices_dir: PathBuf,
    piper_binary: PathBuf,
}

impl Synthesizer {
    pub fn new(voices_dir: impl AsRef<Path>, piper_binary: impl AsRef<Path>) -> Self {
        Self {
            profiles: Arc::new(RwLock::new(HashMap::new())),
            voices_dir: voices_dir.as_ref().to_path_buf(),
            piper_binary: piper_binary.as_ref().to_path_buf(),
        }
    }

    /// Registers a voice profile, replacing any existing profile with the
    /// same id.
    pub async fn add_profile(&self, profile: VoiceProfile) {
        self.profiles
            .write()
            .await
            .insert(profile.id.clone(), profile);
    }

    pub async fn get_profile(&self, id: &str) -> Option<VoiceProfile> {
        self.profiles.read().await.get(id).cloned()
    }

    /// Renders `text` as raw PCM audio with the given profile's voice.
    pub async fn synthesize(&self, text: &str, profile_id: &str) -> Result<Vec<u8>, VoiceError> {
        if text.len() > MAX_TEXT_INPUT_BYTES {
            return Err(VoiceError::Synthesis(format!(
                "text exceeds maximum size: {} bytes (limit: {} bytes)",
                text.len(),
                MAX_TEXT_INPUT_BYTES
            )));
        }

        let profile = self
            .get_profile(profile_id)
            .await
            .ok_or_else(|| VoiceError::ProfileNotFound(profile_id.to_string()))?;

        match profile.model {
            VoiceModel::Piper => self.synthesize_piper(text, &profile).await,
            VoiceModel::System => self.synthesize_system(text).await,
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        if Path::new(path).is_absolute() {
            PathBuf::from(path)
        } else {
            self.voices_dir.join(path)
        }
    }

    async fn synthesize_piper(
        &self,
        text: &str,
        profile: &VoiceProfile,
    ) -> Result<Vec<u8>, VoiceError> {
        let model_path = self.resolve(&profile.model_path);
        if !model_path.exists() {
            return Err(VoiceError::Synthesis(format!(
                "model file not found: {}",
                model_path.display()
            )));
        }

        if !(0.1..=10.0).contains(&profile.speed) {
            return Err(VoiceError::Config(
                "speed must be between 0.1 and 10.0".to_string(),
            ));
        }

        let mut command = Command::new(&self.piper_binary);
        command
            .arg("--model")
            .arg(model_path)
            .arg("--output_raw")
            // Piper's length scale is the inverse of speed: 2.0x speed
            // means a 0.5 length scale.
            .arg("--length_scale")
            .arg((1.0 / profile.speed).to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(config) = &profile.config_path {
            command.arg("--config").arg(self.resolve(config));
        }
        if let Some(speaker) = profile.speaker_id {
            command.arg("--speaker").arg(speaker.to_string());
        }

        let mut child = command
            .spawn()
            .map_err(|e| VoiceError::Synthesis(format!("failed to spawn piper: {e}")))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| VoiceError::Synthesis("failed to open stdin".to_string()))?;

        // Feed stdin from its own task so a full stdout pipe cannot deadlock
        // the child against us.
        let text = text.to_string();
        let write_task = tokio::spawn(async move {
            let result = stdin.write_all(text.as_bytes()).await;
            drop(stdin);
            result
        });

        let output = tokio::time::timeout(SYNTHESIS_TIMEOUT, child.wait_with_output())
            .await
            .map_err(|_| {
                VoiceError::Synthesis(format!(
                    "TTS process timed out after {} seconds",
                    SYNTHESIS_TIMEOUT.as_secs()
                ))
            })?
            .map_err(|e| VoiceError::Synthesis(format!("failed to wait for piper: {e}")))?;

        match write_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(VoiceError::Synthesis(format!(
                    "failed to write text to piper stdin: {e}"
                )))
            }
            Err(e) => return Err(VoiceError::Synthesis(format!("stdin task failed: {e}"))),
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VoiceError::Synthesis(format!("piper failed: {stderr}")));
        }

        Ok(output.stdout)
    }

    /// Falls back to the OS speech engine. espeak-ng writes WAV to stdout
    /// with `--stdout`; the header is stripped so callers always get raw PCM.
    async fn synthesize_system(&self, text: &str) -> Result<Vec<u8>, VoiceError> {
        let mut command = Command::new("espeak-ng");
        command
            .arg("--stdout")
            .arg(text)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = command
            .spawn()
            .map_err(|e| VoiceError::Synthesis(format!("failed to spawn espeak-ng: {e}")))?;

        let output = tokio::time::timeout(SYNTHESIS_TIMEOUT, child.wait_with_output())
            .await
            .map_err(|_| {
                VoiceError::Synthesis(format!(
                    "system TTS timed out after {} seconds",
                    SYNTHESIS_TIMEOUT.as_secs()
                ))
            })?
            .map_err(|e| VoiceError::Synthesis(format!("failed to wait for espeak-ng: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VoiceError::Synthesis(format!("espeak-ng failed: {stderr}")));
        }

        let wav = output.stdout;
        if wav.len() > WAV_HEADER_BYTES {
            Ok(wav[WAV_HEADER_BYTES..].to_vec())
        } else {
            Ok(wav)
        }
    }
}
