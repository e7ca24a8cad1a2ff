use crate::error::VoiceError;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Maximum audio input size (10 MiB). Oversized payloads are rejected before
/// the subprocess is spawned.
const MAX_AUDIO_INPUT_BYTES: usize = 10 * 1024 * 1024;

/// Timeout for one transcription run.
const TRANSCRIBE_TIMEOUT: Duration = Duration::from_secs(120);

/// Speech-to-text over a whisper.cpp style subprocess.
///
/// The binary is expected to take `-m <model>` and `-f -` (read audio from
/// stdin) and print the transcript to stdout.
#[derive(Debug, Clone)]
pub struct Transcriber {
    model_path: PathBuf,
    binary_path: PathBuf,
}

impl Transcriber {
    pub fn new(model_path: impl Into<PathBuf>, binary_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            binary_path: binary_path.into(),
        }
    }

    pub async fn transcribe(&self, audio: &[u8]) -> Result<String, VoiceError> {
        if audio.len() > MAX_AUDIO_INPUT_BYTES {
            return Err(VoiceError::Transcription(format!(
                "audio exceeds maximum size: {} bytes (limit: {} bytes)",
                audio.len(),
                MAX_AUDIO_INPUT_BYTES
            )));
        }

        let mut command = Command::new(&self.binary_path);
        command
            .arg("-m")
            .arg(&self.model_path)
            .arg("-f")
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .map_err(|e| VoiceError::Transcription(format!("failed to spawn STT binary: {e}")))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| VoiceError::Transcription("failed to open stdin".to_string()))?;

        // Feed stdin from its own task so a full stdout pipe cannot deadlock
        // the child against us.
        let audio = audio.to_vec();
        let write_task = tokio::spawn(async move {
            let result = stdin.write_all(&audio).await;
            drop(stdin);
            result
        });

        let output = tokio::time::timeout(TRANSCRIBE_TIMEOUT, child.wait_with_output())
            .await
            .map_err(|_| {
                VoiceError::Transcription(format!(
                    "STT process timed out after {} seconds",
                    TRANSCRIBE_TIMEOUT.as_secs()
                ))
            })?
            .map_err(|e| VoiceError::Transcription(format!("failed to collect output: {e}")))?;

        match write_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(VoiceError::Transcription(format!(
                    "failed to write audio to stdin: {e}"
                )))
            }
            Err(e) => {
                return Err(VoiceError::Transcription(format!("stdin task failed: {e}")));
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VoiceError::Transcription(format!(
                "STT binary failed: {stderr}"
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
