use std::path::Path;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;

use super::guess_mime_type;
use crate::config::{Config, TranscriberKind};
use crate::constants::{FILE_POLL_INTERVAL_SECS, FILE_POLL_TIMEOUT_SECS};
use crate::llm::{GeminiClient, LlmError, PollSettings, Tutor, prompts::TRANSCRIPTION_PROMPT};

/// Failure of an external media tool (Whisper, ffprobe, Gemini Files API)
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("{command} exited unsuccessfully: {stderr}")]
    Failed { command: String, stderr: String },

    #[error("unexpected tool output: {0:?}")]
    Unparseable(String),

    #[error("transcript was empty")]
    EmptyTranscript,

    #[error("transcription is disabled")]
    Disabled,

    #[error("Gemini transcription failed: {0}")]
    Llm(#[from] LlmError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns an uploaded video into transcript text
#[derive(Debug, Clone)]
pub enum Transcriber {
    /// Shell out to the Whisper CLI
    Whisper { command: String, model: String },
    /// Upload to the Gemini Files API and ask for a transcript
    Gemini {
        client: GeminiClient,
        poll: PollSettings,
    },
    Disabled,
}

impl Transcriber {
    pub fn from_config(config: &Config, tutor: &Tutor) -> Self {
        match config.transcriber {
            TranscriberKind::Whisper => Self::Whisper {
                command: config.whisper_command.clone(),
                model: config.whisper_model.clone(),
            },
            TranscriberKind::Gemini => match tutor.client() {
                Some(client) => Self::Gemini {
                    client: client.clone(),
                    poll: PollSettings {
                        interval: Duration::from_secs(FILE_POLL_INTERVAL_SECS),
                        timeout: Duration::from_secs(FILE_POLL_TIMEOUT_SECS),
                    },
                },
                None => {
                    tracing::warn!("TRANSCRIBER=gemini needs GEMINI_API_KEY; transcription disabled");
                    Self::Disabled
                }
            },
            TranscriberKind::Disabled => Self::Disabled,
        }
    }

    pub async fn transcribe(&self, path: &Path) -> Result<String, MediaError> {
        let transcript = match self {
            Self::Whisper { command, model } => whisper(command, model, path).await?,
            Self::Gemini { client, poll } => gemini(client, *poll, path).await?,
            Self::Disabled => return Err(MediaError::Disabled),
        };

        let transcript = transcript.trim().to_string();
        if transcript.is_empty() {
            return Err(MediaError::EmptyTranscript);
        }
        Ok(transcript)
    }
}

async fn whisper(command: &str, model: &str, path: &Path) -> Result<String, MediaError> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    // Removed when dropped, including when the transcription is cancelled
    let out_dir = tempfile::Builder::new()
        .prefix(&format!("tubetutor-whisper-{}-", stem))
        .tempdir()?;

    tracing::info!("Transcribing {} with {}", path.display(), command);
    let output = Command::new(command)
        .arg(path)
        .args(["--model", model, "--output_format", "txt", "--output_dir"])
        .arg(out_dir.path())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| MediaError::Spawn {
            command: command.to_string(),
            source: e,
        })?;

    if !output.status.success() {
        return Err(MediaError::Failed {
            command: command.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    // Whisper names its output after the input's stem
    let transcript = tokio::fs::read_to_string(out_dir.path().join(format!("{}.txt", stem))).await?;

    if let Err(e) = out_dir.close() {
        tracing::warn!("Failed to clean up Whisper output: {}", e);
    }
    Ok(transcript)
}

async fn gemini(client: &GeminiClient, poll: PollSettings, path: &Path) -> Result<String, MediaError> {
    let file = client.upload_file(path, guess_mime_type(path)).await?;
    let upload = RemoteUpload {
        client: client.clone(),
        name: Some(file.name.clone()),
    };

    tracing::info!("Waiting for Gemini file {} to become active", file.name);
    let result = match client.wait_until_active(file, poll).await {
        Ok(active) => client.generate_text_from_file(&active, TRANSCRIPTION_PROMPT).await,
        Err(e) => Err(e),
    };

    upload.delete().await;
    Ok(result?)
}

/// A file on the Gemini Files API that this process owns
///
/// Dropping it without calling [`RemoteUpload::delete`] schedules the delete
/// on the runtime instead.
struct RemoteUpload {
    client: GeminiClient,
    name: Option<String>,
}

impl RemoteUpload {
    async fn delete(mut self) {
        if let Some(name) = self.name.take() {
            delete_remote(&self.client, &name).await;
        }
    }
}

impl Drop for RemoteUpload {
    fn drop(&mut self) {
        let Some(name) = self.name.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::info!("Transcription cancelled, deleting Gemini file {}", name);
                let client = self.client.clone();
                handle.spawn(async move { delete_remote(&client, &name).await });
            }
            Err(_) => tracing::warn!("No runtime to delete Gemini file {}", name),
        }
    }
}

async fn delete_remote(client: &GeminiClient, name: &str) {
    if let Err(e) = client.delete_file(name).await {
        tracing::warn!("Failed to delete Gemini file {}: {}", name, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_transcriber() {
        let result = Transcriber::Disabled.transcribe(Path::new("a.mp4")).await;
        assert!(matches!(result, Err(MediaError::Disabled)));
    }

    #[tokio::test]
    async fn test_missing_whisper_binary() {
        let transcriber = Transcriber::Whisper {
            command: "definitely-not-whisper-9c1e".to_string(),
            model: "base".to_string(),
        };
        let result = transcriber.transcribe(Path::new("a.mp4")).await;
        assert!(matches!(result, Err(MediaError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancelled_whisper_leaves_nothing_behind() {
        let dir = tempfile::TempDir::new().unwrap();
        let stem = format!("lecture-{}", uuid::Uuid::new_v4());
        let video = dir.path().join(format!("{}.mp4", stem));
        let marker = dir.path().join("finished");

        // `sh <video> ...` runs the "video" as a script standing in for Whisper
        std::fs::write(
            &video,
            format!("sleep 1\ntouch '{}'\n", marker.display()),
        )
        .unwrap();

        let transcriber = Transcriber::Whisper {
            command: "sh".to_string(),
            model: "base".to_string(),
        };
        let result =
            tokio::time::timeout(Duration::from_millis(300), transcriber.transcribe(&video)).await;
        assert!(result.is_err());

        let prefix = format!("tubetutor-whisper-{}-", stem);
        let leftovers: Vec<_> = std::fs::read_dir(std::env::temp_dir())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(&prefix))
            .collect();
        assert!(leftovers.is_empty());

        // A killed child never reaches the line after its sleep
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists());
    }
}
