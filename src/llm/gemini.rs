//! Minimal client for the Gemini REST API
//!
//! Covers `generateContent` (plain text and JSON response mode) and the Files
//! API used for transcription: resumable upload, state polling, deletion.

use std::path::Path;
use std::time::Duration;

use reqwest::{Client, Response};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use tokio::time::Instant;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM client is not configured")]
    Disabled,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gemini returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Gemini response contained no text")]
    EmptyResponse,

    #[error("Could not parse model output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Generated content rejected: {0}")]
    InvalidContent(String),

    #[error("Upload URL missing from Gemini response")]
    MissingUploadUrl,

    #[error("File processing failed: {0}")]
    FileFailed(String),

    #[error("File did not become active within {0} seconds")]
    FileTimeout(u64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type LlmResult<T> = std::result::Result<T, LlmError>;

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_data: Option<FileData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: RemoteFile,
}

/// Processing state of a file held by the Files API
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    Processing,
    Active,
    Failed,
    #[default]
    #[serde(other)]
    StateUnspecified,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileStatus {
    #[serde(default)]
    pub message: String,
}

/// A file uploaded to the Files API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    /// Resource name, e.g. `files/abc123`
    pub name: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub state: FileState,
    #[serde(default)]
    pub error: Option<FileStatus>,
}

/// How often and for how long to wait for an uploaded file to become active
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

// =============================================================================
// Client
// =============================================================================

#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
    /// Limit for requests that carry or read a whole video
    file_timeout: Duration,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("file_timeout", &self.file_timeout)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> LlmResult<Self> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            file_timeout: timeout,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Use `timeout` for file uploads and file-based completions instead of
    /// the client-wide prompt timeout
    pub fn with_file_timeout(mut self, timeout: Duration) -> Self {
        self.file_timeout = timeout;
        self
    }

    /// Plain-text completion for a single prompt
    pub async fn generate_text(&self, prompt: &str) -> LlmResult<String> {
        self.generate(vec![text_part(prompt)], false, None).await
    }

    /// Completion in JSON response mode, parsed into `T`
    pub async fn generate_json<T: DeserializeOwned>(&self, prompt: &str) -> LlmResult<T> {
        let text = self.generate(vec![text_part(prompt)], true, None).await?;
        Ok(serde_json::from_str(strip_code_fences(&text))?)
    }

    /// Completion over an uploaded file plus an instruction
    pub async fn generate_text_from_file(&self, file: &RemoteFile, prompt: &str) -> LlmResult<String> {
        let file_part = Part {
            text: None,
            file_data: Some(FileData {
                mime_type: file.mime_type.clone(),
                file_uri: file.uri.clone(),
            }),
        };
        self.generate(vec![file_part, text_part(prompt)], false, Some(self.file_timeout))
            .await
    }

    async fn generate(&self, parts: Vec<Part>, json: bool, timeout: Option<Duration>) -> LlmResult<String> {
        let request = GenerateContentRequest {
            contents: vec![Content { parts }],
            generation_config: json.then(|| GenerationConfig {
                response_mime_type: "application/json".to_string(),
            }),
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let mut builder = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let response = builder.send().await?;

        let body: GenerateContentResponse = check_status(response).await?.json().await?;

        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }

    /// Upload a local file with the resumable upload protocol
    pub async fn upload_file(&self, path: &Path, mime_type: &str) -> LlmResult<RemoteFile> {
        let bytes = tokio::fs::read(path).await?;
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let start = self
            .http
            .post(format!("{}/upload/v1beta/files", self.base_url))
            .header("x-goog-api-key", &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&serde_json::json!({ "file": { "display_name": display_name } }))
            .send()
            .await?;
        let start = check_status(start).await?;

        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(LlmError::MissingUploadUrl)?;

        let size = bytes.len();
        let finish = self
            .http
            .post(upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .timeout(self.file_timeout)
            .body(bytes)
            .send()
            .await?;
        let uploaded: UploadResponse = check_status(finish).await?.json().await?;

        tracing::info!("Uploaded {} bytes to Gemini as {}", size, uploaded.file.name);
        Ok(uploaded.file)
    }

    pub async fn get_file(&self, name: &str) -> LlmResult<RemoteFile> {
        let response = self
            .http
            .get(format!("{}/v1beta/{}", self.base_url, name))
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    pub async fn delete_file(&self, name: &str) -> LlmResult<()> {
        let response = self
            .http
            .delete(format!("{}/v1beta/{}", self.base_url, name))
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    /// Poll until the file is `ACTIVE`
    ///
    /// Fails on `FAILED` or when `poll.timeout` elapses; the caller owns
    /// deleting the remote file either way.
    pub async fn wait_until_active(&self, file: RemoteFile, poll: PollSettings) -> LlmResult<RemoteFile> {
        let deadline = Instant::now() + poll.timeout;
        let mut current = file;

        loop {
            match current.state {
                FileState::Active => return Ok(current),
                FileState::Failed => {
                    let message = current.error.map(|e| e.message).unwrap_or_default();
                    return Err(LlmError::FileFailed(message));
                }
                FileState::Processing | FileState::StateUnspecified => {}
            }

            if Instant::now() >= deadline {
                return Err(LlmError::FileTimeout(poll.timeout.as_secs()));
            }

            tokio::time::sleep(poll.interval).await;
            current = self.get_file(&current.name).await?;
        }
    }
}

fn text_part(text: &str) -> Part {
    Part {
        text: Some(text.to_string()),
        file_data: None,
    }
}

async fn check_status(response: Response) -> LlmResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    tracing::error!("Gemini API request failed ({}): {}", status, body);
    Err(LlmError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Models sometimes wrap JSON in a markdown fence despite JSON mode
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  plain  "), "plain");
    }

    #[test]
    fn test_file_state_parsing() {
        let file: RemoteFile = serde_json::from_str(
            r#"{"name":"files/abc","uri":"https://x/files/abc","mimeType":"video/mp4","state":"PROCESSING"}"#,
        )
        .unwrap();
        assert_eq!(file.state, FileState::Processing);
        assert_eq!(file.mime_type, "video/mp4");

        let unknown: RemoteFile =
            serde_json::from_str(r#"{"name":"files/abc","state":"SOMETHING_NEW"}"#).unwrap();
        assert_eq!(unknown.state, FileState::StateUnspecified);

        let bare: RemoteFile = serde_json::from_str(r#"{"name":"files/abc"}"#).unwrap();
        assert_eq!(bare.state, FileState::StateUnspecified);
    }

    #[test]
    fn test_request_shape() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![text_part("hi")],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
            }),
        };
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert!(json["contents"][0]["parts"][0].get("fileData").is_none());
        assert_eq!(
            json["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }
}
