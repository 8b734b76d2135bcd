use std::env;

use crate::constants::{
    DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL,
    DEFAULT_LLM_TIMEOUT_SECS, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_TRANSCRIPTION_TIMEOUT_SECS,
};

/// Which tool turns an uploaded video into a transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriberKind {
    /// Local Whisper CLI
    Whisper,
    /// Gemini Files API upload followed by a transcription prompt
    Gemini,
    /// Skip transcription; uploads always get fallback questions
    Disabled,
}

impl TranscriberKind {
    fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "whisper" => Ok(Self::Whisper),
            "gemini" => Ok(Self::Gemini),
            "none" | "disabled" | "off" => Ok(Self::Disabled),
            other => Err(format!("Invalid TRANSCRIBER: {}", other)),
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_path: String,
    pub allowed_origins: Vec<String>,
    pub environment: String,
    pub jwt_secret_key: String,
    pub access_token_expire_minutes: i64,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub llm_timeout_secs: u64,
    pub transcription_timeout_secs: u64,
    pub upload_dir: String,
    pub max_upload_bytes: usize,
    pub transcriber: TranscriberKind,
    pub whisper_command: String,
    pub whisper_model: String,
    pub ffprobe_command: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists (development)
        dotenvy::dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|_| "Invalid SERVER_PORT")?;

        let database_path =
            env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/tubetutor.db".to_string());

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let jwt_secret_key = env::var("JWT_SECRET_KEY")
            .map_err(|_| "JWT_SECRET_KEY must be set for signing access tokens")?;

        let access_token_expire_minutes = env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
            .unwrap_or_else(|_| DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES.to_string())
            .parse()
            .map_err(|_| "Invalid ACCESS_TOKEN_EXPIRE_MINUTES")?;

        let gemini_api_key = env::var("GEMINI_API_KEY")
            .ok()
            .and_then(|key| clean_api_key(&key));

        let gemini_model =
            env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string());

        let gemini_base_url = env::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let llm_timeout_secs = env::var("LLM_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_LLM_TIMEOUT_SECS.to_string())
            .parse()
            .map_err(|_| "Invalid LLM_TIMEOUT_SECS")?;

        let transcription_timeout_secs = env::var("TRANSCRIPTION_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_TRANSCRIPTION_TIMEOUT_SECS.to_string())
            .parse()
            .map_err(|_| "Invalid TRANSCRIPTION_TIMEOUT_SECS")?;

        let upload_dir = env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string());

        let max_upload_bytes = env::var("MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| DEFAULT_MAX_UPLOAD_BYTES.to_string())
            .parse()
            .map_err(|_| "Invalid MAX_UPLOAD_BYTES")?;

        let transcriber =
            TranscriberKind::parse(&env::var("TRANSCRIBER").unwrap_or_else(|_| "whisper".into()))?;

        let whisper_command = env::var("WHISPER_COMMAND").unwrap_or_else(|_| "whisper".to_string());
        let whisper_model = env::var("WHISPER_MODEL").unwrap_or_else(|_| "base".to_string());
        let ffprobe_command = env::var("FFPROBE_COMMAND").unwrap_or_else(|_| "ffprobe".to_string());

        Ok(Config {
            server_host,
            server_port,
            database_path,
            allowed_origins,
            environment,
            jwt_secret_key,
            access_token_expire_minutes,
            gemini_api_key,
            gemini_model,
            gemini_base_url,
            llm_timeout_secs,
            transcription_timeout_secs,
            upload_dir,
            max_upload_bytes,
            transcriber,
            whisper_command,
            whisper_model,
            ffprobe_command,
        })
    }

    /// Get server address as string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

/// Strip whitespace and surrounding quotes that often sneak into `.env` values.
/// Returns `None` when nothing usable is left.
pub fn clean_api_key(raw: &str) -> Option<String> {
    let cleaned = raw.trim().trim_matches('"').trim_matches('\'').trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_api_key() {
        assert_eq!(clean_api_key("  abc123 "), Some("abc123".to_string()));
        assert_eq!(clean_api_key("\"abc123\""), Some("abc123".to_string()));
        assert_eq!(clean_api_key("'abc123'"), Some("abc123".to_string()));
        assert_eq!(clean_api_key("\"\""), None);
        assert_eq!(clean_api_key("   "), None);
    }

    #[test]
    fn test_transcriber_kind_parse() {
        assert_eq!(TranscriberKind::parse("Whisper"), Ok(TranscriberKind::Whisper));
        assert_eq!(TranscriberKind::parse("gemini"), Ok(TranscriberKind::Gemini));
        assert_eq!(TranscriberKind::parse(" none "), Ok(TranscriberKind::Disabled));
        assert!(TranscriberKind::parse("vosk").is_err());
    }
}
