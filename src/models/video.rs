use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Video record stored in redb
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    /// Public URL under `/uploads`
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    /// Length in seconds, when ffprobe could read it
    pub duration: Option<f64>,
    /// Filled in after upload if transcription succeeds
    pub transcript: Option<String>,
    pub is_published: bool,
    pub uploader_id: u64,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewVideo {
    pub title: String,
    pub description: Option<String>,
    pub video_url: String,
    pub is_published: bool,
    pub uploader_id: u64,
    pub transcript: Option<String>,
    pub duration: Option<f64>,
}

/// Video model for API responses (the transcript stays server-side)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoResponse {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub duration: Option<f64>,
    pub is_published: bool,
    pub uploader_id: u64,
    pub created_at: DateTime<Utc>,
}

impl From<&Video> for VideoResponse {
    fn from(video: &Video) -> Self {
        Self {
            id: video.id,
            title: video.title.clone(),
            description: video.description.clone(),
            video_url: video.video_url.clone(),
            thumbnail_url: video.thumbnail_url.clone(),
            duration: video.duration,
            is_published: video.is_published,
            uploader_id: video.uploader_id,
            created_at: DateTime::from_timestamp(video.created_at, 0).unwrap_or_else(Utc::now),
        }
    }
}

impl Video {
    /// Transcript text available before `timestamp`, estimated from a fixed
    /// speaking rate
    pub fn transcript_until(transcript: &str, timestamp: f64, chars_per_second: f64) -> String {
        let limit = (timestamp.max(0.0) * chars_per_second) as usize;
        transcript.chars().take(limit).collect()
    }

    /// The last `count` characters of the transcript
    pub fn transcript_tail(transcript: &str, count: usize) -> String {
        let total = transcript.chars().count();
        transcript.chars().skip(total.saturating_sub(count)).collect()
    }
}
