use std::path::Path;

use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, Path as UrlPath, State},
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::AppState;
use crate::constants::{DEFAULT_RETRY_LIMIT, DEFAULT_REWIND_SECONDS};
use crate::db;
use crate::error::{AppError, Result};
use crate::media::{self, StoredFile, probe_duration};
use crate::models::{NewQuestion, NewVideo, QuestionResponse, QuestionType, VideoResponse};
use crate::security::AdminUser;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub video_id: u64,
    pub status: &'static str,
}

/// Fields collected from the upload form
#[derive(Default)]
struct UploadForm {
    title: Option<String>,
    description: Option<String>,
    question_timestamps: Option<String>,
    file_name: Option<String>,
    file: Option<Bytes>,
}

/// List published videos
pub async fn list_videos(State(state): State<AppState>) -> Result<Json<Vec<VideoResponse>>> {
    let db = state.db.clone();
    let videos = tokio::task::spawn_blocking(move || db::videos::list_published(&db)).await??;

    Ok(Json(videos.iter().map(VideoResponse::from).collect()))
}

pub async fn get_video(
    State(state): State<AppState>,
    UrlPath(video_id): UrlPath<u64>,
) -> Result<Json<VideoResponse>> {
    let db = state.db.clone();
    let video = tokio::task::spawn_blocking(move || db::videos::get(&db, video_id))
        .await??
        .ok_or(AppError::VideoNotFound)?;

    Ok(Json(VideoResponse::from(&video)))
}

/// Questions for a video in playback order, without answers
pub async fn list_questions(
    State(state): State<AppState>,
    UrlPath(video_id): UrlPath<u64>,
) -> Result<Json<Vec<QuestionResponse>>> {
    let db = state.db.clone();
    let questions = tokio::task::spawn_blocking(move || {
        if db::videos::get(&db, video_id)?.is_none() {
            return Err(AppError::VideoNotFound);
        }
        db::questions::list_for_video(&db, video_id)
    })
    .await??;

    Ok(Json(questions.iter().map(QuestionResponse::from).collect()))
}

/// Upload a lecture video and generate its quiz
///
/// Transcription, duration probing and question generation all degrade to
/// fallbacks, so once the file is stored the upload succeeds. That work runs
/// on a spawned task: a client that disconnects mid-upload still gets its
/// video and quiz created, and the video only appears together with them.
pub async fn upload_video(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let form = read_upload_form(&mut multipart).await?;

    let title = form
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::InvalidInput("title is required".to_string()))?;
    let file = form
        .file
        .ok_or_else(|| AppError::InvalidInput("video_file is required".to_string()))?;
    if file.len() > state.config.max_upload_bytes {
        return Err(AppError::PayloadTooLarge);
    }

    let timestamps = form
        .question_timestamps
        .as_deref()
        .map(parse_question_timestamps)
        .unwrap_or_default();

    let upload_dir = Path::new(&state.config.upload_dir);
    let original_name = form.file_name.as_deref().unwrap_or("video.mp4");
    let stored = media::store_video(upload_dir, original_name, &file).await?;

    let new_video = NewVideo {
        title,
        description: form.description.filter(|d| !d.trim().is_empty()),
        video_url: stored.url.clone(),
        is_published: true,
        uploader_id: admin.id,
        transcript: None,
        duration: None,
    };
    let video_id = tokio::spawn(process_upload(state, new_video, timestamps, stored)).await??;
    tracing::info!("Admin {} uploaded video {}", admin.id, video_id);

    Ok(Json(UploadResponse {
        video_id,
        status: "success",
    }))
}

/// Transcribe and probe a stored upload, build its quiz, then create the
/// video with its questions
async fn process_upload(
    state: AppState,
    mut new_video: NewVideo,
    timestamps: Vec<f64>,
    stored: StoredFile,
) -> Result<u64> {
    let transcript = match state.transcriber.transcribe(&stored.path).await {
        Ok(transcript) => Some(transcript),
        Err(e) => {
            tracing::warn!("Transcription of {} failed: {}", stored.url, e);
            None
        }
    };

    let duration = match probe_duration(&state.config.ffprobe_command, &stored.path).await {
        Ok(duration) => duration,
        Err(e) => {
            tracing::warn!("Could not read duration of {}: {}", stored.url, e);
            0.0
        }
    };

    let mut questions: Vec<NewQuestion> = Vec::with_capacity(timestamps.len() + 1);
    for timestamp in timestamps {
        let generated = state
            .tutor
            .timestamp_question(transcript.as_deref(), timestamp)
            .await;
        questions.push(generated.into_new_question(
            timestamp,
            QuestionType::Mcq,
            DEFAULT_RETRY_LIMIT,
            DEFAULT_REWIND_SECONDS,
            false,
        ));
    }

    let final_question = state.tutor.final_question(transcript.as_deref(), duration).await;
    questions.push(final_question.into_new_question(
        duration,
        QuestionType::Mcq,
        DEFAULT_RETRY_LIMIT,
        DEFAULT_REWIND_SECONDS,
        true,
    ));

    new_video.transcript = transcript;
    new_video.duration = Some(duration);

    let db = state.db.clone();
    let created = tokio::task::spawn_blocking(move || {
        db::videos::create_with_questions(&db, new_video, questions)
    })
    .await?;

    match created {
        Ok((video, questions)) => {
            tracing::info!(
                "Created video {} ({}) with {} questions",
                video.id,
                video.title,
                questions.len()
            );
            Ok(video.id)
        }
        Err(e) => {
            // Nothing references the file without its video row
            if let Err(remove_err) =
                media::remove_by_url(Path::new(&state.config.upload_dir), &stored.url).await
            {
                tracing::error!("Failed to remove orphaned upload {}: {}", stored.url, remove_err);
            }
            Err(e)
        }
    }
}

/// Delete a video, its questions, every learner's progress on it and its media file
pub async fn delete_video(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    UrlPath(video_id): UrlPath<u64>,
) -> Result<Json<Value>> {
    let db = state.db.clone();
    let video = tokio::task::spawn_blocking(move || db::videos::delete(&db, video_id)).await??;

    if let Err(e) = media::remove_by_url(Path::new(&state.config.upload_dir), &video.video_url).await
    {
        tracing::error!("Failed to delete media for video {}: {}", video_id, e);
    }

    tracing::info!("Admin {} deleted video {}", admin.id, video_id);
    Ok(Json(json!({
        "status": "success",
        "message": "Video deleted successfully",
    })))
}

async fn read_upload_form(multipart: &mut Multipart) -> Result<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("title") => form.title = Some(field.text().await?),
            Some("description") => form.description = Some(field.text().await?),
            Some("question_timestamps") => form.question_timestamps = Some(field.text().await?),
            Some("video_file") => {
                form.file_name = field.file_name().map(str::to_string);
                form.file = Some(field.bytes().await?);
            }
            other => tracing::debug!("Ignoring unexpected upload field {:?}", other),
        }
    }

    Ok(form)
}

/// Parse the `question_timestamps` form field
///
/// A JSON number becomes a one-element list and a JSON array keeps its finite,
/// non-negative numbers. Anything else, including invalid JSON, yields no
/// timestamps.
pub fn parse_question_timestamps(raw: &str) -> Vec<f64> {
    let valid = |v: &Value| v.as_f64().filter(|t| t.is_finite() && *t >= 0.0);

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items.iter().filter_map(valid).collect(),
        Ok(value @ Value::Number(_)) => valid(&value).into_iter().collect(),
        Ok(_) => Vec::new(),
        Err(e) => {
            tracing::warn!("Unparseable question_timestamps {:?}: {}", raw, e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_number() {
        assert_eq!(parse_question_timestamps("45"), vec![45.0]);
        assert_eq!(parse_question_timestamps("12.5"), vec![12.5]);
    }

    #[test]
    fn test_parse_array_keeps_valid_numbers() {
        assert_eq!(
            parse_question_timestamps("[10, 20.5, \"30\", -4, null, 60]"),
            vec![10.0, 20.5, 60.0]
        );
        assert!(parse_question_timestamps("[]").is_empty());
    }

    #[test]
    fn test_parse_anything_else_is_empty() {
        assert!(parse_question_timestamps("{\"t\": 10}").is_empty());
        assert!(parse_question_timestamps("\"10\"").is_empty());
        assert!(parse_question_timestamps("-3").is_empty());
        assert!(parse_question_timestamps("not json").is_empty());
        assert!(parse_question_timestamps("").is_empty());
    }
}
