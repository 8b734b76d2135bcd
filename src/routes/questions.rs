use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::constants::{ALREADY_COMPLETED, ERR_INVALID_TIMESTAMP};
use crate::db;
use crate::error::{AppError, Result};
use crate::models::{AnswerOutcome, Progress};
use crate::security::CurrentUser;

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub answer: String,
    /// Player position when the answer was submitted
    pub current_timestamp: f64,
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub correct: bool,
    pub explanation: String,
    pub rewind_seconds: f64,
    pub retries_left: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl AnswerResponse {
    fn already_completed() -> Self {
        Self {
            correct: true,
            explanation: ALREADY_COMPLETED.to_string(),
            rewind_seconds: 0.0,
            retries_left: 0,
            summary: None,
        }
    }
}

/// Grade an answer and advance the caller's progress on the question's video
///
/// A wrong answer that uses up the question's last attempt tells the player
/// to rewind and carries a recap of the transcript.
pub async fn submit_answer(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(question_id): Path<u64>,
    Json(payload): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>> {
    if !Progress::is_valid_timestamp(payload.current_timestamp) {
        return Err(AppError::InvalidInput(ERR_INVALID_TIMESTAMP.to_string()));
    }

    let db = state.db.clone();
    let user_id = user.id;
    let (question, progress) = tokio::task::spawn_blocking(move || {
        let question = db::questions::get(&db, question_id)?.ok_or(AppError::QuestionNotFound)?;
        let progress = db::progress::get_or_create(&db, user_id, question.video_id)?;
        Ok::<_, AppError>((question, progress))
    })
    .await??;

    if progress.is_question_completed(question_id) {
        return Ok(Json(AnswerResponse::already_completed()));
    }

    let grade = state
        .tutor
        .grade_answer(&question.question_text, &payload.answer, &question.correct_answer)
        .await;

    let db = state.db.clone();
    let video_id = question.video_id;
    let retry_limit = question.retry_limit;
    let correct = grade.correct;
    let current_timestamp = payload.current_timestamp;
    let (_, outcome) = tokio::task::spawn_blocking(move || {
        let video_question_ids = db::questions::ids_for_video(&db, video_id)?;
        db::progress::update(&db, user_id, video_id, |progress| {
            let outcome = progress.record_answer(
                question_id,
                retry_limit,
                correct,
                current_timestamp,
                Utc::now().timestamp(),
            );
            progress.refresh_completion(&video_question_ids);
            outcome
        })
    })
    .await??;

    tracing::debug!(
        "User {} answered question {}: {:?}",
        user_id,
        question_id,
        outcome
    );

    let response = match outcome {
        // Completed by a concurrent request between the check and the write
        AnswerOutcome::AlreadyCompleted => AnswerResponse::already_completed(),
        AnswerOutcome::Correct { retries_left } => AnswerResponse {
            correct: true,
            explanation: grade.explanation,
            rewind_seconds: 0.0,
            retries_left,
            summary: None,
        },
        AnswerOutcome::Retry { retries_left } => AnswerResponse {
            correct: false,
            explanation: grade.explanation,
            rewind_seconds: 0.0,
            retries_left,
            summary: None,
        },
        AnswerOutcome::Exhausted => {
            let db = state.db.clone();
            let transcript = tokio::task::spawn_blocking(move || db::videos::get(&db, video_id))
                .await??
                .and_then(|video| video.transcript)
                .unwrap_or_default();

            let summary = state
                .tutor
                .summarize(&transcript, &question.question_text)
                .await;

            tracing::info!(
                "User {} exhausted retries on question {}, rewinding {}s",
                user_id,
                question_id,
                question.rewind_seconds
            );
            AnswerResponse {
                correct: false,
                explanation: grade.explanation,
                rewind_seconds: question.rewind_seconds,
                retries_left: 0,
                summary: Some(summary),
            }
        }
    };

    Ok(Json(response))
}
