use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable};

use super::{decode, encode, next_id, questions, tables};
use crate::error::{AppError, Result};
use crate::models::{NewQuestion, NewVideo, Question, Video};

/// Create a video and its questions in one transaction
///
/// A video is never visible without its quiz.
pub fn create_with_questions(
    db: &Database,
    new_video: NewVideo,
    new_questions: Vec<NewQuestion>,
) -> Result<(Video, Vec<Question>)> {
    let write_txn = db.begin_write()?;
    let (video, questions) = {
        let video = Video {
            id: next_id(&write_txn, "videos")?,
            title: new_video.title,
            description: new_video.description,
            video_url: new_video.video_url,
            thumbnail_url: None,
            duration: new_video.duration,
            transcript: new_video.transcript,
            is_published: new_video.is_published,
            uploader_id: new_video.uploader_id,
            created_at: Utc::now().timestamp(),
        };

        let mut videos = write_txn.open_table(tables::VIDEOS)?;
        videos.insert(video.id, encode(&video)?.as_slice())?;
        drop(videos);

        let questions = questions::insert_in(&write_txn, video.id, new_questions)?;
        (video, questions)
    };
    write_txn.commit()?;

    tracing::info!("Stored video {} with {} questions", video.id, questions.len());
    Ok((video, questions))
}

pub fn get(db: &Database, id: u64) -> Result<Option<Video>> {
    let read_txn = db.begin_read()?;
    let videos = read_txn.open_table(tables::VIDEOS)?;

    videos.get(id)?.map(|bytes| decode(bytes.value())).transpose()
}

/// Published videos ordered by id
pub fn list_published(db: &Database) -> Result<Vec<Video>> {
    let read_txn = db.begin_read()?;
    let videos = read_txn.open_table(tables::VIDEOS)?;

    let mut result = Vec::new();
    for entry in videos.iter()? {
        let (_, bytes) = entry?;
        let video: Video = decode(bytes.value())?;
        if video.is_published {
            result.push(video);
        }
    }
    Ok(result)
}

/// Delete a video with its questions and every learner's progress on it
///
/// Returns the deleted row so the caller can clean up the media file.
pub fn delete(db: &Database, id: u64) -> Result<Video> {
    let write_txn = db.begin_write()?;
    let (video, question_count, progress_count) = {
        let mut videos = write_txn.open_table(tables::VIDEOS)?;
        let video: Video = videos
            .get(id)?
            .map(|bytes| decode(bytes.value()))
            .transpose()?
            .ok_or(AppError::VideoNotFound)?;
        videos.remove(id)?;

        // Cascade questions through the video index
        let mut index = write_txn.open_table(tables::VIDEO_QUESTIONS)?;
        let question_ids: Vec<u64> = index
            .remove(id)?
            .map(|bytes| decode(bytes.value()))
            .transpose()?
            .unwrap_or_default();

        let mut questions = write_txn.open_table(tables::QUESTIONS)?;
        for question_id in &question_ids {
            questions.remove(*question_id)?;
        }

        // Progress is keyed by (user, video); scan for this video's rows
        let mut progress = write_txn.open_table(tables::PROGRESS)?;
        let mut stale = Vec::new();
        for entry in progress.iter()? {
            let (key, _) = entry?;
            let (user_id, video_id) = key.value();
            if video_id == id {
                stale.push((user_id, video_id));
            }
        }
        for key in &stale {
            progress.remove(*key)?;
        }

        (video, question_ids.len(), stale.len())
    };
    write_txn.commit()?;

    tracing::info!(
        "Video {} deleted with {} questions and {} progress rows",
        id,
        question_count,
        progress_count
    );

    Ok(video)
}
