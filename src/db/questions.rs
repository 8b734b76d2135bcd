use redb::{Database, ReadableDatabase, ReadableTable, WriteTransaction};

use super::{decode, encode, next_id, tables};
use crate::error::Result;
use crate::models::{NewQuestion, Question};

/// Store questions under `video_id` inside the caller's write transaction
pub(crate) fn insert_in(
    write_txn: &WriteTransaction,
    video_id: u64,
    new_questions: Vec<NewQuestion>,
) -> Result<Vec<Question>> {
    let mut index = write_txn.open_table(tables::VIDEO_QUESTIONS)?;
    let mut ids: Vec<u64> = index
        .get(video_id)?
        .map(|bytes| decode(bytes.value()))
        .transpose()?
        .unwrap_or_default();

    let mut questions = write_txn.open_table(tables::QUESTIONS)?;
    let mut inserted = Vec::with_capacity(new_questions.len());
    for new in new_questions {
        let question = Question {
            id: next_id(write_txn, "questions")?,
            video_id,
            timestamp: new.timestamp,
            question_type: new.question_type,
            question_text: new.question_text,
            options: new.options,
            correct_answer: new.correct_answer,
            explanation: new.explanation,
            retry_limit: new.retry_limit,
            rewind_seconds: new.rewind_seconds,
            is_final_quiz: new.is_final_quiz,
        };
        questions.insert(question.id, encode(&question)?.as_slice())?;
        ids.push(question.id);
        inserted.push(question);
    }

    index.insert(video_id, encode(&ids)?.as_slice())?;
    Ok(inserted)
}

pub fn get(db: &Database, id: u64) -> Result<Option<Question>> {
    let read_txn = db.begin_read()?;
    let questions = read_txn.open_table(tables::QUESTIONS)?;

    questions.get(id)?.map(|bytes| decode(bytes.value())).transpose()
}

/// Ids of a video's questions in insertion order
pub fn ids_for_video(db: &Database, video_id: u64) -> Result<Vec<u64>> {
    let read_txn = db.begin_read()?;
    let index = read_txn.open_table(tables::VIDEO_QUESTIONS)?;

    Ok(index
        .get(video_id)?
        .map(|bytes| decode(bytes.value()))
        .transpose()?
        .unwrap_or_default())
}

/// A video's questions in playback order: by timestamp, with the final quiz
/// after every other question even when its timestamp is earlier
pub fn list_for_video(db: &Database, video_id: u64) -> Result<Vec<Question>> {
    let read_txn = db.begin_read()?;
    let index = read_txn.open_table(tables::VIDEO_QUESTIONS)?;
    let ids: Vec<u64> = index
        .get(video_id)?
        .map(|bytes| decode(bytes.value()))
        .transpose()?
        .unwrap_or_default();

    let table = read_txn.open_table(tables::QUESTIONS)?;
    let mut questions = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(bytes) = table.get(id)? {
            questions.push(decode::<Question>(bytes.value())?);
        }
    }

    questions.sort_by(|a, b| {
        a.is_final_quiz
            .cmp(&b.is_final_quiz)
            .then(a.timestamp.total_cmp(&b.timestamp))
            .then(a.id.cmp(&b.id))
    });
    Ok(questions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{test_support::temp_db, videos};
    use crate::models::{NewVideo, QuestionType};

    fn question(timestamp: f64, is_final_quiz: bool) -> NewQuestion {
        NewQuestion {
            timestamp,
            question_type: QuestionType::Mcq,
            question_text: format!("Question at {}", timestamp),
            options: Some(vec!["A".into(), "B".into(), "C".into(), "D".into()]),
            correct_answer: "A".to_string(),
            explanation: None,
            retry_limit: 3,
            rewind_seconds: 30.0,
            is_final_quiz,
        }
    }

    fn new_video() -> NewVideo {
        NewVideo {
            title: "Lifetimes".to_string(),
            description: None,
            video_url: "/uploads/videos/x.mp4".to_string(),
            is_published: true,
            uploader_id: 1,
            transcript: None,
            duration: Some(0.0),
        }
    }

    #[test]
    fn test_insert_and_list_ordered() {
        let (_dir, db) = temp_db();
        let (video, _) = videos::create_with_questions(
            &db,
            new_video(),
            vec![question(90.0, false), question(20.0, false), question(0.0, true)],
        )
        .unwrap();

        // ffprobe failures leave the final quiz at 0s; it still comes last
        let listed = list_for_video(&db, video.id).unwrap();
        let timestamps: Vec<f64> = listed.iter().map(|q| q.timestamp).collect();
        assert_eq!(timestamps, vec![20.0, 90.0, 0.0]);
        assert!(listed[2].is_final_quiz);

        assert_eq!(ids_for_video(&db, video.id).unwrap().len(), 3);
        assert!(get(&db, listed[0].id).unwrap().is_some());
    }

    #[test]
    fn test_equal_timestamps_keep_insertion_order() {
        let (_dir, db) = temp_db();
        let (video, inserted) = videos::create_with_questions(
            &db,
            new_video(),
            vec![question(30.0, false), question(30.0, false), question(10.0, false)],
        )
        .unwrap();

        let ids: Vec<u64> = list_for_video(&db, video.id)
            .unwrap()
            .iter()
            .map(|q| q.id)
            .collect();
        assert_eq!(ids, vec![inserted[2].id, inserted[0].id, inserted[1].id]);
    }

    #[test]
    fn test_delete_video_cascades_questions() {
        let (_dir, db) = temp_db();
        let (video, inserted) =
            videos::create_with_questions(&db, new_video(), vec![question(5.0, false)]).unwrap();

        videos::delete(&db, video.id).unwrap();

        assert!(get(&db, inserted[0].id).unwrap().is_none());
        assert!(list_for_video(&db, video.id).unwrap().is_empty());
    }
}
