use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Per-user, per-video progress record, keyed by `(user_id, video_id)` in redb
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    pub id: u64,
    pub user_id: u64,
    pub video_id: u64,
    /// Last known watch position (seconds)
    pub current_timestamp: f64,
    /// Questions answered correctly, in the order they were completed
    pub completed_questions: Vec<u64>,
    /// Wrong answers per question id
    pub failed_attempts: BTreeMap<u64, u32>,
    pub is_completed: bool,
    /// Percentage of questions completed without a wrong answer
    pub final_score: Option<f64>,
    /// Unix timestamp of the last write
    pub last_updated: i64,
}

/// What the player should do after an answer was recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// The question was completed earlier; nothing changed
    AlreadyCompleted,
    Correct { retries_left: u32 },
    /// Wrong, with attempts to spare
    Retry { retries_left: u32 },
    /// Wrong and out of attempts: rewind and show a summary
    Exhausted,
}

impl AnswerOutcome {
    pub fn retries_left(&self) -> u32 {
        match self {
            Self::Correct { retries_left } | Self::Retry { retries_left } => *retries_left,
            Self::AlreadyCompleted | Self::Exhausted => 0,
        }
    }
}

impl Progress {
    /// Fresh progress row with the watch position at the start
    pub fn new(id: u64, user_id: u64, video_id: u64, now: i64) -> Self {
        Self {
            id,
            user_id,
            video_id,
            current_timestamp: 0.0,
            completed_questions: Vec::new(),
            failed_attempts: BTreeMap::new(),
            is_completed: false,
            final_score: None,
            last_updated: now,
        }
    }

    /// Watch positions are finite, non-negative seconds
    pub fn is_valid_timestamp(timestamp: f64) -> bool {
        timestamp.is_finite() && timestamp >= 0.0
    }

    pub fn is_question_completed(&self, question_id: u64) -> bool {
        self.completed_questions.contains(&question_id)
    }

    /// Wrong answers recorded so far for a question
    pub fn attempts(&self, question_id: u64) -> u32 {
        self.failed_attempts.get(&question_id).copied().unwrap_or(0)
    }

    /// Apply a graded answer to the row
    ///
    /// A correct answer completes the question and moves the watch position to
    /// where the learner answered. A wrong answer bumps the question's failure
    /// counter by one; once `retry_limit` wrong answers have accumulated every
    /// further wrong answer reports `Exhausted`.
    pub fn record_answer(
        &mut self,
        question_id: u64,
        retry_limit: u32,
        correct: bool,
        current_timestamp: f64,
        now: i64,
    ) -> AnswerOutcome {
        if self.is_question_completed(question_id) {
            return AnswerOutcome::AlreadyCompleted;
        }

        let attempts = self.attempts(question_id);
        self.last_updated = now;

        if correct {
            self.completed_questions.push(question_id);
            self.current_timestamp = current_timestamp;
            return AnswerOutcome::Correct {
                retries_left: retry_limit.saturating_sub(attempts),
            };
        }

        let attempts = attempts.saturating_add(1);
        self.failed_attempts.insert(question_id, attempts);

        match retry_limit.saturating_sub(attempts) {
            0 => AnswerOutcome::Exhausted,
            retries_left => AnswerOutcome::Retry { retries_left },
        }
    }

    /// Mark the video completed once every one of its questions is done
    ///
    /// The score is the share of questions answered without a wrong attempt.
    pub fn refresh_completion(&mut self, video_question_ids: &[u64]) {
        if video_question_ids.is_empty()
            || !video_question_ids
                .iter()
                .all(|id| self.is_question_completed(*id))
        {
            return;
        }

        let first_try = video_question_ids
            .iter()
            .filter(|id| self.attempts(**id) == 0)
            .count();

        self.is_completed = true;
        self.final_score = Some(first_try as f64 * 100.0 / video_question_ids.len() as f64);
    }
}

/// Progress model for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub current_timestamp: f64,
    pub completed_questions: Vec<u64>,
    pub failed_attempts: BTreeMap<String, u32>,
    pub is_completed: bool,
    pub final_score: Option<f64>,
}

impl From<&Progress> for ProgressResponse {
    fn from(progress: &Progress) -> Self {
        Self {
            current_timestamp: progress.current_timestamp,
            completed_questions: progress.completed_questions.clone(),
            failed_attempts: progress
                .failed_attempts
                .iter()
                .map(|(id, count)| (id.to_string(), *count))
                .collect(),
            is_completed: progress.is_completed,
            final_score: progress.final_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_000_000;

    #[test]
    fn test_new_progress() {
        let progress = Progress::new(1, 2, 3, NOW);

        assert_eq!(progress.current_timestamp, 0.0);
        assert!(progress.completed_questions.is_empty());
        assert!(progress.failed_attempts.is_empty());
        assert!(!progress.is_completed);
        assert!(progress.final_score.is_none());
    }

    #[test]
    fn test_correct_answer_completes_question() {
        let mut progress = Progress::new(1, 2, 3, NOW);

        let outcome = progress.record_answer(10, 3, true, 42.5, NOW + 1);

        assert_eq!(outcome, AnswerOutcome::Correct { retries_left: 3 });
        assert_eq!(progress.completed_questions, vec![10]);
        assert_eq!(progress.current_timestamp, 42.5);
        assert_eq!(progress.last_updated, NOW + 1);
    }

    #[test]
    fn test_wrong_answer_increments_by_one() {
        let mut progress = Progress::new(1, 2, 3, NOW);

        assert_eq!(
            progress.record_answer(10, 3, false, 12.0, NOW),
            AnswerOutcome::Retry { retries_left: 2 }
        );
        assert_eq!(progress.attempts(10), 1);
        assert_eq!(
            progress.record_answer(10, 3, false, 12.0, NOW),
            AnswerOutcome::Retry { retries_left: 1 }
        );
        assert_eq!(progress.attempts(10), 2);

        // Wrong answers never move the watch position
        assert_eq!(progress.current_timestamp, 0.0);
    }

    #[test]
    fn test_retries_exhausted_and_floor_at_zero() {
        let mut progress = Progress::new(1, 2, 3, NOW);

        for _ in 0..2 {
            progress.record_answer(10, 3, false, 0.0, NOW);
        }
        assert_eq!(
            progress.record_answer(10, 3, false, 0.0, NOW),
            AnswerOutcome::Exhausted
        );

        // Further wrong answers keep counting and stay exhausted
        let outcome = progress.record_answer(10, 3, false, 0.0, NOW);
        assert_eq!(outcome, AnswerOutcome::Exhausted);
        assert_eq!(outcome.retries_left(), 0);
        assert_eq!(progress.attempts(10), 4);
    }

    #[test]
    fn test_correct_after_failures_reports_remaining_retries() {
        let mut progress = Progress::new(1, 2, 3, NOW);

        progress.record_answer(10, 3, false, 0.0, NOW);
        let outcome = progress.record_answer(10, 3, true, 30.0, NOW);

        assert_eq!(outcome, AnswerOutcome::Correct { retries_left: 2 });
        // Counter survives completion
        assert_eq!(progress.attempts(10), 1);
    }

    #[test]
    fn test_correct_after_exhaustion_floors_at_zero() {
        let mut progress = Progress::new(1, 2, 3, NOW);

        for _ in 0..5 {
            progress.record_answer(10, 3, false, 0.0, NOW);
        }
        let outcome = progress.record_answer(10, 3, true, 30.0, NOW);

        assert_eq!(outcome, AnswerOutcome::Correct { retries_left: 0 });
    }

    #[test]
    fn test_completed_question_is_not_regraded() {
        let mut progress = Progress::new(1, 2, 3, NOW);
        progress.record_answer(10, 3, true, 30.0, NOW);

        assert_eq!(
            progress.record_answer(10, 3, false, 99.0, NOW + 5),
            AnswerOutcome::AlreadyCompleted
        );
        assert_eq!(
            progress.record_answer(10, 3, true, 99.0, NOW + 5),
            AnswerOutcome::AlreadyCompleted
        );

        assert_eq!(progress.completed_questions, vec![10]);
        assert_eq!(progress.attempts(10), 0);
        assert_eq!(progress.current_timestamp, 30.0);
        assert_eq!(progress.last_updated, NOW);
    }

    #[test]
    fn test_zero_retry_limit_exhausts_on_first_miss() {
        let mut progress = Progress::new(1, 2, 3, NOW);
        assert_eq!(
            progress.record_answer(10, 0, false, 0.0, NOW),
            AnswerOutcome::Exhausted
        );
    }

    #[test]
    fn test_refresh_completion() {
        let mut progress = Progress::new(1, 2, 3, NOW);
        let questions = [10, 11, 12, 13];

        progress.record_answer(10, 3, true, 10.0, NOW);
        progress.record_answer(11, 3, false, 20.0, NOW);
        progress.record_answer(11, 3, true, 20.0, NOW);
        progress.record_answer(12, 3, true, 30.0, NOW);
        progress.refresh_completion(&questions);
        assert!(!progress.is_completed);
        assert!(progress.final_score.is_none());

        progress.record_answer(13, 3, true, 40.0, NOW);
        progress.refresh_completion(&questions);
        assert!(progress.is_completed);
        assert_eq!(progress.final_score, Some(75.0));
    }

    #[test]
    fn test_refresh_completion_without_questions() {
        let mut progress = Progress::new(1, 2, 3, NOW);
        progress.refresh_completion(&[]);
        assert!(!progress.is_completed);
    }

    #[test]
    fn test_response_uses_string_keys() {
        let mut progress = Progress::new(1, 2, 3, NOW);
        progress.record_answer(10, 3, false, 0.0, NOW);

        let json = serde_json::to_value(ProgressResponse::from(&progress)).unwrap();
        assert_eq!(json["failed_attempts"]["10"], 1);
        assert_eq!(json["is_completed"], false);
        assert!(json["final_score"].is_null());
    }
}
