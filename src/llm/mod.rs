pub mod gemini;
pub mod prompts;

pub use gemini::{GeminiClient, LlmError, LlmResult, PollSettings, RemoteFile};

use std::time::Duration;

use serde::Deserialize;

use crate::config::Config;
use crate::constants::{
    FALLBACK_FINAL_EXPLANATION, FALLBACK_FINAL_OPTIONS, FALLBACK_FINAL_QUESTION,
    FALLBACK_GENERATION_FAILED_EXPLANATION, FALLBACK_GRADE_RIGHT, FALLBACK_GRADE_WRONG,
    FALLBACK_HINT, FALLBACK_NO_TRANSCRIPT_EXPLANATION, FALLBACK_SUMMARY,
    FALLBACK_TIMESTAMP_OPTIONS, FINAL_QUIZ_CONTEXT_CHARS, TRANSCRIPT_CHARS_PER_SECOND,
};
use crate::models::{GeneratedQuestion, QuestionType, Video};

/// Verdict on a learner's answer
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Grade {
    pub correct: bool,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub hint: String,
}

/// Question generation, grading and summaries, with fixed fallbacks when
/// the model is unavailable
///
/// Model failures are logged and never reach the caller as errors, except
/// from [`Tutor::generate_question`] which leaves the fallback choice to the
/// upload flow.
#[derive(Debug, Clone)]
pub struct Tutor {
    client: Option<GeminiClient>,
}

impl Tutor {
    pub fn new(client: Option<GeminiClient>) -> Self {
        Self { client }
    }

    /// Build from configuration; no API key means fallbacks only
    pub fn from_config(config: &Config) -> Self {
        let Some(api_key) = config.gemini_api_key.as_deref() else {
            tracing::warn!("GEMINI_API_KEY not set, question generation and grading use fallbacks");
            return Self::new(None);
        };

        match GeminiClient::new(
            api_key,
            config.gemini_base_url.as_str(),
            config.gemini_model.as_str(),
            Duration::from_secs(config.llm_timeout_secs),
        ) {
            Ok(client) => {
                let client =
                    client.with_file_timeout(Duration::from_secs(config.transcription_timeout_secs));
                tracing::info!("Gemini client ready (model: {})", client.model());
                Self::new(Some(client))
            }
            Err(e) => {
                tracing::error!("Failed to build Gemini client: {}", e);
                Self::new(None)
            }
        }
    }

    pub fn client(&self) -> Option<&GeminiClient> {
        self.client.as_ref()
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Ask the model for a question about `transcript_segment`
    pub async fn generate_question(
        &self,
        transcript_segment: &str,
        timestamp: f64,
        question_type: QuestionType,
    ) -> LlmResult<GeneratedQuestion> {
        let client = self.client.as_ref().ok_or(LlmError::Disabled)?;

        let prompt = prompts::question_prompt(transcript_segment, timestamp, question_type);
        let question: GeneratedQuestion = client.generate_json(&prompt).await?;
        question
            .validate(question_type)
            .map_err(LlmError::InvalidContent)?;

        Ok(question)
    }

    /// Question for an in-video quiz point, falling back to a generic one
    pub async fn timestamp_question(&self, transcript: Option<&str>, timestamp: f64) -> GeneratedQuestion {
        let Some(transcript) = transcript else {
            return fallback_question(timestamp, FALLBACK_NO_TRANSCRIPT_EXPLANATION);
        };

        let segment = Video::transcript_until(transcript, timestamp, TRANSCRIPT_CHARS_PER_SECOND);
        match self.generate_question(&segment, timestamp, QuestionType::Mcq).await {
            Ok(question) => question,
            Err(e) => {
                tracing::warn!("Question generation at {}s failed: {}", timestamp, e);
                fallback_question(timestamp, FALLBACK_GENERATION_FAILED_EXPLANATION)
            }
        }
    }

    /// Question for the end-of-video quiz, from the tail of the transcript
    pub async fn final_question(&self, transcript: Option<&str>, timestamp: f64) -> GeneratedQuestion {
        let Some(transcript) = transcript else {
            return fallback_final_question();
        };

        let segment = Video::transcript_tail(transcript, FINAL_QUIZ_CONTEXT_CHARS);
        match self.generate_question(&segment, timestamp, QuestionType::Mcq).await {
            Ok(question) => question,
            Err(e) => {
                tracing::warn!("Final quiz generation failed: {}", e);
                fallback_final_question()
            }
        }
    }

    /// Grade with the model, or by exact match if it is unavailable
    pub async fn grade_answer(&self, question: &str, user_answer: &str, correct_answer: &str) -> Grade {
        let Some(client) = self.client.as_ref() else {
            return fallback_grade(user_answer, correct_answer);
        };

        let prompt = prompts::grading_prompt(question, correct_answer, user_answer);
        match client.generate_json::<Grade>(&prompt).await {
            Ok(grade) => grade,
            Err(e) => {
                tracing::warn!("Grading failed, using string match: {}", e);
                fallback_grade(user_answer, correct_answer)
            }
        }
    }

    /// Short recap shown after a learner runs out of attempts
    pub async fn summarize(&self, transcript: &str, failed_question: &str) -> String {
        let Some(client) = self.client.as_ref() else {
            return FALLBACK_SUMMARY.to_string();
        };

        let prompt = prompts::summary_prompt(transcript, failed_question);
        match client.generate_text(&prompt).await {
            Ok(summary) => summary.trim().to_string(),
            Err(e) => {
                tracing::warn!("Summary generation failed: {}", e);
                FALLBACK_SUMMARY.to_string()
            }
        }
    }
}

/// Case-insensitive, whitespace-trimmed exact match
pub fn fallback_grade(user_answer: &str, correct_answer: &str) -> Grade {
    let correct = user_answer.trim().to_lowercase() == correct_answer.trim().to_lowercase();
    Grade {
        correct,
        explanation: if correct {
            FALLBACK_GRADE_RIGHT
        } else {
            FALLBACK_GRADE_WRONG
        }
        .to_string(),
        hint: FALLBACK_HINT.to_string(),
    }
}

pub fn fallback_question(timestamp: f64, explanation: &str) -> GeneratedQuestion {
    GeneratedQuestion {
        question_text: format!(
            "At {}s: What is the main idea discussed around this time?",
            timestamp as i64
        ),
        options: FALLBACK_TIMESTAMP_OPTIONS.iter().map(|s| s.to_string()).collect(),
        correct_answer: FALLBACK_TIMESTAMP_OPTIONS[0].to_string(),
        explanation: explanation.to_string(),
    }
}

pub fn fallback_final_question() -> GeneratedQuestion {
    GeneratedQuestion {
        question_text: FALLBACK_FINAL_QUESTION.to_string(),
        options: FALLBACK_FINAL_OPTIONS.iter().map(|s| s.to_string()).collect(),
        correct_answer: FALLBACK_FINAL_OPTIONS[0].to_string(),
        explanation: FALLBACK_FINAL_EXPLANATION.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_grade() {
        let grade = fallback_grade("  Memory Safety ", "memory safety");
        assert!(grade.correct);
        assert_eq!(grade.explanation, FALLBACK_GRADE_RIGHT);

        let grade = fallback_grade("garbage collection", "memory safety");
        assert!(!grade.correct);
        assert_eq!(grade.explanation, FALLBACK_GRADE_WRONG);
        assert_eq!(grade.hint, FALLBACK_HINT);
    }

    #[test]
    fn test_fallback_questions_are_valid_mcqs() {
        let question = fallback_question(95.7, FALLBACK_NO_TRANSCRIPT_EXPLANATION);
        assert_eq!(
            question.question_text,
            "At 95s: What is the main idea discussed around this time?"
        );
        assert_eq!(question.correct_answer, "Main idea A");
        assert!(question.validate(QuestionType::Mcq).is_ok());

        let final_question = fallback_final_question();
        assert_eq!(final_question.correct_answer, "Takeaway A");
        assert!(final_question.validate(QuestionType::Mcq).is_ok());
    }

    #[tokio::test]
    async fn test_disabled_tutor_uses_fallbacks() {
        let tutor = Tutor::new(None);
        assert!(!tutor.is_enabled());

        assert!(matches!(
            tutor.generate_question("text", 1.0, QuestionType::Mcq).await,
            Err(LlmError::Disabled)
        ));

        let question = tutor.timestamp_question(Some("some transcript"), 10.0).await;
        assert_eq!(question.explanation, FALLBACK_GENERATION_FAILED_EXPLANATION);

        let question = tutor.timestamp_question(None, 10.0).await;
        assert_eq!(question.explanation, FALLBACK_NO_TRANSCRIPT_EXPLANATION);

        assert_eq!(tutor.final_question(None, 0.0).await, fallback_final_question());
        assert_eq!(tutor.summarize("t", "q").await, FALLBACK_SUMMARY);
        assert!(tutor.grade_answer("q", "A", "a").await.correct);
    }
}
