use serde::{Deserialize, Serialize};

use crate::constants::MCQ_OPTION_COUNT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Mcq,
    FillIn,
    OneWord,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mcq => "mcq",
            Self::FillIn => "fill_in",
            Self::OneWord => "one_word",
        }
    }
}

/// Question record stored in redb, one per quiz point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: u64,
    pub video_id: u64,
    /// Seconds into the video
    pub timestamp: f64,
    pub question_type: QuestionType,
    pub question_text: String,
    pub options: Option<Vec<String>>,
    pub correct_answer: String,
    pub explanation: Option<String>,
    pub retry_limit: u32,
    pub rewind_seconds: f64,
    pub is_final_quiz: bool,
}

#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub timestamp: f64,
    pub question_type: QuestionType,
    pub question_text: String,
    pub options: Option<Vec<String>>,
    pub correct_answer: String,
    pub explanation: Option<String>,
    pub retry_limit: u32,
    pub rewind_seconds: f64,
    pub is_final_quiz: bool,
}

/// Question model for API responses; answers and explanations are withheld
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub id: u64,
    pub timestamp: f64,
    pub question_type: QuestionType,
    pub question_text: String,
    pub options: Option<Vec<String>>,
    pub retry_limit: u32,
    pub rewind_seconds: f64,
    pub is_final_quiz: bool,
}

impl From<&Question> for QuestionResponse {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id,
            timestamp: question.timestamp,
            question_type: question.question_type,
            question_text: question.question_text.clone(),
            options: question.options.clone(),
            retry_limit: question.retry_limit,
            rewind_seconds: question.rewind_seconds,
            is_final_quiz: question.is_final_quiz,
        }
    }
}

/// Question content as produced by the LLM (or a fallback)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub question_text: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
}

impl GeneratedQuestion {
    /// Check that a generated question can be shown and graded
    pub fn validate(&self, question_type: QuestionType) -> Result<(), String> {
        if self.question_text.trim().is_empty() {
            return Err("question text is empty".to_string());
        }
        if self.correct_answer.trim().is_empty() {
            return Err("correct answer is empty".to_string());
        }
        if question_type == QuestionType::Mcq {
            if self.options.len() != MCQ_OPTION_COUNT {
                return Err(format!(
                    "expected {} options, got {}",
                    MCQ_OPTION_COUNT,
                    self.options.len()
                ));
            }
            let answer = self.correct_answer.trim();
            if !self.options.iter().any(|o| o.trim() == answer) {
                return Err("correct answer is not one of the options".to_string());
            }
        }
        Ok(())
    }

    /// Turn generated content into a storable question at `timestamp`
    pub fn into_new_question(
        self,
        timestamp: f64,
        question_type: QuestionType,
        retry_limit: u32,
        rewind_seconds: f64,
        is_final_quiz: bool,
    ) -> NewQuestion {
        let options = if self.options.is_empty() {
            None
        } else {
            Some(self.options)
        };
        let explanation = if self.explanation.is_empty() {
            None
        } else {
            Some(self.explanation)
        };

        NewQuestion {
            timestamp,
            question_type,
            question_text: self.question_text,
            options,
            correct_answer: self.correct_answer,
            explanation,
            retry_limit,
            rewind_seconds,
            is_final_quiz,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mcq(answer: &str) -> GeneratedQuestion {
        GeneratedQuestion {
            question_text: "What does ownership guarantee?".to_string(),
            options: vec![
                "Memory safety".to_string(),
                "Garbage collection".to_string(),
                "Dynamic typing".to_string(),
                "Reflection".to_string(),
            ],
            correct_answer: answer.to_string(),
            explanation: "Ownership rules are checked at compile time.".to_string(),
        }
    }

    #[test]
    fn test_validate_mcq() {
        assert!(mcq("Memory safety").validate(QuestionType::Mcq).is_ok());
        assert!(mcq("Borrowing").validate(QuestionType::Mcq).is_err());

        let mut short = mcq("Memory safety");
        short.options.pop();
        assert!(short.validate(QuestionType::Mcq).is_err());
    }

    #[test]
    fn test_validate_free_text_needs_no_options() {
        let question = GeneratedQuestion {
            question_text: "Name the borrow checker's main rule".to_string(),
            options: vec![],
            correct_answer: "aliasing xor mutation".to_string(),
            explanation: String::new(),
        };
        assert!(question.validate(QuestionType::FillIn).is_ok());
        assert!(question.validate(QuestionType::Mcq).is_err());
    }

    #[test]
    fn test_into_new_question_drops_empty_fields() {
        let question = GeneratedQuestion {
            question_text: "Q".to_string(),
            options: vec![],
            correct_answer: "A".to_string(),
            explanation: String::new(),
        }
        .into_new_question(12.0, QuestionType::OneWord, 3, 30.0, false);

        assert!(question.options.is_none());
        assert!(question.explanation.is_none());
        assert_eq!(question.timestamp, 12.0);
    }

    #[test]
    fn test_question_type_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&QuestionType::Mcq).unwrap(), "\"mcq\"");
        assert_eq!(
            serde_json::to_string(&QuestionType::FillIn).unwrap(),
            "\"fill_in\""
        );
        assert_eq!(QuestionType::OneWord.as_str(), "one_word");
    }
}
