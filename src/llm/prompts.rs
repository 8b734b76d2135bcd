//! Prompt templates sent to the model

use crate::models::QuestionType;

/// Instruction sent alongside an uploaded video to get its transcript
pub const TRANSCRIPTION_PROMPT: &str = "Provide a complete, accurate, and time-stamped \
transcript of the entire video. Focus on the spoken content and do not include any \
introductory or concluding remarks about the transcription process itself.";

pub fn question_prompt(transcript_segment: &str, timestamp: f64, question_type: QuestionType) -> String {
    format!(
        r#"Generate a {kind} question based on the following text content, which covers material up to {timestamp} seconds into a lecture.

Text Content: {transcript_segment}

Requirements:
1. The question must test understanding of a key concept in the text.
2. For MCQ, provide exactly 4 options with only one correct answer.
3. Keep the explanation concise and clear.

Return the result as a single JSON object (no markdown or extra text):
{{
    "question_text": "string (the question)",
    "options": ["option1", "option2", "option3", "option4"],
    "correct_answer": "string (the text of the correct option)",
    "explanation": "string (brief explanation)"
}}"#,
        kind = question_type.as_str(),
    )
}

pub fn grading_prompt(question: &str, correct_answer: &str, user_answer: &str) -> String {
    format!(
        r#"Grade the user's answer.

Question: {question}
Correct Answer: {correct_answer}
User Answer: {user_answer}

Instructions:
1. Respond with a boolean for the 'correct' field.
2. Provide a brief explanation for why the answer is correct or incorrect.
3. Be lenient with minor spelling or formatting variations.

Return JSON (no markdown):
{{
    "correct": boolean,
    "explanation": "string (brief feedback)",
    "hint": "string (optional hint for incorrect answer)"
}}"#
    )
}

pub fn summary_prompt(transcript_segment: &str, failed_question: &str) -> String {
    format!(
        r#"The student failed the question: "{failed_question}".

Based on the content segment: {transcript_segment}

Provide a concise summary (2-3 sentences) of the core concepts in the text that would help the student answer the question. Keep it encouraging."#
    )
}
