/// Attempts a learner gets on a question before the player rewinds
pub const DEFAULT_RETRY_LIMIT: u32 = 3;

/// How far the player seeks back after retries are exhausted (seconds)
pub const DEFAULT_REWIND_SECONDS: f64 = 30.0;

/// Transcript characters per second of video, used to cut the context
/// for a question at a given timestamp
pub const TRANSCRIPT_CHARS_PER_SECOND: f64 = 10.0;

/// Trailing transcript characters given to the final quiz prompt
pub const FINAL_QUIZ_CONTEXT_CHARS: usize = 1000;

/// Number of options in a multiple-choice question
pub const MCQ_OPTION_COUNT: usize = 4;

pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_USERNAME_LENGTH: usize = 50;

pub const DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 30;

/// Maximum upload size in bytes (1GB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 1_073_741_824;

// =============================================================================
// Gemini
// =============================================================================

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

/// Timeout for uploading a video to Gemini and for transcribing it
pub const DEFAULT_TRANSCRIPTION_TIMEOUT_SECS: u64 = 1800;

/// Interval between file state checks while Gemini processes an upload
pub const FILE_POLL_INTERVAL_SECS: u64 = 5;

/// Give up on a Gemini file that has not become active after this long
pub const FILE_POLL_TIMEOUT_SECS: u64 = 300;

// =============================================================================
// Fallback text
// =============================================================================

pub const FALLBACK_TIMESTAMP_OPTIONS: [&str; 4] =
    ["Main idea A", "Main idea B", "Main idea C", "Main idea D"];

pub const FALLBACK_FINAL_QUESTION: &str = "Final quiz: What is the main takeaway from this video?";

pub const FALLBACK_FINAL_OPTIONS: [&str; 4] =
    ["Takeaway A", "Takeaway B", "Takeaway C", "Takeaway D"];

pub const FALLBACK_NO_TRANSCRIPT_EXPLANATION: &str =
    "Fallback question generated because no transcript was available.";

pub const FALLBACK_GENERATION_FAILED_EXPLANATION: &str =
    "Fallback question generated because question generation failed.";

pub const FALLBACK_FINAL_EXPLANATION: &str = "Fallback final quiz question.";

pub const FALLBACK_SUMMARY: &str = "Summary generation failed. Please review the video content.";

pub const FALLBACK_GRADE_WRONG: &str = "Grading API failed. Simple string match used.";
pub const FALLBACK_GRADE_RIGHT: &str = "Answer correct.";
pub const FALLBACK_HINT: &str = "Review the video content.";

pub const ALREADY_COMPLETED: &str = "Already completed";

// =============================================================================
// Error Messages
// =============================================================================

pub const ERR_INVALID_EMAIL: &str = "A valid email address is required";

pub const ERR_INVALID_USERNAME: &str = "Username must be between 1 and 50 characters";

pub const ERR_PASSWORD_TOO_SHORT: &str = "Password must be at least 6 characters";

pub const ERR_INVALID_TIMESTAMP: &str = "Timestamp must be a non-negative number of seconds";
