pub mod progress;
pub mod question;
pub mod user;
pub mod video;

pub use progress::{AnswerOutcome, Progress, ProgressResponse};
pub use question::{GeneratedQuestion, NewQuestion, Question, QuestionResponse, QuestionType};
pub use user::{NewUser, User, UserResponse};
pub use video::{NewVideo, Video, VideoResponse};
