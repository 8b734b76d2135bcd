pub mod auth;
pub mod health;
pub mod progress;
pub mod questions;
pub mod videos;

pub use auth::{login, me, register};
pub use health::{health_check, root};
pub use progress::{get_progress, update_progress};
pub use questions::submit_answer;
pub use videos::{delete_video, get_video, list_questions, list_videos, upload_video};
