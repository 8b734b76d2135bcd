//! TubeTutor Server Library
//!
//! This module exports the core types, the router and the data layer for the
//! binaries and the integration tests.

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod llm;
pub mod media;
pub mod models;
pub mod routes;
pub mod security;

pub use config::Config;
pub use db::{Db, open_database};
pub use error::{AppError, Result};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use llm::Tutor;
use media::{Transcriber, UPLOADS_URL_PREFIX};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub config: Config,
    pub tutor: Tutor,
    pub transcriber: Transcriber,
}

impl AppState {
    /// Create a new AppState, building the LLM and transcription backends from `config`
    pub fn new(db: Db, config: Config) -> Self {
        let tutor = Tutor::from_config(&config);
        let transcriber = Transcriber::from_config(&config, &tutor);
        Self {
            db,
            config,
            tutor,
            transcriber,
        }
    }
}

/// Build the HTTP router with every API route and the uploads file server
pub fn router(state: AppState) -> Router {
    let uploads = ServeDir::new(&state.config.upload_dir);
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health_check))
        .route("/auth/register", post(routes::register))
        .route("/auth/login", post(routes::login))
        .route("/auth/me", get(routes::me))
        .route("/videos", get(routes::list_videos))
        .route("/videos/", get(routes::list_videos))
        .route("/videos/upload", post(routes::upload_video))
        .route(
            "/videos/:video_id",
            get(routes::get_video).delete(routes::delete_video),
        )
        .route("/videos/:video_id/questions", get(routes::list_questions))
        .route("/questions/:question_id/answer", post(routes::submit_answer))
        .route(
            "/progress/:video_id",
            get(routes::get_progress).put(routes::update_progress),
        )
        .nest_service(UPLOADS_URL_PREFIX, uploads)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
