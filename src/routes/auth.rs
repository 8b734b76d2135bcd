use axum::{Form, Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::constants::{
    ERR_INVALID_EMAIL, ERR_INVALID_USERNAME, ERR_PASSWORD_TOO_SHORT, MIN_PASSWORD_LENGTH,
};
use crate::db;
use crate::error::{AppError, Result};
use crate::models::{NewUser, User, UserResponse};
use crate::security::{
    CurrentUser, hash_password, issue_token, verify_password, verify_unknown_account,
};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// OAuth2 password form; `username` carries the email address
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub user: UserResponse,
}

/// Register a new learner account
///
/// Returns 409 Conflict if the email or username is taken.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<UserResponse>> {
    if !User::validate_email(&payload.email) {
        return Err(AppError::InvalidInput(ERR_INVALID_EMAIL.to_string()));
    }
    if !User::validate_username(&payload.username) {
        return Err(AppError::InvalidInput(ERR_INVALID_USERNAME.to_string()));
    }
    if payload.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::InvalidInput(ERR_PASSWORD_TOO_SHORT.to_string()));
    }

    let db = state.db.clone();
    let user = tokio::task::spawn_blocking(move || {
        let hashed_password = hash_password(&payload.password)?;
        db::users::create(
            &db,
            NewUser {
                email: payload.email,
                username: payload.username,
                hashed_password,
                is_admin: false,
            },
        )
    })
    .await??;

    tracing::info!("Registered user {}", user.id);
    Ok(Json(UserResponse::from(&user)))
}

/// Exchange email and password for a bearer token
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>> {
    let db = state.db.clone();
    let user = tokio::task::spawn_blocking(move || {
        // Argon2 verification is CPU-bound, keep it off the async workers
        let verified = match db::users::find_by_email(&db, &form.username)? {
            Some(user) => verify_password(&form.password, &user.hashed_password).then_some(user),
            None => {
                verify_unknown_account(&form.password);
                None
            }
        };
        Ok::<_, AppError>(verified)
    })
    .await??
    .ok_or_else(|| {
        tracing::info!("Failed login attempt");
        AppError::InvalidCredentials
    })?;

    let access_token = issue_token(
        user.id,
        &state.config.jwt_secret_key,
        state.config.access_token_expire_minutes,
    )?;

    tracing::info!("User {} logged in", user.id);
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
        user: UserResponse::from(&user),
    }))
}

/// The authenticated user's profile
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from(&user))
}
