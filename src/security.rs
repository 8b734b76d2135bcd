use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::AppState;
use crate::db;
use crate::error::{AppError, Result};
use crate::models::User;

// =============================================================================
// Passwords
// =============================================================================

/// Hash a password into an Argon2id PHC string with a random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::PasswordHash(e.to_string()))
}

/// Check a password against a stored PHC string
///
/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, hashed: &str) -> bool {
    let parsed = match PasswordHash::new(hashed) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!("Stored password hash is malformed: {}", e);
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Stand-in hash checked when a login names no account
static UNKNOWN_ACCOUNT_HASH: LazyLock<String> =
    LazyLock::new(|| hash_password("tubetutor-unknown-account").unwrap_or_default());

/// Spend one Argon2 verification on a login for an unknown account, so it
/// takes as long as a wrong password for a real one
pub fn verify_unknown_account(password: &str) {
    verify_password(password, &UNKNOWN_ACCOUNT_HASH);
}

// =============================================================================
// Access tokens
// =============================================================================

/// JWT claims carried by access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

/// Issue an HS256 access token for `user_id`
pub fn issue_token(user_id: u64, secret: &str, expire_minutes: i64) -> Result<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (now + Duration::minutes(expire_minutes)).timestamp(),
        iat: now.timestamp(),
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

/// Validate signature and expiry; returns the user id the token was issued to
pub fn validate_token(token: &str, secret: &str) -> Result<u64> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| {
        tracing::debug!("Rejected access token: {}", e);
        AppError::Unauthorized
    })?;

    data.claims.sub.parse().map_err(|_| AppError::Unauthorized)
}

/// Pull the token out of an `Authorization: Bearer <token>` header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

// =============================================================================
// Extractors
// =============================================================================

/// The user behind a valid bearer token
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = extract_bearer_token(&parts.headers).ok_or(AppError::Unauthorized)?;
        let user_id = validate_token(token, &state.config.jwt_secret_key)?;

        let db = state.db.clone();
        let user = tokio::task::spawn_blocking(move || db::users::get(&db, user_id))
            .await??
            .ok_or_else(|| {
                tracing::warn!("Token for unknown user {}", user_id);
                AppError::UserNotFound
            })?;

        Ok(CurrentUser(user))
    }
}

/// A current user with the admin flag set
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        if !user.is_admin {
            tracing::warn!("User {} attempted an admin action", user.id);
            return Err(AppError::Forbidden);
        }

        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_password_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-phc-string"));
    }

    #[test]
    fn test_unknown_account_hash_is_real_argon2() {
        assert!(UNKNOWN_ACCOUNT_HASH.starts_with("$argon2"));
        assert!(PasswordHash::new(&UNKNOWN_ACCOUNT_HASH).is_ok());
        verify_unknown_account("anything");
    }

    #[test]
    fn test_password_hashes_are_salted() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn test_issue_and_validate_token() {
        let token = issue_token(42, SECRET, 30).unwrap();
        assert_eq!(validate_token(&token, SECRET).unwrap(), 42);
    }

    #[test]
    fn test_token_with_wrong_secret_rejected() {
        let token = issue_token(42, SECRET, 30).unwrap();
        assert!(matches!(
            validate_token(&token, "other-secret"),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        // Well past the default 60 second leeway
        let token = issue_token(42, SECRET, -10).unwrap();
        assert!(matches!(
            validate_token(&token, SECRET),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_bearer_token(&headers), Some("abc.def.ghi"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer xyz"));
        assert_eq!(extract_bearer_token(&headers), Some("xyz"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer_token(&headers), None);
    }
}
