use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::MAX_USERNAME_LENGTH;

/// User record stored in redb
/// Uses Unix timestamp for compact storage with bincode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    /// Lowercased on write; also the key of the email index
    pub email: String,
    pub username: String,
    /// Argon2 PHC string
    pub hashed_password: String,
    pub is_admin: bool,
    /// When the user was created (Unix timestamp)
    pub created_at: i64,
}

/// Fields needed to create a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub hashed_password: String,
    pub is_admin: bool,
}

/// User model for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            is_admin: user.is_admin,
            created_at: DateTime::from_timestamp(user.created_at, 0).unwrap_or_else(Utc::now),
        }
    }
}

impl User {
    /// Normalise an email for storage and lookup
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_ascii_lowercase()
    }

    /// Loose structural email check: one `@`, non-empty local part,
    /// and a dotted domain
    pub fn validate_email(email: &str) -> bool {
        let email = email.trim();
        if email.chars().any(char::is_whitespace) {
            return false;
        }
        match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
            }
            None => false,
        }
    }

    pub fn validate_username(username: &str) -> bool {
        let username = username.trim();
        !username.is_empty() && username.chars().count() <= MAX_USERNAME_LENGTH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(User::validate_email("learner@example.com"));
        assert!(User::validate_email("  admin@tubetutor.com "));

        assert!(!User::validate_email("no-at-sign.com"));
        assert!(!User::validate_email("@example.com"));
        assert!(!User::validate_email("learner@localhost"));
        assert!(!User::validate_email("learner@@example.com"));
        assert!(!User::validate_email("learner@example."));
        assert!(!User::validate_email("lea rner@example.com"));
    }

    #[test]
    fn test_validate_username() {
        assert!(User::validate_username("admin"));
        assert!(!User::validate_username("   "));
        assert!(!User::validate_username(&"a".repeat(MAX_USERNAME_LENGTH + 1)));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(User::normalize_email(" Admin@TubeTutor.com "), "admin@tubetutor.com");
    }

    #[test]
    fn test_user_record_serialization() {
        let record = User {
            id: 7,
            email: "learner@example.com".to_string(),
            username: "learner".to_string(),
            hashed_password: "$argon2id$v=19$...".to_string(),
            is_admin: false,
            created_at: 1733788800,
        };

        // Verify bincode serialization works
        let bytes = bincode::serialize(&record).unwrap();
        let deserialized: User = bincode::deserialize(&bytes).unwrap();

        assert_eq!(record.id, deserialized.id);
        assert_eq!(record.email, deserialized.email);
        assert_eq!(record.created_at, deserialized.created_at);
    }

    #[test]
    fn test_response_hides_password_hash() {
        let record = User {
            id: 1,
            email: "learner@example.com".to_string(),
            username: "learner".to_string(),
            hashed_password: "secret-hash".to_string(),
            is_admin: true,
            created_at: 0,
        };

        let json = serde_json::to_value(UserResponse::from(&record)).unwrap();
        assert!(json.get("hashed_password").is_none());
        assert_eq!(json["is_admin"], true);
    }
}
