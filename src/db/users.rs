use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable};

use super::{decode, encode, next_id, tables};
use crate::error::{AppError, Result};
use crate::models::{NewUser, User};

/// Insert a user, enforcing unique email and username
pub fn create(db: &Database, new_user: NewUser) -> Result<User> {
    let email = User::normalize_email(&new_user.email);
    let username = new_user.username.trim().to_string();

    let write_txn = db.begin_write()?;
    let user = {
        let mut emails = write_txn.open_table(tables::USER_EMAILS)?;
        let mut names = write_txn.open_table(tables::USER_NAMES)?;

        if emails.get(email.as_str())?.is_some() || names.get(username.as_str())?.is_some() {
            tracing::info!("Registration rejected, email or username taken");
            return Err(AppError::UserAlreadyExists);
        }

        let user = User {
            id: next_id(&write_txn, "users")?,
            email,
            username,
            hashed_password: new_user.hashed_password,
            is_admin: new_user.is_admin,
            created_at: Utc::now().timestamp(),
        };

        let mut users = write_txn.open_table(tables::USERS)?;
        users.insert(user.id, encode(&user)?.as_slice())?;
        emails.insert(user.email.as_str(), user.id)?;
        names.insert(user.username.as_str(), user.id)?;

        user
    };
    write_txn.commit()?;

    tracing::info!("User {} created (admin: {})", user.id, user.is_admin);
    Ok(user)
}

pub fn get(db: &Database, id: u64) -> Result<Option<User>> {
    let read_txn = db.begin_read()?;
    let users = read_txn.open_table(tables::USERS)?;

    users.get(id)?.map(|bytes| decode(bytes.value())).transpose()
}

pub fn find_by_email(db: &Database, email: &str) -> Result<Option<User>> {
    let email = User::normalize_email(email);

    let read_txn = db.begin_read()?;
    let emails = read_txn.open_table(tables::USER_EMAILS)?;
    let Some(id) = emails.get(email.as_str())?.map(|v| v.value()) else {
        return Ok(None);
    };

    let users = read_txn.open_table(tables::USERS)?;
    users.get(id)?.map(|bytes| decode(bytes.value())).transpose()
}

/// All users ordered by id
pub fn list(db: &Database) -> Result<Vec<User>> {
    let read_txn = db.begin_read()?;
    let users = read_txn.open_table(tables::USERS)?;

    let mut result = Vec::new();
    for entry in users.iter()? {
        let (_, bytes) = entry?;
        result.push(decode(bytes.value())?);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::temp_db;

    fn new_user(email: &str, username: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            username: username.to_string(),
            hashed_password: "hash".to_string(),
            is_admin: false,
        }
    }

    #[test]
    fn test_create_and_lookup() {
        let (_dir, db) = temp_db();

        let user = create(&db, new_user("Learner@Example.com", "learner")).unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.email, "learner@example.com");

        let by_id = get(&db, user.id).unwrap().unwrap();
        assert_eq!(by_id.username, "learner");

        let by_email = find_by_email(&db, "LEARNER@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, user.id);

        assert!(get(&db, 99).unwrap().is_none());
        assert!(find_by_email(&db, "nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_or_username_rejected() {
        let (_dir, db) = temp_db();
        create(&db, new_user("a@example.com", "alice")).unwrap();

        assert!(matches!(
            create(&db, new_user("A@EXAMPLE.COM", "someone")),
            Err(AppError::UserAlreadyExists)
        ));
        assert!(matches!(
            create(&db, new_user("b@example.com", "alice")),
            Err(AppError::UserAlreadyExists)
        ));

        assert_eq!(list(&db).unwrap().len(), 1);
    }
}
