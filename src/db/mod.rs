pub mod progress;
pub mod questions;
pub mod tables;
pub mod users;
pub mod videos;

use redb::{Database, Error as RedbError, ReadableDatabase, ReadableTable, WriteTransaction};
use serde::{Serialize, de::DeserializeOwned};
use std::path::Path;
use std::sync::Arc;

use crate::error::Result;

/// Database handle type (Arc-wrapped for sharing across handlers)
pub type Db = Arc<Database>;

/// Open or create the redb database at the given path
///
/// Creates all required tables on first run.
#[allow(clippy::result_large_err)]
pub fn open_database(path: impl AsRef<Path>) -> std::result::Result<Db, RedbError> {
    tracing::info!("Opening database at: {:?}", path.as_ref());

    // Create parent directory if it doesn't exist
    if let Some(parent) = path.as_ref().parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            tracing::error!("Failed to create database directory: {}", e);
            RedbError::Io(e)
        })?;
    }

    let db = Database::create(path)?;

    // Initialize tables on first run
    let write_txn = db.begin_write()?;
    {
        // Create tables if they don't exist by opening them
        let _ = write_txn.open_table(tables::USERS)?;
        let _ = write_txn.open_table(tables::USER_EMAILS)?;
        let _ = write_txn.open_table(tables::USER_NAMES)?;
        let _ = write_txn.open_table(tables::VIDEOS)?;
        let _ = write_txn.open_table(tables::QUESTIONS)?;
        let _ = write_txn.open_table(tables::VIDEO_QUESTIONS)?;
        let _ = write_txn.open_table(tables::PROGRESS)?;
        let _ = write_txn.open_table(tables::SEQUENCES)?;
    }
    write_txn.commit()?;

    tracing::info!("Database initialized successfully");

    Ok(Arc::new(db))
}

/// Check that a read transaction can be opened
pub fn ping(db: &Database) -> bool {
    match db.begin_read() {
        Ok(_) => true,
        Err(e) => {
            tracing::error!("Database health check failed: {:?}", e);
            false
        }
    }
}

/// Issue the next id for `sequence` inside the caller's transaction
pub(crate) fn next_id(txn: &WriteTransaction, sequence: &str) -> Result<u64> {
    let mut sequences = txn.open_table(tables::SEQUENCES)?;
    let next = sequences.get(sequence)?.map(|v| v.value()).unwrap_or(0) + 1;
    sequences.insert(sequence, next)?;
    Ok(next)
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(bytes)?)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tempfile::TempDir;

    /// Fresh database in a temporary directory; keep the `TempDir` alive
    pub fn temp_db() -> (TempDir, Db) {
        let dir = tempfile::tempdir().unwrap();
        let db = open_database(dir.path().join("test.db")).unwrap();
        (dir, db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_id_is_per_sequence() {
        let (_dir, db) = test_support::temp_db();

        let txn = db.begin_write().unwrap();
        assert_eq!(next_id(&txn, "users").unwrap(), 1);
        assert_eq!(next_id(&txn, "users").unwrap(), 2);
        assert_eq!(next_id(&txn, "videos").unwrap(), 1);
        txn.commit().unwrap();

        let txn = db.begin_write().unwrap();
        assert_eq!(next_id(&txn, "users").unwrap(), 3);
        txn.commit().unwrap();
    }

    #[test]
    fn test_ping() {
        let (_dir, db) = test_support::temp_db();
        assert!(ping(&db));
    }
}
