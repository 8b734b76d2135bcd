use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, WriteTransaction};

use super::{decode, encode, next_id, tables};
use crate::error::Result;
use crate::models::Progress;

/// Load the row for (user, video), or build a fresh one inside `txn`
fn load_or_new(txn: &WriteTransaction, user_id: u64, video_id: u64) -> Result<(Progress, bool)> {
    let existing: Option<Progress> = {
        let table = txn.open_table(tables::PROGRESS)?;
        table
            .get((user_id, video_id))?
            .map(|bytes| decode(bytes.value()))
            .transpose()?
    };

    match existing {
        Some(progress) => Ok((progress, false)),
        None => {
            let id = next_id(txn, "progress")?;
            Ok((Progress::new(id, user_id, video_id, Utc::now().timestamp()), true))
        }
    }
}

/// Fetch the progress row, creating it on first access
pub fn get_or_create(db: &Database, user_id: u64, video_id: u64) -> Result<Progress> {
    {
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(tables::PROGRESS)?;
        if let Some(bytes) = table.get((user_id, video_id))? {
            return decode(bytes.value());
        }
    }

    let write_txn = db.begin_write()?;
    let (progress, created) = load_or_new(&write_txn, user_id, video_id)?;
    if created {
        let mut table = write_txn.open_table(tables::PROGRESS)?;
        table.insert((user_id, video_id), encode(&progress)?.as_slice())?;
        drop(table);
        tracing::debug!(
            "Created progress row for user {} on video {}",
            user_id,
            video_id
        );
    }
    write_txn.commit()?;

    Ok(progress)
}

/// Read-modify-write the progress row (creating it if absent)
///
/// Concurrent updates are not merged; the last commit wins.
pub fn update<F, R>(db: &Database, user_id: u64, video_id: u64, apply: F) -> Result<(Progress, R)>
where
    F: FnOnce(&mut Progress) -> R,
{
    let write_txn = db.begin_write()?;
    let (progress, result) = {
        let (mut progress, _) = load_or_new(&write_txn, user_id, video_id)?;
        let result = apply(&mut progress);

        let mut table = write_txn.open_table(tables::PROGRESS)?;
        table.insert((user_id, video_id), encode(&progress)?.as_slice())?;
        (progress, result)
    };
    write_txn.commit()?;

    Ok((progress, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::temp_db;

    #[test]
    fn test_get_or_create_is_idempotent() {
        let (_dir, db) = temp_db();

        let first = get_or_create(&db, 1, 2).unwrap();
        let second = get_or_create(&db, 1, 2).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.current_timestamp, 0.0);

        // A different pair gets its own row
        let other = get_or_create(&db, 1, 3).unwrap();
        assert_ne!(first.id, other.id);
    }

    #[test]
    fn test_update_creates_and_persists() {
        let (_dir, db) = temp_db();

        let (progress, previous) = update(&db, 5, 6, |p| {
            let previous = p.current_timestamp;
            p.current_timestamp = 120.0;
            previous
        })
        .unwrap();
        assert_eq!(previous, 0.0);
        assert_eq!(progress.current_timestamp, 120.0);

        let reloaded = get_or_create(&db, 5, 6).unwrap();
        assert_eq!(reloaded.id, progress.id);
        assert_eq!(reloaded.current_timestamp, 120.0);
    }
}
