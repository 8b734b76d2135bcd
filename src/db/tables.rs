use redb::TableDefinition;

/// Users table: user_id -> User (serialized)
pub const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");

/// Email index: lowercased email -> user_id
pub const USER_EMAILS: TableDefinition<&str, u64> = TableDefinition::new("user_emails");

/// Username index: username -> user_id
pub const USER_NAMES: TableDefinition<&str, u64> = TableDefinition::new("user_names");

/// Videos table: video_id -> Video (serialized)
pub const VIDEOS: TableDefinition<u64, &[u8]> = TableDefinition::new("videos");

/// Questions table: question_id -> Question (serialized)
pub const QUESTIONS: TableDefinition<u64, &[u8]> = TableDefinition::new("questions");

/// Video questions index: video_id -> Vec<question_id>
/// Used for listing a video's questions and for cascade delete
pub const VIDEO_QUESTIONS: TableDefinition<u64, &[u8]> = TableDefinition::new("video_questions");

/// Progress table: (user_id, video_id) -> Progress (serialized)
pub const PROGRESS: TableDefinition<(u64, u64), &[u8]> = TableDefinition::new("progress");

/// Id sequences: entity name -> last issued id
pub const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");
