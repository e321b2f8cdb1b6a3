/// Primary key type shared by every hydrated record (BIGSERIAL upstream).
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
