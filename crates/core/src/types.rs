/// Sessions are keyed by UUID (v4), generated at creation time.
pub type SessionId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Rounds are 1-based and strictly monotonic within a session.
pub type Round = i32;
