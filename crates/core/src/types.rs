/// All primary keys are fixed-length random alphanumeric strings (see [`crate::ids`]).
pub type DbId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
