use fichas_core::error::CoreError;

/// Error returned by store operations that enforce domain rules on top of
/// plain SQL (reconciling syncs, state transitions).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
