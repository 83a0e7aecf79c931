use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// A value shape that must hold exactly one populated slot did not.
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Value out of range for field {field}: {value}")]
    ValueOutOfRange { field: DbId, value: String },

    #[error("Submission {id} is approved and can no longer be changed")]
    SubmissionLocked { id: DbId },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
