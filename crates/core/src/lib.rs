//! Fichas domain core.
//!
//! Pure domain logic with no I/O: the error taxonomy, identifier generation,
//! field types and the typed field value model, the submission review state
//! machine, and the key-set reconciliation planner shared by both stores.

pub mod error;
pub mod field_type;
pub mod field_value;
pub mod ids;
pub mod reconcile;
pub mod roles;
pub mod submission_state;
pub mod types;
