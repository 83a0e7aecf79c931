//! Random identifier generation.
//!
//! Every row id is a 12-character string drawn uniformly from `0-9A-Za-z`.
//! Ids are exposed to clients and embedded in sync payloads, so both the
//! alphabet and the length are part of the external contract.

use rand::Rng;

use crate::types::DbId;

/// Length of every generated id.
pub const ID_LENGTH: usize = 12;

/// Generate a new random id.
pub fn generate_id() -> DbId {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(ID_LENGTH)
        .map(char::from)
        .collect()
}

/// Whether `candidate` has the shape of a generated id.
///
/// Client-side placeholder ids (e.g. for fields not yet saved) fail this
/// check and are treated as "no id".
pub fn is_valid_id(candidate: &str) -> bool {
    candidate.len() == ID_LENGTH && candidate.bytes().all(|b| b.is_ascii_alphanumeric())
}
