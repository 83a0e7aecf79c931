//! Submission review lifecycle.
//!
//! ```text
//! draft ──► waiting_review ──► approved (terminal)
//!                 │  ▲
//!                 ▼  │
//!          changes_requested
//! ```
//!
//! A submission starts as a draft. Only a draft or a submission with changes
//! requested can be sent for review, only a submission waiting for review can
//! be approved or sent back, and an approved submission never changes again.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    Draft,
    WaitingReview,
    ChangesRequested,
    Approved,
}

impl SubmissionState {
    pub const ALL: [SubmissionState; 4] = [
        SubmissionState::Draft,
        SubmissionState::WaitingReview,
        SubmissionState::ChangesRequested,
        SubmissionState::Approved,
    ];

    /// Database and wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionState::Draft => "draft",
            SubmissionState::WaitingReview => "waiting_review",
            SubmissionState::ChangesRequested => "changes_requested",
            SubmissionState::Approved => "approved",
        }
    }

    /// Approved submissions accept no further edits or transitions.
    pub fn is_locked(self) -> bool {
        self == SubmissionState::Approved
    }

    pub fn can_transition_to(self, next: SubmissionState) -> bool {
        use SubmissionState::*;
        matches!(
            (self, next),
            (Draft, WaitingReview)
                | (ChangesRequested, WaitingReview)
                | (WaitingReview, Approved)
                | (WaitingReview, ChangesRequested)
        )
    }

    /// Check a transition of submission `id` from `self` to `next`.
    ///
    /// Leaving `approved` fails with [`CoreError::SubmissionLocked`]; any
    /// other illegal move fails with [`CoreError::Conflict`].
    pub fn check_transition(self, id: &str, next: SubmissionState) -> Result<(), CoreError> {
        if self.is_locked() {
            return Err(CoreError::SubmissionLocked { id: id.to_string() });
        }
        if !self.can_transition_to(next) {
            return Err(CoreError::Conflict(format!(
                "Submission {id} cannot move from {self} to {next}"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubmissionState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Invalid submission state '{s}'")))
    }
}

impl TryFrom<String> for SubmissionState {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::SubmissionState::*;
    use super::*;

    #[test]
    fn test_review_cycle_transitions_allowed() {
        assert!(Draft.can_transition_to(WaitingReview));
        assert!(WaitingReview.can_transition_to(ChangesRequested));
        assert!(ChangesRequested.can_transition_to(WaitingReview));
        assert!(WaitingReview.can_transition_to(Approved));
    }

    #[test]
    fn test_shortcuts_rejected() {
        assert!(!Draft.can_transition_to(Approved));
        assert!(!Draft.can_transition_to(ChangesRequested));
        assert!(!ChangesRequested.can_transition_to(Approved));
        assert!(!WaitingReview.can_transition_to(WaitingReview));
    }

    #[test]
    fn test_approved_is_terminal() {
        for next in SubmissionState::ALL {
            assert!(!Approved.can_transition_to(next));
            assert_matches!(
                Approved.check_transition("s1", next),
                Err(CoreError::SubmissionLocked { ref id }) if id == "s1"
            );
        }
    }

    #[test]
    fn test_illegal_transition_is_conflict() {
        assert_matches!(Draft.check_transition("s1", Approved), Err(CoreError::Conflict(_)));
        assert!(Draft.check_transition("s1", WaitingReview).is_ok());
    }

    #[test]
    fn test_only_approved_is_locked() {
        assert!(Approved.is_locked());
        assert!(!Draft.is_locked());
        assert!(!WaitingReview.is_locked());
        assert!(!ChangesRequested.is_locked());
    }

    #[test]
    fn test_names_round_trip() {
        for state in SubmissionState::ALL {
            assert_eq!(state.as_str().parse::<SubmissionState>().unwrap(), state);
            assert_eq!(
                serde_json::to_string(&state).unwrap(),
                format!("\"{}\"", state.as_str())
            );
        }
        assert_matches!("submitted".parse::<SubmissionState>(), Err(CoreError::Validation(_)));
    }
}
