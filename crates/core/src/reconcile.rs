//! Key-set reconciliation planning.
//!
//! Both stores reconcile a persisted child collection against an incoming
//! list by natural key: template fields by their own id, submitted answers by
//! template field id. [`plan`] computes the set difference once so the stores
//! only have to execute it.

use std::collections::HashSet;
use std::fmt::Display;
use std::hash::Hash;

use crate::error::CoreError;

/// What to do with one incoming entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowAction<K> {
    /// The key is already persisted; rewrite that row.
    Update(K),
    /// No persisted row; insert one.
    Create,
}

/// Result of [`plan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan<K> {
    /// One action per incoming entry, in incoming order.
    pub actions: Vec<RowAction<K>>,
    /// Persisted keys the incoming list did not mention, sorted.
    pub stale: Vec<K>,
}

impl<K> ReconcilePlan<K> {
    pub fn update_count(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| matches!(a, RowAction::Update(_)))
            .count()
    }

    pub fn create_count(&self) -> usize {
        self.actions.len() - self.update_count()
    }
}

/// Diff `incoming` keys against the `existing` persisted keys.
///
/// An incoming `Some(key)` found in `existing` becomes an update and is
/// removed from the working set; anything else (`None`, or a key that is not
/// persisted) becomes a create. Keys left in the working set are stale.
///
/// A key that appears twice in `incoming` is rejected with
/// [`CoreError::Validation`], since both entries would target the same row.
pub fn plan<K>(
    existing: impl IntoIterator<Item = K>,
    incoming: impl IntoIterator<Item = Option<K>>,
) -> Result<ReconcilePlan<K>, CoreError>
where
    K: Eq + Hash + Ord + Clone + Display,
{
    let mut remaining: HashSet<K> = existing.into_iter().collect();
    let mut seen: HashSet<K> = HashSet::new();
    let mut actions = Vec::new();

    for key in incoming {
        let action = match key {
            Some(key) => {
                if !seen.insert(key.clone()) {
                    return Err(CoreError::Validation(format!(
                        "Duplicate entry for {key} in sync payload"
                    )));
                }
                if remaining.remove(&key) {
                    RowAction::Update(key)
                } else {
                    RowAction::Create
                }
            }
            None => RowAction::Create,
        };
        actions.push(action);
    }

    let mut stale: Vec<K> = remaining.into_iter().collect();
    stale.sort();

    Ok(ReconcilePlan { actions, stale })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn keys(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_known_keys_update_unknown_create_and_omitted_are_stale() {
        let result = plan(
            keys(&["a", "b", "c"]),
            vec![Some("b".to_string()), None, Some("zzz".to_string())],
        )
        .unwrap();

        assert_eq!(
            result.actions,
            vec![RowAction::Update("b".to_string()), RowAction::Create, RowAction::Create]
        );
        assert_eq!(result.stale, keys(&["a", "c"]));
        assert_eq!(result.update_count(), 1);
        assert_eq!(result.create_count(), 2);
    }

    #[test]
    fn test_identical_key_set_has_no_creates_or_stale() {
        let existing = keys(&["a", "b"]);
        let result = plan(existing.clone(), existing.into_iter().map(Some)).unwrap();
        assert_eq!(result.create_count(), 0);
        assert!(result.stale.is_empty());
    }

    #[test]
    fn test_empty_incoming_marks_everything_stale() {
        let result = plan(keys(&["b", "a"]), Vec::<Option<String>>::new()).unwrap();
        assert!(result.actions.is_empty());
        assert_eq!(result.stale, keys(&["a", "b"]));
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let result = plan(keys(&["a"]), vec![Some("a".to_string()), Some("a".to_string())]);
        assert_matches!(result, Err(CoreError::Validation(_)));
    }

    #[test]
    fn test_duplicate_unknown_key_rejected() {
        let result = plan(keys(&[]), vec![Some("n".to_string()), Some("n".to_string())]);
        assert_matches!(result, Err(CoreError::Validation(_)));
    }
}
