//! Errors of a single reconciliation run.

use thiserror::Error;

use crate::dao::{models::ObjectKey, storage::StorageError};

/// Errors raised while reconciling a single object.
///
/// Every variant triggers a retry with backoff in the dispatch layer.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A lookup or update against the store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// A dependent object could not be created.
    #[error("failed to create dependency `{key}`")]
    DependencyCreate {
        key: ObjectKey,
        #[source]
        source: StorageError,
    },
    /// A guess could not be removed while finalizing its game.
    #[error("failed to delete guess `{key}` during cleanup")]
    Cleanup {
        key: ObjectKey,
        #[source]
        source: StorageError,
    },
    /// More than one step of the same run failed.
    #[error("{} errors: {}", .0.len(), join_messages(.0))]
    Aggregate(Vec<ReconcileError>),
}

impl ReconcileError {
    /// Collapse collected errors: `None` when empty, the error itself when
    /// alone, [`ReconcileError::Aggregate`] otherwise. Nested aggregates are
    /// flattened.
    pub fn aggregate(errors: Vec<ReconcileError>) -> Option<ReconcileError> {
        let mut flat = Vec::with_capacity(errors.len());
        for error in errors {
            match error {
                ReconcileError::Aggregate(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }

        match flat.len() {
            0 => None,
            1 => flat.pop(),
            _ => Some(ReconcileError::Aggregate(flat)),
        }
    }

    /// Whether every underlying failure is a stale-write conflict.
    pub fn is_conflict(&self) -> bool {
        match self {
            ReconcileError::Storage(source) => source.is_conflict(),
            ReconcileError::DependencyCreate { source, .. }
            | ReconcileError::Cleanup { source, .. } => source.is_conflict(),
            ReconcileError::Aggregate(errors) => {
                !errors.is_empty() && errors.iter().all(ReconcileError::is_conflict)
            }
        }
    }
}

fn join_messages(errors: &[ReconcileError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::Kind;

    fn conflict() -> ReconcileError {
        StorageError::conflict(Kind::Game, ObjectKey::new("ns", "g")).into()
    }

    fn missing() -> ReconcileError {
        StorageError::not_found(Kind::Guess, ObjectKey::new("ns", "x")).into()
    }

    #[test]
    fn aggregate_of_nothing_is_none() {
        assert!(ReconcileError::aggregate(Vec::new()).is_none());
    }

    #[test]
    fn aggregate_of_one_is_that_error() {
        let error = ReconcileError::aggregate(vec![conflict()]).unwrap();
        assert!(matches!(error, ReconcileError::Storage(_)));
    }

    #[test]
    fn aggregate_flattens_nested_errors() {
        let nested = ReconcileError::Aggregate(vec![conflict(), missing()]);
        let error = ReconcileError::aggregate(vec![nested, conflict()]).unwrap();

        match &error {
            ReconcileError::Aggregate(errors) => assert_eq!(errors.len(), 3),
            other => panic!("expected an aggregate, got {other:?}"),
        }
        assert!(error.to_string().starts_with("3 errors: "));
    }

    #[test]
    fn conflict_detection_requires_every_member() {
        assert!(conflict().is_conflict());
        assert!(!missing().is_conflict());
        assert!(ReconcileError::Aggregate(vec![conflict(), conflict()]).is_conflict());
        assert!(!ReconcileError::Aggregate(vec![conflict(), missing()]).is_conflict());
    }
}
