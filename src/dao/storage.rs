//! Backend-independent storage errors.

use std::error::Error;
use thiserror::Error;

use crate::dao::models::{Kind, ObjectKey};

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The addressed object does not exist.
    #[error("{kind} `{key}` not found")]
    NotFound { kind: Kind, key: ObjectKey },
    /// The write carried a stale resource version.
    #[error("{kind} `{key}` was modified concurrently")]
    Conflict { kind: Kind, key: ObjectKey },
    /// An object with the same identity already exists.
    #[error("{kind} `{key}` already exists")]
    AlreadyExists { kind: Kind, key: ObjectKey },
    /// The backend could not be reached or failed unexpectedly.
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Shorthand for [`StorageError::NotFound`].
    pub fn not_found(kind: Kind, key: ObjectKey) -> Self {
        StorageError::NotFound { kind, key }
    }

    /// Shorthand for [`StorageError::Conflict`].
    pub fn conflict(kind: Kind, key: ObjectKey) -> Self {
        StorageError::Conflict { kind, key }
    }

    /// Shorthand for [`StorageError::AlreadyExists`].
    pub fn already_exists(kind: Kind, key: ObjectKey) -> Self {
        StorageError::AlreadyExists { kind, key }
    }

    /// Whether this is [`StorageError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }

    /// Whether this is [`StorageError::Conflict`].
    pub fn is_conflict(&self) -> bool {
        matches!(self, StorageError::Conflict { .. })
    }

    /// Whether this is [`StorageError::AlreadyExists`].
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StorageError::AlreadyExists { .. })
    }
}
