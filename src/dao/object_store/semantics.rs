//! Write rules shared by every store backend: version checks, generation
//! bumps, no-op detection and finalizer-gated deletion.

use std::time::SystemTime;

use uuid::Uuid;

use crate::dao::{
    models::{Game, Guess, Resource},
    storage::{StorageError, StorageResult},
};

use super::PatchOptions;

/// What a backend has to do to persist a write.
#[derive(Debug, PartialEq, Eq)]
pub enum WriteOutcome<T> {
    /// Nothing changed; keep the stored object and publish nothing.
    Unchanged,
    /// Persist the object under a fresh resource version.
    Store(T),
    /// The last finalizer of a deleting object was removed; drop it.
    Remove(T),
}

/// What a backend has to do to honour a delete request.
#[derive(Debug, PartialEq, Eq)]
pub enum DeleteOutcome<T> {
    /// No finalizers left; drop the object.
    Remove,
    /// Finalizers pending; persist the object with its deletion timestamp set.
    MarkDeleting(T),
    /// Deletion already requested earlier.
    AlreadyDeleting,
}

/// Stamp store-owned metadata on an object about to be created.
pub fn prepare_create<T: Resource>(mut object: T) -> T {
    let meta = object.metadata_mut();
    meta.uid = Some(Uuid::new_v4());
    meta.generation = 1;
    meta.deletion_timestamp = None;
    meta.resource_version = None;
    object
}

/// Validate `incoming` against `stored` and compute the object to persist.
///
/// `next` is `stored` with the caller's mutable fields merged in. Store-owned
/// metadata always comes from `stored`.
pub fn plan_write<T: Resource>(
    stored: &T,
    incoming_version: Option<&str>,
    mut next: T,
) -> StorageResult<WriteOutcome<T>> {
    let current = stored.metadata();
    if let Some(version) = incoming_version {
        if current.resource_version.as_deref() != Some(version) {
            return Err(StorageError::conflict(T::KIND, current.key()));
        }
    }

    {
        let meta = next.metadata_mut();
        meta.name = current.name.clone();
        meta.namespace = current.namespace.clone();
        meta.uid = current.uid;
        meta.resource_version = current.resource_version.clone();
        meta.generation = current.generation;
        meta.deletion_timestamp = current.deletion_timestamp;
    }

    if next == *stored {
        return Ok(WriteOutcome::Unchanged);
    }

    if !next.same_spec(stored) {
        next.metadata_mut().generation += 1;
    }

    let meta = next.metadata();
    if meta.is_deleting() && meta.finalizers.is_empty() {
        return Ok(WriteOutcome::Remove(next));
    }

    Ok(WriteOutcome::Store(next))
}

pub fn plan_delete<T: Resource>(stored: &T) -> DeleteOutcome<T> {
    let meta = stored.metadata();
    if meta.finalizers.is_empty() {
        return DeleteOutcome::Remove;
    }
    if meta.is_deleting() {
        return DeleteOutcome::AlreadyDeleting;
    }

    let mut marked = stored.clone();
    marked.metadata_mut().deletion_timestamp = Some(SystemTime::now());
    DeleteOutcome::MarkDeleting(marked)
}

/// Merge an update: labels, finalizers and spec from `incoming`.
pub fn merge_game_update(stored: &Game, incoming: Game) -> Game {
    let mut next = stored.clone();
    next.metadata.labels = incoming.metadata.labels;
    next.metadata.finalizers = incoming.metadata.finalizers;
    next.spec = incoming.spec;
    next
}

/// Merge a patch: spec and status from `incoming`.
pub fn merge_game_patch(stored: &Game, incoming: Game, options: PatchOptions) -> Game {
    let mut next = stored.clone();
    next.spec = incoming.spec;
    next.status = incoming.status;
    if options.observe_generation {
        next.status.observed_generation = Some(incoming.metadata.generation);
    }
    next
}

pub fn merge_guess_update(stored: &Guess, incoming: Guess) -> Guess {
    let mut next = stored.clone();
    next.metadata.labels = incoming.metadata.labels;
    next.metadata.finalizers = incoming.metadata.finalizers;
    next.spec = incoming.spec;
    next
}
