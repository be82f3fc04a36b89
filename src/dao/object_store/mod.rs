/// CouchDB-backed store.
#[cfg(feature = "couch-store")]
pub mod couchdb;
/// In-process store.
pub mod memory;
mod semantics;

use futures::future::BoxFuture;
use tokio::sync::broadcast;

use crate::dao::models::{DynamicObject, Game, Guess, LabelSelector, ObjectKey, Phrase};
use crate::dao::storage::StorageResult;

pub use memory::MemoryStore;

/// What happened to the object carried by a [`WatchEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    /// The object was created.
    Added,
    /// The object was written with an effective change.
    Modified,
    /// The object was physically removed.
    Deleted,
}

/// Change notification published by a store after every effective write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// What happened.
    pub event_type: EventType,
    /// State of the object after the write, or its last state when deleted.
    pub object: DynamicObject,
}

impl WatchEvent {
    /// Event of `event_type` carrying `object`.
    pub fn new(event_type: EventType, object: DynamicObject) -> Self {
        Self { event_type, object }
    }
}

/// Options accepted by [`ObjectStore::patch_game`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchOptions {
    /// Record the written object's generation as `status.observed_generation`.
    pub observe_generation: bool,
}

/// Declarative object store the controllers read from and write to.
///
/// Writes are guarded by `metadata.resource_version`: a stale version yields
/// [`StorageError::Conflict`](crate::dao::storage::StorageError::Conflict). Writes
/// that change nothing leave the version untouched and publish no event.
/// Deleting an object that still carries finalizers only stamps its
/// `deletion_timestamp`; the object disappears once an update empties the
/// finalizer list.
pub trait ObjectStore: Send + Sync {
    fn get_game(&self, key: ObjectKey) -> BoxFuture<'static, StorageResult<Option<Game>>>;
    fn get_guess(&self, key: ObjectKey) -> BoxFuture<'static, StorageResult<Option<Guess>>>;
    fn get_phrase(&self, key: ObjectKey) -> BoxFuture<'static, StorageResult<Option<Phrase>>>;
    /// List games, optionally restricted to one namespace.
    fn list_games(
        &self,
        namespace: Option<String>,
    ) -> BoxFuture<'static, StorageResult<Vec<Game>>>;
    /// List guesses whose labels satisfy `selector`, optionally restricted to
    /// one namespace.
    fn list_guesses(
        &self,
        namespace: Option<String>,
        selector: LabelSelector,
    ) -> BoxFuture<'static, StorageResult<Vec<Guess>>>;
    fn create_game(&self, game: Game) -> BoxFuture<'static, StorageResult<Game>>;
    fn create_guess(&self, guess: Guess) -> BoxFuture<'static, StorageResult<Guess>>;
    fn create_phrase(&self, phrase: Phrase) -> BoxFuture<'static, StorageResult<Phrase>>;
    /// Replace metadata (labels, finalizers) and spec; status is left alone.
    fn update_game(&self, game: Game) -> BoxFuture<'static, StorageResult<Game>>;
    /// Replace spec and status; metadata is left alone.
    fn patch_game(
        &self,
        game: Game,
        options: PatchOptions,
    ) -> BoxFuture<'static, StorageResult<Game>>;
    /// Replace metadata (labels, finalizers) and spec.
    fn update_guess(&self, guess: Guess) -> BoxFuture<'static, StorageResult<Guess>>;
    fn delete_game(&self, key: ObjectKey) -> BoxFuture<'static, StorageResult<()>>;
    fn delete_guess(&self, key: ObjectKey) -> BoxFuture<'static, StorageResult<()>>;
    /// Subscribe to change notifications for every kind.
    fn watch(&self) -> broadcast::Receiver<WatchEvent>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
