use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;
use tokio::sync::broadcast;

use crate::dao::{
    models::{Game, Guess, LabelSelector, ObjectKey, Phrase, Resource},
    storage::{StorageError, StorageResult},
};

use super::{
    EventType, ObjectStore, PatchOptions, WatchEvent,
    semantics::{
        DeleteOutcome, WriteOutcome, merge_game_patch, merge_game_update, merge_guess_update,
        plan_delete, plan_write, prepare_create,
    },
};

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Process-local object store backed by concurrent hash maps.
///
/// Used when no external database is configured and as the store behind the
/// controller tests.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    games: DashMap<ObjectKey, Game>,
    guesses: DashMap<ObjectKey, Guess>,
    phrases: DashMap<ObjectKey, Phrase>,
    versions: AtomicU64,
    events: broadcast::Sender<WatchEvent>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        let (events, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(MemoryInner {
                games: DashMap::new(),
                guesses: DashMap::new(),
                phrases: DashMap::new(),
                versions: AtomicU64::new(0),
                events,
            }),
        }
    }
}

impl MemoryInner {
    fn next_version(&self) -> String {
        (self.versions.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    fn publish<T: Resource>(&self, event_type: EventType, object: T) {
        // No subscribers is not an error.
        let _ = self
            .events
            .send(WatchEvent::new(event_type, object.into_dynamic()));
    }

    fn get<T: Resource>(&self, bucket: &DashMap<ObjectKey, T>, key: &ObjectKey) -> Option<T> {
        bucket.get(key).map(|entry| entry.value().clone())
    }

    fn list<T, F>(&self, bucket: &DashMap<ObjectKey, T>, filter: F) -> Vec<T>
    where
        T: Resource,
        F: Fn(&T) -> bool,
    {
        let mut items: Vec<T> = bucket
            .iter()
            .filter(|entry| filter(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        items.sort_by_key(|item| item.metadata().key());
        items
    }

    fn create<T: Resource>(
        &self,
        bucket: &DashMap<ObjectKey, T>,
        object: T,
    ) -> StorageResult<T> {
        let key = object.metadata().key();
        match bucket.entry(key.clone()) {
            Entry::Occupied(_) => Err(StorageError::already_exists(T::KIND, key)),
            Entry::Vacant(slot) => {
                let mut created = prepare_create(object);
                created.metadata_mut().resource_version = Some(self.next_version());
                slot.insert(created.clone());
                self.publish(EventType::Added, created.clone());
                Ok(created)
            }
        }
    }

    fn write<T, M>(
        &self,
        bucket: &DashMap<ObjectKey, T>,
        incoming: T,
        merge: M,
    ) -> StorageResult<T>
    where
        T: Resource,
        M: FnOnce(&T, T) -> T,
    {
        let key = incoming.metadata().key();
        let version = incoming.metadata().resource_version.clone();
        match bucket.entry(key.clone()) {
            Entry::Vacant(_) => Err(StorageError::not_found(T::KIND, key)),
            Entry::Occupied(mut slot) => {
                let next = merge(slot.get(), incoming);
                match plan_write(slot.get(), version.as_deref(), next)? {
                    WriteOutcome::Unchanged => Ok(slot.get().clone()),
                    WriteOutcome::Store(mut next) => {
                        next.metadata_mut().resource_version = Some(self.next_version());
                        slot.insert(next.clone());
                        self.publish(EventType::Modified, next.clone());
                        Ok(next)
                    }
                    WriteOutcome::Remove(next) => {
                        slot.remove();
                        self.publish(EventType::Deleted, next.clone());
                        Ok(next)
                    }
                }
            }
        }
    }

    fn delete<T: Resource>(
        &self,
        bucket: &DashMap<ObjectKey, T>,
        key: ObjectKey,
    ) -> StorageResult<()> {
        match bucket.entry(key.clone()) {
            Entry::Vacant(_) => Err(StorageError::not_found(T::KIND, key)),
            Entry::Occupied(mut slot) => {
                match plan_delete(slot.get()) {
                    DeleteOutcome::Remove => {
                        let removed = slot.remove();
                        self.publish(EventType::Deleted, removed);
                    }
                    DeleteOutcome::MarkDeleting(mut marked) => {
                        marked.metadata_mut().resource_version = Some(self.next_version());
                        slot.insert(marked.clone());
                        self.publish(EventType::Modified, marked);
                    }
                    DeleteOutcome::AlreadyDeleting => {}
                }
                Ok(())
            }
        }
    }
}

impl ObjectStore for MemoryStore {
    fn get_game(&self, key: ObjectKey) -> BoxFuture<'static, StorageResult<Option<Game>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.get(&inner.games, &key)) })
    }

    fn get_guess(&self, key: ObjectKey) -> BoxFuture<'static, StorageResult<Option<Guess>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.get(&inner.guesses, &key)) })
    }

    fn get_phrase(&self, key: ObjectKey) -> BoxFuture<'static, StorageResult<Option<Phrase>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.get(&inner.phrases, &key)) })
    }

    fn list_games(
        &self,
        namespace: Option<String>,
    ) -> BoxFuture<'static, StorageResult<Vec<Game>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner.list(&inner.games, |game| {
                namespace
                    .as_deref()
                    .is_none_or(|ns| game.metadata.namespace == ns)
            }))
        })
    }

    fn list_guesses(
        &self,
        namespace: Option<String>,
        selector: LabelSelector,
    ) -> BoxFuture<'static, StorageResult<Vec<Guess>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner.list(&inner.guesses, |guess| {
                namespace
                    .as_deref()
                    .is_none_or(|ns| guess.metadata.namespace == ns)
                    && selector.matches(&guess.metadata.labels)
            }))
        })
    }

    fn create_game(&self, game: Game) -> BoxFuture<'static, StorageResult<Game>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.create(&inner.games, game) })
    }

    fn create_guess(&self, guess: Guess) -> BoxFuture<'static, StorageResult<Guess>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.create(&inner.guesses, guess) })
    }

    fn create_phrase(&self, phrase: Phrase) -> BoxFuture<'static, StorageResult<Phrase>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.create(&inner.phrases, phrase) })
    }

    fn update_game(&self, game: Game) -> BoxFuture<'static, StorageResult<Game>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.write(&inner.games, game, merge_game_update) })
    }

    fn patch_game(
        &self,
        game: Game,
        options: PatchOptions,
    ) -> BoxFuture<'static, StorageResult<Game>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.write(&inner.games, game, |stored, incoming| {
                merge_game_patch(stored, incoming, options)
            })
        })
    }

    fn update_guess(&self, guess: Guess) -> BoxFuture<'static, StorageResult<Guess>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.write(&inner.guesses, guess, merge_guess_update) })
    }

    fn delete_game(&self, key: ObjectKey) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.delete(&inner.games, key) })
    }

    fn delete_guess(&self, key: ObjectKey) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.delete(&inner.guesses, key) })
    }

    fn watch(&self) -> broadcast::Receiver<WatchEvent> {
        self.inner.events.subscribe()
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
