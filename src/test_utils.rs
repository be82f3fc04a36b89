//! Doubles shared by unit tests.

use std::{
    io,
    sync::atomic::{AtomicBool, Ordering},
};

use futures::future::BoxFuture;
use tokio::sync::broadcast;

use crate::{
    controller::phrase::PhraseGenerator,
    dao::{
        models::{Game, Guess, LabelSelector, ObjectKey, Phrase},
        object_store::{MemoryStore, ObjectStore, PatchOptions, WatchEvent},
        storage::{StorageError, StorageResult},
    },
};

/// Always hands out the same phrase.
pub struct FixedPhrase(String);

impl FixedPhrase {
    pub fn new(phrase: impl Into<String>) -> Self {
        Self(phrase.into())
    }
}

impl PhraseGenerator for FixedPhrase {
    fn generate(&self) -> String {
        self.0.clone()
    }
}

/// In-memory store whose individual operations can be switched to fail.
#[derive(Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    phrase_creates: AtomicBool,
    guess_deletes: AtomicBool,
    guess_lists: AtomicBool,
    game_patches: AtomicBool,
    game_patch_races: AtomicBool,
}

impl FaultyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn fail_phrase_creates(&self, fail: bool) {
        self.phrase_creates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_guess_deletes(&self, fail: bool) {
        self.guess_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_guess_lists(&self, fail: bool) {
        self.guess_lists.store(fail, Ordering::SeqCst);
    }

    pub fn fail_game_patches(&self, fail: bool) {
        self.game_patches.store(fail, Ordering::SeqCst);
    }

    /// Let another writer update the game right before the next status patch.
    pub fn race_next_game_patch(&self) {
        self.game_patch_races.store(true, Ordering::SeqCst);
    }
}

fn tripped(flag: &AtomicBool) -> bool {
    flag.load(Ordering::SeqCst)
}

fn failure<T: Send + 'static>(operation: &str) -> BoxFuture<'static, StorageResult<T>> {
    let message = format!("injected {operation} failure");
    Box::pin(async move {
        Err(StorageError::unavailable(
            message.clone(),
            io::Error::other(message),
        ))
    })
}

impl ObjectStore for FaultyStore {
    fn get_game(&self, key: ObjectKey) -> BoxFuture<'static, StorageResult<Option<Game>>> {
        self.inner.get_game(key)
    }

    fn get_guess(&self, key: ObjectKey) -> BoxFuture<'static, StorageResult<Option<Guess>>> {
        self.inner.get_guess(key)
    }

    fn get_phrase(&self, key: ObjectKey) -> BoxFuture<'static, StorageResult<Option<Phrase>>> {
        self.inner.get_phrase(key)
    }

    fn list_games(
        &self,
        namespace: Option<String>,
    ) -> BoxFuture<'static, StorageResult<Vec<Game>>> {
        self.inner.list_games(namespace)
    }

    fn list_guesses(
        &self,
        namespace: Option<String>,
        selector: LabelSelector,
    ) -> BoxFuture<'static, StorageResult<Vec<Guess>>> {
        if tripped(&self.guess_lists) {
            return failure("list");
        }
        self.inner.list_guesses(namespace, selector)
    }

    fn create_game(&self, game: Game) -> BoxFuture<'static, StorageResult<Game>> {
        self.inner.create_game(game)
    }

    fn create_guess(&self, guess: Guess) -> BoxFuture<'static, StorageResult<Guess>> {
        self.inner.create_guess(guess)
    }

    fn create_phrase(&self, phrase: Phrase) -> BoxFuture<'static, StorageResult<Phrase>> {
        if tripped(&self.phrase_creates) {
            return failure("create");
        }
        self.inner.create_phrase(phrase)
    }

    fn update_game(&self, game: Game) -> BoxFuture<'static, StorageResult<Game>> {
        self.inner.update_game(game)
    }

    fn patch_game(
        &self,
        game: Game,
        options: PatchOptions,
    ) -> BoxFuture<'static, StorageResult<Game>> {
        if tripped(&self.game_patches) {
            return failure("patch");
        }
        if self.game_patch_races.swap(false, Ordering::SeqCst) {
            let inner = self.inner.clone();
            return Box::pin(async move {
                if let Some(mut current) = inner.get_game(game.key()).await? {
                    current.status.status = "written elsewhere".to_owned();
                    inner.patch_game(current, PatchOptions::default()).await?;
                }
                inner.patch_game(game, options).await
            });
        }
        self.inner.patch_game(game, options)
    }

    fn update_guess(&self, guess: Guess) -> BoxFuture<'static, StorageResult<Guess>> {
        self.inner.update_guess(guess)
    }

    fn delete_game(&self, key: ObjectKey) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.delete_game(key)
    }

    fn delete_guess(&self, key: ObjectKey) -> BoxFuture<'static, StorageResult<()>> {
        if tripped(&self.guess_deletes) {
            return failure("delete");
        }
        self.inner.delete_guess(key)
    }

    fn watch(&self) -> broadcast::Receiver<WatchEvent> {
        self.inner.watch()
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.health_check()
    }
}
