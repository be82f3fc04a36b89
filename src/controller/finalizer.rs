//! Deletion guard that removes a game's guesses before the game goes away.

use tracing::{debug, info, warn};

use crate::{
    controller::error::ReconcileError,
    dao::{
        models::{Game, ObjectMeta},
        object_store::ObjectStore,
    },
};

/// Marker registered on every live game.
pub const GAME_FINALIZER: &str = "nullgame.nullchannel.io/finalizer";

/// Step to take given a game's deletion state and finalizer list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizerAction {
    /// Live game without the marker: register it.
    Register,
    /// Live game already guarded.
    Continue,
    /// Deletion requested and the marker is still ours to remove.
    Cleanup,
    /// Deletion requested and nothing left to do.
    Skip,
}

impl FinalizerAction {
    /// Pick the step for an object with metadata `meta`.
    pub fn decide(meta: &ObjectMeta) -> Self {
        match (meta.is_deleting(), meta.has_finalizer(GAME_FINALIZER)) {
            (false, false) => FinalizerAction::Register,
            (false, true) => FinalizerAction::Continue,
            (true, true) => FinalizerAction::Cleanup,
            (true, false) => FinalizerAction::Skip,
        }
    }
}

/// Whether reconciliation proceeds past the finalizer step.
#[derive(Debug)]
pub enum Flow {
    /// Carry on with the (possibly re-read) game.
    Continue(Game),
    /// The game is being deleted; nothing else to reconcile.
    Stop,
}

/// Run the finalizer step for `game`.
pub async fn apply(store: &dyn ObjectStore, mut game: Game) -> Result<Flow, ReconcileError> {
    match FinalizerAction::decide(&game.metadata) {
        FinalizerAction::Register => {
            game.metadata.add_finalizer(GAME_FINALIZER);
            let game = store.update_game(game).await?;
            debug!(game = %game.key(), "registered finalizer");
            Ok(Flow::Continue(game))
        }
        FinalizerAction::Continue => Ok(Flow::Continue(game)),
        FinalizerAction::Cleanup => {
            cleanup_guesses(store, &game).await?;
            game.metadata.remove_finalizer(GAME_FINALIZER);
            store.update_game(game).await?;
            Ok(Flow::Stop)
        }
        FinalizerAction::Skip => Ok(Flow::Stop),
    }
}

/// Delete every guess labelled with the game's name.
///
/// Guesses already gone count as deleted. Every delete is attempted and all
/// failures are returned together.
pub async fn cleanup_guesses(store: &dyn ObjectStore, game: &Game) -> Result<(), ReconcileError> {
    let guesses = store
        .list_guesses(Some(game.metadata.namespace.clone()), game.guess_selector())
        .await?;

    let total = guesses.len();
    let mut errors = Vec::new();
    for guess in guesses {
        let key = guess.key();
        match store.delete_guess(key.clone()).await {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {}
            Err(source) => {
                warn!(game = %game.key(), guess = %key, error = %source, "failed to delete guess");
                errors.push(ReconcileError::Cleanup { key, source });
            }
        }
    }

    match ReconcileError::aggregate(errors) {
        Some(err) => Err(err),
        None => {
            info!(game = %game.key(), deleted = total, "cleaned up guesses of deleted game");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::{
        dao::{
            models::{GAME_LABEL, Guess, LabelSelector, ObjectKey},
            object_store::MemoryStore,
        },
        test_utils::FaultyStore,
    };

    fn meta(deleting: bool, marked: bool) -> ObjectMeta {
        let mut meta = ObjectMeta::new("ns", "g1");
        if deleting {
            meta.deletion_timestamp = Some(SystemTime::now());
        }
        if marked {
            meta.add_finalizer(GAME_FINALIZER);
        }
        meta
    }

    #[test]
    fn decision_table() {
        assert_eq!(FinalizerAction::decide(&meta(false, false)), FinalizerAction::Register);
        assert_eq!(FinalizerAction::decide(&meta(false, true)), FinalizerAction::Continue);
        assert_eq!(FinalizerAction::decide(&meta(true, true)), FinalizerAction::Cleanup);
        assert_eq!(FinalizerAction::decide(&meta(true, false)), FinalizerAction::Skip);
    }

    async fn seed_guesses(store: &dyn ObjectStore, game: &str, count: usize) {
        for index in 0..count {
            let mut guess = Guess::new("ns", format!("{game}-{index}"), game, "a");
            guess
                .metadata
                .labels
                .insert(GAME_LABEL.to_owned(), game.to_owned());
            store.create_guess(guess).await.unwrap();
        }
    }

    async fn remaining(store: &dyn ObjectStore) -> usize {
        store
            .list_guesses(None, LabelSelector::new())
            .await
            .unwrap()
            .len()
    }

    #[tokio::test]
    async fn register_persists_marker() {
        let store = MemoryStore::new();
        let game = store.create_game(Game::new("ns", "g1")).await.unwrap();

        let flow = apply(&store, game).await.unwrap();

        let Flow::Continue(game) = flow else {
            panic!("expected to continue");
        };
        assert!(game.metadata.has_finalizer(GAME_FINALIZER));
        let stored = store.get_game(game.key()).await.unwrap().unwrap();
        assert!(stored.metadata.has_finalizer(GAME_FINALIZER));
    }

    #[tokio::test]
    async fn deletion_removes_guesses_then_game() {
        let store = MemoryStore::new();
        let mut game = Game::new("ns", "g1");
        game.metadata.add_finalizer(GAME_FINALIZER);
        store.create_game(game).await.unwrap();
        seed_guesses(&store, "g1", 3).await;
        seed_guesses(&store, "g2", 1).await;

        store.delete_game(ObjectKey::new("ns", "g1")).await.unwrap();
        let deleting = store
            .get_game(ObjectKey::new("ns", "g1"))
            .await
            .unwrap()
            .unwrap();

        let flow = apply(&store, deleting).await.unwrap();

        assert!(matches!(flow, Flow::Stop));
        assert_eq!(remaining(&store).await, 1);
        assert!(
            store
                .get_game(ObjectKey::new("ns", "g1"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn cleanup_is_idempotent() {
        let store = MemoryStore::new();
        let game = Game::new("ns", "g1");

        cleanup_guesses(&store, &game).await.unwrap();
        cleanup_guesses(&store, &game).await.unwrap();
    }

    #[tokio::test]
    async fn failed_delete_keeps_marker() {
        let store = FaultyStore::new(MemoryStore::new());
        let mut game = Game::new("ns", "g1");
        game.metadata.add_finalizer(GAME_FINALIZER);
        store.create_game(game).await.unwrap();
        seed_guesses(&store, "g1", 2).await;
        store.delete_game(ObjectKey::new("ns", "g1")).await.unwrap();
        let deleting = store
            .get_game(ObjectKey::new("ns", "g1"))
            .await
            .unwrap()
            .unwrap();

        store.fail_guess_deletes(true);
        let err = apply(&store, deleting).await.unwrap_err();

        match err {
            ReconcileError::Aggregate(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected both deletes to fail, got {other:?}"),
        }
        let stored = store
            .get_game(ObjectKey::new("ns", "g1"))
            .await
            .unwrap()
            .unwrap();
        assert!(stored.metadata.has_finalizer(GAME_FINALIZER));
    }

    #[tokio::test]
    async fn skip_when_marker_already_gone() {
        let store = MemoryStore::new();
        let mut game = Game::new("ns", "g1");
        game.metadata.deletion_timestamp = Some(SystemTime::now());

        assert!(matches!(apply(&store, game).await.unwrap(), Flow::Stop));
    }
}
