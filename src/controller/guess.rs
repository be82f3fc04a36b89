//! Labeling of guesses with the game they target.

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, instrument, warn};

use crate::{
    controller::error::ReconcileError,
    dao::{
        models::{GAME_LABEL, ObjectKey},
        object_store::ObjectStore,
    },
    runtime::{Action, Reconciler},
};

/// Stamps every guess with the label naming its game, which is what the
/// game side selects guesses by.
pub struct GuessReconciler {
    store: Arc<dyn ObjectStore>,
}

impl GuessReconciler {
    /// Labeler writing through `store`.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Stamp the game label on one guess.
    #[instrument(skip(self), fields(guess = %key))]
    pub async fn reconcile_guess(&self, key: ObjectKey) -> Result<Action, ReconcileError> {
        let Some(mut guess) = self.store.get_guess(key).await? else {
            return Ok(Action::await_change());
        };

        if guess.metadata.is_deleting() {
            return Ok(Action::await_change());
        }

        if guess.spec.game.is_empty() {
            warn!("guess does not name a game; leaving it unlabelled");
            return Ok(Action::await_change());
        }

        if guess.game_label() == Some(guess.spec.game.as_str()) {
            return Ok(Action::await_change());
        }

        guess
            .metadata
            .labels
            .insert(GAME_LABEL.to_owned(), guess.spec.game.clone());
        self.store.update_guess(guess).await?;
        debug!("labelled guess with its game");

        Ok(Action::await_change())
    }
}

impl Reconciler for GuessReconciler {
    type Error = ReconcileError;

    fn reconcile(&self, key: ObjectKey) -> BoxFuture<'_, Result<Action, Self::Error>> {
        Box::pin(self.reconcile_guess(key))
    }

    fn is_conflict(error: &Self::Error) -> bool {
        error.is_conflict()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::{models::Guess, object_store::MemoryStore};

    fn key() -> ObjectKey {
        ObjectKey::new("ns", "guess-1")
    }

    #[tokio::test]
    async fn stamps_missing_label() {
        let store = Arc::new(MemoryStore::new());
        store
            .create_guess(Guess::new("ns", "guess-1", "g1", "a"))
            .await
            .unwrap();

        GuessReconciler::new(store.clone())
            .reconcile_guess(key())
            .await
            .unwrap();

        let guess = store.get_guess(key()).await.unwrap().unwrap();
        assert_eq!(guess.game_label(), Some("g1"));
    }

    #[tokio::test]
    async fn fixes_wrong_label() {
        let store = Arc::new(MemoryStore::new());
        let mut guess = Guess::new("ns", "guess-1", "g1", "a");
        guess
            .metadata
            .labels
            .insert(GAME_LABEL.to_owned(), "g2".to_owned());
        store.create_guess(guess).await.unwrap();

        GuessReconciler::new(store.clone())
            .reconcile_guess(key())
            .await
            .unwrap();

        let guess = store.get_guess(key()).await.unwrap().unwrap();
        assert_eq!(guess.game_label(), Some("g1"));
    }

    #[tokio::test]
    async fn correct_label_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let mut guess = Guess::new("ns", "guess-1", "g1", "a");
        guess
            .metadata
            .labels
            .insert(GAME_LABEL.to_owned(), "g1".to_owned());
        let created = store.create_guess(guess).await.unwrap();

        GuessReconciler::new(store.clone())
            .reconcile_guess(key())
            .await
            .unwrap();

        let guess = store.get_guess(key()).await.unwrap().unwrap();
        assert_eq!(guess.metadata.resource_version, created.metadata.resource_version);
    }

    #[tokio::test]
    async fn gameless_guess_is_left_alone() {
        let store = Arc::new(MemoryStore::new());
        store
            .create_guess(Guess::new("ns", "guess-1", "", "a"))
            .await
            .unwrap();

        GuessReconciler::new(store.clone())
            .reconcile_guess(key())
            .await
            .unwrap();

        let guess = store.get_guess(key()).await.unwrap().unwrap();
        assert!(guess.metadata.labels.is_empty());
    }

    #[tokio::test]
    async fn missing_guess_is_success() {
        let store = Arc::new(MemoryStore::new());
        GuessReconciler::new(store)
            .reconcile_guess(key())
            .await
            .unwrap();
    }
}
