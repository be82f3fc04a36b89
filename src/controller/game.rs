//! Reconciliation of games: provisioning, status derivation and cleanup.

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, instrument, warn};

use crate::{
    controller::{
        error::ReconcileError,
        finalizer::{self, Flow},
        guesses::{self, ClassifiedGuesses},
        phase::derive_status,
        phrase::{self, BabbleGenerator, PhraseGenerator},
    },
    dao::{
        models::{Game, ObjectKey},
        object_store::{ObjectStore, PatchOptions},
    },
    runtime::{Action, Reconciler},
};

/// Guesses a game accepts before it is lost.
pub const DEFAULT_MAX_GUESSES: usize = 5;

/// Construction-time settings of the [`GameReconciler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameReconcilerConfig {
    /// Guesses allowed before an unsolved game fails.
    pub max_guesses: usize,
}

impl Default for GameReconcilerConfig {
    fn default() -> Self {
        Self {
            max_guesses: DEFAULT_MAX_GUESSES,
        }
    }
}

/// Drives a game towards the status implied by its guesses.
pub struct GameReconciler {
    store: Arc<dyn ObjectStore>,
    phrases: Arc<dyn PhraseGenerator>,
    config: GameReconcilerConfig,
}

/// Inputs gathered by the side-effecting part of a run.
#[derive(Debug, Default)]
struct BodyOutcome {
    solution: Option<String>,
    guesses: Option<ClassifiedGuesses>,
    errors: Vec<ReconcileError>,
}

impl GameReconciler {
    /// Reconciler generating two-word phrases for new games.
    pub fn new(store: Arc<dyn ObjectStore>, config: GameReconcilerConfig) -> Self {
        Self {
            store,
            phrases: Arc::new(BabbleGenerator::default()),
            config,
        }
    }

    /// Replace the source of new solution phrases.
    pub fn with_phrase_generator(mut self, phrases: Arc<dyn PhraseGenerator>) -> Self {
        self.phrases = phrases;
        self
    }

    /// Reconcile one game.
    ///
    /// Once the finalizer step lets the run continue, the status is written
    /// even when provisioning or listing failed. Every failure of the run is
    /// returned together.
    #[instrument(skip(self), fields(game = %key))]
    pub async fn reconcile_game(&self, key: ObjectKey) -> Result<Action, ReconcileError> {
        let Some(game) = self.store.get_game(key).await? else {
            debug!("game no longer exists");
            return Ok(Action::await_change());
        };

        let mut game = match finalizer::apply(self.store.as_ref(), game).await? {
            Flow::Continue(game) => game,
            Flow::Stop => return Ok(Action::await_change()),
        };

        let mut outcome = self.run_body(&mut game).await;
        if let Err(err) = self.write_status(game, &outcome).await {
            warn!(error = %err, "failed to write game status");
            outcome.errors.push(err);
        }

        match ReconcileError::aggregate(outcome.errors) {
            Some(err) => Err(err),
            None => Ok(Action::await_change()),
        }
    }

    async fn run_body(&self, game: &mut Game) -> BodyOutcome {
        let mut outcome = BodyOutcome::default();

        match phrase::ensure_phrase(self.store.as_ref(), self.phrases.as_ref(), game).await {
            Ok(phrase) => {
                outcome.solution = phrase.text().map(str::to_owned);
                if outcome.solution.is_none() {
                    warn!(phrase = %phrase.key(), "solution record carries no phrase");
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to provision solution");
                outcome.errors.push(err);
            }
        }

        match guesses::aggregate(self.store.as_ref(), game).await {
            Ok(classified) => outcome.guesses = Some(classified),
            Err(err) => {
                warn!(error = %err, "failed to list guesses");
                outcome.errors.push(err.into());
            }
        }

        outcome
    }

    async fn write_status(&self, mut game: Game, outcome: &BodyOutcome) -> Result<Game, ReconcileError> {
        derive_status(
            &mut game.status,
            outcome.guesses.as_ref(),
            outcome.solution.as_deref(),
            self.config.max_guesses,
        );

        if !outcome.errors.is_empty() {
            let messages: Vec<_> = outcome.errors.iter().map(ToString::to_string).collect();
            game.status.status = format!("reconcile failed: {}", messages.join("; "));
        }

        debug!(
            phase = ?game.status.phase,
            guesses = game.status.number_of_guesses,
            "writing game status"
        );

        let options = PatchOptions {
            observe_generation: outcome.errors.is_empty(),
        };
        Ok(self.store.patch_game(game, options).await?)
    }
}

impl Reconciler for GameReconciler {
    type Error = ReconcileError;

    fn reconcile(&self, key: ObjectKey) -> BoxFuture<'_, Result<Action, Self::Error>> {
        Box::pin(self.reconcile_game(key))
    }

    fn is_conflict(error: &Self::Error) -> bool {
        error.is_conflict()
    }
}
