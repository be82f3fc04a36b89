//! Reconcilers for games and guesses together with the pieces they are
//! built from.

/// Errors raised by a reconciliation run.
pub mod error;
/// Deletion guard for games.
pub mod finalizer;
/// Game reconciler.
pub mod game;
/// Guess labeler.
pub mod guess;
/// Guess collection and classification.
pub mod guesses;
/// Guess to game reverse index.
pub mod mapping;
/// Solution masking.
pub mod masking;
/// Phase and status derivation.
pub mod phase;
/// Solution phrase provisioning.
pub mod phrase;

pub use error::ReconcileError;
pub use game::{GameReconciler, GameReconcilerConfig};
pub use guess::GuessReconciler;
pub use mapping::guess_to_game;
