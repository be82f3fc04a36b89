//! Reverse index from guesses to the games they belong to.

use tracing::warn;

use crate::dao::models::{DynamicObject, ObjectKey};

/// Map a changed guess to the game it belongs to.
///
/// Anything but a guess naming a game maps to nothing.
pub fn guess_to_game(object: &DynamicObject) -> Vec<ObjectKey> {
    let DynamicObject::Guess(guess) = object else {
        warn!(kind = %object.kind(), object = %object.key(), "cannot map non-guess to a game");
        return Vec::new();
    };

    if guess.spec.game.is_empty() {
        warn!(guess = %guess.key(), "guess does not name a game");
        return Vec::new();
    }

    vec![ObjectKey::new(
        guess.metadata.namespace.clone(),
        guess.spec.game.clone(),
    )]
}
