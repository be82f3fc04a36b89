//! Status derivation for a game from its guesses and solution.

use crate::dao::models::{GamePhase, GameStatus};

use super::{guesses::ClassifiedGuesses, masking::mask};

/// Shown in place of the phrase once an unsolved game runs out of guesses.
pub const FAILED_MARKER: &str = "FAILED";

/// Status message of a game without guesses.
pub const MSG_WAITING: &str = "waiting for guesses";
/// Status message of a game being played.
pub const MSG_IN_PROGRESS: &str = "in progress";
/// Status message of a game whose phrase was found.
pub const MSG_SOLVED: &str = "solved";
/// Status message of a game that ran past its guess limit.
pub const MSG_OUT_OF_GUESSES: &str = "out of guesses";

/// Phase reached from `current` after `count` guesses.
///
/// Rules apply in order and later ones win; an unset phase starts at
/// [`GamePhase::Pending`]. Nothing ever leads to [`GamePhase::Creating`].
/// An active game never drops back to pending when its guesses disappear.
pub fn next_phase(current: Option<GamePhase>, count: usize, max_guesses: usize) -> GamePhase {
    let mut phase = current.unwrap_or(GamePhase::Pending);
    if count > 0 {
        phase = GamePhase::Active;
    }
    if count > max_guesses {
        phase = GamePhase::Finished;
    }
    phase
}

/// Recompute the guess-derived fields of `status`.
///
/// An unset phase always becomes [`GamePhase::Pending`]. Without guesses
/// every other derived field keeps its previous value. Without a solution the
/// count and phase are refreshed but `current` is not.
pub fn derive_status(
    status: &mut GameStatus,
    guesses: Option<&ClassifiedGuesses>,
    solution: Option<&str>,
    max_guesses: usize,
) {
    status.phase.get_or_insert(GamePhase::Pending);
    let Some(guesses) = guesses else {
        return;
    };

    status.number_of_guesses = guesses.total();
    let exhausted = status.number_of_guesses > max_guesses;

    let mut solved = false;
    if let Some(solution) = solution {
        status.current = mask(solution, guesses);
        solved = status.current == solution;
        if !solved && exhausted {
            status.current = FAILED_MARKER.to_owned();
        }
    }

    let phase = next_phase(status.phase, status.number_of_guesses, max_guesses);
    status.phase = Some(phase);

    status.status = if solved && status.number_of_guesses > 0 {
        MSG_SOLVED
    } else {
        match phase {
            GamePhase::Pending | GamePhase::Creating => MSG_WAITING,
            GamePhase::Active => MSG_IN_PROGRESS,
            GamePhase::Finished => MSG_OUT_OF_GUESSES,
        }
    }
    .to_owned();
}
