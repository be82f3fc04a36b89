use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::dao::models::{Game, GamePhase, Guess};

use super::{
    format_system_time,
    validation::{validate_game_name, validate_guess_text, validate_object_name},
};

/// Payload creating a new game.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateGameRequest {
    #[validate(custom(function = "validate_game_name"))]
    pub name: String,
}

/// Payload submitting a guess against a game.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateGuessRequest {
    /// Name of the guess record; generated when omitted.
    #[serde(default)]
    pub name: Option<String>,
    /// Game the guess is made against.
    pub game: String,
    /// A single letter or an attempt at the whole phrase.
    pub guess: String,
}

impl Validate for CreateGuessRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(ref name) = self.name {
            if let Err(e) = validate_object_name(name) {
                errors.add("name", e);
            }
        }
        if let Err(e) = validate_game_name(&self.game) {
            errors.add("game", e);
        }
        if let Err(e) = validate_guess_text(&self.guess) {
            errors.add("guess", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Public view of a game. The solution is never exposed.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameResponse {
    pub namespace: String,
    pub name: String,
    pub generation: i64,
    pub phase: Option<GamePhase>,
    /// Revealed letters, the full phrase once solved, or `FAILED`.
    pub current: String,
    pub number_of_guesses: usize,
    pub status: String,
    pub observed_generation: Option<i64>,
    /// RFC 3339 time deletion was requested, while cleanup is pending.
    pub deletion_requested_at: Option<String>,
}

impl From<Game> for GameResponse {
    fn from(game: Game) -> Self {
        Self {
            deletion_requested_at: game.metadata.deletion_timestamp.map(format_system_time),
            namespace: game.metadata.namespace,
            name: game.metadata.name,
            generation: game.metadata.generation,
            phase: game.status.phase,
            current: game.status.current,
            number_of_guesses: game.status.number_of_guesses,
            status: game.status.status,
            observed_generation: game.status.observed_generation,
        }
    }
}

/// Stored guess as returned after submission.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GuessResponse {
    pub namespace: String,
    pub name: String,
    pub game: String,
    pub guess: String,
}

impl From<Guess> for GuessResponse {
    fn from(guess: Guess) -> Self {
        Self {
            namespace: guess.metadata.namespace,
            name: guess.metadata.name,
            game: guess.spec.game,
            guess: guess.spec.guess,
        }
    }
}
