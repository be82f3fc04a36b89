//! Business logic behind the resource routes. Handlers only create, read and
//! delete objects; everything derived is left to the reconcilers.

use tracing::info;
use uuid::Uuid;
use validator::ValidationError;

use crate::{
    dao::models::{Game, Guess, ObjectKey},
    dto::{
        resources::{CreateGameRequest, CreateGuessRequest, GameResponse, GuessResponse},
        validation::validate_object_name,
    },
    error::ServiceError,
    state::SharedState,
};

/// Keeps generated guess names within the object name limit.
const GENERATED_SUFFIX_LEN: usize = 6;

fn ensure_namespace(namespace: &str) -> Result<(), ServiceError> {
    validate_object_name(namespace).map_err(|err: ValidationError| {
        ServiceError::InvalidInput(format!(
            "namespace `{namespace}`: {}",
            err.message.unwrap_or_default()
        ))
    })
}

/// Persist a new game; its status fills in once it has been reconciled.
pub async fn create_game(
    state: &SharedState,
    namespace: &str,
    request: CreateGameRequest,
) -> Result<GameResponse, ServiceError> {
    ensure_namespace(namespace)?;
    let game = state
        .store()
        .create_game(Game::new(namespace, request.name))
        .await?;
    info!(game = %game.key(), "game created");
    Ok(game.into())
}

/// Fetch one game.
pub async fn get_game(
    state: &SharedState,
    namespace: &str,
    name: &str,
) -> Result<GameResponse, ServiceError> {
    ensure_namespace(namespace)?;
    let key = ObjectKey::new(namespace, name);
    match state.store().get_game(key.clone()).await? {
        Some(game) => Ok(game.into()),
        None => Err(ServiceError::NotFound(format!("game `{key}` not found"))),
    }
}

/// List the games of a namespace.
pub async fn list_games(
    state: &SharedState,
    namespace: &str,
) -> Result<Vec<GameResponse>, ServiceError> {
    ensure_namespace(namespace)?;
    let games = state.store().list_games(Some(namespace.to_owned())).await?;
    Ok(games.into_iter().map(Into::into).collect())
}

/// Request deletion. The game lingers until its guesses have been removed.
pub async fn delete_game(
    state: &SharedState,
    namespace: &str,
    name: &str,
) -> Result<(), ServiceError> {
    ensure_namespace(namespace)?;
    let key = ObjectKey::new(namespace, name);
    state.store().delete_game(key.clone()).await?;
    info!(game = %key, "game deletion requested");
    Ok(())
}

/// Persist a guess. The game it names need not exist yet.
pub async fn create_guess(
    state: &SharedState,
    namespace: &str,
    request: CreateGuessRequest,
) -> Result<GuessResponse, ServiceError> {
    ensure_namespace(namespace)?;
    let name = request.name.unwrap_or_else(|| {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}-{}", request.game, &suffix[..GENERATED_SUFFIX_LEN])
    });
    let guess = state
        .store()
        .create_guess(Guess::new(namespace, name, request.game, request.guess))
        .await?;
    info!(guess = %guess.key(), game = %guess.spec.game, "guess submitted");
    Ok(guess.into())
}
