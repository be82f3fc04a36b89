use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use validator::Validate;

use crate::{
    dto::resources::{CreateGameRequest, CreateGuessRequest, GameResponse, GuessResponse},
    error::AppError,
    services::resource_service,
    state::SharedState,
};

/// Routes managing games and guesses inside a namespace.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/namespaces/{namespace}/games",
            post(create_game).get(list_games),
        )
        .route(
            "/namespaces/{namespace}/games/{name}",
            get(get_game).delete(delete_game),
        )
        .route("/namespaces/{namespace}/guesses", post(create_guess))
}

/// Create a game; a solution is provisioned asynchronously.
#[utoipa::path(
    post,
    path = "/namespaces/{namespace}/games",
    tag = "games",
    params(("namespace" = String, Path, description = "Namespace to create the game in")),
    request_body = CreateGameRequest,
    responses(
        (status = 201, description = "Game created", body = GameResponse),
        (status = 400, description = "Invalid name"),
        (status = 409, description = "Game already exists")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    Path(namespace): Path<String>,
    Json(payload): Json<CreateGameRequest>,
) -> Result<(StatusCode, Json<GameResponse>), AppError> {
    payload.validate()?;
    let game = resource_service::create_game(&state, &namespace, payload).await?;
    Ok((StatusCode::CREATED, Json(game)))
}

/// List the games of a namespace.
#[utoipa::path(
    get,
    path = "/namespaces/{namespace}/games",
    tag = "games",
    params(("namespace" = String, Path, description = "Namespace to list")),
    responses((status = 200, description = "Games in the namespace", body = [GameResponse]))
)]
pub async fn list_games(
    State(state): State<SharedState>,
    Path(namespace): Path<String>,
) -> Result<Json<Vec<GameResponse>>, AppError> {
    let games = resource_service::list_games(&state, &namespace).await?;
    Ok(Json(games))
}

/// Fetch a game with its current status.
#[utoipa::path(
    get,
    path = "/namespaces/{namespace}/games/{name}",
    tag = "games",
    params(
        ("namespace" = String, Path, description = "Namespace of the game"),
        ("name" = String, Path, description = "Name of the game")
    ),
    responses(
        (status = 200, description = "Game found", body = GameResponse),
        (status = 404, description = "Game not found")
    )
)]
pub async fn get_game(
    State(state): State<SharedState>,
    Path((namespace, name)): Path<(String, String)>,
) -> Result<Json<GameResponse>, AppError> {
    let game = resource_service::get_game(&state, &namespace, &name).await?;
    Ok(Json(game))
}

/// Request deletion of a game and, through its finalizer, its guesses.
#[utoipa::path(
    delete,
    path = "/namespaces/{namespace}/games/{name}",
    tag = "games",
    params(
        ("namespace" = String, Path, description = "Namespace of the game"),
        ("name" = String, Path, description = "Name of the game")
    ),
    responses(
        (status = 202, description = "Deletion requested"),
        (status = 404, description = "Game not found")
    )
)]
pub async fn delete_game(
    State(state): State<SharedState>,
    Path((namespace, name)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    resource_service::delete_game(&state, &namespace, &name).await?;
    Ok(StatusCode::ACCEPTED)
}

/// Submit a guess against a game.
#[utoipa::path(
    post,
    path = "/namespaces/{namespace}/guesses",
    tag = "guesses",
    params(("namespace" = String, Path, description = "Namespace of the game")),
    request_body = CreateGuessRequest,
    responses(
        (status = 201, description = "Guess recorded", body = GuessResponse),
        (status = 400, description = "Invalid guess"),
        (status = 409, description = "Guess name already taken")
    )
)]
pub async fn create_guess(
    State(state): State<SharedState>,
    Path(namespace): Path<String>,
    Json(payload): Json<CreateGuessRequest>,
) -> Result<(StatusCode, Json<GuessResponse>), AppError> {
    payload.validate()?;
    let guess = resource_service::create_guess(&state, &namespace, payload).await?;
    Ok((StatusCode::CREATED, Json(guess)))
}
