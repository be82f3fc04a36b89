use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the null game controller.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::resources::create_game,
        crate::routes::resources::list_games,
        crate::routes::resources::get_game,
        crate::routes::resources::delete_game,
        crate::routes::resources::create_guess,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::resources::CreateGameRequest,
            crate::dto::resources::CreateGuessRequest,
            crate::dto::resources::GameResponse,
            crate::dto::resources::GuessResponse,
            crate::dao::models::GamePhase,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "games", description = "Game lifecycle"),
        (name = "guesses", description = "Guess submission"),
    )
)]
pub struct ApiDoc;
