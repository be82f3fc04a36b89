use axum::Router;

use crate::state::SharedState;

/// Swagger UI and OpenAPI document.
pub mod docs;
/// Health check endpoint.
pub mod health;
/// Game and guess endpoints.
pub mod resources;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router().merge(resources::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
