use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::{handlers, middleware::metrics_middleware, pokemon, sync};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Cached records
        .route("/pokemon", get(pokemon::list_pokemon))
        .route(
            "/pokemon/by-number/{number}",
            get(pokemon::get_pokemon_by_number),
        )
        .route("/pokemon/{name}", get(pokemon::get_pokemon))
        .route("/pokemon/{name}/image", get(pokemon::get_pokemon_image))
        // Sync control
        .route("/sync", post(sync::start_sync))
        .route("/sync/status", get(sync::get_status))
        .route("/reset", post(sync::reset));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(metrics_middleware)),
        )
        .with_state(state)
}
