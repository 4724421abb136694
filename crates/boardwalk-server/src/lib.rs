pub mod api;
pub mod broadcast;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod locks;
pub mod repository;
pub mod session;
pub mod state;
pub mod ws;

use axum::Router;
use tower_http::cors::CorsLayer;

use config::ServerConfig;
use state::AppState;

/// Build the Axum router and application state from a config.
pub fn build_app(config: ServerConfig) -> (Router<()>, AppState) {
    let state = AppState::new(config);

    let api_routes = Router::new()
        .route("/rooms", axum::routing::post(api::create_room))
        .route("/rooms/join", axum::routing::post(api::join_room))
        .route("/rooms/{code}", axum::routing::get(api::get_room));

    let app = Router::new()
        .route("/ws", axum::routing::get(ws::ws_handler))
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
        .with_state(state.clone());

    (app, state)
}
