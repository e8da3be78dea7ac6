use axum::{Router, routing::post};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};

pub mod handlers;
pub mod models;

pub use handlers::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // API routes
        .route("/api/download", post(handlers::download_handler))
        .route("/api/chat", post(handlers::chat_handler))
        .with_state(state)
        // Static file serving for the UI
        .nest_service("/", ServeDir::new("static"))
        .layer(cors)
}
