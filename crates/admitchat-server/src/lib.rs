//! AdmitChat relay server
//!
//! Accepts a conversation on `POST /api/chat`, prepends the admissions system
//! prompt, and streams the provider's reply back as plain text.

pub mod api;
pub mod config;
pub mod prompt;
pub mod relay;

use axum::{
    Router,
    http::{Method, header},
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use api::AppState;
pub use config::ServerConfig;
pub use relay::{CompletionRelay, RelayError};

pub fn build_router(state: AppState) -> Router {
    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(api::health::health))
        .route("/api/chat", post(api::chat::relay_chat))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
