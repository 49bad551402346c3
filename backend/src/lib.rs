//! XMind MCP server library.
//!
//! This module exposes the application builder for use in tests.

use axum::http::HeaderValue;
use axum::http::{header, Method};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod api;
pub mod config;
pub mod logging;
pub mod mcp;
pub mod openapi;
pub mod state;
pub mod tools;

use state::AppState;

/// Create the Axum application router.
///
/// This function is used both by the main server binary and by integration tests.
pub async fn create_app() -> Router {
    create_app_with_state(AppState::default()).await
}

/// Create the Axum application router with a given state.
pub async fn create_app_with_state(state: AppState) -> Router {
    create_app_with_config(state, Vec::new()).await
}

/// Create the Axum application router with a given state and CORS origins.
///
/// If `cors_allowed_origins` is empty or contains `*`, any origin is allowed.
/// Otherwise, only the specified origins are allowed.
pub async fn create_app_with_config(state: AppState, cors_allowed_origins: Vec<String>) -> Router {
    let swagger_router =
        SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi());

    Router::new()
        .route("/", get(api::info::root))
        .route("/health", get(api::info::health))
        .route("/tools", get(api::info::list_tools))
        // MCP transport: stream out, messages in
        .route("/sse", get(api::sse::sse_stream))
        .route(
            "/messages/{session_id}",
            post(api::messages::post_message).delete(api::messages::delete_session),
        )
        .merge(swagger_router)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&cors_allowed_origins))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::CACHE_CONTROL]);

    // If no origins specified, allow any origin
    // Otherwise, restrict to the specified origins
    if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse::<HeaderValue>().ok())
            .collect();
        cors.allow_origin(origins)
    }
}
