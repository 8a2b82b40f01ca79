//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`. Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Conversations
        .route(
            "/conversations",
            post(handlers::conversation::start_conversation),
        )
        .route(
            "/conversations/{id}",
            get(handlers::conversation::get_conversation)
                .delete(handlers::conversation::cancel_conversation),
        )
        .route(
            "/conversations/{id}/events",
            post(handlers::conversation::send_event),
        )
        .route(
            "/conversations/{id}/resume",
            post(handlers::conversation::resume_conversation),
        )
        // Registry and drafts
        .route("/engineers", get(handlers::engineer::list_engineers))
        .route("/drafts", get(handlers::draft::list_drafts));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint (no auth required).
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
