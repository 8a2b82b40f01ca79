//! Engineer registry handlers.

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use proposer_core::repository::engineer::EngineerRegistry;
use proposer_types::engineer::Engineer;

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// GET /api/v1/engineers - List registry engineers ordered by name.
pub async fn list_engineers(
    State(state): State<AppState>,
    _auth: Authenticated,
) -> Result<Json<ApiResponse<Vec<Engineer>>>, AppError> {
    let start = Instant::now();
    let engineers = state.controller.registry().list().await?;
    Ok(Json(
        ApiResponse::success(engineers, start).with_link("self", "/api/v1/engineers"),
    ))
}
