//! Proposal draft handlers.

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use proposer_core::repository::draft::ProposalDraftStore;

use crate::cli::draft::summary_json;
use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// GET /api/v1/drafts - List saved drafts, most recent first.
pub async fn list_drafts(
    State(state): State<AppState>,
    _auth: Authenticated,
) -> Result<Json<ApiResponse<Vec<serde_json::Value>>>, AppError> {
    let start = Instant::now();
    let drafts = state.controller.drafts().list_drafts().await?;
    let items = drafts.iter().map(summary_json).collect();
    Ok(Json(
        ApiResponse::success(items, start).with_link("self", "/api/v1/drafts"),
    ))
}
