//! Conversation handlers: the HTTP transport of the interview.
//!
//! Events use the tagged `Inbound` JSON shape, e.g.
//! `{"type":"text","text":"Acme Corp"}` or `{"type":"action","token":"edit"}`.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use proposer_core::repository::draft::ProposalDraftStore;
use proposer_types::message::{Inbound, Outbound};
use proposer_types::session::{ConversationId, ConversationState};
use serde::Serialize;

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Replies produced by one event, with the state the conversation is left in.
#[derive(Debug, Serialize)]
pub struct ConversationReply {
    pub conversation_id: String,
    /// `None` once the conversation was cancelled.
    pub state: Option<ConversationState>,
    pub replies: Vec<Outbound>,
}

/// POST /api/v1/conversations - Start a conversation with a fresh id.
pub async fn start_conversation(
    State(state): State<AppState>,
    _auth: Authenticated,
) -> Result<Json<ApiResponse<ConversationReply>>, AppError> {
    let start = Instant::now();
    let id = ConversationId::new(uuid::Uuid::now_v7().to_string());
    let replies = state.controller.handle(&id, Inbound::Start).await;
    respond(&state, id, replies, start).await
}

/// GET /api/v1/conversations/{id} - Current state of a live conversation.
pub async fn get_conversation(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ConversationReply>>, AppError> {
    let start = Instant::now();
    let id = live_conversation(&state, id)?;
    respond(&state, id, Vec::new(), start).await
}

/// POST /api/v1/conversations/{id}/events - Apply one user event.
pub async fn send_event(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<String>,
    Json(event): Json<Inbound>,
) -> Result<Json<ApiResponse<ConversationReply>>, AppError> {
    let start = Instant::now();
    validate_event(&event)?;
    let id = if matches!(event, Inbound::Start) {
        ConversationId::new(id)
    } else {
        live_conversation(&state, id)?
    };

    let replies = state.controller.handle(&id, event).await;
    respond(&state, id, replies, start).await
}

/// POST /api/v1/conversations/{id}/resume - Restore a saved draft.
pub async fn resume_conversation(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ConversationReply>>, AppError> {
    let start = Instant::now();
    let id = ConversationId::new(id);
    let draft = state
        .controller
        .drafts()
        .load_draft(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No saved draft for conversation '{id}'")))?;

    let replies = state
        .controller
        .resume(&draft)
        .await
        .map_err(|e| AppError::Internal(format!("Saved draft is unreadable: {e}")))?;
    respond(&state, id, replies, start).await
}

/// DELETE /api/v1/conversations/{id} - Abandon a conversation.
pub async fn cancel_conversation(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ConversationReply>>, AppError> {
    let start = Instant::now();
    let id = live_conversation(&state, id)?;
    let replies = state.controller.handle(&id, Inbound::Cancel).await;
    respond(&state, id, replies, start).await
}

fn live_conversation(state: &AppState, id: String) -> Result<ConversationId, AppError> {
    let id = ConversationId::new(id);
    if state.controller.sessions().contains(&id) {
        Ok(id)
    } else {
        Err(AppError::NotFound(format!("Conversation '{id}' not found")))
    }
}

/// Reject events no transport should send.
fn validate_event(event: &Inbound) -> Result<(), AppError> {
    let empty = match event {
        Inbound::Photo { reference } => reference.trim().is_empty(),
        Inbound::Action { token } => token.trim().is_empty(),
        Inbound::Start | Inbound::Text { .. } | Inbound::Cancel => false,
    };
    if empty {
        return Err(AppError::Validation(
            "Photo references and action tokens must not be empty".to_string(),
        ));
    }
    Ok(())
}

async fn respond(
    state: &AppState,
    id: ConversationId,
    replies: Vec<Outbound>,
    start: Instant,
) -> Result<Json<ApiResponse<ConversationReply>>, AppError> {
    let current = match state.controller.sessions().get(&id) {
        Some(handle) => Some(handle.lock().await.state),
        None => None,
    };

    let link = format!("/api/v1/conversations/{id}");
    let reply = ConversationReply {
        conversation_id: id.to_string(),
        state: current,
        replies,
    };
    Ok(Json(
        ApiResponse::success(reply, start)
            .with_link("self", link.clone())
            .with_link("events", format!("{link}/events")),
    ))
}
