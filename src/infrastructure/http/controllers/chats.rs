use crate::{
    application::services::InboundResult,
    domain::entities::{AssignmentHistory, ChatAssignment},
    domain::services::is_within_window,
    infrastructure::http::middleware::{ApiError, ApiResult, AppState},
};
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Default)]
pub struct MessageEventRequest {
    /// Provider timestamp of the message; defaults to now.
    #[serde(default)]
    pub at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct ChatView {
    #[serde(flatten)]
    pub assignment: ChatAssignment,
    pub within_window: bool,
}

/// POST /api/companies/:company_id/chats/:chat_id/inbound
pub async fn inbound_message(
    State(state): State<AppState>,
    Path((company_id, chat_id)): Path<(String, String)>,
    request: Option<Json<MessageEventRequest>>,
) -> ApiResult<Json<InboundResult>> {
    let Json(request) = request.unwrap_or_default();
    let result = state
        .intake_service
        .handle_inbound_message(&chat_id, &company_id, request.at)
        .await?;
    Ok(Json(result))
}

/// POST /api/chats/:chat_id/outbound
pub async fn outbound_message(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
    request: Option<Json<MessageEventRequest>>,
) -> ApiResult<Json<ChatView>> {
    let Json(request) = request.unwrap_or_default();
    let assignment = state
        .intake_service
        .handle_outbound_message(&chat_id, request.at)
        .await?;
    Ok(Json(view(&state, assignment)))
}

/// POST /api/chats/:chat_id/resolve
pub async fn resolve_chat(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
) -> ApiResult<Json<ChatView>> {
    let assignment = state.assignment_service.resolve(&chat_id).await?;
    Ok(Json(view(&state, assignment)))
}

/// GET /api/chats/:chat_id
pub async fn get_chat(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
) -> ApiResult<Json<ChatView>> {
    let assignment = state
        .assignment_service
        .get_by_chat_id(&chat_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Chat {} not found", chat_id)))?;
    Ok(Json(view(&state, assignment)))
}

/// GET /api/chats/:chat_id/history
pub async fn get_chat_history(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
) -> ApiResult<Json<Vec<AssignmentHistory>>> {
    let history = state.assignment_service.list_history(&chat_id).await?;
    Ok(Json(history))
}

/// GET /api/companies/:company_id/queue
pub async fn get_queue(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> ApiResult<Json<Vec<ChatAssignment>>> {
    let queue = state.assignment_service.list_unassigned(&company_id).await?;
    Ok(Json(queue))
}

fn view(state: &AppState, assignment: ChatAssignment) -> ChatView {
    let within_window = is_within_window(&assignment, state.time_service.now());
    ChatView {
        assignment,
        within_window,
    }
}
