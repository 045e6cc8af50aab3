use crate::{
    domain::entities::{AttendantActivityLog, AttendantState, AttendantStatus, ChatAssignment},
    infrastructure::http::middleware::{ApiError, ApiResult, AppState},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

#[derive(Deserialize)]
pub struct SetMaxChatsRequest {
    pub max_chats: i64,
}

#[derive(Deserialize)]
pub struct ActivityParams {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

/// PUT /api/companies/:company_id/attendants/:user_id/status
pub async fn set_status(
    State(state): State<AppState>,
    Path((company_id, user_id)): Path<(String, String)>,
    Json(request): Json<SetStatusRequest>,
) -> ApiResult<Json<AttendantStatus>> {
    let status: AttendantState = request.status.parse()?;

    let attendant = state
        .attendant_registry
        .set_status(&user_id, &company_id, status)
        .await?;

    if status == AttendantState::Available {
        drain_queue(&state, &company_id).await;
    }

    Ok(Json(attendant))
}

/// PUT /api/companies/:company_id/attendants/:user_id/max-chats
pub async fn set_max_chats(
    State(state): State<AppState>,
    Path((company_id, user_id)): Path<(String, String)>,
    Json(request): Json<SetMaxChatsRequest>,
) -> ApiResult<Json<AttendantStatus>> {
    let attendant = state
        .attendant_registry
        .set_max_chats(&user_id, &company_id, request.max_chats)
        .await?;

    if attendant.is_eligible() {
        drain_queue(&state, &company_id).await;
    }

    Ok(Json(attendant))
}

/// POST /api/companies/:company_id/attendants/:user_id/heartbeat
pub async fn heartbeat(
    State(state): State<AppState>,
    Path((company_id, user_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state
        .attendant_registry
        .record_heartbeat(&user_id, &company_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/companies/:company_id/attendants
pub async fn list_attendants(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> ApiResult<Json<Vec<AttendantStatus>>> {
    let attendants = state.attendant_registry.list_by_company(&company_id).await?;
    Ok(Json(attendants))
}

/// GET /api/companies/:company_id/attendants/:user_id
pub async fn get_attendant(
    State(state): State<AppState>,
    Path((company_id, user_id)): Path<(String, String)>,
) -> ApiResult<Json<AttendantStatus>> {
    state
        .attendant_registry
        .get_status(&user_id, &company_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Attendant {} not found", user_id)))
}

/// GET /api/companies/:company_id/attendants/:user_id/chats
pub async fn list_attendant_chats(
    State(state): State<AppState>,
    Path((company_id, user_id)): Path<(String, String)>,
) -> ApiResult<Json<Vec<ChatAssignment>>> {
    let chats = state
        .assignment_service
        .list_by_attendant(&user_id, &company_id)
        .await?;
    Ok(Json(chats))
}

/// GET /api/companies/:company_id/attendants/:user_id/activity
pub async fn get_activity_log(
    State(state): State<AppState>,
    Path((company_id, user_id)): Path<(String, String)>,
    Query(params): Query<ActivityParams>,
) -> ApiResult<Json<Vec<AttendantActivityLog>>> {
    let logs = state
        .attendant_registry
        .activity_log(&user_id, &company_id, params.limit.clamp(1, 500))
        .await?;
    Ok(Json(logs))
}

/// The triggering change already succeeded, so a failed drain is only logged.
async fn drain_queue(state: &AppState, company_id: &str) {
    if let Err(e) = state.distribution_engine.distribute_queue(company_id).await {
        tracing::warn!("Failed to drain queue for company {}: {}", company_id, e);
    }
}
