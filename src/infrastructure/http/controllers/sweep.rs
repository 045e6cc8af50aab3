use crate::{
    domain::entities::SweepReport,
    infrastructure::http::middleware::{ApiError, ApiResult, AppState},
};
use axum::{extract::State, Json};

/// POST /api/sweep - Run the reconciliation sweep now
pub async fn run_sweep(State(state): State<AppState>) -> ApiResult<Json<SweepReport>> {
    let report = state.sweep_service.run_all().await?;
    *state.last_sweep.write().await = Some(report.clone());
    Ok(Json(report))
}

/// GET /api/sweep/last
pub async fn last_sweep(State(state): State<AppState>) -> ApiResult<Json<SweepReport>> {
    let last = state.last_sweep.read().await.clone();
    last.map(Json)
        .ok_or_else(|| ApiError::NotFound("No sweep has run yet".to_string()))
}
