use crate::{
    domain::entities::{CompanySettings, DashboardSnapshot, DistributionStrategy},
    infrastructure::http::middleware::{ApiResult, AppState},
};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct SetStrategyRequest {
    pub strategy: String,
}

#[derive(Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

/// GET /api/companies/:company_id/settings
pub async fn get_settings(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> ApiResult<Json<CompanySettings>> {
    let settings = state.company_service.get_settings(&company_id).await?;
    Ok(Json(settings))
}

/// PUT /api/companies/:company_id/strategy
pub async fn set_strategy(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    Json(request): Json<SetStrategyRequest>,
) -> ApiResult<Json<CompanySettings>> {
    let strategy: DistributionStrategy = request.strategy.parse()?;
    let settings = state
        .company_service
        .set_strategy(&company_id, strategy)
        .await?;
    Ok(Json(settings))
}

/// PUT /api/companies/:company_id/active
pub async fn set_active(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    Json(request): Json<SetActiveRequest>,
) -> ApiResult<Json<CompanySettings>> {
    let settings = state
        .company_service
        .set_active(&company_id, request.active)
        .await?;
    Ok(Json(settings))
}

/// GET /api/companies/:company_id/metrics
pub async fn get_metrics(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> ApiResult<Json<DashboardSnapshot>> {
    let snapshot = state.metrics_aggregator.snapshot(&company_id).await?;
    Ok(Json(snapshot))
}
