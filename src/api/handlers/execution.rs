use crate::api::dto::execution::{
    ExecutionResponse, ExecutionsListResponse, ListExecutionsQuery, RefreshResponse,
};
use crate::api::routes::AppState;
use crate::error::Result;
use axum::{
    Json,
    extract::{Path, Query, State},
};

pub async fn list_executions(
    State(state): State<AppState>,
    Query(query): Query<ListExecutionsQuery>,
) -> Result<Json<ExecutionsListResponse>> {
    let page = state
        .execution_service
        .list_executions(query.package_id.as_deref(), query.page_request())
        .await?;
    Ok(Json(ExecutionsListResponse::from(page)))
}

pub async fn get_execution(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ExecutionResponse>> {
    let execution = state.execution_service.get_execution(&id).await?;
    Ok(Json(ExecutionResponse::from(execution)))
}

pub async fn refresh_execution(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RefreshResponse>> {
    // Unknown ids are reported as 404 rather than a silent no-op.
    state.execution_service.get_execution(&id).await?;
    let refreshed = state.execution_service.update_execution_status(&id).await?;
    let execution = state.execution_service.get_execution(&id).await?;
    Ok(Json(RefreshResponse::new(refreshed, execution)))
}
