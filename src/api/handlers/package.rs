use crate::api::dto::package::{
    ConnectionTestResponse, ExecuteQuery, PackageResponse, PackagesListResponse,
};
use crate::api::routes::AppState;
use crate::error::Result;
use crate::services::{CatalogExecutionResult, NewPackage, StartOutcome};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

pub async fn list_packages(State(state): State<AppState>) -> Result<Json<PackagesListResponse>> {
    let packages = state.package_service.list_packages().await?;
    Ok(Json(PackagesListResponse {
        data: packages.into_iter().map(PackageResponse::from).collect(),
    }))
}

pub async fn get_package(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PackageResponse>> {
    let package = state.package_service.get_package(&id).await?;
    Ok(Json(PackageResponse::from(package)))
}

pub async fn create_package(
    State(state): State<AppState>,
    Json(req): Json<NewPackage>,
) -> Result<(StatusCode, Json<PackageResponse>)> {
    let package = state.package_service.create_package(req).await?;
    Ok((StatusCode::CREATED, Json(PackageResponse::from(package))))
}

pub async fn update_package(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<NewPackage>,
) -> Result<Json<PackageResponse>> {
    let package = state.package_service.update_package(&id, req).await?;
    Ok(Json(PackageResponse::from(package)))
}

pub async fn delete_package(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.package_service.delete_package(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn test_connection(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConnectionTestResponse>> {
    let existence = state.package_service.test_connection(&id).await?;
    Ok(Json(ConnectionTestResponse::from(existence)))
}

pub async fn execute_package(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ExecuteQuery>,
) -> Result<Json<CatalogExecutionResult>> {
    let result = state
        .package_service
        .execute_package(&id, query.executed_by())
        .await?;
    Ok(Json(result))
}

pub async fn start_package(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ExecuteQuery>,
) -> Result<(StatusCode, Json<StartOutcome>)> {
    let outcome = state
        .execution_service
        .start_package_execution(&id, query.executed_by())
        .await?;
    let status = if outcome.success {
        StatusCode::ACCEPTED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome)))
}
