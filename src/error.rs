use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Failures talking to the SSIS catalog database.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Catalog connection error: {0}")]
    Connection(String),

    #[error("Catalog error: {0}")]
    Tds(#[from] tiberius::error::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("create_execution returned no execution id")]
    MissingExecutionId,

    #[error("Unexpected catalog response: {0}")]
    Protocol(String),
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Package not found: {0}")]
    PackageNotFound(String),

    #[error("Package already exists: {0}")]
    PackageAlreadyExists(String),

    #[error("Execution not found: {0}")]
    ExecutionNotFound(String),

    #[error("Invalid package parameters: {0}")]
    ParameterParse(String),

    #[error("{0}")]
    Validation(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            AppError::Catalog(e) => {
                tracing::error!("Catalog error: {}", e);
                (StatusCode::BAD_GATEWAY, e.to_string())
            }
            AppError::PackageNotFound(id) => {
                (StatusCode::NOT_FOUND, format!("Package '{}' not found", id))
            }
            AppError::PackageAlreadyExists(name) => (
                StatusCode::CONFLICT,
                format!("Package '{}' already exists", name),
            ),
            AppError::ExecutionNotFound(id) => (
                StatusCode::NOT_FOUND,
                format!("Execution '{}' not found", id),
            ),
            AppError::ParameterParse(e) => (StatusCode::UNPROCESSABLE_ENTITY, e),
            AppError::Validation(e) => (StatusCode::BAD_REQUEST, e),
        };

        let body = json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
