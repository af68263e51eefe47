use super::handlers::{execution, health, package};
use super::middleware::cors::add_cors;
use crate::services::{ExecutionService, PackageService};
use axum::{
    Router,
    routing::{get, post},
};

#[derive(Clone)]
pub struct AppState {
    pub package_service: PackageService,
    pub execution_service: ExecutionService,
}

pub fn create_router(
    package_service: PackageService,
    execution_service: ExecutionService,
) -> Router {
    let state = AppState {
        package_service,
        execution_service,
    };

    let api_routes = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Package registry
        .route(
            "/api/packages",
            get(package::list_packages).post(package::create_package),
        )
        .route(
            "/api/packages/{id}",
            get(package::get_package)
                .put(package::update_package)
                .delete(package::delete_package),
        )
        .route("/api/packages/{id}/test", post(package::test_connection))
        // Execution
        .route("/api/packages/{id}/execute", post(package::execute_package))
        .route("/api/packages/{id}/start", post(package::start_package))
        .route("/api/executions", get(execution::list_executions))
        .route("/api/executions/{id}", get(execution::get_execution))
        .route(
            "/api/executions/{id}/refresh",
            post(execution::refresh_execution),
        )
        .with_state(state);

    add_cors(api_routes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fake::FakeCatalog;
    use crate::models::CatalogStatus;
    use crate::repository::{ExecutionRepository, PackageRepository, establish_connection};
    use crate::services::{CatalogService, PollSettings};
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    async fn app(fake: FakeCatalog) -> Router {
        let pool = establish_connection("sqlite::memory:").await.unwrap();
        let packages = PackageRepository::new(pool.clone());
        let executions = ExecutionRepository::new(pool);
        let poll = PollSettings {
            interval: Duration::from_millis(5),
            default_timeout: Duration::from_secs(5),
        };
        let catalog = CatalogService::new(Arc::new(fake), poll);
        create_router(
            PackageService::new(packages.clone(), executions.clone(), catalog.clone()),
            ExecutionService::new(executions, packages, catalog),
        )
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn register(app: &Router) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/api/packages",
            Some(json!({
                "folder_name": "F",
                "project_name": "P",
                "package_name": "Pkg",
                "server_address": "db01",
                "use_windows_auth": true,
                "package_parameters": {"BatchSize": 500, "ApiPassword": "hunter2"}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body.get("password").is_none());
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = app(FakeCatalog::standard()).await;
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn package_lifecycle() {
        let app = app(FakeCatalog::standard()).await;
        let id = register(&app).await;

        let (status, body) = send(&app, "GET", &format!("/api/packages/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["catalog_name"], "SSISDB");
        assert_eq!(body["package_parameters"]["BatchSize"], 500);

        let (status, _) = send(
            &app,
            "POST",
            "/api/packages",
            Some(json!({
                "folder_name": "F",
                "project_name": "P",
                "package_name": "Pkg",
                "server_address": "db01",
                "use_windows_auth": true
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(&app, "POST", &format!("/api/packages/{}/test", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["package_exists"], true);

        let (status, body) = send(
            &app,
            "PUT",
            &format!("/api/packages/{}", id),
            Some(json!({
                "folder_name": "F",
                "project_name": "P",
                "package_name": "Pkg",
                "server_address": "db02",
                "use_windows_auth": true,
                "timeout_minutes": 15
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["server_address"], "db02");
        assert_eq!(body["timeout_minutes"], 15);

        let (status, _) = send(
            &app,
            "PUT",
            "/api/packages/missing",
            Some(json!({
                "folder_name": "F",
                "project_name": "P",
                "package_name": "Pkg",
                "server_address": "db02",
                "use_windows_auth": true
            })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "DELETE", &format!("/api/packages/{}", id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, "GET", &format!("/api/packages/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn synchronous_execution_over_http() {
        let app = app(FakeCatalog::standard().with_statuses(vec![
            Some(CatalogStatus::Running),
            Some(CatalogStatus::Succeeded),
        ]))
        .await;
        let id = register(&app).await;

        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/packages/{}/execute?executed_by=alice", id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["status"], "Succeeded");
        assert_eq!(body["execution_id"], 42);
        assert!(!body["logs"].as_str().unwrap().contains("hunter2"));

        let (_, list) = send(
            &app,
            "GET",
            &format!("/api/executions?package_id={}", id),
            None,
        )
        .await;
        let records = list["data"].as_array().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(list["total"], 1);
        assert_eq!(list["page"], 1);
        assert_eq!(list["page_size"], 25);
        assert_eq!(records[0]["executed_by"], "alice");
        assert_eq!(records[0]["status"], "Succeeded");
    }

    #[tokio::test]
    async fn start_then_refresh() {
        let app = app(FakeCatalog::standard().with_statuses(vec![Some(CatalogStatus::Succeeded)]))
            .await;
        let id = register(&app).await;

        let (status, started) =
            send(&app, "POST", &format!("/api/packages/{}/start", id), None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(started["success"], true);
        assert_eq!(started["catalog_execution_id"], 42);
        let record_id = started["execution_record_id"].as_str().unwrap().to_string();

        let (_, record) = send(&app, "GET", &format!("/api/executions/{}", record_id), None).await;
        assert_eq!(record["status"], "Running");

        let (status, refreshed) = send(
            &app,
            "POST",
            &format!("/api/executions/{}/refresh", record_id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(refreshed["refreshed"], true);
        assert_eq!(refreshed["is_running"], false);
        assert_eq!(refreshed["is_completed"], true);
        assert_eq!(refreshed["is_successful"], true);
        assert_eq!(refreshed["execution"]["status"], "Succeeded");
        assert!(refreshed["execution"]["end_time"].is_string());
    }

    #[tokio::test]
    async fn execution_history_is_paged() {
        let app = app(FakeCatalog::standard().with_statuses(vec![Some(CatalogStatus::Succeeded)]))
            .await;
        let id = register(&app).await;
        for _ in 0..3 {
            let (status, _) =
                send(&app, "POST", &format!("/api/packages/{}/start", id), None).await;
            assert_eq!(status, StatusCode::ACCEPTED);
        }

        let (status, first) = send(&app, "GET", "/api/executions?page=1&page_size=2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["data"].as_array().unwrap().len(), 2);
        assert_eq!(first["total"], 3);

        let (_, second) = send(&app, "GET", "/api/executions?page=2&page_size=2", None).await;
        assert_eq!(second["data"].as_array().unwrap().len(), 1);
        assert_eq!(second["page"], 2);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let app = app(FakeCatalog::standard()).await;
        let (status, _) = send(&app, "POST", "/api/executions/missing/refresh", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, "POST", "/api/packages/missing/execute", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
