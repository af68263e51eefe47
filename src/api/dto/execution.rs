use crate::models::{Execution, ExecutionStatus};
use crate::services::{ExecutionPage, PageRequest};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ListExecutionsQuery {
    pub package_id: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl ListExecutionsQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }
}

#[derive(Debug, Serialize)]
pub struct ExecutionResponse {
    pub id: String,
    pub package_id: String,
    pub catalog_execution_id: Option<i64>,
    pub status: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration_seconds: Option<i64>,
    pub executed_by: Option<String>,
    pub execution_parameters: Option<String>,
    pub execution_logs: Option<String>,
    pub error_message: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<Execution> for ExecutionResponse {
    fn from(execution: Execution) -> Self {
        Self {
            id: execution.id,
            package_id: execution.package_id,
            catalog_execution_id: execution.catalog_execution_id,
            status: execution.status.as_str().to_string(),
            start_time: execution.start_time.map(|t| t.to_rfc3339()),
            end_time: execution.end_time.map(|t| t.to_rfc3339()),
            duration_seconds: execution.duration_seconds,
            executed_by: execution.executed_by,
            execution_parameters: execution.execution_parameters,
            execution_logs: execution.execution_logs,
            error_message: execution.error_message,
            created_at: execution.created_at.to_rfc3339(),
            updated_at: execution.updated_at.map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExecutionsListResponse {
    pub data: Vec<ExecutionResponse>,
    pub page: u32,
    pub page_size: u32,
    pub total: i64,
}

impl From<ExecutionPage> for ExecutionsListResponse {
    fn from(page: ExecutionPage) -> Self {
        Self {
            data: page.items.into_iter().map(ExecutionResponse::from).collect(),
            page: page.page,
            page_size: page.page_size,
            total: page.total,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// The catalog returned a usable snapshot for this refresh.
    pub refreshed: bool,
    pub is_running: bool,
    pub is_completed: bool,
    pub is_successful: bool,
    pub execution: ExecutionResponse,
}

impl RefreshResponse {
    pub fn new(refreshed: bool, execution: Execution) -> Self {
        let status = execution.status;
        Self {
            refreshed,
            is_running: matches!(status, ExecutionStatus::Pending | ExecutionStatus::Running),
            is_completed: status.is_terminal(),
            is_successful: status == ExecutionStatus::Succeeded,
            execution: ExecutionResponse::from(execution),
        }
    }
}
