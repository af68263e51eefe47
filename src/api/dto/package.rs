use crate::models::{Package, ProjectParameter};
use crate::services::PackageExistence;
use serde::{Deserialize, Serialize};

const DEFAULT_EXECUTED_BY: &str = "api";

#[derive(Debug, Deserialize)]
pub struct ExecuteQuery {
    pub executed_by: Option<String>,
}

impl ExecuteQuery {
    pub fn executed_by(&self) -> &str {
        self.executed_by
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_EXECUTED_BY)
    }
}

#[derive(Debug, Serialize)]
pub struct PackageResponse {
    pub id: String,
    pub folder_name: String,
    pub project_name: String,
    pub package_name: String,
    pub description: Option<String>,
    pub server_address: String,
    pub catalog_name: String,
    pub use_windows_auth: bool,
    pub username: Option<String>,
    pub timeout_minutes: i64,
    pub package_parameters: Option<serde_json::Value>,
    pub last_execution_date: Option<String>,
    pub last_execution_status: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Package> for PackageResponse {
    fn from(package: Package) -> Self {
        let package_parameters = package
            .package_parameters
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok());
        Self {
            id: package.id,
            folder_name: package.folder_name,
            project_name: package.project_name,
            package_name: package.package_name,
            description: package.description,
            server_address: package.server_address,
            catalog_name: package.catalog_name,
            use_windows_auth: package.use_windows_auth,
            username: package.username,
            timeout_minutes: package.timeout_minutes,
            package_parameters,
            last_execution_date: package.last_execution_date.map(|t| t.to_rfc3339()),
            last_execution_status: package
                .last_execution_status
                .map(|s| s.as_str().to_string()),
            created_at: package.created_at.to_rfc3339(),
            updated_at: package.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PackagesListResponse {
    pub data: Vec<PackageResponse>,
}

#[derive(Debug, Serialize)]
pub struct ConnectionTestResponse {
    pub success: bool,
    pub message: String,
    pub folder_exists: bool,
    pub project_exists: bool,
    pub package_exists: bool,
    pub required_parameters: Vec<ProjectParameter>,
}

impl From<PackageExistence> for ConnectionTestResponse {
    fn from(existence: PackageExistence) -> Self {
        let message = existence
            .error_message
            .unwrap_or_else(|| "Package found in catalog".to_string());
        Self {
            success: existence.success,
            message,
            folder_exists: existence.folder_exists,
            project_exists: existence.project_exists,
            package_exists: existence.package_exists,
            required_parameters: existence.parameters,
        }
    }
}
