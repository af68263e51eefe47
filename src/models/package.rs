use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ExecutionStatus;

pub const DEFAULT_CATALOG_NAME: &str = "SSISDB";
pub const DEFAULT_TIMEOUT_MINUTES: i64 = 60;
/// One week.
pub const MAX_TIMEOUT_MINUTES: i64 = 7 * 24 * 60;

/// A deployed SSIS package and the catalog connection used to run it.
#[derive(Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Package {
    pub id: String,
    pub folder_name: String,
    pub project_name: String,
    pub package_name: String,
    pub description: Option<String>,
    pub server_address: String,
    pub catalog_name: String,
    pub use_windows_auth: bool,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub timeout_minutes: i64,
    pub package_parameters: Option<String>,
    pub last_execution_date: Option<DateTime<Utc>>,
    pub last_execution_status: Option<ExecutionStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Package")
            .field("id", &self.id)
            .field("folder_name", &self.folder_name)
            .field("project_name", &self.project_name)
            .field("package_name", &self.package_name)
            .field("description", &self.description)
            .field("server_address", &self.server_address)
            .field("catalog_name", &self.catalog_name)
            .field("use_windows_auth", &self.use_windows_auth)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .field("timeout_minutes", &self.timeout_minutes)
            .field("package_parameters", &self.package_parameters)
            .field("last_execution_date", &self.last_execution_date)
            .field("last_execution_status", &self.last_execution_status)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}
