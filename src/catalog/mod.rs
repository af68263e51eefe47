mod tds_client;

#[cfg(test)]
pub mod fake;

pub use tds_client::TdsCatalogClient;

use crate::error::CatalogResult;
use crate::models::{
    ExecutionSnapshot, FolderRef, Package, PackageRef, ProjectParameter, ProjectRef,
};
use async_trait::async_trait;

/// `object_type` for project-scoped parameters in the catalog procedures.
pub const PROJECT_OBJECT_TYPE: i16 = 20;

#[derive(Clone, PartialEq, Eq)]
pub enum CatalogAuth {
    Windows,
    SqlServer { username: String, password: String },
}

/// Where and how to reach an SSIS catalog. Passed into every call.
#[derive(Clone, PartialEq, Eq)]
pub struct CatalogConnection {
    pub server_address: String,
    pub catalog_name: String,
    pub auth: CatalogAuth,
}

impl CatalogConnection {
    pub fn windows(server_address: impl Into<String>, catalog_name: impl Into<String>) -> Self {
        Self {
            server_address: server_address.into(),
            catalog_name: catalog_name.into(),
            auth: CatalogAuth::Windows,
        }
    }

    pub fn sql_server(
        server_address: impl Into<String>,
        catalog_name: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server_address: server_address.into(),
            catalog_name: catalog_name.into(),
            auth: CatalogAuth::SqlServer {
                username: username.into(),
                password: password.into(),
            },
        }
    }

    pub fn for_package(package: &Package) -> Self {
        if package.use_windows_auth {
            Self::windows(&package.server_address, &package.catalog_name)
        } else {
            Self::sql_server(
                &package.server_address,
                &package.catalog_name,
                package.username.clone().unwrap_or_default(),
                package.password.clone().unwrap_or_default(),
            )
        }
    }
}

impl std::fmt::Debug for CatalogConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let auth = match &self.auth {
            CatalogAuth::Windows => "windows".to_string(),
            CatalogAuth::SqlServer { username, .. } => format!("sql({})", username),
        };
        f.debug_struct("CatalogConnection")
            .field("server_address", &self.server_address)
            .field("catalog_name", &self.catalog_name)
            .field("auth", &auth)
            .finish()
    }
}

/// Request/response calls against the catalog's tables and stored
/// procedures. Each call owns its own connection.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn resolve_folder(
        &self,
        conn: &CatalogConnection,
        folder_name: &str,
    ) -> CatalogResult<Option<FolderRef>>;

    async fn resolve_project(
        &self,
        conn: &CatalogConnection,
        folder_id: i64,
        project_name: &str,
    ) -> CatalogResult<Option<ProjectRef>>;

    async fn resolve_package(
        &self,
        conn: &CatalogConnection,
        project_id: i64,
        package_name: &str,
    ) -> CatalogResult<Option<PackageRef>>;

    /// Only parameters the catalog flags as required, ordered by name.
    async fn list_required_project_parameters(
        &self,
        conn: &CatalogConnection,
        project_id: i64,
    ) -> CatalogResult<Vec<ProjectParameter>>;

    async fn create_execution(
        &self,
        conn: &CatalogConnection,
        folder_name: &str,
        project_name: &str,
        package_name: &str,
    ) -> CatalogResult<i64>;

    async fn set_parameter(
        &self,
        conn: &CatalogConnection,
        execution_id: i64,
        name: &str,
        value: &str,
    ) -> CatalogResult<()>;

    async fn start_execution(&self, conn: &CatalogConnection, execution_id: i64)
    -> CatalogResult<()>;

    async fn get_status(
        &self,
        conn: &CatalogConnection,
        execution_id: i64,
    ) -> CatalogResult<Option<ExecutionSnapshot>>;

    /// Formatted operation messages, oldest first. Best effort: failures
    /// yield an empty list.
    async fn get_messages(&self, conn: &CatalogConnection, execution_id: i64) -> Vec<String>;
}
