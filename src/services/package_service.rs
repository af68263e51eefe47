use crate::catalog::CatalogConnection;
use crate::error::{AppError, Result};
use crate::models::package::{DEFAULT_CATALOG_NAME, DEFAULT_TIMEOUT_MINUTES, MAX_TIMEOUT_MINUTES};
use crate::models::{Execution, Package, ParameterSet};
use crate::repository::{ExecutionRepository, PackageRepository};
use crate::services::execution_service::locator_for;
use crate::services::{CatalogExecutionResult, CatalogService, PackageExistence};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct NewPackage {
    pub folder_name: String,
    pub project_name: String,
    pub package_name: String,
    pub description: Option<String>,
    pub server_address: String,
    pub catalog_name: Option<String>,
    #[serde(default)]
    pub use_windows_auth: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_minutes: Option<i64>,
    pub package_parameters: Option<Value>,
}

#[derive(Clone)]
pub struct PackageService {
    repo: PackageRepository,
    exec_repo: ExecutionRepository,
    catalog: CatalogService,
}

impl PackageService {
    pub fn new(
        repo: PackageRepository,
        exec_repo: ExecutionRepository,
        catalog: CatalogService,
    ) -> Self {
        Self {
            repo,
            exec_repo,
            catalog,
        }
    }

    pub async fn list_packages(&self) -> Result<Vec<Package>> {
        self.repo.list().await
    }

    pub async fn get_package(&self, id: &str) -> Result<Package> {
        self.repo.get(id).await
    }

    pub async fn create_package(&self, new: NewPackage) -> Result<Package> {
        let fields = validate(&new)?;

        if self
            .repo
            .exists(&new.folder_name, &new.project_name, &new.package_name, None)
            .await?
        {
            return Err(duplicate(&new));
        }

        let now = Utc::now();
        let package = Package {
            id: Uuid::new_v4().to_string(),
            folder_name: new.folder_name,
            project_name: new.project_name,
            package_name: new.package_name,
            description: new.description,
            server_address: new.server_address,
            catalog_name: fields.catalog_name,
            use_windows_auth: new.use_windows_auth,
            username: new.username,
            password: new.password,
            timeout_minutes: fields.timeout_minutes,
            package_parameters: fields.package_parameters,
            last_execution_date: None,
            last_execution_status: None,
            created_at: now,
            updated_at: now,
        };

        self.repo.create(&package).await?;
        tracing::info!(
            "Registered package {}/{}/{} as {}",
            package.folder_name,
            package.project_name,
            package.package_name,
            package.id
        );
        Ok(package)
    }

    /// Replaces a package definition. An omitted password keeps the stored
    /// one; switching to Windows authentication drops it.
    pub async fn update_package(&self, id: &str, changes: NewPackage) -> Result<Package> {
        let existing = self.repo.get(id).await?;
        let fields = validate(&changes)?;

        if self
            .repo
            .exists(
                &changes.folder_name,
                &changes.project_name,
                &changes.package_name,
                Some(id),
            )
            .await?
        {
            return Err(duplicate(&changes));
        }

        let password = if changes.use_windows_auth {
            None
        } else {
            changes.password.or(existing.password)
        };

        let package = Package {
            id: existing.id,
            folder_name: changes.folder_name,
            project_name: changes.project_name,
            package_name: changes.package_name,
            description: changes.description,
            server_address: changes.server_address,
            catalog_name: fields.catalog_name,
            use_windows_auth: changes.use_windows_auth,
            username: changes.username,
            password,
            timeout_minutes: fields.timeout_minutes,
            package_parameters: fields.package_parameters,
            last_execution_date: existing.last_execution_date,
            last_execution_status: existing.last_execution_status,
            created_at: existing.created_at,
            updated_at: Utc::now(),
        };

        self.repo.update(&package).await?;
        tracing::info!("Updated package {}", package.id);
        Ok(package)
    }

    pub async fn delete_package(&self, id: &str) -> Result<()> {
        if !self.exec_repo.list_by_package(id).await?.is_empty() {
            return Err(AppError::Validation(
                "Package has execution history and cannot be deleted".to_string(),
            ));
        }
        self.repo.delete(id).await
    }

    /// Looks the package up in its catalog and lists the required project
    /// parameters.
    pub async fn test_connection(&self, id: &str) -> Result<PackageExistence> {
        let package = self.repo.get(id).await?;
        let conn = CatalogConnection::for_package(&package);
        Ok(self
            .catalog
            .check_package_exists(&conn, &locator_for(&package))
            .await)
    }

    /// Runs the package and waits for it, bounded by its `timeout_minutes`.
    pub async fn execute_package(
        &self,
        id: &str,
        executed_by: &str,
    ) -> Result<CatalogExecutionResult> {
        let package = self.repo.get(id).await?;
        let params = ParameterSet::from_json(package.package_parameters.as_deref())?;

        let conn = CatalogConnection::for_package(&package);
        let started_at = Utc::now();

        let result = self
            .catalog
            .execute_package(
                &conn,
                &locator_for(&package),
                &params,
                Some(run_timeout(&package)),
            )
            .await;

        if !result.started {
            return Ok(result);
        }

        let execution = synchronous_record(
            &package,
            &params,
            &result,
            executed_by,
            started_at,
            Utc::now(),
        );
        self.exec_repo.create_started(&execution).await?;
        self.repo
            .update_last_execution(&package.id, started_at, execution.status)
            .await?;

        Ok(result)
    }
}

/// Fields derived from a package request once it passed validation.
struct ValidatedFields {
    catalog_name: String,
    timeout_minutes: i64,
    package_parameters: Option<String>,
}

fn validate(new: &NewPackage) -> Result<ValidatedFields> {
    for (field, value) in [
        ("folder_name", &new.folder_name),
        ("project_name", &new.project_name),
        ("package_name", &new.package_name),
        ("server_address", &new.server_address),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::Validation(format!("{} cannot be empty", field)));
        }
    }

    if !new.use_windows_auth && new.username.as_deref().is_none_or(|u| u.trim().is_empty()) {
        return Err(AppError::Validation(
            "username is required without Windows authentication".to_string(),
        ));
    }

    let timeout_minutes = new.timeout_minutes.unwrap_or(DEFAULT_TIMEOUT_MINUTES);
    if !(1..=MAX_TIMEOUT_MINUTES).contains(&timeout_minutes) {
        return Err(AppError::Validation(format!(
            "timeout_minutes must be between 1 and {}",
            MAX_TIMEOUT_MINUTES
        )));
    }

    let package_parameters = match &new.package_parameters {
        None | Some(Value::Null) => None,
        Some(value) => {
            let raw = value.to_string();
            ParameterSet::from_json(Some(&raw))?;
            Some(raw)
        }
    };

    let catalog_name = new
        .catalog_name
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_CATALOG_NAME)
        .to_string();

    Ok(ValidatedFields {
        catalog_name,
        timeout_minutes,
        package_parameters,
    })
}

fn duplicate(new: &NewPackage) -> AppError {
    AppError::PackageAlreadyExists(format!(
        "{}/{}/{}",
        new.folder_name, new.project_name, new.package_name
    ))
}

/// Rows written before the upper bound existed are clamped too.
fn run_timeout(package: &Package) -> Duration {
    let minutes = package.timeout_minutes.clamp(1, MAX_TIMEOUT_MINUTES) as u64;
    Duration::from_secs(minutes * 60)
}

/// Record of a run the catalog accepted. Only a terminal status observed
/// while polling closes the record; anything else is left to the reconciler.
fn synchronous_record(
    package: &Package,
    params: &ParameterSet,
    result: &CatalogExecutionResult,
    executed_by: &str,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
) -> Execution {
    let status = result.record_status();
    let closed = status.is_terminal() && result.catalog_status.is_some();

    Execution {
        id: Uuid::new_v4().to_string(),
        package_id: package.id.clone(),
        catalog_execution_id: Some(result.execution_id),
        status,
        start_time: Some(started_at),
        end_time: closed.then_some(finished_at),
        duration_seconds: closed.then(|| (finished_at - started_at).num_seconds().max(0)),
        executed_by: Some(executed_by.to_string()),
        execution_parameters: Some(params.masked_json()),
        execution_logs: Some(result.logs.clone()),
        error_message: result.error_message.clone(),
        created_at: started_at,
        updated_at: None,
    }
}
