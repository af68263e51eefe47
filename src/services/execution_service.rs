use crate::catalog::CatalogConnection;
use crate::error::{AppError, Result};
use crate::models::{Execution, ExecutionStatus, Package, ParameterSet};
use crate::repository::{ExecutionRepository, PackageRepository};
use crate::services::{CatalogService, PackageLocator};
use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct StartOutcome {
    pub success: bool,
    pub execution_record_id: Option<String>,
    pub catalog_execution_id: Option<i64>,
    pub error_message: Option<String>,
}

#[derive(Clone)]
pub struct ExecutionService {
    exec_repo: ExecutionRepository,
    package_repo: PackageRepository,
    catalog: CatalogService,
}

impl ExecutionService {
    pub fn new(
        exec_repo: ExecutionRepository,
        package_repo: PackageRepository,
        catalog: CatalogService,
    ) -> Self {
        Self {
            exec_repo,
            package_repo,
            catalog,
        }
    }

    /// Starts the package in the catalog without waiting for it. A record
    /// with status `Running` is written only once the catalog accepted the
    /// start.
    pub async fn start_package_execution(
        &self,
        package_id: &str,
        executed_by: &str,
    ) -> Result<StartOutcome> {
        let package = self.package_repo.get(package_id).await?;
        let params = ParameterSet::from_json(package.package_parameters.as_deref())?;

        let conn = CatalogConnection::for_package(&package);
        let started = self
            .catalog
            .start_execution(&conn, &locator_for(&package), &params)
            .await;

        let Some(catalog_execution_id) = started.execution_id.filter(|_| started.success) else {
            tracing::warn!(
                "Catalog rejected start of package {}: {:?}",
                package_id,
                started.error_message
            );
            return Ok(StartOutcome {
                success: false,
                execution_record_id: None,
                catalog_execution_id: None,
                error_message: started.error_message,
            });
        };

        let now = Utc::now();
        let execution = Execution {
            id: uuid::Uuid::new_v4().to_string(),
            package_id: package.id.clone(),
            catalog_execution_id: Some(catalog_execution_id),
            status: ExecutionStatus::Running,
            start_time: Some(now),
            end_time: None,
            duration_seconds: None,
            executed_by: Some(executed_by.to_string()),
            execution_parameters: Some(params.masked_json()),
            execution_logs: Some(started.logs),
            error_message: None,
            created_at: now,
            updated_at: None,
        };
        self.exec_repo.create_started(&execution).await?;
        self.package_repo
            .update_last_execution(&package.id, now, ExecutionStatus::Running)
            .await?;

        tracing::info!(
            "Execution {} started for package {} (catalog execution {})",
            execution.id,
            package.id,
            catalog_execution_id
        );

        Ok(StartOutcome {
            success: true,
            execution_record_id: Some(execution.id),
            catalog_execution_id: Some(catalog_execution_id),
            error_message: None,
        })
    }

    /// Refreshes a record from the catalog. Returns `false` when nothing
    /// could be updated: the record is unknown, was never started, or the
    /// catalog gave no usable status.
    pub async fn update_execution_status(&self, record_id: &str) -> Result<bool> {
        let Some(mut execution) = self.exec_repo.find(record_id).await? else {
            tracing::warn!("Execution {} not found", record_id);
            return Ok(false);
        };
        let Some(catalog_execution_id) = execution.catalog_execution_id else {
            tracing::warn!("Execution {} was never started in the catalog", record_id);
            return Ok(false);
        };

        let package = match self.package_repo.get(&execution.package_id).await {
            Ok(package) => package,
            Err(AppError::PackageNotFound(id)) => {
                tracing::warn!("Package {} of execution {} is gone", id, record_id);
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        let conn = CatalogConnection::for_package(&package);
        let report = self
            .catalog
            .get_execution_status(&conn, catalog_execution_id)
            .await;
        let Some(snapshot) = report.snapshot else {
            tracing::warn!(
                "No usable status for catalog execution {}: {:?}",
                catalog_execution_id,
                report.error_message
            );
            return Ok(false);
        };

        let was_finalized = execution.is_finalized();
        execution.apply_snapshot(&snapshot, report.messages, Utc::now());
        self.exec_repo.save(&execution).await?;

        if !was_finalized {
            let date = execution.start_time.unwrap_or(execution.created_at);
            self.package_repo
                .update_last_execution(&package.id, date, execution.status)
                .await?;
        }

        tracing::debug!(
            "Execution {} reconciled: {} (catalog execution {} is {}, ended {:?})",
            record_id,
            execution.status.as_str(),
            snapshot.execution_id,
            snapshot.status,
            snapshot.end_time
        );
        Ok(true)
    }

    pub async fn get_execution(&self, id: &str) -> Result<Execution> {
        self.exec_repo.get(id).await
    }

    pub async fn list_executions(
        &self,
        package_id: Option<&str>,
        page: PageRequest,
    ) -> Result<ExecutionPage> {
        let items = self
            .exec_repo
            .list_page(package_id, page.limit(), page.offset())
            .await?;
        let total = self.exec_repo.count(package_id).await?;
        Ok(ExecutionPage {
            items,
            total,
            page: page.page,
            page_size: page.page_size,
        })
    }
}

/// 1-based page of execution history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub const DEFAULT_PAGE_SIZE: u32 = 25;
    pub const MAX_PAGE_SIZE: u32 = 200;

    /// Missing or zero values fall back to the first page of 25.
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Self {
        Self {
            page: page.filter(|p| *p > 0).unwrap_or(1),
            page_size: page_size
                .filter(|s| *s > 0)
                .unwrap_or(Self::DEFAULT_PAGE_SIZE)
                .min(Self::MAX_PAGE_SIZE),
        }
    }

    fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionPage {
    pub items: Vec<Execution>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}

pub(crate) fn locator_for(package: &Package) -> PackageLocator {
    PackageLocator::new(
        &package.folder_name,
        &package.project_name,
        &package.package_name,
    )
}
