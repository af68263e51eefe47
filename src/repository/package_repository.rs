use crate::error::{AppError, Result};
use crate::models::{ExecutionStatus, Package};
use crate::repository::DbPool;
use chrono::{DateTime, Utc};

#[derive(Clone)]
pub struct PackageRepository {
    pool: DbPool,
}

impl PackageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Package>> {
        let packages = sqlx::query_as::<_, Package>(
            "SELECT * FROM packages ORDER BY folder_name, project_name, package_name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(packages)
    }

    pub async fn get(&self, id: &str) -> Result<Package> {
        let package = sqlx::query_as::<_, Package>("SELECT * FROM packages WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::PackageNotFound(id.to_string()))?;

        Ok(package)
    }

    /// Whether another definition already uses this identity. `exclude_id`
    /// skips the package being edited.
    pub async fn exists(
        &self,
        folder_name: &str,
        project_name: &str,
        package_name: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM packages
            WHERE folder_name = ? AND project_name = ? AND package_name = ?
              AND (? IS NULL OR id <> ?)
            "#,
        )
        .bind(folder_name)
        .bind(project_name)
        .bind(package_name)
        .bind(exclude_id)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    pub async fn create(&self, package: &Package) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO packages (id, folder_name, project_name, package_name, description, server_address, catalog_name, use_windows_auth, username, password, timeout_minutes, package_parameters, last_execution_date, last_execution_status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, NULL, ?, ?)
            "#,
        )
        .bind(&package.id)
        .bind(&package.folder_name)
        .bind(&package.project_name)
        .bind(&package.package_name)
        .bind(&package.description)
        .bind(&package.server_address)
        .bind(&package.catalog_name)
        .bind(package.use_windows_auth)
        .bind(&package.username)
        .bind(&package.password)
        .bind(package.timeout_minutes)
        .bind(&package.package_parameters)
        .bind(package.created_at)
        .bind(package.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Rewrites the editable fields; execution history columns are left alone.
    pub async fn update(&self, package: &Package) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE packages
            SET folder_name = ?, project_name = ?, package_name = ?, description = ?, server_address = ?, catalog_name = ?, use_windows_auth = ?, username = ?, password = ?, timeout_minutes = ?, package_parameters = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&package.folder_name)
        .bind(&package.project_name)
        .bind(&package.package_name)
        .bind(&package.description)
        .bind(&package.server_address)
        .bind(&package.catalog_name)
        .bind(package.use_windows_auth)
        .bind(&package.username)
        .bind(&package.password)
        .bind(package.timeout_minutes)
        .bind(&package.package_parameters)
        .bind(package.updated_at)
        .bind(&package.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::PackageNotFound(package.id.clone()));
        }

        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM packages WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::PackageNotFound(id.to_string()));
        }

        Ok(())
    }

    pub async fn update_last_execution(
        &self,
        id: &str,
        date: DateTime<Utc>,
        status: ExecutionStatus,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE packages
            SET last_execution_date = ?, last_execution_status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(date)
        .bind(status as i32)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
