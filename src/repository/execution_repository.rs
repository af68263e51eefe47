use crate::error::{AppError, Result};
use crate::models::Execution;
use crate::repository::DbPool;
use chrono::Utc;

#[derive(Clone)]
pub struct ExecutionRepository {
    pool: DbPool,
}

impl ExecutionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Inserts the record of a run the catalog has accepted.
    pub async fn create_started(&self, execution: &Execution) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO executions (id, package_id, catalog_execution_id, status, start_time, end_time, duration_seconds, executed_by, execution_parameters, execution_logs, error_message, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL)
            "#,
        )
        .bind(&execution.id)
        .bind(&execution.package_id)
        .bind(execution.catalog_execution_id)
        .bind(execution.status as i32)
        .bind(execution.start_time)
        .bind(execution.end_time)
        .bind(execution.duration_seconds)
        .bind(&execution.executed_by)
        .bind(&execution.execution_parameters)
        .bind(&execution.execution_logs)
        .bind(&execution.error_message)
        .bind(execution.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find(&self, id: &str) -> Result<Option<Execution>> {
        let execution = sqlx::query_as::<_, Execution>("SELECT * FROM executions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(execution)
    }

    pub async fn get(&self, id: &str) -> Result<Execution> {
        self.find(id)
            .await?
            .ok_or_else(|| AppError::ExecutionNotFound(id.to_string()))
    }

    pub async fn list_by_package(&self, package_id: &str) -> Result<Vec<Execution>> {
        let executions = sqlx::query_as::<_, Execution>(
            "SELECT * FROM executions WHERE package_id = ? ORDER BY created_at DESC",
        )
        .bind(package_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(executions)
    }

    /// One page of history, newest first, optionally for a single package.
    pub async fn list_page(
        &self,
        package_id: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Execution>> {
        let executions = sqlx::query_as::<_, Execution>(
            r#"
            SELECT * FROM executions
            WHERE (? IS NULL OR package_id = ?)
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(package_id)
        .bind(package_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(executions)
    }

    pub async fn count(&self, package_id: Option<&str>) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM executions WHERE (? IS NULL OR package_id = ?)")
                .bind(package_id)
                .bind(package_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Persists the reconciled fields of a record.
    pub async fn save(&self, execution: &Execution) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE executions
            SET status = ?, start_time = ?, end_time = ?, duration_seconds = ?, execution_logs = ?, error_message = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(execution.status as i32)
        .bind(execution.start_time)
        .bind(execution.end_time)
        .bind(execution.duration_seconds)
        .bind(&execution.execution_logs)
        .bind(&execution.error_message)
        .bind(Utc::now())
        .bind(&execution.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::ExecutionNotFound(execution.id.clone()));
        }

        Ok(())
    }
}
