use super::{CatalogAuth, CatalogClient, CatalogConnection, PROJECT_OBJECT_TYPE};
use crate::error::{CatalogError, CatalogResult};
use crate::models::catalog::format_message_line;
use crate::models::{
    CatalogStatus, ExecutionSnapshot, FolderRef, MessageType, PackageRef, ProjectParameter,
    ProjectRef,
};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use std::time::Duration;
use tiberius::{AuthMethod, Client, Config, Row};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

type TdsClient = Client<Compat<TcpStream>>;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Catalog client speaking TDS to the SQL Server hosting the catalog.
#[derive(Clone, Default)]
pub struct TdsCatalogClient;

impl TdsCatalogClient {
    pub fn new() -> Self {
        Self
    }

    fn config(conn: &CatalogConnection) -> CatalogResult<Config> {
        for (field, value) in [
            ("server address", &conn.server_address),
            ("catalog name", &conn.catalog_name),
        ] {
            if value.trim().is_empty() || value.contains(';') {
                return Err(CatalogError::Connection(format!("Invalid {}: '{}'", field, value)));
            }
        }

        let mut ado = format!(
            "Server={};Database={};TrustServerCertificate=true",
            conn.server_address, conn.catalog_name
        );
        if conn.auth == CatalogAuth::Windows {
            ado.push_str(";Integrated Security=true");
        }

        let mut config = Config::from_ado_string(&ado)?;
        if let CatalogAuth::SqlServer { username, password } = &conn.auth {
            config.authentication(AuthMethod::sql_server(username, password));
        }
        Ok(config)
    }

    async fn connect(conn: &CatalogConnection) -> CatalogResult<TdsClient> {
        let config = Self::config(conn)?;
        match tokio::time::timeout(CONNECT_TIMEOUT, Self::connect_with(config)).await {
            Ok(result) => result,
            Err(_) => Err(CatalogError::Connection(format!(
                "Timed out connecting to {}",
                conn.server_address
            ))),
        }
    }

    async fn connect_with(config: Config) -> CatalogResult<TdsClient> {
        let tcp = TcpStream::connect(config.get_addr()).await?;
        tcp.set_nodelay(true)?;

        match Client::connect(config.clone(), tcp.compat_write()).await {
            Ok(client) => Ok(client),
            // Azure-style gateways answer the login with a redirect.
            Err(tiberius::error::Error::Routing { host, port }) => {
                let mut config = config;
                config.host(&host);
                config.port(port);

                let tcp = TcpStream::connect(config.get_addr()).await?;
                tcp.set_nodelay(true)?;
                Ok(Client::connect(config, tcp.compat_write()).await?)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn required_i64(row: &Row, column: &str) -> CatalogResult<i64> {
        row.try_get::<i64, _>(column)?
            .ok_or_else(|| CatalogError::Protocol(format!("column '{}' is NULL", column)))
    }

    fn required_str(row: &Row, column: &str) -> CatalogResult<String> {
        row.try_get::<&str, _>(column)?
            .map(str::to_string)
            .ok_or_else(|| CatalogError::Protocol(format!("column '{}' is NULL", column)))
    }

    fn optional_str(row: &Row, column: &str) -> CatalogResult<Option<String>> {
        Ok(row.try_get::<&str, _>(column)?.map(str::to_string))
    }

    fn optional_time(row: &Row, column: &str) -> CatalogResult<Option<DateTime<Utc>>> {
        Ok(row
            .try_get::<DateTime<FixedOffset>, _>(column)?
            .map(|t| t.with_timezone(&Utc)))
    }

    fn message_line(row: &Row) -> CatalogResult<String> {
        let message_time = Self::optional_time(row, "message_time")?
            .ok_or_else(|| CatalogError::Protocol("message_time is NULL".to_string()))?;
        let message_type = row
            .try_get::<i16, _>("message_type")?
            .ok_or_else(|| CatalogError::Protocol("message_type is NULL".to_string()))?;
        let source_type = row.try_get::<i16, _>("message_source_type")?.unwrap_or(0);
        let message = row.try_get::<&str, _>("message")?.unwrap_or("");

        Ok(format_message_line(
            message_time,
            MessageType(message_type),
            message,
            source_type,
        ))
    }

    async fn fetch_messages(
        conn: &CatalogConnection,
        execution_id: i64,
    ) -> CatalogResult<Vec<String>> {
        let mut client = Self::connect(conn).await?;
        let rows = client
            .query(
                r#"
                SELECT message_time, message_type, message_source_type, message
                FROM [catalog].[operation_messages]
                WHERE operation_id = @P1
                  AND message_type IN (50, 60, 70, 80, 90, 100, 110, 120, 130)
                ORDER BY message_time ASC
                "#,
                &[&execution_id],
            )
            .await?
            .into_first_result()
            .await?;

        let mut lines = Vec::with_capacity(rows.len());
        for row in &rows {
            match Self::message_line(row) {
                Ok(line) => lines.push(line),
                Err(e) => {
                    tracing::warn!("Skipping unreadable message for execution {}: {}", execution_id, e)
                }
            }
        }
        Ok(lines)
    }
}

#[async_trait]
impl CatalogClient for TdsCatalogClient {
    async fn resolve_folder(
        &self,
        conn: &CatalogConnection,
        folder_name: &str,
    ) -> CatalogResult<Option<FolderRef>> {
        let mut client = Self::connect(conn).await?;
        let row = client
            .query(
                "SELECT folder_id, name FROM [catalog].[folders] WHERE name = @P1",
                &[&folder_name],
            )
            .await?
            .into_row()
            .await?;

        row.map(|row| {
            Ok(FolderRef {
                folder_id: Self::required_i64(&row, "folder_id")?,
                name: Self::required_str(&row, "name")?,
            })
        })
        .transpose()
    }

    async fn resolve_project(
        &self,
        conn: &CatalogConnection,
        folder_id: i64,
        project_name: &str,
    ) -> CatalogResult<Option<ProjectRef>> {
        let mut client = Self::connect(conn).await?;
        let row = client
            .query(
                r#"
                SELECT project_id, folder_id, name
                FROM [catalog].[projects]
                WHERE folder_id = @P1 AND name = @P2
                "#,
                &[&folder_id, &project_name],
            )
            .await?
            .into_row()
            .await?;

        row.map(|row| {
            Ok(ProjectRef {
                project_id: Self::required_i64(&row, "project_id")?,
                folder_id: Self::required_i64(&row, "folder_id")?,
                name: Self::required_str(&row, "name")?,
            })
        })
        .transpose()
    }

    async fn resolve_package(
        &self,
        conn: &CatalogConnection,
        project_id: i64,
        package_name: &str,
    ) -> CatalogResult<Option<PackageRef>> {
        let mut client = Self::connect(conn).await?;
        let row = client
            .query(
                r#"
                SELECT package_id, project_id, name
                FROM [catalog].[packages]
                WHERE project_id = @P1 AND name = @P2
                "#,
                &[&project_id, &package_name],
            )
            .await?
            .into_row()
            .await?;

        row.map(|row| {
            Ok(PackageRef {
                package_id: Self::required_i64(&row, "package_id")?,
                project_id: Self::required_i64(&row, "project_id")?,
                name: Self::required_str(&row, "name")?,
            })
        })
        .transpose()
    }

    async fn list_required_project_parameters(
        &self,
        conn: &CatalogConnection,
        project_id: i64,
    ) -> CatalogResult<Vec<ProjectParameter>> {
        let mut client = Self::connect(conn).await?;
        // default_value is sql_variant
        let rows = client
            .query(
                r#"
                SELECT parameter_name,
                       data_type,
                       required,
                       CONVERT(NVARCHAR(4000), default_value) AS default_value,
                       description
                FROM [catalog].[object_parameters]
                WHERE project_id = @P1
                  AND object_type = @P2
                  AND required = 1
                ORDER BY parameter_name
                "#,
                &[&project_id, &PROJECT_OBJECT_TYPE],
            )
            .await?
            .into_first_result()
            .await?;

        rows.iter()
            .map(|row| {
                Ok(ProjectParameter {
                    name: Self::required_str(row, "parameter_name")?,
                    data_type: Self::required_str(row, "data_type")?,
                    required: row.try_get::<bool, _>("required")?.unwrap_or(false),
                    default_value: Self::optional_str(row, "default_value")?,
                    description: Self::optional_str(row, "description")?,
                })
            })
            .collect()
    }

    async fn create_execution(
        &self,
        conn: &CatalogConnection,
        folder_name: &str,
        project_name: &str,
        package_name: &str,
    ) -> CatalogResult<i64> {
        let mut client = Self::connect(conn).await?;
        let results = client
            .query(
                r#"
                DECLARE @execution_id BIGINT;
                EXEC [catalog].[create_execution]
                    @folder_name = @P1,
                    @project_name = @P2,
                    @package_name = @P3,
                    @use32bitruntime = 0,
                    @reference_id = NULL,
                    @execution_id = @execution_id OUTPUT;
                SELECT @execution_id AS execution_id;
                "#,
                &[&folder_name, &project_name, &package_name],
            )
            .await?
            .into_results()
            .await?;

        let row = results
            .into_iter()
            .flatten()
            .last()
            .ok_or(CatalogError::MissingExecutionId)?;
        row.try_get::<i64, _>("execution_id")?
            .ok_or(CatalogError::MissingExecutionId)
    }

    async fn set_parameter(
        &self,
        conn: &CatalogConnection,
        execution_id: i64,
        name: &str,
        value: &str,
    ) -> CatalogResult<()> {
        let mut client = Self::connect(conn).await?;
        client
            .execute(
                r#"
                EXEC [catalog].[set_execution_parameter_value]
                    @execution_id = @P1,
                    @object_type = @P2,
                    @parameter_name = @P3,
                    @parameter_value = @P4
                "#,
                &[&execution_id, &PROJECT_OBJECT_TYPE, &name, &value],
            )
            .await?;
        Ok(())
    }

    async fn start_execution(
        &self,
        conn: &CatalogConnection,
        execution_id: i64,
    ) -> CatalogResult<()> {
        let mut client = Self::connect(conn).await?;
        client
            .execute(
                "EXEC [catalog].[start_execution] @execution_id = @P1",
                &[&execution_id],
            )
            .await?;
        Ok(())
    }

    async fn get_status(
        &self,
        conn: &CatalogConnection,
        execution_id: i64,
    ) -> CatalogResult<Option<ExecutionSnapshot>> {
        let mut client = Self::connect(conn).await?;
        let row = client
            .query(
                r#"
                SELECT e.execution_id,
                       e.status,
                       e.start_time,
                       e.end_time,
                       (SELECT TOP 1 m.message
                        FROM [catalog].[operation_messages] m
                        WHERE m.operation_id = e.execution_id
                          AND m.message_type IN (@P2, @P3)
                        ORDER BY m.message_time DESC) AS error_message
                FROM [catalog].[executions] e
                WHERE e.execution_id = @P1
                "#,
                &[
                    &execution_id,
                    &MessageType::ERROR,
                    &MessageType::DIAGNOSTIC_ERROR,
                ],
            )
            .await?
            .into_row()
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let code = row
            .try_get::<i32, _>("status")?
            .ok_or_else(|| CatalogError::Protocol("status is NULL".to_string()))?;

        Ok(Some(ExecutionSnapshot {
            execution_id: Self::required_i64(&row, "execution_id")?,
            status: CatalogStatus::from_code(code),
            start_time: Self::optional_time(&row, "start_time")?,
            end_time: Self::optional_time(&row, "end_time")?,
            error_message: Self::optional_str(&row, "error_message")?,
        }))
    }

    async fn get_messages(&self, conn: &CatalogConnection, execution_id: i64) -> Vec<String> {
        match Self::fetch_messages(conn, execution_id).await {
            Ok(lines) => lines,
            Err(e) => {
                tracing::warn!("Failed to read messages for execution {}: {}", execution_id, e);
                Vec::new()
            }
        }
    }
}
