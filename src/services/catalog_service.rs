use crate::catalog::{CatalogClient, CatalogConnection};
use crate::error::CatalogError;
use crate::models::parameters::ParameterSet;
use crate::models::{CatalogStatus, ExecutionSnapshot, ExecutionStatus, ProjectParameter};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const STATUS_ERROR: &str = "Error";
pub const STATUS_TIMEOUT: &str = "Timeout";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// Ceiling used when the caller supplies no timeout of its own.
    pub default_timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            default_timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageLocator {
    pub folder_name: String,
    pub project_name: String,
    pub package_name: String,
}

impl PackageLocator {
    pub fn new(
        folder_name: impl Into<String>,
        project_name: impl Into<String>,
        package_name: impl Into<String>,
    ) -> Self {
        Self {
            folder_name: folder_name.into(),
            project_name: project_name.into(),
            package_name: package_name.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PackageExistence {
    pub success: bool,
    pub error_message: Option<String>,
    pub folder_exists: bool,
    pub project_exists: bool,
    pub package_exists: bool,
    pub parameters: Vec<ProjectParameter>,
}

impl PackageExistence {
    fn missing(message: String, folder_exists: bool, project_exists: bool) -> Self {
        Self {
            success: false,
            error_message: Some(message),
            folder_exists,
            project_exists,
            package_exists: false,
            parameters: Vec::new(),
        }
    }
}

/// Outcome of a run driven to completion (or to the poll ceiling).
#[derive(Debug, Clone, Serialize)]
pub struct CatalogExecutionResult {
    pub success: bool,
    pub execution_id: i64,
    pub status: String,
    pub logs: String,
    pub error_message: Option<String>,
    /// The catalog accepted `start_execution` for this run.
    #[serde(skip)]
    pub started: bool,
    /// Terminal status observed while polling, if any.
    #[serde(skip)]
    pub catalog_status: Option<CatalogStatus>,
}

impl CatalogExecutionResult {
    /// Status for the persisted record. Runs that ended without a terminal
    /// observation are `Failed` (or `Timeout`) but stay open for
    /// reconciliation.
    pub fn record_status(&self) -> ExecutionStatus {
        match self.catalog_status {
            Some(status) => status.to_execution_status(),
            None if self.status == STATUS_TIMEOUT => ExecutionStatus::Timeout,
            None => ExecutionStatus::Failed,
        }
    }
}

/// Outcome of a fire-and-forget start.
#[derive(Debug, Clone, Serialize)]
pub struct StartedExecution {
    pub success: bool,
    pub execution_id: Option<i64>,
    pub logs: String,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionStatusReport {
    pub status: String,
    pub logs: String,
    pub error_message: Option<String>,
    #[serde(skip)]
    pub snapshot: Option<ExecutionSnapshot>,
    #[serde(skip)]
    pub messages: Vec<String>,
}

/// Timestamped lines describing one orchestration run.
#[derive(Debug, Default)]
struct Transcript(String);

impl Transcript {
    fn line(&mut self, text: impl AsRef<str>) {
        self.0.push_str(&format!(
            "[{}] {}\n",
            Utc::now().format("%Y-%m-%d %H:%M:%S"),
            text.as_ref()
        ));
    }

    fn into_string(self) -> String {
        self.0
    }
}

enum SetupFailure {
    NotFound(String),
    Catalog {
        execution_id: Option<i64>,
        error: CatalogError,
    },
}

enum PollOutcome {
    Finished(CatalogStatus),
    Lost,
    Failed(CatalogError),
}

/// Drives the catalog through resolve, create, parametrize and start, and
/// optionally waits for the run to finish.
#[derive(Clone)]
pub struct CatalogService {
    client: Arc<dyn CatalogClient>,
    poll: PollSettings,
}

impl CatalogService {
    pub fn new(client: Arc<dyn CatalogClient>, poll: PollSettings) -> Self {
        Self { client, poll }
    }

    pub async fn check_package_exists(
        &self,
        conn: &CatalogConnection,
        locator: &PackageLocator,
    ) -> PackageExistence {
        tracing::info!(
            "Checking package in {} on {}",
            conn.catalog_name,
            conn.server_address
        );

        match self.lookup_package(conn, locator).await {
            Ok(existence) => existence,
            Err(e) => {
                tracing::error!("Error checking package existence: {}", e);
                PackageExistence::missing(format!("Connection error: {}", e), false, false)
            }
        }
    }

    async fn lookup_package(
        &self,
        conn: &CatalogConnection,
        locator: &PackageLocator,
    ) -> Result<PackageExistence, CatalogError> {
        let Some(folder) = self.client.resolve_folder(conn, &locator.folder_name).await? else {
            return Ok(PackageExistence::missing(
                format!(
                    "Folder '{}' not found in {} catalog.",
                    locator.folder_name, conn.catalog_name
                ),
                false,
                false,
            ));
        };

        let Some(project) = self
            .client
            .resolve_project(conn, folder.folder_id, &locator.project_name)
            .await?
        else {
            return Ok(PackageExistence::missing(
                format!(
                    "Project '{}' not found in folder '{}'.",
                    locator.project_name, locator.folder_name
                ),
                true,
                false,
            ));
        };

        if self
            .client
            .resolve_package(conn, project.project_id, &locator.package_name)
            .await?
            .is_none()
        {
            return Ok(PackageExistence::missing(
                format!(
                    "Package '{}' not found in project '{}'.",
                    locator.package_name, locator.project_name
                ),
                true,
                true,
            ));
        }

        let parameters = self
            .client
            .list_required_project_parameters(conn, project.project_id)
            .await?;

        tracing::info!(
            "Found package {}/{}/{} with {} project parameters",
            locator.folder_name,
            locator.project_name,
            locator.package_name,
            parameters.len()
        );

        Ok(PackageExistence {
            success: true,
            error_message: None,
            folder_exists: true,
            project_exists: true,
            package_exists: true,
            parameters,
        })
    }

    /// Runs the package and waits for a terminal catalog status, giving up
    /// after `timeout` (or the configured default). Giving up does not stop
    /// the run inside the catalog.
    pub async fn execute_package(
        &self,
        conn: &CatalogConnection,
        locator: &PackageLocator,
        params: &ParameterSet,
        timeout: Option<Duration>,
    ) -> CatalogExecutionResult {
        let mut log = Transcript::default();
        let execution_id = match self.setup(conn, locator, params, &mut log).await {
            Ok(id) => id,
            Err(failure) => return Self::setup_failed(failure, log),
        };

        let ceiling = timeout.unwrap_or(self.poll.default_timeout);
        let outcome =
            tokio::time::timeout(ceiling, self.poll_until_done(conn, execution_id, &mut log)).await;

        let (status, error_message, catalog_status) = match outcome {
            Ok(PollOutcome::Finished(status)) => {
                let messages = self.client.get_messages(conn, execution_id).await;
                for message in &messages {
                    log.0.push_str(message);
                    log.0.push('\n');
                }
                let error_message = (status != CatalogStatus::Succeeded)
                    .then(|| format!("Execution completed with status: {}", status));
                (status.label().to_string(), error_message, Some(status))
            }
            Ok(PollOutcome::Lost) => (
                CatalogStatus::Failed.label().to_string(),
                Some("Could not retrieve execution status".to_string()),
                None,
            ),
            Ok(PollOutcome::Failed(e)) => {
                tracing::error!("Status query failed for execution {}: {}", execution_id, e);
                (
                    CatalogStatus::Failed.label().to_string(),
                    Some(e.to_string()),
                    None,
                )
            }
            Err(_) => {
                log.line("Timeout - execution still running");
                tracing::warn!(
                    "Stopped waiting for execution {} after {:?}",
                    execution_id,
                    ceiling
                );
                return CatalogExecutionResult {
                    success: false,
                    execution_id,
                    status: STATUS_TIMEOUT.to_string(),
                    logs: log.into_string(),
                    error_message: Some(format!(
                        "Execution timeout after {}",
                        Self::describe(ceiling)
                    )),
                    started: true,
                    catalog_status: None,
                };
            }
        };

        tracing::info!(
            "Package execution completed: {} (ID: {})",
            status,
            execution_id
        );

        CatalogExecutionResult {
            success: error_message.is_none(),
            execution_id,
            status,
            logs: log.into_string(),
            error_message,
            started: true,
            catalog_status,
        }
    }

    /// Creates and starts the run, then returns without waiting.
    pub async fn start_execution(
        &self,
        conn: &CatalogConnection,
        locator: &PackageLocator,
        params: &ParameterSet,
    ) -> StartedExecution {
        let mut log = Transcript::default();
        match self.setup(conn, locator, params, &mut log).await {
            Ok(execution_id) => StartedExecution {
                success: true,
                execution_id: Some(execution_id),
                logs: log.into_string(),
                error_message: None,
            },
            Err(failure) => {
                let result = Self::setup_failed(failure, log);
                StartedExecution {
                    success: false,
                    execution_id: None,
                    logs: result.logs,
                    error_message: result.error_message,
                }
            }
        }
    }

    pub async fn get_execution_status(
        &self,
        conn: &CatalogConnection,
        execution_id: i64,
    ) -> ExecutionStatusReport {
        match self.client.get_status(conn, execution_id).await {
            Ok(Some(snapshot)) => {
                let messages = self.client.get_messages(conn, execution_id).await;
                ExecutionStatusReport {
                    status: snapshot.status.label().to_string(),
                    logs: messages.join("\n"),
                    error_message: snapshot.error_message.clone(),
                    snapshot: Some(snapshot),
                    messages,
                }
            }
            Ok(None) => ExecutionStatusReport {
                status: CatalogStatus::Unknown(0).label().to_string(),
                logs: String::new(),
                error_message: Some(format!(
                    "Execution {} not found in {} catalog",
                    execution_id, conn.catalog_name
                )),
                snapshot: None,
                messages: Vec::new(),
            },
            Err(e) => {
                tracing::error!("Error getting status of execution {}: {}", execution_id, e);
                ExecutionStatusReport {
                    status: STATUS_ERROR.to_string(),
                    logs: String::new(),
                    error_message: Some(e.to_string()),
                    snapshot: None,
                    messages: Vec::new(),
                }
            }
        }
    }

    async fn setup(
        &self,
        conn: &CatalogConnection,
        locator: &PackageLocator,
        params: &ParameterSet,
        log: &mut Transcript,
    ) -> Result<i64, SetupFailure> {
        let catalog_error = |execution_id, error| SetupFailure::Catalog {
            execution_id,
            error,
        };

        log.line(format!("Connecting to {} catalog", conn.catalog_name));

        let folder = self
            .client
            .resolve_folder(conn, &locator.folder_name)
            .await
            .map_err(|e| catalog_error(None, e))?
            .ok_or_else(|| {
                SetupFailure::NotFound(format!(
                    "Folder '{}' not found in {} catalog",
                    locator.folder_name, conn.catalog_name
                ))
            })?;

        let project = self
            .client
            .resolve_project(conn, folder.folder_id, &locator.project_name)
            .await
            .map_err(|e| catalog_error(None, e))?
            .ok_or_else(|| {
                SetupFailure::NotFound(format!(
                    "Project '{}' not found in folder '{}'",
                    locator.project_name, locator.folder_name
                ))
            })?;

        log.line(format!("Connected to {} catalog", conn.catalog_name));

        let execution_id = self
            .client
            .create_execution(
                conn,
                &folder.name,
                &project.name,
                &locator.package_name,
            )
            .await
            .map_err(|e| catalog_error(None, e))?;
        log.line(format!("Execution created with ID: {}", execution_id));

        if !params.is_empty() {
            log.line(format!("Setting {} parameters", params.len()));
        }
        for (name, value) in params.iter() {
            self.client
                .set_parameter(conn, execution_id, name, value)
                .await
                .map_err(|e| catalog_error(Some(execution_id), e))?;
            log.line(format!(
                "Parameter set: {} = {}",
                name,
                ParameterSet::loggable_value(name, value)
            ));
        }

        self.client
            .start_execution(conn, execution_id)
            .await
            .map_err(|e| catalog_error(Some(execution_id), e))?;
        log.line("Execution started");
        tracing::info!(
            "Started execution {} of {}/{}/{}",
            execution_id,
            locator.folder_name,
            locator.project_name,
            locator.package_name
        );

        Ok(execution_id)
    }

    async fn poll_until_done(
        &self,
        conn: &CatalogConnection,
        execution_id: i64,
        log: &mut Transcript,
    ) -> PollOutcome {
        loop {
            tokio::time::sleep(self.poll.interval).await;

            match self.client.get_status(conn, execution_id).await {
                Ok(Some(snapshot)) => {
                    log.line(format!("Status: {}", snapshot.status));
                    if !snapshot.status.is_in_flight() {
                        return PollOutcome::Finished(snapshot.status);
                    }
                }
                Ok(None) => {
                    log.line("ERROR: Could not retrieve execution status");
                    return PollOutcome::Lost;
                }
                Err(e) => {
                    log.line(format!("ERROR: {}", e));
                    return PollOutcome::Failed(e);
                }
            }
        }
    }

    fn setup_failed(failure: SetupFailure, mut log: Transcript) -> CatalogExecutionResult {
        let (execution_id, message) = match failure {
            SetupFailure::NotFound(message) => (0, message),
            SetupFailure::Catalog {
                execution_id,
                error,
            } => {
                tracing::error!("Error executing package: {}", error);
                (execution_id.unwrap_or(0), error.to_string())
            }
        };
        log.line(format!("ERROR: {}", message));

        CatalogExecutionResult {
            success: false,
            execution_id,
            status: STATUS_ERROR.to_string(),
            logs: log.into_string(),
            error_message: Some(message),
            started: false,
            catalog_status: None,
        }
    }

    fn describe(ceiling: Duration) -> String {
        let secs = ceiling.as_secs();
        match secs {
            60 => "1 minute".to_string(),
            s if s > 0 && s % 60 == 0 => format!("{} minutes", s / 60),
            s => format!("{} seconds", s),
        }
    }
}
