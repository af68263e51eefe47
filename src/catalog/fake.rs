//! In-memory catalog double that records every call.

use super::{CatalogClient, CatalogConnection};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{
    CatalogStatus, ExecutionSnapshot, FolderRef, PackageRef, ProjectParameter, ProjectRef,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogOp {
    ResolveFolder(String),
    ResolveProject(i64, String),
    ResolvePackage(i64, String),
    ListParameters(i64),
    CreateExecution(String, String, String),
    SetParameter(i64, String, String),
    StartExecution(i64),
    GetStatus(i64),
    GetMessages(i64),
}

/// Which call should fail with a connection error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    ResolveFolder,
    ResolveProject,
    CreateExecution,
    SetParameter,
    StartExecution,
    GetStatus,
}

pub struct FakeCatalog {
    folders: Vec<FolderRef>,
    projects: Vec<ProjectRef>,
    packages: Vec<PackageRef>,
    parameters: Vec<ProjectParameter>,
    next_execution_id: i64,
    statuses: Mutex<VecDeque<Option<CatalogStatus>>>,
    last_status: Mutex<Option<CatalogStatus>>,
    start_time: Option<DateTime<Utc>>,
    error_message: Option<String>,
    messages: Vec<String>,
    failures: Mutex<HashSet<FailPoint>>,
    operations: Mutex<Vec<CatalogOp>>,
}

impl FakeCatalog {
    /// Catalog holding folder `F` (1), project `P` (10) and package `Pkg`
    /// (100), handing out execution id 42.
    pub fn standard() -> Self {
        Self {
            folders: vec![FolderRef {
                folder_id: 1,
                name: "F".to_string(),
            }],
            projects: vec![ProjectRef {
                project_id: 10,
                folder_id: 1,
                name: "P".to_string(),
            }],
            packages: vec![PackageRef {
                package_id: 100,
                project_id: 10,
                name: "Pkg".to_string(),
            }],
            parameters: Vec::new(),
            next_execution_id: 42,
            statuses: Mutex::new(VecDeque::new()),
            last_status: Mutex::new(None),
            start_time: None,
            error_message: None,
            messages: Vec::new(),
            failures: Mutex::new(HashSet::new()),
            operations: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self {
            folders: Vec::new(),
            projects: Vec::new(),
            packages: Vec::new(),
            ..Self::standard()
        }
    }

    pub fn without_project(mut self) -> Self {
        self.projects.clear();
        self.packages.clear();
        self
    }

    pub fn without_package(mut self) -> Self {
        self.packages.clear();
        self
    }

    pub fn with_parameters(mut self, parameters: Vec<ProjectParameter>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Statuses returned by successive `get_status` calls. The last one
    /// repeats once the script runs out; `None` means "no such execution".
    pub fn with_statuses(self, statuses: Vec<Option<CatalogStatus>>) -> Self {
        *self.statuses.lock().expect("lock") = statuses.into();
        self
    }

    pub fn with_start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = Some(start_time);
        self
    }

    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = Some(message.to_string());
        self
    }

    pub fn with_messages(mut self, messages: &[&str]) -> Self {
        self.messages = messages.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn fail_on(self, point: FailPoint) -> Self {
        self.failures.lock().expect("lock").insert(point);
        self
    }

    pub fn set_statuses(&self, statuses: Vec<Option<CatalogStatus>>) {
        *self.statuses.lock().expect("lock") = statuses.into();
    }

    pub fn operations(&self) -> Vec<CatalogOp> {
        self.operations.lock().expect("lock").clone()
    }

    pub fn count(&self, matcher: impl Fn(&CatalogOp) -> bool) -> usize {
        self.operations
            .lock()
            .expect("lock")
            .iter()
            .filter(|op| matcher(op))
            .count()
    }

    fn record(&self, op: CatalogOp) {
        self.operations.lock().expect("lock").push(op);
    }

    fn check_failure(&self, point: FailPoint) -> CatalogResult<()> {
        if self.failures.lock().expect("lock").contains(&point) {
            return Err(CatalogError::Connection(format!(
                "Injected failure at {:?}",
                point
            )));
        }
        Ok(())
    }

    fn next_status(&self) -> Option<CatalogStatus> {
        let mut script = self.statuses.lock().expect("lock");
        let mut last = self.last_status.lock().expect("lock");
        match script.pop_front() {
            Some(next) => {
                *last = next;
                next
            }
            None => *last,
        }
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn resolve_folder(
        &self,
        _conn: &CatalogConnection,
        folder_name: &str,
    ) -> CatalogResult<Option<FolderRef>> {
        self.record(CatalogOp::ResolveFolder(folder_name.to_string()));
        self.check_failure(FailPoint::ResolveFolder)?;
        Ok(self.folders.iter().find(|f| f.name == folder_name).cloned())
    }

    async fn resolve_project(
        &self,
        _conn: &CatalogConnection,
        folder_id: i64,
        project_name: &str,
    ) -> CatalogResult<Option<ProjectRef>> {
        self.record(CatalogOp::ResolveProject(folder_id, project_name.to_string()));
        self.check_failure(FailPoint::ResolveProject)?;
        Ok(self
            .projects
            .iter()
            .find(|p| p.folder_id == folder_id && p.name == project_name)
            .cloned())
    }

    async fn resolve_package(
        &self,
        _conn: &CatalogConnection,
        project_id: i64,
        package_name: &str,
    ) -> CatalogResult<Option<PackageRef>> {
        self.record(CatalogOp::ResolvePackage(project_id, package_name.to_string()));
        Ok(self
            .packages
            .iter()
            .find(|p| p.project_id == project_id && p.name == package_name)
            .cloned())
    }

    async fn list_required_project_parameters(
        &self,
        _conn: &CatalogConnection,
        project_id: i64,
    ) -> CatalogResult<Vec<ProjectParameter>> {
        self.record(CatalogOp::ListParameters(project_id));
        Ok(self
            .parameters
            .iter()
            .filter(|p| p.required)
            .cloned()
            .collect())
    }

    async fn create_execution(
        &self,
        _conn: &CatalogConnection,
        folder_name: &str,
        project_name: &str,
        package_name: &str,
    ) -> CatalogResult<i64> {
        self.record(CatalogOp::CreateExecution(
            folder_name.to_string(),
            project_name.to_string(),
            package_name.to_string(),
        ));
        self.check_failure(FailPoint::CreateExecution)?;
        Ok(self.next_execution_id)
    }

    async fn set_parameter(
        &self,
        _conn: &CatalogConnection,
        execution_id: i64,
        name: &str,
        value: &str,
    ) -> CatalogResult<()> {
        self.record(CatalogOp::SetParameter(
            execution_id,
            name.to_string(),
            value.to_string(),
        ));
        self.check_failure(FailPoint::SetParameter)
    }

    async fn start_execution(
        &self,
        _conn: &CatalogConnection,
        execution_id: i64,
    ) -> CatalogResult<()> {
        self.record(CatalogOp::StartExecution(execution_id));
        self.check_failure(FailPoint::StartExecution)
    }

    async fn get_status(
        &self,
        _conn: &CatalogConnection,
        execution_id: i64,
    ) -> CatalogResult<Option<ExecutionSnapshot>> {
        self.record(CatalogOp::GetStatus(execution_id));
        self.check_failure(FailPoint::GetStatus)?;
        Ok(self.next_status().map(|status| ExecutionSnapshot {
            execution_id,
            status,
            start_time: self.start_time,
            end_time: None,
            error_message: self.error_message.clone(),
        }))
    }

    async fn get_messages(&self, _conn: &CatalogConnection, execution_id: i64) -> Vec<String> {
        self.record(CatalogOp::GetMessages(execution_id));
        self.messages.clone()
    }
}
