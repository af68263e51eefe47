use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ExecutionStatus;

/// Execution state as reported by `[catalog].[executions].status`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CatalogStatus {
    Created,
    Running,
    Canceled,
    Failed,
    Pending,
    EndedUnexpectedly,
    Succeeded,
    Stopping,
    Completed,
    Unknown(i32),
}

impl CatalogStatus {
    #[cfg(test)]
    pub const ALL: [CatalogStatus; 9] = [
        Self::Created,
        Self::Running,
        Self::Canceled,
        Self::Failed,
        Self::Pending,
        Self::EndedUnexpectedly,
        Self::Succeeded,
        Self::Stopping,
        Self::Completed,
    ];

    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Created,
            2 => Self::Running,
            3 => Self::Canceled,
            4 => Self::Failed,
            5 => Self::Pending,
            6 => Self::EndedUnexpectedly,
            7 => Self::Succeeded,
            8 => Self::Stopping,
            9 => Self::Completed,
            other => Self::Unknown(other),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Running => "Running",
            Self::Canceled => "Canceled",
            Self::Failed => "Failed",
            Self::Pending => "Pending",
            Self::EndedUnexpectedly => "Ended unexpectedly",
            Self::Succeeded => "Succeeded",
            Self::Stopping => "Stopping",
            Self::Completed => "Completed",
            Self::Unknown(_) => "Unknown",
        }
    }

    /// Still owned by the catalog: the synchronous poll loop keeps waiting.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Created | Self::Running | Self::Pending)
    }

    pub fn to_execution_status(self) -> ExecutionStatus {
        match self {
            Self::Created | Self::Pending => ExecutionStatus::Pending,
            Self::Running | Self::Stopping => ExecutionStatus::Running,
            Self::Succeeded | Self::Completed => ExecutionStatus::Succeeded,
            Self::Canceled => ExecutionStatus::Cancelled,
            Self::Failed | Self::EndedUnexpectedly | Self::Unknown(_) => ExecutionStatus::Failed,
        }
    }
}

impl std::fmt::Display for CatalogStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// `message_type` codes of `[catalog].[operation_messages]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageType(pub i16);

impl MessageType {
    pub const ERROR: i16 = 120;
    pub const DIAGNOSTIC_ERROR: i16 = 130;

    pub fn label(&self) -> String {
        let label = match self.0 {
            10 => "PRE-VALIDATE",
            20 => "POST-VALIDATE",
            30 => "PRE-EXECUTE",
            40 => "POST-EXECUTE",
            50 => "STATUSCHANGE",
            60 => "PROGRESS",
            70 => "INFORMATION",
            80 => "QUERYCANCEL",
            90 => "TASKFAILED",
            100 => "DIAGNOSTIC",
            110 => "WARNING",
            120 => "ERROR",
            130 => "DIAGERROR",
            other => return format!("TYPE_{}", other),
        };
        label.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRef {
    pub folder_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRef {
    pub project_id: i64,
    pub folder_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRef {
    pub package_id: i64,
    pub project_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectParameter {
    pub name: String,
    pub data_type: String,
    pub required: bool,
    pub default_value: Option<String>,
    pub description: Option<String>,
}

/// One read of `[catalog].[executions]`. Never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionSnapshot {
    pub execution_id: i64,
    pub status: CatalogStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

pub fn format_message_line(
    message_time: DateTime<Utc>,
    message_type: MessageType,
    message: &str,
    source_type: i16,
) -> String {
    format!(
        "[{}] [{}] {} [{}]",
        message_time.format("%Y-%m-%d %H:%M:%S"),
        message_type.label(),
        message,
        source_type
    )
}
