use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ExecutionSnapshot;

/// One execution attempt of a package. Written once the catalog accepted
/// the start, then only mutated by status reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Execution {
    pub id: String,
    pub package_id: String,
    pub catalog_execution_id: Option<i64>,
    pub status: ExecutionStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub executed_by: Option<String>,
    pub execution_parameters: Option<String>,
    pub execution_logs: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[repr(i32)]
pub enum ExecutionStatus {
    Pending = 1,
    Running = 2,
    Succeeded = 3,
    Failed = 4,
    Cancelled = 5,
    Timeout = 6,
}

impl ExecutionStatus {
    /// `Timeout` is deliberately absent: the catalog may still be running it.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Cancelled => "Cancelled",
            Self::Timeout => "Timeout",
        }
    }
}

impl Execution {
    pub fn is_finalized(&self) -> bool {
        self.status.is_terminal() && self.end_time.is_some()
    }

    /// Folds a fresh catalog snapshot into the record.
    ///
    /// End time, duration and error message are written the first time a
    /// terminal status is observed and never again. Only `Failed` keeps an
    /// error message, taken from the catalog. The log transcript is
    /// replaced by any non-empty snapshot, even after finalization.
    pub fn apply_snapshot(
        &mut self,
        snapshot: &ExecutionSnapshot,
        messages: Vec<String>,
        now: DateTime<Utc>,
    ) {
        if !messages.is_empty() {
            self.execution_logs = Some(messages.join("\n"));
        }

        if self.is_finalized() {
            return;
        }

        self.status = snapshot.status.to_execution_status();
        if !self.status.is_terminal() {
            return;
        }

        if let Some(remote_start) = snapshot.start_time {
            self.start_time = Some(remote_start);
        }
        self.end_time = Some(now);
        self.duration_seconds = self
            .start_time
            .map(|start| (now - start).num_seconds().max(0));

        // Drops messages written client-side, such as a poll timeout.
        self.error_message = match self.status {
            ExecutionStatus::Failed => snapshot.error_message.clone(),
            _ => None,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CatalogStatus;
    use chrono::Duration;

    fn running_record(start: DateTime<Utc>) -> Execution {
        Execution {
            id: "rec-1".to_string(),
            package_id: "pkg-1".to_string(),
            catalog_execution_id: Some(42),
            status: ExecutionStatus::Running,
            start_time: Some(start),
            end_time: None,
            duration_seconds: None,
            executed_by: Some("operator".to_string()),
            execution_parameters: None,
            execution_logs: Some("initial".to_string()),
            error_message: None,
            created_at: start,
            updated_at: None,
        }
    }

    fn snapshot(status: CatalogStatus, start: Option<DateTime<Utc>>) -> ExecutionSnapshot {
        ExecutionSnapshot {
            execution_id: 42,
            status,
            start_time: start,
            end_time: None,
            error_message: Some("Data flow task failed".to_string()),
        }
    }

    #[test]
    fn finalizes_on_first_terminal_observation() {
        let t0 = Utc::now() - Duration::seconds(90);
        let mut record = running_record(t0 + Duration::seconds(5));
        let now = Utc::now();

        record.apply_snapshot(
            &snapshot(CatalogStatus::Succeeded, Some(t0)),
            vec!["line".to_string()],
            now,
        );

        assert_eq!(record.status, ExecutionStatus::Succeeded);
        assert_eq!(record.start_time, Some(t0));
        assert_eq!(record.end_time, Some(now));
        assert_eq!(record.duration_seconds, Some((now - t0).num_seconds()));
        assert_eq!(record.execution_logs.as_deref(), Some("line"));
        assert!(record.error_message.is_none());
    }

    #[test]
    fn failed_records_take_the_remote_error() {
        let start = Utc::now() - Duration::seconds(10);
        let mut record = running_record(start);
        record.apply_snapshot(&snapshot(CatalogStatus::Failed, None), Vec::new(), Utc::now());

        assert_eq!(record.status, ExecutionStatus::Failed);
        assert_eq!(record.error_message.as_deref(), Some("Data flow task failed"));
        assert_eq!(record.execution_logs.as_deref(), Some("initial"));
    }

    #[test]
    fn finalized_record_only_refreshes_logs() {
        let start = Utc::now() - Duration::seconds(30);
        let mut record = running_record(start);
        let first = Utc::now();
        record.apply_snapshot(&snapshot(CatalogStatus::Canceled, None), Vec::new(), first);
        let frozen = record.clone();

        record.apply_snapshot(
            &snapshot(CatalogStatus::Failed, Some(start - Duration::seconds(100))),
            vec!["later".to_string()],
            first + Duration::seconds(60),
        );

        assert_eq!(record.status, frozen.status);
        assert_eq!(record.end_time, frozen.end_time);
        assert_eq!(record.duration_seconds, frozen.duration_seconds);
        assert_eq!(record.error_message, frozen.error_message);
        assert_eq!(record.start_time, frozen.start_time);
        assert_eq!(record.execution_logs.as_deref(), Some("later"));
    }

    #[test]
    fn non_terminal_status_leaves_end_time_open() {
        let mut record = running_record(Utc::now());
        record.apply_snapshot(&snapshot(CatalogStatus::Stopping, None), Vec::new(), Utc::now());
        assert_eq!(record.status, ExecutionStatus::Running);
        assert!(record.end_time.is_none());
        assert!(record.duration_seconds.is_none());
    }

    #[test]
    fn timeout_record_can_still_be_finalized() {
        let mut record = running_record(Utc::now() - Duration::seconds(400));
        record.status = ExecutionStatus::Timeout;
        record.error_message = Some("Execution timeout after 5 minutes".to_string());
        assert!(!record.is_finalized());

        record.apply_snapshot(&snapshot(CatalogStatus::Succeeded, None), Vec::new(), Utc::now());
        assert_eq!(record.status, ExecutionStatus::Succeeded);
        assert!(record.duration_seconds.unwrap() >= 400);
        assert!(record.error_message.is_none());
    }

    #[test]
    fn lost_run_that_failed_takes_the_catalog_error() {
        let mut record = running_record(Utc::now() - Duration::seconds(60));
        record.status = ExecutionStatus::Failed;
        record.error_message = Some("Could not retrieve execution status".to_string());
        assert!(!record.is_finalized());

        record.apply_snapshot(&snapshot(CatalogStatus::Failed, None), Vec::new(), Utc::now());
        assert_eq!(record.error_message.as_deref(), Some("Data flow task failed"));

        let mut cancelled = running_record(Utc::now());
        cancelled.error_message = Some("Could not retrieve execution status".to_string());
        cancelled.apply_snapshot(&snapshot(CatalogStatus::Canceled, None), Vec::new(), Utc::now());
        assert_eq!(cancelled.status, ExecutionStatus::Cancelled);
        assert!(cancelled.error_message.is_none());
    }
}
