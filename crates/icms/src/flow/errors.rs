use crate::case::domain::ApplicationStatus;

use super::models::{ProcessId, TaskType};

/// Failures raised while checking a process against the workflow it is expected to be in.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error("process {process_id} is not active")]
    ProcessInactive { process_id: ProcessId },
    #[error("process {process_id} is in the wrong state: {status}")]
    ProcessState {
        process_id: ProcessId,
        status: ApplicationStatus,
    },
    #[error("expected one active {task_type} task for process {process_id}, found {found}")]
    Task {
        process_id: ProcessId,
        status: ApplicationStatus,
        task_type: TaskType,
        found: usize,
    },
}

impl FlowError {
    /// Task errors point at corrupt workflow data and are reported; the others are routine.
    pub const fn should_report(&self) -> bool {
        matches!(self, Self::Task { .. })
    }
}
