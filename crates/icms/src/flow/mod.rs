//! Process/Task workflow primitive gating every case transition.

mod errors;
mod models;
pub mod progress;

pub use errors::FlowError;
pub use models::{
    CaseType, Process, ProcessId, ProcessType, Task, TaskId, TaskTable, TaskType, UserId,
};
pub use progress::{get_expected_task, get_task};
