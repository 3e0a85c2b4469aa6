//! Checks that a case is at a particular point in its workflow before it is changed.

use crate::case::domain::{Application, ApplicationStatus as ST};

use super::errors::FlowError;
use super::models::{Process, Task, TaskTable, TaskType};

/// Fetches the single active task of `task_type` after validating the process status.
///
/// The task table is only reachable through a case unit of work, which holds the store
/// lock for its whole duration. Zero or several matching tasks is a `FlowError::Task`.
pub fn get_task<P: Process>(
    tasks: &TaskTable,
    process: &P,
    expected_state: &[ST],
    task_type: TaskType,
) -> Result<Task, FlowError> {
    if !process.is_active() {
        return Err(FlowError::ProcessInactive {
            process_id: process.process_id(),
        });
    }

    check_expected_status(process, expected_state)?;
    get_expected_task(tasks, process, task_type)
}

/// Same as [`get_task`] without the status check.
pub fn get_expected_task<P: Process>(
    tasks: &TaskTable,
    process: &P,
    task_type: TaskType,
) -> Result<Task, FlowError> {
    if !process.is_active() {
        return Err(FlowError::ProcessInactive {
            process_id: process.process_id(),
        });
    }

    let matching: Vec<&Task> = tasks
        .active_for(process.process_id())
        .filter(|task| task.task_type == task_type)
        .collect();

    match matching.as_slice() {
        [task] => Ok((*task).clone()),
        others => Err(FlowError::Task {
            process_id: process.process_id(),
            status: process.status(),
            task_type,
            found: others.len(),
        }),
    }
}

pub fn check_expected_status<P: Process>(process: &P, expected: &[ST]) -> Result<(), FlowError> {
    let status = process.status();
    if expected.contains(&status) {
        Ok(())
    } else {
        Err(FlowError::ProcessState {
            process_id: process.process_id(),
            status,
        })
    }
}

pub fn check_expected_task<P: Process>(
    tasks: &TaskTable,
    process: &P,
    task_type: TaskType,
) -> Result<(), FlowError> {
    if get_active_task_list(tasks, process).contains(&task_type) {
        Ok(())
    } else {
        Err(FlowError::Task {
            process_id: process.process_id(),
            status: process.status(),
            task_type,
            found: 0,
        })
    }
}

pub fn get_active_task_list<P: Process>(tasks: &TaskTable, process: &P) -> Vec<TaskType> {
    tasks
        .active_for(process.process_id())
        .map(|task| task.task_type)
        .collect()
}

/// The applicant is still creating the application.
pub fn application_in_draft(tasks: &TaskTable, app: &Application) -> Result<(), FlowError> {
    check_expected_status(app, &[ST::InProgress])?;
    check_expected_task(tasks, app, TaskType::Prepare)
}

/// The applicant is editing: a fresh draft, or a response to an update request.
pub fn application_in_progress(tasks: &TaskTable, app: &Application) -> Result<(), FlowError> {
    let expected = [ST::InProgress, ST::Processing, ST::VariationRequested];
    if let Err(err) = check_expected_status(app, &expected) {
        // Releasing ownership after raising an update request moves the case back to SUBMITTED.
        let released_update = app.status == ST::Submitted
            && app.case_owner.is_none()
            && app.current_update_requests().next().is_some();
        if !released_update {
            return Err(err);
        }
    }

    check_expected_task(tasks, app, TaskType::Prepare)
}

pub fn application_in_submitted(tasks: &TaskTable, app: &Application) -> Result<(), FlowError> {
    check_expected_status(app, &[ST::Submitted, ST::VariationRequested])?;
    check_expected_task(tasks, app, TaskType::Process)
}

pub fn application_in_processing(tasks: &TaskTable, app: &Application) -> Result<(), FlowError> {
    check_expected_status(app, &[ST::Submitted, ST::Processing, ST::VariationRequested])?;
    check_expected_task(tasks, app, TaskType::Process)
}

pub fn application_is_authorised(tasks: &TaskTable, app: &Application) -> Result<(), FlowError> {
    check_expected_status(app, &[ST::Processing, ST::VariationRequested])?;
    check_expected_task(tasks, app, TaskType::Authorise)
}

pub fn application_is_with_chief(tasks: &TaskTable, app: &Application) -> Result<(), FlowError> {
    check_expected_status(app, &[ST::Processing, ST::VariationRequested])?;
    check_expected_task(tasks, app, TaskType::ChiefWait)
}

pub fn application_is_complete(app: &Application, include_revoked: bool) -> Result<(), FlowError> {
    if include_revoked {
        check_expected_status(app, &[ST::Completed, ST::Revoked])
    } else {
        check_expected_status(app, &[ST::Completed])
    }
}
