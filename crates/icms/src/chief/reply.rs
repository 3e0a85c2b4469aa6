use chrono::Utc;
use tracing::{info, warn};

use crate::case::document_pack::pack_draft_set_active;
use crate::case::domain::{Application, ApplicationStatus as ST, VariationRequestStatus};
use crate::case::repository::CaseTables;
use crate::case::service::CaseError;
use crate::flow::{ProcessId, TaskType};

use super::{ChiefRequestId, ChiefRequestStatus, ChiefResponseError};

/// CHIEF accepted the licence: the case is completed and the draft licence issued.
///
/// For a revoked licence only the revoke wait task is closed.
pub fn chief_licence_reply_approve_licence(
    tables: &mut CaseTables,
    process_id: ProcessId,
) -> Result<(), CaseError> {
    let mut application = tables.application(process_id)?.clone();

    if application.status == ST::Revoked {
        let task = tables.get_task(process_id, &[ST::Revoked], TaskType::ChiefRevokeWait)?;
        tables.tasks_mut().end(task.id, None);
    } else {
        let task = tables.get_task(
            process_id,
            &[ST::Processing, ST::VariationRequested],
            TaskType::ChiefWait,
        )?;
        tables.tasks_mut().end(task.id, None);

        application.close_open_variation(VariationRequestStatus::Accepted);
        pack_draft_set_active(tables, &application)?;
        application.status = ST::Completed;
        application.order_datetime = Utc::now();
    }

    if let Some(request_id) = processing_request(tables, process_id) {
        complete_chief_request(tables, request_id);
    }

    info!(
        process_id = %process_id,
        reference = application.get_reference(),
        status = %application.status,
        "CHIEF approved licence"
    );
    tables.save_application(application)?;
    Ok(())
}

/// CHIEF rejected the licence: the wait task ends and a CHIEF_ERROR task takes its place.
pub fn chief_licence_reply_reject_licence(
    tables: &mut CaseTables,
    process_id: ProcessId,
    errors: Vec<ChiefResponseError>,
) -> Result<(), CaseError> {
    let application = tables.application(process_id)?;
    let (expected, task_type) = if application.status == ST::Revoked {
        (vec![ST::Revoked], TaskType::ChiefRevokeWait)
    } else {
        (
            vec![ST::Processing, ST::VariationRequested],
            TaskType::ChiefWait,
        )
    };
    let reference = application.get_reference().to_string();

    let task = tables.get_task(process_id, &expected, task_type)?;
    tables.tasks_mut().end(task.id, None);
    tables
        .tasks_mut()
        .create(process_id, TaskType::ChiefError, Some(task.id));

    if let Some(request_id) = processing_request(tables, process_id) {
        fail_chief_request(tables, request_id, errors);
    }

    warn!(process_id = %process_id, reference, "CHIEF rejected licence");
    Ok(())
}

pub fn complete_chief_request(tables: &mut CaseTables, request_id: ChiefRequestId) {
    if let Some(request) = tables.chief_request_mut(request_id) {
        request.status = ChiefRequestStatus::Success;
        request.response_received_datetime = Some(Utc::now());
    }
}

pub fn fail_chief_request(
    tables: &mut CaseTables,
    request_id: ChiefRequestId,
    errors: Vec<ChiefResponseError>,
) {
    if let Some(request) = tables.chief_request_mut(request_id) {
        request.status = ChiefRequestStatus::Error;
        request.response_received_datetime = Some(Utc::now());
        request.response_errors.extend(errors);
    }
}

/// Applications waiting on a CHIEF reply.
pub fn pending_licences(tables: &CaseTables) -> Vec<&Application> {
    with_active_task(tables, TaskType::ChiefWait)
}

/// Applications whose licence was rejected by CHIEF or could not be sent.
pub fn failed_licences(tables: &CaseTables) -> Vec<&Application> {
    with_active_task(tables, TaskType::ChiefError)
}

fn with_active_task(tables: &CaseTables, task_type: TaskType) -> Vec<&Application> {
    tables
        .applications()
        .filter(|app| app.is_active && tables.tasks().has_active(app.id, task_type))
        .collect()
}

fn processing_request(tables: &CaseTables, process_id: ProcessId) -> Option<ChiefRequestId> {
    tables
        .chief_requests()
        .filter(|request| {
            request.process_id == process_id && request.status == ChiefRequestStatus::Processing
        })
        .map(|request| request.id)
        .max()
}
