use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::case::document_pack::{doc_ref_licence_get_optional, pack_draft_get, pack_revoked_get};
use crate::case::domain::{Application, ApplicationStatus};
use crate::case::repository::CaseTables;
use crate::flow::{ProcessType, TaskId, TaskType};

use super::{ChiefError, ChiefRequest, ChiefRequestStatus, ChiefResponseError};

/// Outbound adapter delivering licence payloads to CHIEF.
pub trait ChiefClient: Send + Sync {
    fn send_licence(&self, payload: &LicencePayload) -> Result<(), ChiefError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChiefAction {
    Insert,
    Replace,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChiefLicenceType {
    Oil,
    Dfl,
    Sil,
    San,
}

impl ChiefLicenceType {
    pub fn for_process(process_type: ProcessType) -> Result<Self, ChiefError> {
        match process_type {
            ProcessType::FaOil => Ok(Self::Oil),
            ProcessType::FaDfl => Ok(Self::Dfl),
            ProcessType::FaSil => Ok(Self::Sil),
            ProcessType::Sanctions => Ok(Self::San),
            other => Err(ChiefError::UnsupportedProcessType(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicencePayload {
    pub action: ChiefAction,
    pub licence_type: ChiefLicenceType,
    pub case_reference: String,
    pub licence_reference: String,
    pub organisation_name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl LicencePayload {
    pub fn build(
        tables: &CaseTables,
        application: &Application,
        revoke: bool,
    ) -> Result<Self, ChiefError> {
        let licence_type = ChiefLicenceType::for_process(application.process_type)?;
        let action = if revoke {
            ChiefAction::Cancel
        } else if application.status == ApplicationStatus::VariationRequested {
            ChiefAction::Replace
        } else {
            ChiefAction::Insert
        };

        let pack = if revoke {
            pack_revoked_get(tables, application.id)?
        } else {
            pack_draft_get(tables, application.id)?
        };

        let licence_reference = doc_ref_licence_get_optional(tables, pack.id)
            .and_then(|licence| licence.reference.clone())
            .ok_or(ChiefError::MissingLicence(application.id))?;

        Ok(Self {
            action,
            licence_type,
            case_reference: application.get_reference().to_string(),
            licence_reference,
            organisation_name: application.organisation_name.clone(),
            start_date: pack.licence_start_date,
            end_date: pack.licence_end_date,
        })
    }
}

/// Records a CHIEF request for the licence and creates the task that waits for the reply.
///
/// When `send_enabled` is false the request is recorded without a payload. A failure to build
/// or deliver the payload leaves a CHIEF_ERROR task instead of a wait task.
pub fn send_application_to_chief<C>(
    tables: &mut CaseTables,
    client: &C,
    application: &Application,
    previous_task: Option<TaskId>,
    revoke: bool,
    send_enabled: bool,
) -> TaskType
where
    C: ChiefClient + ?Sized,
{
    let outcome = if send_enabled {
        LicencePayload::build(tables, application, revoke).and_then(|payload| {
            client.send_licence(&payload)?;
            Ok(Some(payload))
        })
    } else {
        Ok(None)
    };

    let id = tables.next_chief_request_id();
    let mut request = ChiefRequest {
        id,
        process_id: application.id,
        case_reference: application.get_reference().to_string(),
        request_data: None,
        request_sent_datetime: Utc::now(),
        response_received_datetime: None,
        status: ChiefRequestStatus::Processing,
        response_errors: Vec::new(),
    };

    let task_type = match outcome {
        Ok(payload) => {
            request.request_data = payload;
            info!(
                process_id = %application.id,
                reference = application.get_reference(),
                revoke,
                sent = send_enabled,
                "licence handed to CHIEF"
            );
            if revoke {
                TaskType::ChiefRevokeWait
            } else {
                TaskType::ChiefWait
            }
        }
        Err(err) => {
            error!(
                process_id = %application.id,
                reference = application.get_reference(),
                error = %err,
                report = true,
                "failed to send licence to CHIEF"
            );
            request.status = ChiefRequestStatus::InternalError;
            request.response_errors.push(ChiefResponseError {
                error_code: "ICMS".to_string(),
                error_msg: err.to_string(),
            });
            TaskType::ChiefError
        }
    };

    tables.insert_chief_request(request);
    tables
        .tasks_mut()
        .create(application.id, task_type, previous_task);
    task_type
}
