use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::chief::{self, ChiefClient, ChiefError, ChiefResponseError};
use crate::config::IcmsConfig;
use crate::flow::{progress, CaseType, FlowError, ProcessId, TaskType};
use crate::search::{self, SearchError, SearchResults, SearchTerms};

use super::checks::{
    get_app_errors, get_submission_errors, FieldErrors, FIELD_REQUIRED, LICENCE_MEDIUM_UNAVAILABLE,
};
use super::document_pack::{
    doc_ref_documents_all, doc_ref_documents_create, pack_active_revoke, pack_draft_archive,
    pack_draft_create, pack_draft_get, pack_draft_set_active, pack_issued_get_all,
    pack_licence_update, CaseDocumentReference, DocumentPack, DocumentPackError, LicenceUpdate,
};
use super::domain::{
    Application, ApplicationDetail, ApplicationStatus as ST, CaseEmail, Checklist,
    CorrespondenceStatus, Decision, FurtherInformationRequest, NewApplication, UpdateRequest,
    UpdateRequestStatus, User, VariationRequest, VariationRequestStatus, WithdrawApplication,
    WithdrawalStatus,
};
use super::reference::{
    get_application_case_reference, get_variation_request_case_reference, ReferenceError,
};
use super::repository::{CaseRepository, CaseTables, RepositoryError};

const CASE_PROCESSING: [ST; 2] = [ST::Processing, ST::VariationRequested];
const CASE_OPEN: [ST; 3] = [ST::Submitted, ST::Processing, ST::VariationRequested];

/// Error raised by case workflow operations.
#[derive(Debug, thiserror::Error)]
pub enum CaseError {
    #[error(transparent)]
    Flow(#[from] FlowError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    DocumentPack(#[from] DocumentPackError),
    #[error(transparent)]
    Reference(#[from] ReferenceError),
    #[error(transparent)]
    Chief(#[from] ChiefError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(FieldErrors),
    #[error("{0}")]
    InvalidRequest(String),
}

impl CaseError {
    fn validation(field: &str, message: &str) -> Self {
        let mut errors = FieldErrors::default();
        errors.add(field, message);
        Self::Validation(errors)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionInput {
    pub decision: Decision,
    #[serde(default)]
    pub refuse_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokeInput {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub send_email: bool,
}

/// Everything a caseworker sees on the case management screen.
#[derive(Debug, Clone, Serialize)]
pub struct CaseView {
    pub application: Application,
    pub status_label: &'static str,
    pub active_tasks: Vec<TaskType>,
    pub draft: Option<DocumentPack>,
    pub issued: Vec<DocumentPack>,
    pub documents: Vec<CaseDocumentReference>,
}

/// Case workflow operations. Every mutation runs in one repository unit of work.
pub struct CaseService<R, C> {
    repository: Arc<R>,
    chief: Arc<C>,
    config: IcmsConfig,
}

impl<R, C> CaseService<R, C>
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    pub fn new(repository: Arc<R>, chief: Arc<C>, config: IcmsConfig) -> Self {
        Self {
            repository,
            chief,
            config,
        }
    }

    pub fn config(&self) -> &IcmsConfig {
        &self.config
    }

    /// Start a new application with a PREPARE task and an empty draft pack.
    pub fn create_application(
        &self,
        user: &User,
        draft: NewApplication,
    ) -> Result<Application, CaseError> {
        let detail = draft
            .detail
            .unwrap_or_else(|| ApplicationDetail::empty(draft.process_type));
        if !detail.matches(draft.process_type) {
            return Err(CaseError::validation(
                "detail",
                "Application details do not match the application type",
            ));
        }

        self.repository.atomic(|tables| {
            let now = Utc::now();
            let application = Application {
                id: tables.next_process_id(),
                process_type: draft.process_type,
                is_active: true,
                status: ST::InProgress,
                reference: None,
                applicant_reference: draft.applicant_reference,
                decision: None,
                refuse_reason: None,
                variation_decision: None,
                variation_refuse_reason: None,
                case_owner: None,
                created: now,
                submit_datetime: None,
                submitted_by: None,
                order_datetime: now,
                contact: draft.contact,
                organisation_name: draft.organisation_name,
                agent_name: draft.agent_name,
                chief_usage_status: None,
                licence_reference: None,
                checklist: None,
                variation_requests: Vec::new(),
                further_information_requests: Vec::new(),
                update_requests: Vec::new(),
                case_emails: Vec::new(),
                withdrawals: Vec::new(),
                detail,
            };

            tables.insert_application(application.clone())?;
            tables
                .tasks_mut()
                .create(application.id, TaskType::Prepare, None);
            pack_draft_create(tables, &application, false)?;

            info!(
                process_id = %application.id,
                process_type = application.process_type.code(),
                created_by = user.id.0,
                "application created"
            );
            Ok(application)
        })
    }

    pub fn get_application(
        &self,
        case_type: CaseType,
        id: ProcessId,
    ) -> Result<Application, CaseError> {
        self.repository
            .read(|tables| load(tables, case_type, id))?
    }

    pub fn case_view(&self, case_type: CaseType, id: ProcessId) -> Result<CaseView, CaseError> {
        self.repository.read(|tables| -> Result<CaseView, CaseError> {
            let application = load(tables, case_type, id)?;
            let draft = pack_draft_get(tables, id).ok().cloned();
            let documents = draft
                .as_ref()
                .map(|pack| {
                    doc_ref_documents_all(tables, pack.id)
                        .into_iter()
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();

            Ok(CaseView {
                status_label: application.status.label(),
                active_tasks: progress::get_active_task_list(tables.tasks(), &application),
                issued: pack_issued_get_all(tables, id).into_iter().cloned().collect(),
                draft,
                documents,
                application,
            })
        })?
    }

    /// Replace the type-specific details while the applicant is editing.
    pub fn edit_application(
        &self,
        case_type: CaseType,
        id: ProcessId,
        detail: ApplicationDetail,
    ) -> Result<Application, CaseError> {
        self.repository.atomic(|tables| {
            let mut application = load(tables, case_type, id)?;
            progress::application_in_progress(tables.tasks(), &application)?;

            if !detail.matches(application.process_type) {
                return Err(CaseError::validation(
                    "detail",
                    "Application details do not match the application type",
                ));
            }

            application.detail = detail;
            tables.save_application(application.clone())?;
            Ok(application)
        })
    }

    /// Delete an application that has not been submitted.
    pub fn cancel_application(&self, case_type: CaseType, id: ProcessId) -> Result<(), CaseError> {
        self.repository.atomic(|tables| {
            load(tables, case_type, id)?;
            tables.get_task(id, &[ST::InProgress], TaskType::Prepare)?;
            let removed = tables.remove_application(id)?;
            info!(process_id = %removed.id, "application cancelled");
            Ok(())
        })
    }

    pub fn submit_application(
        &self,
        case_type: CaseType,
        id: ProcessId,
        user: &User,
    ) -> Result<Application, CaseError> {
        self.repository.atomic(|tables| {
            let mut application = load(tables, case_type, id)?;
            progress::application_in_progress(tables.tasks(), &application)?;
            let task = progress::get_expected_task(tables.tasks(), &application, TaskType::Prepare)?;

            let errors = get_submission_errors(&application);
            if !errors.is_empty() {
                return Err(CaseError::Validation(errors));
            }

            if application.reference.is_none() {
                application.reference = Some(get_application_case_reference(tables, &application));
            }

            let now = Utc::now();
            if application.submit_datetime.is_none() {
                application.submit_datetime = Some(now);
            }
            application.submitted_by = Some(user.id);
            application.order_datetime = now;
            application.status = match (&application.case_owner, application.status) {
                (_, ST::VariationRequested) => ST::VariationRequested,
                (Some(_), _) => ST::Processing,
                (None, _) => ST::Submitted,
            };
            for update in application.update_requests.iter_mut() {
                if update.status == UpdateRequestStatus::UpdateInProgress {
                    update.status = UpdateRequestStatus::Responded;
                }
            }

            tables.tasks_mut().end(task.id, Some(user.id));
            if !tables.tasks().has_active(id, TaskType::Process) {
                tables
                    .tasks_mut()
                    .create(id, TaskType::Process, Some(task.id));
            }

            transition(&application, "submitted");
            tables.save_application(application.clone())?;
            Ok(application)
        })
    }

    pub fn take_ownership(
        &self,
        case_type: CaseType,
        id: ProcessId,
        user: &User,
    ) -> Result<Application, CaseError> {
        self.repository.atomic(|tables| {
            let mut application = load(tables, case_type, id)?;
            tables.get_task(id, &[ST::Submitted, ST::VariationRequested], TaskType::Process)?;

            if application.status == ST::Submitted {
                application.status = ST::Processing;
            }
            application.case_owner = Some(user.clone());

            if application.is_import_application()
                && pack_draft_get(tables, id)?.licence_start_date.is_none()
            {
                pack_licence_update(
                    tables,
                    id,
                    LicenceUpdate {
                        licence_start_date: Some(Utc::now().date_naive()),
                        ..LicenceUpdate::default()
                    },
                )?;
            }

            transition(&application, "ownership taken");
            tables.save_application(application.clone())?;
            Ok(application)
        })
    }

    pub fn release_ownership(
        &self,
        case_type: CaseType,
        id: ProcessId,
    ) -> Result<Application, CaseError> {
        self.repository.atomic(|tables| {
            let mut application = load(tables, case_type, id)?;
            tables.get_task(id, &CASE_OPEN, TaskType::Process)?;

            if application.status != ST::VariationRequested {
                application.status = ST::Submitted;
            }
            application.case_owner = None;

            transition(&application, "ownership released");
            tables.save_application(application.clone())?;
            Ok(application)
        })
    }

    /// Hand a batch of cases to another caseworker. Cases not being processed are skipped.
    ///
    /// Every id must belong to `case_type`; one from the other case type fails the whole batch.
    pub fn reassign_case_owner(
        &self,
        case_type: CaseType,
        ids: &[ProcessId],
        new_owner: &User,
    ) -> Result<Vec<ProcessId>, CaseError> {
        self.repository.atomic(|tables| {
            let mut reassigned = Vec::new();
            for id in ids {
                let mut application = load(tables, case_type, *id)?;
                if CASE_PROCESSING.contains(&application.status) {
                    application.case_owner = Some(new_owner.clone());
                    tables.save_application(application)?;
                    reassigned.push(*id);
                }
            }
            info!(
                case_type = case_type.code(),
                count = reassigned.len(),
                owner = new_owner.id.0,
                "cases reassigned"
            );
            Ok(reassigned)
        })
    }

    pub fn complete_checklist(
        &self,
        case_type: CaseType,
        id: ProcessId,
        checklist: Checklist,
    ) -> Result<Application, CaseError> {
        self.repository.atomic(|tables| {
            let mut application = load(tables, case_type, id)?;
            tables.get_task(id, &CASE_PROCESSING, TaskType::Process)?;

            if !application.application_type().case_checklist_flag {
                return Err(CaseError::InvalidRequest(format!(
                    "{} applications do not have a checklist",
                    application.process_type.label()
                )));
            }

            application.checklist = Some(checklist);
            tables.save_application(application.clone())?;
            Ok(application)
        })
    }

    pub fn edit_licence(
        &self,
        case_type: CaseType,
        id: ProcessId,
        update: LicenceUpdate,
    ) -> Result<DocumentPack, CaseError> {
        self.repository.atomic(|tables| {
            let application = load(tables, case_type, id)?;
            if !application.is_import_application() {
                return Err(CaseError::InvalidRequest(
                    "certificates do not have licence details".to_string(),
                ));
            }
            tables.get_task(id, &CASE_PROCESSING, TaskType::Process)?;

            if let Some(paper_only) = update.issue_paper_licence_only {
                if !application
                    .application_type()
                    .supports_paper_licence_only(paper_only)
                {
                    return Err(CaseError::validation(
                        "issue_paper_licence_only",
                        LICENCE_MEDIUM_UNAVAILABLE,
                    ));
                }
            }

            let draft = pack_draft_get(tables, id)?;
            let start = update.licence_start_date.or(draft.licence_start_date);
            let end = update.licence_end_date.or(draft.licence_end_date);
            if let (Some(start), Some(end)) = (start, end) {
                if end <= start {
                    return Err(CaseError::validation(
                        "licence_end_date",
                        "End date must be after the start date.",
                    ));
                }
            }

            pack_licence_update(tables, id, update)?;
            Ok(pack_draft_get(tables, id)?.clone())
        })
    }

    /// Record the approve/refuse decision. Import variations record the variation decision.
    pub fn set_decision(
        &self,
        case_type: CaseType,
        id: ProcessId,
        input: DecisionInput,
    ) -> Result<Application, CaseError> {
        self.repository.atomic(|tables| {
            let mut application = load(tables, case_type, id)?;
            tables.get_task(id, &CASE_PROCESSING, TaskType::Process)?;

            let refuse_reason = match input.decision {
                Decision::Approve => None,
                Decision::Refuse => match input.refuse_reason {
                    Some(reason) if !reason.trim().is_empty() => Some(reason),
                    _ => return Err(CaseError::validation("refuse_reason", FIELD_REQUIRED)),
                },
            };

            if is_import_variation(&application) {
                application.variation_decision = Some(input.decision);
                application.variation_refuse_reason = refuse_reason;
            } else {
                application.decision = Some(input.decision);
                application.refuse_reason = refuse_reason;
            }

            tables.save_application(application.clone())?;
            Ok(application)
        })
    }

    pub fn start_authorisation(
        &self,
        case_type: CaseType,
        id: ProcessId,
        user: &User,
    ) -> Result<Application, CaseError> {
        self.repository.atomic(|tables| {
            let mut application = load(tables, case_type, id)?;
            let task = tables.get_task(id, &CASE_PROCESSING, TaskType::Process)?;

            let errors = get_app_errors(tables, &application);
            if !errors.is_empty() {
                return Err(CaseError::Validation(errors));
            }

            tables.tasks_mut().end(task.id, Some(user.id));

            let variation = is_import_variation(&application);
            let decision = if variation {
                application.variation_decision
            } else {
                application.decision
            };

            match (decision, variation) {
                (Some(Decision::Refuse), true) => {
                    let reason = application.variation_refuse_reason.clone();
                    if let Some(open) = application.open_variation_request_mut() {
                        open.reject_cancellation_reason = reason;
                    }
                    application.close_open_variation(VariationRequestStatus::Rejected);
                    application.status = ST::Completed;
                    pack_draft_archive(tables, id)?;
                }
                (Some(Decision::Refuse), false) => {
                    tables
                        .tasks_mut()
                        .create(id, TaskType::Rejected, Some(task.id));
                    application.status = ST::Completed;
                    pack_draft_archive(tables, id)?;
                }
                _ => {
                    tables
                        .tasks_mut()
                        .create(id, TaskType::Authorise, Some(task.id));
                    if application.status != ST::VariationRequested {
                        application.status = ST::Processing;
                    }
                    doc_ref_documents_create(tables, &mut application)?;
                }
            }

            transition(&application, "authorisation started");
            tables.save_application(application.clone())?;
            Ok(application)
        })
    }

    pub fn authorise_documents(
        &self,
        case_type: CaseType,
        id: ProcessId,
        user: &User,
    ) -> Result<Application, CaseError> {
        self.repository.atomic(|tables| {
            let application = load(tables, case_type, id)?;
            let task = tables.get_task(id, &CASE_PROCESSING, TaskType::Authorise)?;

            tables.tasks_mut().end(task.id, Some(user.id));
            tables
                .tasks_mut()
                .create(id, TaskType::DocumentSigning, Some(task.id));

            transition(&application, "documents authorised");
            Ok(application)
        })
    }

    /// Signing succeeded: issue the documents, or hand the licence to CHIEF first.
    pub fn documents_signed(
        &self,
        case_type: CaseType,
        id: ProcessId,
    ) -> Result<Application, CaseError> {
        self.repository.atomic(|tables| {
            let mut application = load(tables, case_type, id)?;
            let task = tables.get_task(id, &CASE_PROCESSING, TaskType::DocumentSigning)?;
            tables.tasks_mut().end(task.id, None);

            if application.is_import_application() && application.application_type().chief_flag {
                chief::send_application_to_chief(
                    tables,
                    self.chief.as_ref(),
                    &application,
                    Some(task.id),
                    false,
                    self.config.send_licence_to_chief,
                );
            } else {
                let closed = if application.is_import_application() {
                    VariationRequestStatus::Accepted
                } else {
                    VariationRequestStatus::Closed
                };
                application.close_open_variation(closed);
                pack_draft_set_active(tables, &application)?;
                application.status = ST::Completed;
                application.order_datetime = Utc::now();
            }

            transition(&application, "documents signed");
            tables.save_application(application.clone())?;
            Ok(application)
        })
    }

    pub fn documents_failed(
        &self,
        case_type: CaseType,
        id: ProcessId,
    ) -> Result<Application, CaseError> {
        self.swap_task(case_type, id, TaskType::DocumentSigning, TaskType::DocumentError)
    }

    pub fn retry_document_signing(
        &self,
        case_type: CaseType,
        id: ProcessId,
    ) -> Result<Application, CaseError> {
        self.swap_task(case_type, id, TaskType::DocumentError, TaskType::DocumentSigning)
    }

    pub fn request_withdrawal(
        &self,
        case_type: CaseType,
        id: ProcessId,
        user: &User,
        reason: String,
    ) -> Result<Application, CaseError> {
        if reason.trim().is_empty() {
            return Err(CaseError::validation("reason", FIELD_REQUIRED));
        }

        self.repository.atomic(|tables| {
            let mut application = load(tables, case_type, id)?;
            progress::check_expected_status(&application, &CASE_OPEN)?;

            if application.open_withdrawal_mut().is_some() {
                return Err(CaseError::InvalidRequest(
                    "a withdrawal request is already open".to_string(),
                ));
            }

            application.withdrawals.push(WithdrawApplication {
                id: tables.next_record_id(),
                status: WithdrawalStatus::Open,
                reason,
                request_by: user.id,
                response_by: None,
                response: None,
            });

            transition(&application, "withdrawal requested");
            tables.save_application(application.clone())?;
            Ok(application)
        })
    }

    pub fn respond_withdrawal(
        &self,
        case_type: CaseType,
        id: ProcessId,
        user: &User,
        accept: bool,
        response: Option<String>,
    ) -> Result<Application, CaseError> {
        self.repository.atomic(|tables| {
            let mut application = load(tables, case_type, id)?;
            progress::check_expected_status(&application, &CASE_OPEN)?;

            let withdrawal = application.open_withdrawal_mut().ok_or_else(|| {
                CaseError::InvalidRequest("no open withdrawal request".to_string())
            })?;
            withdrawal.response_by = Some(user.id);
            withdrawal.response = response;

            if accept {
                withdrawal.status = WithdrawalStatus::Accepted;
                tables.tasks_mut().end_all_active(id);
                pack_draft_archive(tables, id)?;

                if application.status == ST::VariationRequested {
                    application.close_open_variation(VariationRequestStatus::Withdrawn);
                    application.status = ST::Completed;
                } else {
                    application.status = ST::Withdrawn;
                    application.is_active = false;
                }
            } else {
                withdrawal.status = WithdrawalStatus::Rejected;
                if !tables.tasks().has_active(id, TaskType::Process) {
                    tables.tasks_mut().create(id, TaskType::Process, None);
                }
            }

            transition(&application, "withdrawal answered");
            tables.save_application(application.clone())?;
            Ok(application)
        })
    }

    pub fn stop_case(&self, case_type: CaseType, id: ProcessId) -> Result<Application, CaseError> {
        self.repository.atomic(|tables| {
            let mut application = load(tables, case_type, id)?;
            tables.get_task(id, &CASE_OPEN, TaskType::Process)?;

            tables.tasks_mut().end_all_active(id);
            pack_draft_archive(tables, id)?;
            application.close_open_variation(VariationRequestStatus::Cancelled);
            application.status = ST::Stopped;

            transition(&application, "case stopped");
            tables.save_application(application.clone())?;
            Ok(application)
        })
    }

    pub fn reopen_case(&self, case_type: CaseType, id: ProcessId) -> Result<Application, CaseError> {
        self.repository.atomic(|tables| {
            let mut application = load(tables, case_type, id)?;
            progress::check_expected_status(&application, &[ST::Stopped, ST::Withdrawn])?;

            application.status = ST::Submitted;
            application.is_active = true;
            application.case_owner = None;
            tables.tasks_mut().create(id, TaskType::Process, None);
            pack_draft_create(tables, &application, false)?;

            transition(&application, "case reopened");
            tables.save_application(application.clone())?;
            Ok(application)
        })
    }

    pub fn revoke_licence(
        &self,
        case_type: CaseType,
        id: ProcessId,
        input: RevokeInput,
    ) -> Result<Application, CaseError> {
        self.repository.atomic(|tables| {
            let mut application = load(tables, case_type, id)?;
            progress::application_is_complete(&application, false)?;

            pack_active_revoke(tables, id, input.reason, input.send_email)?;
            application.status = ST::Revoked;

            if application.is_import_application() && application.application_type().chief_flag {
                chief::send_application_to_chief(
                    tables,
                    self.chief.as_ref(),
                    &application,
                    None,
                    true,
                    self.config.send_licence_to_chief,
                );
            }

            transition(&application, "licence revoked");
            tables.save_application(application.clone())?;
            Ok(application)
        })
    }

    /// Open a variation on a completed case. The case reference gains a variation suffix.
    pub fn request_variation(
        &self,
        case_type: CaseType,
        id: ProcessId,
        user: &User,
        what_varied: String,
    ) -> Result<Application, CaseError> {
        if what_varied.trim().is_empty() {
            return Err(CaseError::validation("what_varied", FIELD_REQUIRED));
        }

        self.repository.atomic(|tables| {
            let mut application = load(tables, case_type, id)?;
            progress::application_is_complete(&application, false)?;

            application.variation_requests.push(VariationRequest {
                id: tables.next_record_id(),
                status: VariationRequestStatus::Open,
                what_varied,
                requested_by: user.id,
                requested_datetime: Utc::now(),
                closed_datetime: None,
                reject_cancellation_reason: None,
            });
            application.status = ST::VariationRequested;
            application.variation_decision = None;
            application.variation_refuse_reason = None;
            application.case_owner = None;
            application.reference = Some(get_variation_request_case_reference(&application)?);

            tables.tasks_mut().create(id, TaskType::Process, None);
            pack_draft_create(tables, &application, true)?;

            transition(&application, "variation requested");
            tables.save_application(application.clone())?;
            Ok(application)
        })
    }

    /// Ask the applicant for further information while the case is being processed.
    pub fn add_further_information_request(
        &self,
        case_type: CaseType,
        id: ProcessId,
        request_subject: String,
    ) -> Result<FurtherInformationRequest, CaseError> {
        self.repository.atomic(|tables| {
            let mut application = load(tables, case_type, id)?;
            tables.get_task(id, &CASE_PROCESSING, TaskType::Process)?;

            let request = FurtherInformationRequest {
                id: next_entry_id(application.further_information_requests.len()),
                status: CorrespondenceStatus::Open,
                request_subject,
            };
            application.further_information_requests.push(request.clone());

            debug!(process_id = %id, request_id = request.id, "further information requested");
            tables.save_application(application)?;
            Ok(request)
        })
    }

    pub fn respond_further_information_request(
        &self,
        case_type: CaseType,
        id: ProcessId,
        request_id: u64,
    ) -> Result<FurtherInformationRequest, CaseError> {
        self.repository.atomic(|tables| {
            let mut application = load(tables, case_type, id)?;
            progress::check_expected_status(&application, &CASE_OPEN)?;

            let request = application
                .further_information_requests
                .iter_mut()
                .find(|request| request.id == request_id)
                .ok_or_else(|| unknown_entry("further information request", request_id))?;
            if request.status != CorrespondenceStatus::Open {
                return Err(CaseError::InvalidRequest(format!(
                    "further information request {request_id} is not open"
                )));
            }
            request.status = CorrespondenceStatus::Responded;
            let request = request.clone();

            tables.save_application(application)?;
            Ok(request)
        })
    }

    pub fn close_further_information_request(
        &self,
        case_type: CaseType,
        id: ProcessId,
        request_id: u64,
    ) -> Result<FurtherInformationRequest, CaseError> {
        self.repository.atomic(|tables| {
            let mut application = load(tables, case_type, id)?;
            tables.get_task(id, &CASE_PROCESSING, TaskType::Process)?;

            let request = application
                .further_information_requests
                .iter_mut()
                .find(|request| request.id == request_id)
                .ok_or_else(|| unknown_entry("further information request", request_id))?;
            if !matches!(
                request.status,
                CorrespondenceStatus::Open | CorrespondenceStatus::Responded
            ) {
                return Err(CaseError::InvalidRequest(format!(
                    "further information request {request_id} is already closed"
                )));
            }
            request.status = CorrespondenceStatus::Closed;
            let request = request.clone();

            tables.save_application(application)?;
            Ok(request)
        })
    }

    /// Send an update request, handing the application back to the applicant with a PREPARE task.
    pub fn add_update_request(
        &self,
        case_type: CaseType,
        id: ProcessId,
        request_subject: String,
    ) -> Result<UpdateRequest, CaseError> {
        self.repository.atomic(|tables| {
            let mut application = load(tables, case_type, id)?;
            let task = tables.get_task(id, &CASE_PROCESSING, TaskType::Process)?;
            if application.current_update_requests().next().is_some() {
                return Err(CaseError::InvalidRequest(
                    "an update request is already in progress".to_string(),
                ));
            }

            let request = UpdateRequest {
                id: next_entry_id(application.update_requests.len()),
                status: UpdateRequestStatus::Open,
                request_subject,
            };
            application.update_requests.push(request.clone());
            application.order_datetime = Utc::now();
            tables
                .tasks_mut()
                .create(id, TaskType::Prepare, Some(task.id));

            transition(&application, "update requested");
            tables.save_application(application)?;
            Ok(request)
        })
    }

    /// The applicant starts editing in response to an open update request.
    pub fn start_update_request(
        &self,
        case_type: CaseType,
        id: ProcessId,
        request_id: u64,
    ) -> Result<UpdateRequest, CaseError> {
        self.repository.atomic(|tables| {
            let mut application = load(tables, case_type, id)?;
            progress::check_expected_status(&application, &CASE_OPEN)?;

            let request = application
                .update_requests
                .iter_mut()
                .find(|request| request.id == request_id)
                .ok_or_else(|| unknown_entry("update request", request_id))?;
            if request.status != UpdateRequestStatus::Open {
                return Err(CaseError::InvalidRequest(format!(
                    "update request {request_id} is not open"
                )));
            }
            request.status = UpdateRequestStatus::UpdateInProgress;
            let request = request.clone();

            tables.save_application(application)?;
            Ok(request)
        })
    }

    /// Withdraw an open update request, or close one the applicant has responded to.
    pub fn close_update_request(
        &self,
        case_type: CaseType,
        id: ProcessId,
        request_id: u64,
    ) -> Result<UpdateRequest, CaseError> {
        self.repository.atomic(|tables| {
            let mut application = load(tables, case_type, id)?;
            tables.get_task(id, &CASE_PROCESSING, TaskType::Process)?;

            let request = application
                .update_requests
                .iter_mut()
                .find(|request| request.id == request_id)
                .ok_or_else(|| unknown_entry("update request", request_id))?;
            let withdrawn = match request.status {
                UpdateRequestStatus::Open => {
                    request.status = UpdateRequestStatus::Draft;
                    true
                }
                UpdateRequestStatus::Responded => {
                    request.status = UpdateRequestStatus::Closed;
                    false
                }
                _ => {
                    return Err(CaseError::InvalidRequest(format!(
                        "update request {request_id} cannot be closed"
                    )))
                }
            };
            let request = request.clone();

            if withdrawn {
                let prepare =
                    progress::get_expected_task(tables.tasks(), &application, TaskType::Prepare)?;
                tables.tasks_mut().end(prepare.id, None);
            }

            tables.save_application(application)?;
            Ok(request)
        })
    }

    /// Record an email sent to another department about the case.
    pub fn add_case_email(
        &self,
        case_type: CaseType,
        id: ProcessId,
        to: String,
    ) -> Result<CaseEmail, CaseError> {
        self.repository.atomic(|tables| {
            let mut application = load(tables, case_type, id)?;
            tables.get_task(id, &CASE_PROCESSING, TaskType::Process)?;

            let email = CaseEmail {
                id: next_entry_id(application.case_emails.len()),
                status: CorrespondenceStatus::Open,
                to,
            };
            application.case_emails.push(email.clone());

            debug!(process_id = %id, email_id = email.id, "case email sent");
            tables.save_application(application)?;
            Ok(email)
        })
    }

    pub fn close_case_email(
        &self,
        case_type: CaseType,
        id: ProcessId,
        email_id: u64,
    ) -> Result<CaseEmail, CaseError> {
        self.repository.atomic(|tables| {
            let mut application = load(tables, case_type, id)?;
            tables.get_task(id, &CASE_PROCESSING, TaskType::Process)?;

            let email = application
                .case_emails
                .iter_mut()
                .find(|email| email.id == email_id)
                .ok_or_else(|| unknown_entry("case email", email_id))?;
            if !matches!(
                email.status,
                CorrespondenceStatus::Open | CorrespondenceStatus::Responded
            ) {
                return Err(CaseError::InvalidRequest(format!(
                    "case email {email_id} is already closed"
                )));
            }
            email.status = CorrespondenceStatus::Closed;
            let email = email.clone();

            tables.save_application(application)?;
            Ok(email)
        })
    }

    pub fn chief_approve(&self, id: ProcessId) -> Result<(), CaseError> {
        self.repository
            .atomic(|tables| chief::chief_licence_reply_approve_licence(tables, id))
    }

    pub fn chief_reject(
        &self,
        id: ProcessId,
        errors: Vec<ChiefResponseError>,
    ) -> Result<(), CaseError> {
        self.repository
            .atomic(|tables| chief::chief_licence_reply_reject_licence(tables, id, errors))
    }

    /// Send a licence that CHIEF rejected (or that failed to send) again.
    pub fn resend_licence_to_chief(&self, id: ProcessId) -> Result<TaskType, CaseError> {
        self.repository.atomic(|tables| {
            let application = tables.application(id)?.clone();
            let revoke = application.status == ST::Revoked;
            let expected: &[ST] = if revoke { &[ST::Revoked] } else { &CASE_PROCESSING };
            let task = tables.get_task(id, expected, TaskType::ChiefError)?;
            tables.tasks_mut().end(task.id, None);

            Ok(chief::send_application_to_chief(
                tables,
                self.chief.as_ref(),
                &application,
                Some(task.id),
                revoke,
                self.config.send_licence_to_chief,
            ))
        })
    }

    /// Abandon the CHIEF hand-off and return the case to the caseworker.
    pub fn revert_licence_to_processing(&self, id: ProcessId) -> Result<(), CaseError> {
        self.repository.atomic(|tables| {
            let task = tables.get_task(id, &CASE_PROCESSING, TaskType::ChiefError)?;
            tables.tasks_mut().end(task.id, None);
            tables
                .tasks_mut()
                .create(id, TaskType::Process, Some(task.id));
            debug!(process_id = %id, "licence reverted to processing");
            Ok(())
        })
    }

    pub fn pending_chief_licences(&self) -> Result<Vec<Application>, CaseError> {
        Ok(self.repository.read(|tables| {
            chief::pending_licences(tables)
                .into_iter()
                .cloned()
                .collect()
        })?)
    }

    pub fn failed_chief_licences(&self) -> Result<Vec<Application>, CaseError> {
        Ok(self.repository.read(|tables| {
            chief::failed_licences(tables)
                .into_iter()
                .cloned()
                .collect()
        })?)
    }

    /// Run a search; `limit` falls back to the configured default.
    pub fn search(
        &self,
        terms: &SearchTerms,
        user: Option<&User>,
        limit: Option<usize>,
    ) -> Result<SearchResults, CaseError> {
        let limit = limit.unwrap_or(self.config.search_limit);
        let results = self
            .repository
            .read(|tables| search::search_applications(tables, terms, user, limit))??;
        Ok(results)
    }

    /// Run a search without a row limit and render the result spreadsheet.
    pub fn search_spreadsheet(
        &self,
        terms: &SearchTerms,
        user: Option<&User>,
    ) -> Result<Vec<u8>, CaseError> {
        let results = self.search(terms, user, Some(usize::MAX))?;
        Ok(search::get_search_results_spreadsheet(terms.case_type, &results)?)
    }

    fn swap_task(
        &self,
        case_type: CaseType,
        id: ProcessId,
        from: TaskType,
        to: TaskType,
    ) -> Result<Application, CaseError> {
        self.repository.atomic(|tables| {
            let application = load(tables, case_type, id)?;
            let task = tables.get_task(id, &CASE_PROCESSING, from)?;
            tables.tasks_mut().end(task.id, None);
            tables.tasks_mut().create(id, to, Some(task.id));
            debug!(process_id = %id, from = %from, to = %to, "task replaced");
            Ok(application)
        })
    }
}

fn load(tables: &CaseTables, case_type: CaseType, id: ProcessId) -> Result<Application, CaseError> {
    let application = tables.application(id)?;
    if application.case_type() != case_type {
        return Err(RepositoryError::NotFound(id).into());
    }
    Ok(application.clone())
}

fn next_entry_id(existing: usize) -> u64 {
    existing as u64 + 1
}

fn unknown_entry(kind: &str, entry_id: u64) -> CaseError {
    CaseError::InvalidRequest(format!("no {kind} with id {entry_id}"))
}

fn is_import_variation(application: &Application) -> bool {
    application.is_import_application() && application.status == ST::VariationRequested
}

fn transition(application: &Application, action: &'static str) {
    info!(
        process_id = %application.id,
        reference = application.get_reference(),
        status = %application.status,
        action,
        "case transition"
    );
}
