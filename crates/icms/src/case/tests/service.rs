use super::common::*;
use chrono::{Datelike, Utc};
use std::sync::Arc;

use crate::case::checks::LICENCE_MEDIUM_UNAVAILABLE;
use crate::case::document_pack::{
    doc_ref_documents_all, pack_active_get, pack_draft_get, pack_licence_update, DocumentType,
    LicenceUpdate, PackStatus,
};
use crate::case::domain::{
    ApplicationDetail, ApplicationStatus, CommodityGroup, CorrespondenceStatus,
    UpdateRequestStatus, VariationRequestStatus, WithdrawalStatus,
};
use crate::case::repository::{CaseRepository, RepositoryError};
use crate::case::service::{CaseError, CaseService, DecisionInput, RevokeInput};
use crate::case::Decision;
use crate::chief::{ChiefAction, ChiefRequestStatus, ChiefResponseError};
use crate::config::IcmsConfig;
use crate::flow::{progress, CaseType, FlowError, ProcessId, TaskType};

fn active_tasks(
    repository: &impl CaseRepository,
    service: &TestService,
    id: ProcessId,
) -> Vec<TaskType> {
    let application = service
        .get_application(CaseType::Import, id)
        .or_else(|_| service.get_application(CaseType::Export, id))
        .expect("application exists");
    repository
        .read(|tables| progress::get_active_task_list(tables.tasks(), &application))
        .expect("tables readable")
}

#[test]
fn submitting_assigns_a_case_reference_and_opens_processing() {
    let (service, repository, _) = build_service();

    let created = service
        .create_application(&applicant(), wood_application())
        .expect("created");
    assert_eq!(created.get_reference(), "Not Assigned");
    assert_eq!(created.status, ApplicationStatus::InProgress);

    let application = service
        .submit_application(CaseType::Import, created.id, &applicant())
        .expect("submitted");

    assert_eq!(application.status, ApplicationStatus::Submitted);
    assert_eq!(
        application.get_reference(),
        format!("IMA/{}/00001", Utc::now().year())
    );
    assert!(application.submit_datetime.is_some());
    assert_eq!(
        active_tasks(repository.as_ref(), &service, application.id),
        vec![TaskType::Process]
    );
}

#[test]
fn failed_submission_keeps_the_reference_sequence_untouched() {
    let (service, _, _) = build_service();

    let mut incomplete = wood_application();
    incomplete.detail = Some(ApplicationDetail::empty(incomplete.process_type));
    let created = service
        .create_application(&applicant(), incomplete)
        .expect("created");

    match service.submit_application(CaseType::Import, created.id, &applicant()) {
        Err(CaseError::Validation(errors)) => {
            assert!(errors.contains("shipping_year"));
            assert!(errors.contains("commodity_code"));
        }
        other => panic!("expected validation errors, got {other:?}"),
    }

    let stored = service
        .get_application(CaseType::Import, created.id)
        .expect("still stored");
    assert_eq!(stored.status, ApplicationStatus::InProgress);
    assert!(stored.reference.is_none());

    let next = submitted(&service, wood_application());
    assert_eq!(
        next.get_reference(),
        format!("IMA/{}/00001", Utc::now().year())
    );
}

#[test]
fn mismatched_detail_is_rejected_on_create() {
    let (service, _, _) = build_service();
    let mut draft = wood_application();
    draft.detail = Some(ApplicationDetail::empty(crate::flow::ProcessType::Cfs));

    assert!(matches!(
        service.create_application(&applicant(), draft),
        Err(CaseError::Validation(_))
    ));
}

#[test]
fn export_references_use_certificate_prefixes() {
    let (service, _, _) = build_service();
    let application = submitted(&service, cfs_application());

    assert_eq!(
        application.get_reference(),
        format!("CA/{}/00001", Utc::now().year())
    );
}

#[test]
fn case_lookups_respect_the_case_type() {
    let (service, _, _) = build_service();
    let application = submitted(&service, wood_application());

    assert!(matches!(
        service.get_application(CaseType::Export, application.id),
        Err(CaseError::Repository(RepositoryError::NotFound(_)))
    ));
}

#[test]
fn taking_ownership_requires_a_submitted_case() {
    let (service, _, _) = build_service();
    let created = service
        .create_application(&applicant(), wood_application())
        .expect("created");

    match service.take_ownership(CaseType::Import, created.id, &caseworker()) {
        Err(CaseError::Flow(FlowError::ProcessState { status, .. })) => {
            assert_eq!(status, ApplicationStatus::InProgress)
        }
        other => panic!("expected a workflow error, got {other:?}"),
    }
}

#[test]
fn taking_ownership_starts_processing_and_dates_the_licence() {
    let (service, repository, _) = build_service();
    let application = submitted(&service, wood_application());

    let owned = service
        .take_ownership(CaseType::Import, application.id, &caseworker())
        .expect("owned");

    assert_eq!(owned.status, ApplicationStatus::Processing);
    assert_eq!(owned.case_owner, Some(caseworker()));
    let start = repository
        .read(|tables| {
            pack_draft_get(tables, application.id)
                .map(|pack| pack.licence_start_date)
                .expect("draft exists")
        })
        .expect("tables readable");
    assert_eq!(start, Some(Utc::now().date_naive()));

    let released = service
        .release_ownership(CaseType::Import, application.id)
        .expect("released");
    assert_eq!(released.status, ApplicationStatus::Submitted);
    assert!(released.case_owner.is_none());
}

#[test]
fn authorisation_lists_every_missing_item() {
    let (service, _, _) = build_service();
    let application = submitted(&service, wood_application());
    service
        .take_ownership(CaseType::Import, application.id, &caseworker())
        .expect("owned");

    match service.start_authorisation(CaseType::Import, application.id, &caseworker()) {
        Err(CaseError::Validation(errors)) => {
            assert!(errors.contains("decision"));
            assert!(errors.contains("checklist"));
        }
        other => panic!("expected validation errors, got {other:?}"),
    }
}

#[test]
fn refusal_needs_a_reason() {
    let (service, _, _) = build_service();
    let application = submitted(&service, wood_application());
    service
        .take_ownership(CaseType::Import, application.id, &caseworker())
        .expect("owned");

    let input = DecisionInput {
        decision: Decision::Refuse,
        refuse_reason: Some("   ".to_string()),
    };
    match service.set_decision(CaseType::Import, application.id, input) {
        Err(CaseError::Validation(errors)) => assert!(errors.contains("refuse_reason")),
        other => panic!("expected validation errors, got {other:?}"),
    }
}

#[test]
fn refused_case_completes_without_documents() {
    let (service, repository, _) = build_service();
    let application = submitted(&service, wood_application());
    let id = application.id;
    service
        .take_ownership(CaseType::Import, id, &caseworker())
        .expect("owned");
    service
        .complete_checklist(CaseType::Import, id, complete_checklist())
        .expect("checklist");
    service
        .set_decision(
            CaseType::Import,
            id,
            DecisionInput {
                decision: Decision::Refuse,
                refuse_reason: Some("Quota exhausted".to_string()),
            },
        )
        .expect("decision");

    let refused = service
        .start_authorisation(CaseType::Import, id, &caseworker())
        .expect("authorisation");

    assert_eq!(refused.status, ApplicationStatus::Completed);
    assert_eq!(
        active_tasks(repository.as_ref(), &service, id),
        vec![TaskType::Rejected]
    );
    let draft_left = repository
        .read(|tables| pack_draft_get(tables, id).is_ok())
        .expect("tables readable");
    assert!(!draft_left);
}

#[test]
fn wood_licence_is_issued_on_signing() {
    let (service, repository, chief) = build_service();
    let completed = signed(&service, wood_application());

    assert_eq!(completed.status, ApplicationStatus::Completed);
    assert!(active_tasks(repository.as_ref(), &service, completed.id).is_empty());
    assert!(chief.sent().is_empty());

    let (status, completion, licence) = repository
        .read(|tables| {
            let pack = pack_active_get(tables, completed.id).expect("licence issued");
            let licence = doc_ref_documents_all(tables, pack.id)
                .into_iter()
                .find(|doc| doc.document_type == DocumentType::Licence)
                .and_then(|doc| doc.reference.clone());
            (pack.status, pack.case_completion_datetime, licence)
        })
        .expect("tables readable");
    assert_eq!(status, PackStatus::Active);
    assert!(completion.is_some());
    // Wood licences are paper only: no GB prefix.
    assert_eq!(licence.as_deref(), Some("0000001B"));
}

#[test]
fn export_certificates_are_created_per_country() {
    let (service, repository, _) = build_service();
    let completed = signed(&service, cfs_application());

    assert_eq!(completed.status, ApplicationStatus::Completed);
    let countries = repository
        .read(|tables| {
            let pack = pack_active_get(tables, completed.id).expect("certificates issued");
            doc_ref_documents_all(tables, pack.id)
                .into_iter()
                .map(|doc| doc.country.clone().unwrap_or_default())
                .collect::<Vec<_>>()
        })
        .expect("tables readable");
    assert_eq!(countries, vec!["Brazil".to_string(), "Japan".to_string()]);
}

#[test]
fn chief_licence_waits_for_reply_when_sending_is_disabled() {
    let (service, repository, chief) = build_service();
    let waiting = signed(&service, oil_application());

    assert_eq!(waiting.status, ApplicationStatus::Processing);
    assert_eq!(
        active_tasks(repository.as_ref(), &service, waiting.id),
        vec![TaskType::ChiefWait]
    );
    assert!(chief.sent().is_empty());

    let recorded = repository
        .read(|tables| {
            tables
                .chief_requests()
                .map(|request| (request.status, request.request_data.is_none()))
                .collect::<Vec<_>>()
        })
        .expect("tables readable");
    assert_eq!(recorded, vec![(ChiefRequestStatus::Processing, true)]);

    let pending = service.pending_chief_licences().expect("pending");
    assert_eq!(pending.len(), 1);

    service.chief_approve(waiting.id).expect("approved");
    let completed = service
        .get_application(CaseType::Import, waiting.id)
        .expect("stored");
    assert_eq!(completed.status, ApplicationStatus::Completed);
    assert!(service.pending_chief_licences().expect("pending").is_empty());
}

#[test]
fn chief_receives_an_insert_payload_when_sending_is_enabled() {
    let config = IcmsConfig {
        send_licence_to_chief: true,
        ..IcmsConfig::default()
    };
    let (service, _, chief) = build_service_with(config, RecordingChief::default());
    let waiting = signed(&service, oil_application());

    let sent = chief.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].action, ChiefAction::Insert);
    assert_eq!(sent[0].case_reference, waiting.get_reference());
    assert!(sent[0].licence_reference.starts_with("GBOIL"));
}

#[test]
fn transport_failure_leaves_a_chief_error_task() {
    let config = IcmsConfig {
        send_licence_to_chief: true,
        ..IcmsConfig::default()
    };
    let (service, repository, _) = build_service_with(config, RecordingChief::failing());
    let application = signed(&service, oil_application());

    assert_eq!(
        active_tasks(repository.as_ref(), &service, application.id),
        vec![TaskType::ChiefError]
    );
    assert_eq!(service.failed_chief_licences().expect("failed").len(), 1);
}

#[test]
fn rejected_licence_can_be_resent_or_reverted() {
    let (service, repository, _) = build_service();
    let waiting = signed(&service, oil_application());
    let id = waiting.id;

    service
        .chief_reject(
            id,
            vec![ChiefResponseError {
                error_code: "E123".to_string(),
                error_msg: "Bad licence".to_string(),
            }],
        )
        .expect("rejected");
    assert_eq!(
        active_tasks(repository.as_ref(), &service, id),
        vec![TaskType::ChiefError]
    );
    let errors = repository
        .read(|tables| {
            tables
                .chief_requests()
                .flat_map(|request| request.response_errors.clone())
                .collect::<Vec<_>>()
        })
        .expect("tables readable");
    assert_eq!(errors.len(), 1);

    assert_eq!(
        service.resend_licence_to_chief(id).expect("resent"),
        TaskType::ChiefWait
    );
    service
        .chief_reject(id, Vec::new())
        .expect("rejected again");

    service.revert_licence_to_processing(id).expect("reverted");
    assert_eq!(
        active_tasks(repository.as_ref(), &service, id),
        vec![TaskType::Process]
    );
}

#[test]
fn chief_reply_without_a_wait_task_is_a_workflow_error() {
    let (service, _, _) = build_service();
    let application = submitted(&service, oil_application());

    assert!(matches!(
        service.chief_approve(application.id),
        Err(CaseError::Flow(FlowError::ProcessState { .. }))
    ));
}

#[test]
fn document_signing_failure_can_be_retried() {
    let (service, repository, _) = build_service();
    let application = ready_for_authorisation(&service, wood_application());
    let id = application.id;
    service
        .start_authorisation(CaseType::Import, id, &caseworker())
        .expect("authorisation");
    service
        .authorise_documents(CaseType::Import, id, &caseworker())
        .expect("authorised");

    service
        .documents_failed(CaseType::Import, id)
        .expect("failure recorded");
    assert_eq!(
        active_tasks(repository.as_ref(), &service, id),
        vec![TaskType::DocumentError]
    );

    service
        .retry_document_signing(CaseType::Import, id)
        .expect("retry");
    let completed = service
        .documents_signed(CaseType::Import, id)
        .expect("signed");
    assert_eq!(completed.status, ApplicationStatus::Completed);
}

#[test]
fn accepted_withdrawal_closes_the_case_until_reopened() {
    let (service, repository, _) = build_service();
    let application = submitted(&service, wood_application());
    let id = application.id;

    service
        .request_withdrawal(CaseType::Import, id, &applicant(), "Order cancelled".to_string())
        .expect("requested");
    assert!(matches!(
        service.request_withdrawal(CaseType::Import, id, &applicant(), "Again".to_string()),
        Err(CaseError::InvalidRequest(_))
    ));

    let withdrawn = service
        .respond_withdrawal(CaseType::Import, id, &caseworker(), true, None)
        .expect("accepted");
    assert_eq!(withdrawn.status, ApplicationStatus::Withdrawn);
    assert!(!withdrawn.is_active);
    assert_eq!(withdrawn.withdrawals[0].status, WithdrawalStatus::Accepted);
    assert!(active_tasks(repository.as_ref(), &service, id).is_empty());

    let reopened = service.reopen_case(CaseType::Import, id).expect("reopened");
    assert_eq!(reopened.status, ApplicationStatus::Submitted);
    assert!(reopened.is_active);
    assert_eq!(
        active_tasks(repository.as_ref(), &service, id),
        vec![TaskType::Process]
    );
}

#[test]
fn rejected_withdrawal_keeps_processing() {
    let (service, _, _) = build_service();
    let application = submitted(&service, wood_application());
    let id = application.id;

    service
        .request_withdrawal(CaseType::Import, id, &applicant(), "Wrong quota".to_string())
        .expect("requested");
    let kept = service
        .respond_withdrawal(
            CaseType::Import,
            id,
            &caseworker(),
            false,
            Some("Quota is correct".to_string()),
        )
        .expect("rejected");

    assert_eq!(kept.status, ApplicationStatus::Submitted);
    assert_eq!(kept.withdrawals[0].status, WithdrawalStatus::Rejected);
    assert_eq!(
        kept.withdrawals[0].response.as_deref(),
        Some("Quota is correct")
    );
}

#[test]
fn stopped_case_rejects_further_processing() {
    let (service, _, _) = build_service();
    let application = submitted(&service, wood_application());
    let id = application.id;

    let stopped = service.stop_case(CaseType::Import, id).expect("stopped");
    assert_eq!(stopped.status, ApplicationStatus::Stopped);

    assert!(matches!(
        service.take_ownership(CaseType::Import, id, &caseworker()),
        Err(CaseError::Flow(_))
    ));
    assert_eq!(
        service
            .reopen_case(CaseType::Import, id)
            .expect("reopened")
            .status,
        ApplicationStatus::Submitted
    );
}

#[test]
fn variation_extends_the_case_reference_and_reissues_the_licence() {
    let (service, repository, _) = build_service();
    let completed = signed(&service, wood_application());
    let id = completed.id;
    let original = completed.get_reference().to_string();

    let varied = service
        .request_variation(CaseType::Import, id, &applicant(), "Extend end date".to_string())
        .expect("variation requested");
    assert_eq!(varied.status, ApplicationStatus::VariationRequested);
    assert_eq!(varied.get_reference(), format!("{original}/1"));

    let (draft_end, active_end) = repository
        .read(|tables| {
            (
                pack_draft_get(tables, id).expect("draft").licence_end_date,
                pack_active_get(tables, id).expect("active").licence_end_date,
            )
        })
        .expect("tables readable");
    assert_eq!(draft_end, active_end);

    service
        .take_ownership(CaseType::Import, id, &caseworker())
        .expect("owned");
    let decided = service
        .set_decision(CaseType::Import, id, approve())
        .expect("variation decision");
    assert_eq!(decided.variation_decision, Some(Decision::Approve));
    assert_eq!(decided.decision, Some(Decision::Approve));

    service
        .start_authorisation(CaseType::Import, id, &caseworker())
        .expect("authorisation");
    service
        .authorise_documents(CaseType::Import, id, &caseworker())
        .expect("authorised");
    let reissued = service
        .documents_signed(CaseType::Import, id)
        .expect("signed");

    assert_eq!(reissued.status, ApplicationStatus::Completed);
    assert_eq!(
        reissued.variation_requests[0].status,
        VariationRequestStatus::Accepted
    );
    let archived = repository
        .read(|tables| {
            tables
                .packs_for(id)
                .filter(|pack| pack.status == PackStatus::Archived)
                .count()
        })
        .expect("tables readable");
    assert_eq!(archived, 1);
}

#[test]
fn revoking_a_chief_licence_waits_for_the_cancel_reply() {
    let (service, repository, _) = build_service();
    let waiting = signed(&service, oil_application());
    service.chief_approve(waiting.id).expect("approved");

    let revoked = service
        .revoke_licence(
            CaseType::Import,
            waiting.id,
            RevokeInput {
                reason: Some("Licence misused".to_string()),
                send_email: true,
            },
        )
        .expect("revoked");

    assert_eq!(revoked.status, ApplicationStatus::Revoked);
    assert_eq!(
        active_tasks(repository.as_ref(), &service, waiting.id),
        vec![TaskType::ChiefRevokeWait]
    );
    service.chief_approve(waiting.id).expect("cancel confirmed");
    assert!(active_tasks(repository.as_ref(), &service, waiting.id).is_empty());
}

#[test]
fn cancelling_a_draft_removes_it() {
    let (service, _, _) = build_service();
    let created = service
        .create_application(&applicant(), wood_application())
        .expect("created");

    service
        .cancel_application(CaseType::Import, created.id)
        .expect("cancelled");
    assert!(matches!(
        service.get_application(CaseType::Import, created.id),
        Err(CaseError::Repository(RepositoryError::NotFound(_)))
    ));
}

#[test]
fn reassignment_skips_cases_not_being_processed() {
    let (service, _, _) = build_service();
    let owned = submitted(&service, wood_application());
    service
        .take_ownership(CaseType::Import, owned.id, &caseworker())
        .expect("owned");
    let waiting = submitted(&service, wood_application());

    let moved = service
        .reassign_case_owner(CaseType::Import, &[owned.id, waiting.id], &second_caseworker())
        .expect("reassigned");

    assert_eq!(moved, vec![owned.id]);
    let stored = service
        .get_application(CaseType::Import, owned.id)
        .expect("stored");
    assert_eq!(stored.case_owner, Some(second_caseworker()));
}

#[test]
fn reassignment_refuses_cases_of_the_other_case_type() {
    let (service, _, _) = build_service();
    let import = submitted(&service, wood_application());
    service
        .take_ownership(CaseType::Import, import.id, &caseworker())
        .expect("owned");
    let export = submitted(&service, cfs_application());
    service
        .take_ownership(CaseType::Export, export.id, &caseworker())
        .expect("owned");

    assert!(matches!(
        service.reassign_case_owner(CaseType::Import, &[import.id, export.id], &second_caseworker()),
        Err(CaseError::Repository(RepositoryError::NotFound(id))) if id == export.id
    ));

    // The failed batch leaves every case with its owner.
    for (case_type, id) in [(CaseType::Import, import.id), (CaseType::Export, export.id)] {
        let stored = service.get_application(case_type, id).expect("stored");
        assert_eq!(stored.case_owner, Some(caseworker()));
    }
}

#[test]
fn licence_format_must_be_available_for_the_type() {
    let (service, _, _) = build_service();
    let wood = submitted(&service, wood_application());
    service
        .take_ownership(CaseType::Import, wood.id, &caseworker())
        .expect("owned");

    let electronic = LicenceUpdate {
        issue_paper_licence_only: Some(false),
        ..LicenceUpdate::default()
    };
    match service.edit_licence(CaseType::Import, wood.id, electronic) {
        Err(CaseError::Validation(errors)) => {
            assert!(errors.contains("issue_paper_licence_only"));
            assert_eq!(errors.len(), 1);
        }
        other => panic!("expected validation errors, got {other:?}"),
    }

    let oil = submitted(&service, oil_application());
    service
        .take_ownership(CaseType::Import, oil.id, &caseworker())
        .expect("owned");
    let paper = LicenceUpdate {
        issue_paper_licence_only: Some(true),
        ..LicenceUpdate::default()
    };
    assert!(matches!(
        service.edit_licence(CaseType::Import, oil.id, paper),
        Err(CaseError::Validation(_))
    ));

    // Types offering both formats accept either.
    let mut sil = oil_application();
    sil.process_type = crate::flow::ProcessType::FaSil;
    let sil = submitted(&service, sil);
    service
        .take_ownership(CaseType::Import, sil.id, &caseworker())
        .expect("owned");
    let draft = service
        .edit_licence(
            CaseType::Import,
            sil.id,
            LicenceUpdate {
                issue_paper_licence_only: Some(true),
                ..LicenceUpdate::default()
            },
        )
        .expect("paper licence accepted");
    assert_eq!(draft.issue_paper_licence_only, Some(true));
}

#[test]
fn authorisation_rejects_an_unavailable_licence_format() {
    let (service, repository, _) = build_service();
    let application = ready_for_authorisation(&service, wood_application());
    repository
        .atomic(|tables| -> Result<(), CaseError> {
            let electronic = LicenceUpdate {
                issue_paper_licence_only: Some(false),
                ..LicenceUpdate::default()
            };
            Ok(pack_licence_update(tables, application.id, electronic)?)
        })
        .expect("draft updated");

    match service.start_authorisation(CaseType::Import, application.id, &caseworker()) {
        Err(CaseError::Validation(errors)) => {
            assert!(errors.contains("issue_paper_licence_only"));
            let json = serde_json::to_value(&errors).expect("serialises");
            assert_eq!(
                json["issue_paper_licence_only"],
                serde_json::json!([LICENCE_MEDIUM_UNAVAILABLE])
            );
        }
        other => panic!("expected validation errors, got {other:?}"),
    }
}

#[test]
fn open_further_information_request_blocks_authorisation_until_closed() {
    let (service, _, _) = build_service();
    let application = ready_for_authorisation(&service, wood_application());
    let id = application.id;

    let fir = service
        .add_further_information_request(CaseType::Import, id, "Supplier invoices".to_string())
        .expect("fir sent");
    assert_eq!(fir.status, CorrespondenceStatus::Open);

    match service.start_authorisation(CaseType::Import, id, &caseworker()) {
        Err(CaseError::Validation(errors)) => {
            assert!(errors.contains("further_information_requests"));
        }
        other => panic!("expected validation errors, got {other:?}"),
    }

    let responded = service
        .respond_further_information_request(CaseType::Import, id, fir.id)
        .expect("responded");
    assert_eq!(responded.status, CorrespondenceStatus::Responded);
    assert!(matches!(
        service.respond_further_information_request(CaseType::Import, id, fir.id),
        Err(CaseError::InvalidRequest(_))
    ));

    let closed = service
        .close_further_information_request(CaseType::Import, id, fir.id)
        .expect("closed");
    assert_eq!(closed.status, CorrespondenceStatus::Closed);
    service
        .start_authorisation(CaseType::Import, id, &caseworker())
        .expect("authorisation started");
}

#[test]
fn unknown_correspondence_is_an_invalid_request() {
    let (service, _, _) = build_service();
    let application = submitted(&service, wood_application());
    service
        .take_ownership(CaseType::Import, application.id, &caseworker())
        .expect("owned");

    assert!(matches!(
        service.close_further_information_request(CaseType::Import, application.id, 7),
        Err(CaseError::InvalidRequest(_))
    ));
    assert!(matches!(
        service.close_update_request(CaseType::Import, application.id, 7),
        Err(CaseError::InvalidRequest(_))
    ));
    assert!(matches!(
        service.close_case_email(CaseType::Import, application.id, 7),
        Err(CaseError::InvalidRequest(_))
    ));
}

#[test]
fn update_request_round_trip_keeps_the_case_with_its_owner() {
    let (service, repository, _) = build_service();
    let application = ready_for_authorisation(&service, wood_application());
    let id = application.id;
    let first_submitted = application.submit_datetime;

    let request = service
        .add_update_request(CaseType::Import, id, "Correct the shipping year".to_string())
        .expect("update requested");
    assert_eq!(request.status, UpdateRequestStatus::Open);
    assert_eq!(
        active_tasks(repository.as_ref(), &service, id),
        vec![TaskType::Process, TaskType::Prepare]
    );
    assert!(matches!(
        service.add_update_request(CaseType::Import, id, "Again".to_string()),
        Err(CaseError::InvalidRequest(_))
    ));
    match service.start_authorisation(CaseType::Import, id, &caseworker()) {
        Err(CaseError::Validation(errors)) => assert!(errors.contains("update_requests")),
        other => panic!("expected validation errors, got {other:?}"),
    }

    let started = service
        .start_update_request(CaseType::Import, id, request.id)
        .expect("update started");
    assert_eq!(started.status, UpdateRequestStatus::UpdateInProgress);

    let resubmitted = service
        .submit_application(CaseType::Import, id, &applicant())
        .expect("resubmitted");
    assert_eq!(resubmitted.status, ApplicationStatus::Processing);
    assert_eq!(resubmitted.submit_datetime, first_submitted);
    assert_eq!(resubmitted.reference, application.reference);
    assert_eq!(
        resubmitted.update_requests[0].status,
        UpdateRequestStatus::Responded
    );
    assert_eq!(
        active_tasks(repository.as_ref(), &service, id),
        vec![TaskType::Process]
    );

    let closed = service
        .close_update_request(CaseType::Import, id, request.id)
        .expect("closed");
    assert_eq!(closed.status, UpdateRequestStatus::Closed);
    service
        .start_authorisation(CaseType::Import, id, &caseworker())
        .expect("authorisation started");
}

#[test]
fn withdrawn_update_request_returns_to_draft() {
    let (service, repository, _) = build_service();
    let application = submitted(&service, wood_application());
    let id = application.id;
    service
        .take_ownership(CaseType::Import, id, &caseworker())
        .expect("owned");

    let request = service
        .add_update_request(CaseType::Import, id, "Check the commodity".to_string())
        .expect("update requested");
    let withdrawn = service
        .close_update_request(CaseType::Import, id, request.id)
        .expect("withdrawn");

    assert_eq!(withdrawn.status, UpdateRequestStatus::Draft);
    assert_eq!(
        active_tasks(repository.as_ref(), &service, id),
        vec![TaskType::Process]
    );
    assert!(matches!(
        service.submit_application(CaseType::Import, id, &applicant()),
        Err(CaseError::Flow(_))
    ));
}

#[test]
fn released_case_with_an_update_request_can_be_resubmitted() {
    let (service, _, _) = build_service();
    let application = submitted(&service, wood_application());
    let id = application.id;
    service
        .take_ownership(CaseType::Import, id, &caseworker())
        .expect("owned");
    let request = service
        .add_update_request(CaseType::Import, id, "Confirm the year".to_string())
        .expect("update requested");
    let released = service
        .release_ownership(CaseType::Import, id)
        .expect("released");
    assert_eq!(released.status, ApplicationStatus::Submitted);

    service
        .start_update_request(CaseType::Import, id, request.id)
        .expect("update started");
    let resubmitted = service
        .submit_application(CaseType::Import, id, &applicant())
        .expect("resubmitted");

    assert_eq!(resubmitted.status, ApplicationStatus::Submitted);
    assert!(resubmitted.case_owner.is_none());
    assert_eq!(
        resubmitted.update_requests[0].status,
        UpdateRequestStatus::Responded
    );
}

#[test]
fn open_case_email_blocks_export_authorisation() {
    let (service, _, _) = build_service();
    let application = ready_for_authorisation(&service, cfs_application());
    let id = application.id;

    let email = service
        .add_case_email(CaseType::Export, id, "hse@example.com".to_string())
        .expect("email sent");
    match service.start_authorisation(CaseType::Export, id, &caseworker()) {
        Err(CaseError::Validation(errors)) => assert!(errors.contains("case_emails")),
        other => panic!("expected validation errors, got {other:?}"),
    }

    let closed = service
        .close_case_email(CaseType::Export, id, email.id)
        .expect("closed");
    assert_eq!(closed.status, CorrespondenceStatus::Closed);
    assert!(matches!(
        service.close_case_email(CaseType::Export, id, email.id),
        Err(CaseError::InvalidRequest(_))
    ));
    service
        .start_authorisation(CaseType::Export, id, &caseworker())
        .expect("authorisation started");
}

#[test]
fn checklist_is_refused_for_types_without_one() {
    let (service, _, _) = build_service();
    let mut draft = wood_application();
    draft.process_type = crate::flow::ProcessType::IronSteel;
    draft.detail = Some(ApplicationDetail::IronSteel {
        origin_country: Some("Kazakhstan".to_string()),
        consignment_country: Some("Kazakhstan".to_string()),
        shipping_year: Some(Utc::now().year()),
        category_commodity_group: Some(CommodityGroup {
            group_code: "SA1".to_string(),
            group_name: "Flat products".to_string(),
        }),
        commodity_code: Some("7207111100".to_string()),
    });
    let application = submitted(&service, draft);
    service
        .take_ownership(CaseType::Import, application.id, &caseworker())
        .expect("owned");

    assert!(matches!(
        service.complete_checklist(CaseType::Import, application.id, complete_checklist()),
        Err(CaseError::InvalidRequest(_))
    ));
}

#[test]
fn case_view_shows_active_tasks_and_draft() {
    let (service, _, _) = build_service();
    let application = submitted(&service, wood_application());

    let view = service
        .case_view(CaseType::Import, application.id)
        .expect("view");
    assert_eq!(view.status_label, "Submitted");
    assert_eq!(view.active_tasks, vec![TaskType::Process]);
    assert!(view.draft.is_some());
    assert!(view.issued.is_empty());
}

#[test]
fn unavailable_store_surfaces_as_repository_error() {
    let service = CaseService::new(
        Arc::new(UnavailableRepository),
        Arc::new(RecordingChief::default()),
        IcmsConfig::default(),
    );

    assert!(matches!(
        service.create_application(&applicant(), wood_application()),
        Err(CaseError::Repository(RepositoryError::Unavailable(_)))
    ));
}
