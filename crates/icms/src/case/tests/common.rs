use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{Datelike, Duration, Utc};
use serde_json::Value;

use crate::case::document_pack::LicenceUpdate;
use crate::case::domain::{
    Application, ApplicationDetail, Checklist, ChecklistAnswer, FirearmCommodity, NewApplication,
    User,
};
use crate::case::repository::{CaseRepository, CaseTables, InMemoryCaseRepository, RepositoryError};
use crate::case::service::{CaseService, DecisionInput};
use crate::case::Decision;
use crate::chief::{ChiefClient, ChiefError, LicencePayload};
use crate::config::IcmsConfig;
use crate::flow::{CaseType, ProcessType, UserId};

pub(super) type TestService = CaseService<InMemoryCaseRepository, RecordingChief>;

pub(super) fn applicant() -> User {
    User {
        id: UserId(10),
        first_name: "Ivy".to_string(),
        last_name: "Importer".to_string(),
        email: "ivy@example.com".to_string(),
    }
}

pub(super) fn caseworker() -> User {
    User {
        id: UserId(20),
        first_name: "Carl".to_string(),
        last_name: "Caseworker".to_string(),
        email: "carl@ilb.example.com".to_string(),
    }
}

pub(super) fn second_caseworker() -> User {
    User {
        id: UserId(21),
        first_name: "Cara".to_string(),
        last_name: "Caseworker".to_string(),
        email: "cara@ilb.example.com".to_string(),
    }
}

fn new_application(process_type: ProcessType, detail: ApplicationDetail) -> NewApplication {
    NewApplication {
        process_type,
        contact: applicant(),
        organisation_name: "Northern Timber Ltd".to_string(),
        agent_name: None,
        applicant_reference: Some("NT-001".to_string()),
        detail: Some(detail),
    }
}

pub(super) fn wood_application() -> NewApplication {
    new_application(
        ProcessType::Wood,
        ApplicationDetail::Wood {
            shipping_year: Some(Utc::now().year()),
            commodity_code: Some("4403211000".to_string()),
        },
    )
}

pub(super) fn oil_application() -> NewApplication {
    new_application(
        ProcessType::FaOil,
        ApplicationDetail::Firearms {
            origin_country: Some("Any Country".to_string()),
            consignment_country: Some("Any Country".to_string()),
            commodity: Some(FirearmCommodity::ExChapter93),
        },
    )
}

pub(super) fn cfs_application() -> NewApplication {
    new_application(
        ProcessType::Cfs,
        ApplicationDetail::Export {
            countries: vec!["Japan".to_string(), "Brazil".to_string()],
            manufacturer_countries: vec!["United Kingdom".to_string()],
            brands: Vec::new(),
        },
    )
}

pub(super) fn complete_checklist() -> Checklist {
    Checklist {
        case_update: Some(ChecklistAnswer::No),
        fir_required: Some(ChecklistAnswer::NotApplicable),
        validity_period_correct: Some(ChecklistAnswer::Yes),
        endorsements_listed: Some(ChecklistAnswer::Yes),
        response_preparation: true,
        authorisation: true,
    }
}

pub(super) fn approve() -> DecisionInput {
    DecisionInput {
        decision: Decision::Approve,
        refuse_reason: None,
    }
}

pub(super) fn licence_end_date() -> LicenceUpdate {
    LicenceUpdate {
        licence_end_date: Some(Utc::now().date_naive() + Duration::days(180)),
        ..LicenceUpdate::default()
    }
}

/// CHIEF double keeping every payload it was asked to send.
#[derive(Default)]
pub(super) struct RecordingChief {
    sent: Mutex<Vec<LicencePayload>>,
    fail: bool,
}

impl RecordingChief {
    pub(super) fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub(super) fn sent(&self) -> Vec<LicencePayload> {
        self.sent.lock().expect("chief mutex poisoned").clone()
    }
}

impl ChiefClient for RecordingChief {
    fn send_licence(&self, payload: &LicencePayload) -> Result<(), ChiefError> {
        if self.fail {
            return Err(ChiefError::Transport("connection refused".to_string()));
        }
        self.sent
            .lock()
            .expect("chief mutex poisoned")
            .push(payload.clone());
        Ok(())
    }
}

/// Repository whose store is never reachable.
pub(super) struct UnavailableRepository;

impl CaseRepository for UnavailableRepository {
    fn atomic<T, E, F>(&self, _work: F) -> Result<T, E>
    where
        F: FnOnce(&mut CaseTables) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        Err(RepositoryError::Unavailable("database offline".to_string()).into())
    }

    fn read<T, F>(&self, _query: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&CaseTables) -> T,
    {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn build_service() -> (
    Arc<TestService>,
    Arc<InMemoryCaseRepository>,
    Arc<RecordingChief>,
) {
    build_service_with(IcmsConfig::default(), RecordingChief::default())
}

pub(super) fn build_service_with(
    config: IcmsConfig,
    chief: RecordingChief,
) -> (
    Arc<TestService>,
    Arc<InMemoryCaseRepository>,
    Arc<RecordingChief>,
) {
    let repository = Arc::new(InMemoryCaseRepository::default());
    let chief = Arc::new(chief);
    let service = Arc::new(CaseService::new(
        repository.clone(),
        chief.clone(),
        config,
    ));
    (service, repository, chief)
}

pub(super) fn submitted(service: &TestService, draft: NewApplication) -> Application {
    let case_type = draft.process_type.case_type();
    let created = service
        .create_application(&applicant(), draft)
        .expect("application created");
    service
        .submit_application(case_type, created.id, &applicant())
        .expect("application submitted")
}

/// Submitted, owned, checklist done, licence dated and approved: ready to authorise.
pub(super) fn ready_for_authorisation(service: &TestService, draft: NewApplication) -> Application {
    let application = submitted(service, draft);
    let case_type = application.case_type();
    let id = application.id;

    service
        .take_ownership(case_type, id, &caseworker())
        .expect("ownership taken");
    if application.application_type().case_checklist_flag {
        service
            .complete_checklist(case_type, id, complete_checklist())
            .expect("checklist saved");
    }
    if case_type == CaseType::Import {
        service
            .edit_licence(case_type, id, licence_end_date())
            .expect("licence dated");
    }
    service
        .set_decision(case_type, id, approve())
        .expect("decision saved")
}

/// Runs authorisation and signing, leaving the case completed or with CHIEF.
pub(super) fn signed(service: &TestService, draft: NewApplication) -> Application {
    let application = ready_for_authorisation(service, draft);
    let case_type = application.case_type();
    let id = application.id;

    service
        .start_authorisation(case_type, id, &caseworker())
        .expect("authorisation started");
    service
        .authorise_documents(case_type, id, &caseworker())
        .expect("documents authorised");
    service
        .documents_signed(case_type, id)
        .expect("documents signed")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("body is json")
}
