use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::chief::{ChiefClient, ChiefResponseError};
use crate::error::case_error_response;
use crate::flow::{CaseType, ProcessId};
use crate::search::SearchTerms;

use super::document_pack::LicenceUpdate;
use super::domain::{ApplicationDetail, Checklist, NewApplication, User};
use super::repository::CaseRepository;
use super::service::{CaseError, CaseService, DecisionInput, RevokeInput};

type CaseState<R, C> = State<Arc<CaseService<R, C>>>;

/// Router builder exposing the case workflow, search and CHIEF callback endpoints.
pub fn case_router<R, C>(service: Arc<CaseService<R, C>>) -> Router
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    Router::new()
        .route(
            "/api/v1/case/:case_type/applications",
            post(create_handler::<R, C>),
        )
        .route("/api/v1/case/:case_type/search", post(search_handler::<R, C>))
        .route(
            "/api/v1/case/:case_type/search/download",
            post(search_download_handler::<R, C>),
        )
        .route(
            "/api/v1/case/:case_type/reassign",
            post(reassign_handler::<R, C>),
        )
        .route(
            "/api/v1/case/:case_type/:application_id",
            get(view_handler::<R, C>),
        )
        .route(
            "/api/v1/case/:case_type/:application_id/edit",
            post(edit_handler::<R, C>),
        )
        .route(
            "/api/v1/case/:case_type/:application_id/cancel",
            post(cancel_handler::<R, C>),
        )
        .route(
            "/api/v1/case/:case_type/:application_id/submit",
            post(submit_handler::<R, C>),
        )
        .route(
            "/api/v1/case/:case_type/:application_id/take-ownership",
            post(take_ownership_handler::<R, C>),
        )
        .route(
            "/api/v1/case/:case_type/:application_id/release-ownership",
            post(release_ownership_handler::<R, C>),
        )
        .route(
            "/api/v1/case/:case_type/:application_id/checklist",
            post(checklist_handler::<R, C>),
        )
        .route(
            "/api/v1/case/:case_type/:application_id/licence",
            post(licence_handler::<R, C>),
        )
        .route(
            "/api/v1/case/:case_type/:application_id/decision",
            post(decision_handler::<R, C>),
        )
        .route(
            "/api/v1/case/:case_type/:application_id/start-authorisation",
            post(start_authorisation_handler::<R, C>),
        )
        .route(
            "/api/v1/case/:case_type/:application_id/authorise-documents",
            post(authorise_documents_handler::<R, C>),
        )
        .route(
            "/api/v1/case/:case_type/:application_id/documents-signed",
            post(documents_signed_handler::<R, C>),
        )
        .route(
            "/api/v1/case/:case_type/:application_id/documents-failed",
            post(documents_failed_handler::<R, C>),
        )
        .route(
            "/api/v1/case/:case_type/:application_id/retry-signing",
            post(retry_signing_handler::<R, C>),
        )
        .route(
            "/api/v1/case/:case_type/:application_id/withdraw",
            post(withdraw_handler::<R, C>),
        )
        .route(
            "/api/v1/case/:case_type/:application_id/withdraw/response",
            post(withdraw_response_handler::<R, C>),
        )
        .route(
            "/api/v1/case/:case_type/:application_id/stop",
            post(stop_handler::<R, C>),
        )
        .route(
            "/api/v1/case/:case_type/:application_id/reopen",
            post(reopen_handler::<R, C>),
        )
        .route(
            "/api/v1/case/:case_type/:application_id/revoke",
            post(revoke_handler::<R, C>),
        )
        .route(
            "/api/v1/case/:case_type/:application_id/request-variation",
            post(request_variation_handler::<R, C>),
        )
        .route(
            "/api/v1/case/:case_type/:application_id/further-information-requests",
            post(add_fir_handler::<R, C>),
        )
        .route(
            "/api/v1/case/:case_type/:application_id/further-information-requests/:entry_id/respond",
            post(respond_fir_handler::<R, C>),
        )
        .route(
            "/api/v1/case/:case_type/:application_id/further-information-requests/:entry_id/close",
            post(close_fir_handler::<R, C>),
        )
        .route(
            "/api/v1/case/:case_type/:application_id/update-requests",
            post(add_update_request_handler::<R, C>),
        )
        .route(
            "/api/v1/case/:case_type/:application_id/update-requests/:entry_id/start",
            post(start_update_request_handler::<R, C>),
        )
        .route(
            "/api/v1/case/:case_type/:application_id/update-requests/:entry_id/close",
            post(close_update_request_handler::<R, C>),
        )
        .route(
            "/api/v1/case/:case_type/:application_id/case-emails",
            post(add_case_email_handler::<R, C>),
        )
        .route(
            "/api/v1/case/:case_type/:application_id/case-emails/:entry_id/close",
            post(close_case_email_handler::<R, C>),
        )
        .route("/api/v1/chief/pending", get(chief_pending_handler::<R, C>))
        .route("/api/v1/chief/failed", get(chief_failed_handler::<R, C>))
        .route(
            "/api/v1/chief/:application_id/approve",
            post(chief_approve_handler::<R, C>),
        )
        .route(
            "/api/v1/chief/:application_id/reject",
            post(chief_reject_handler::<R, C>),
        )
        .route(
            "/api/v1/chief/:application_id/resend",
            post(chief_resend_handler::<R, C>),
        )
        .route(
            "/api/v1/chief/:application_id/revert",
            post(chief_revert_handler::<R, C>),
        )
        .with_state(service)
}

/// Acting user. Sessions live outside this service, so callers name the user explicitly.
#[derive(Debug, Clone, Deserialize)]
pub struct ActorInput {
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInput {
    pub user: User,
    pub application: NewApplication,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawInput {
    pub user: User,
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawResponseInput {
    pub user: User,
    pub accept: bool,
    #[serde(default)]
    pub response: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariationInput {
    pub user: User,
    pub what_varied: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestInput {
    pub request_subject: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaseEmailInput {
    pub to: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReassignInput {
    pub applications: Vec<ProcessId>,
    pub new_owner: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub terms: SearchTerms,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChiefRejectInput {
    #[serde(default)]
    pub errors: Vec<ChiefResponseError>,
}

#[derive(Debug, Clone, Serialize)]
struct ReassignView {
    reassigned: Vec<ProcessId>,
}

fn not_found() -> Response {
    let payload = json!({ "error": "not found" });
    (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
}

fn mismatched_terms(case_type: CaseType) -> Response {
    let payload = json!({
        "error": format!("search terms must be for {} cases", case_type.code()),
    });
    (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, CaseError>) -> Response {
    match result {
        Ok(value) => (status, axum::Json(value)).into_response(),
        Err(err) => case_error_response(err),
    }
}

macro_rules! case_type_or_404 {
    ($value:expr) => {
        match CaseType::from_code(&$value) {
            Some(case_type) => case_type,
            None => return not_found(),
        }
    };
}

pub(crate) async fn create_handler<R, C>(
    State(service): CaseState<R, C>,
    Path(case_type): Path<String>,
    axum::Json(input): axum::Json<CreateInput>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let case_type = case_type_or_404!(case_type);
    if input.application.process_type.case_type() != case_type {
        let payload = json!({
            "error": format!(
                "{} is not a {} application",
                input.application.process_type.label(),
                case_type.code()
            ),
        });
        return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
    }

    respond(
        StatusCode::CREATED,
        service.create_application(&input.user, input.application),
    )
}

pub(crate) async fn view_handler<R, C>(
    State(service): CaseState<R, C>,
    Path((case_type, application_id)): Path<(String, u64)>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let case_type = case_type_or_404!(case_type);
    respond(
        StatusCode::OK,
        service.case_view(case_type, ProcessId(application_id)),
    )
}

pub(crate) async fn edit_handler<R, C>(
    State(service): CaseState<R, C>,
    Path((case_type, application_id)): Path<(String, u64)>,
    axum::Json(detail): axum::Json<ApplicationDetail>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let case_type = case_type_or_404!(case_type);
    respond(
        StatusCode::OK,
        service.edit_application(case_type, ProcessId(application_id), detail),
    )
}

pub(crate) async fn cancel_handler<R, C>(
    State(service): CaseState<R, C>,
    Path((case_type, application_id)): Path<(String, u64)>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let case_type = case_type_or_404!(case_type);
    match service.cancel_application(case_type, ProcessId(application_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => case_error_response(err),
    }
}

pub(crate) async fn submit_handler<R, C>(
    State(service): CaseState<R, C>,
    Path((case_type, application_id)): Path<(String, u64)>,
    axum::Json(input): axum::Json<ActorInput>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let case_type = case_type_or_404!(case_type);
    respond(
        StatusCode::OK,
        service.submit_application(case_type, ProcessId(application_id), &input.user),
    )
}

pub(crate) async fn take_ownership_handler<R, C>(
    State(service): CaseState<R, C>,
    Path((case_type, application_id)): Path<(String, u64)>,
    axum::Json(input): axum::Json<ActorInput>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let case_type = case_type_or_404!(case_type);
    respond(
        StatusCode::OK,
        service.take_ownership(case_type, ProcessId(application_id), &input.user),
    )
}

pub(crate) async fn release_ownership_handler<R, C>(
    State(service): CaseState<R, C>,
    Path((case_type, application_id)): Path<(String, u64)>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let case_type = case_type_or_404!(case_type);
    respond(
        StatusCode::OK,
        service.release_ownership(case_type, ProcessId(application_id)),
    )
}

pub(crate) async fn checklist_handler<R, C>(
    State(service): CaseState<R, C>,
    Path((case_type, application_id)): Path<(String, u64)>,
    axum::Json(checklist): axum::Json<Checklist>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let case_type = case_type_or_404!(case_type);
    respond(
        StatusCode::OK,
        service.complete_checklist(case_type, ProcessId(application_id), checklist),
    )
}

pub(crate) async fn licence_handler<R, C>(
    State(service): CaseState<R, C>,
    Path((case_type, application_id)): Path<(String, u64)>,
    axum::Json(update): axum::Json<LicenceUpdate>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let case_type = case_type_or_404!(case_type);
    respond(
        StatusCode::OK,
        service.edit_licence(case_type, ProcessId(application_id), update),
    )
}

pub(crate) async fn decision_handler<R, C>(
    State(service): CaseState<R, C>,
    Path((case_type, application_id)): Path<(String, u64)>,
    axum::Json(input): axum::Json<DecisionInput>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let case_type = case_type_or_404!(case_type);
    respond(
        StatusCode::OK,
        service.set_decision(case_type, ProcessId(application_id), input),
    )
}

pub(crate) async fn start_authorisation_handler<R, C>(
    State(service): CaseState<R, C>,
    Path((case_type, application_id)): Path<(String, u64)>,
    axum::Json(input): axum::Json<ActorInput>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let case_type = case_type_or_404!(case_type);
    respond(
        StatusCode::OK,
        service.start_authorisation(case_type, ProcessId(application_id), &input.user),
    )
}

pub(crate) async fn authorise_documents_handler<R, C>(
    State(service): CaseState<R, C>,
    Path((case_type, application_id)): Path<(String, u64)>,
    axum::Json(input): axum::Json<ActorInput>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let case_type = case_type_or_404!(case_type);
    respond(
        StatusCode::OK,
        service.authorise_documents(case_type, ProcessId(application_id), &input.user),
    )
}

pub(crate) async fn documents_signed_handler<R, C>(
    State(service): CaseState<R, C>,
    Path((case_type, application_id)): Path<(String, u64)>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let case_type = case_type_or_404!(case_type);
    respond(
        StatusCode::OK,
        service.documents_signed(case_type, ProcessId(application_id)),
    )
}

pub(crate) async fn documents_failed_handler<R, C>(
    State(service): CaseState<R, C>,
    Path((case_type, application_id)): Path<(String, u64)>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let case_type = case_type_or_404!(case_type);
    respond(
        StatusCode::OK,
        service.documents_failed(case_type, ProcessId(application_id)),
    )
}

pub(crate) async fn retry_signing_handler<R, C>(
    State(service): CaseState<R, C>,
    Path((case_type, application_id)): Path<(String, u64)>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let case_type = case_type_or_404!(case_type);
    respond(
        StatusCode::OK,
        service.retry_document_signing(case_type, ProcessId(application_id)),
    )
}

pub(crate) async fn withdraw_handler<R, C>(
    State(service): CaseState<R, C>,
    Path((case_type, application_id)): Path<(String, u64)>,
    axum::Json(input): axum::Json<WithdrawInput>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let case_type = case_type_or_404!(case_type);
    respond(
        StatusCode::OK,
        service.request_withdrawal(
            case_type,
            ProcessId(application_id),
            &input.user,
            input.reason,
        ),
    )
}

pub(crate) async fn withdraw_response_handler<R, C>(
    State(service): CaseState<R, C>,
    Path((case_type, application_id)): Path<(String, u64)>,
    axum::Json(input): axum::Json<WithdrawResponseInput>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let case_type = case_type_or_404!(case_type);
    respond(
        StatusCode::OK,
        service.respond_withdrawal(
            case_type,
            ProcessId(application_id),
            &input.user,
            input.accept,
            input.response,
        ),
    )
}

pub(crate) async fn stop_handler<R, C>(
    State(service): CaseState<R, C>,
    Path((case_type, application_id)): Path<(String, u64)>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let case_type = case_type_or_404!(case_type);
    respond(
        StatusCode::OK,
        service.stop_case(case_type, ProcessId(application_id)),
    )
}

pub(crate) async fn reopen_handler<R, C>(
    State(service): CaseState<R, C>,
    Path((case_type, application_id)): Path<(String, u64)>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let case_type = case_type_or_404!(case_type);
    respond(
        StatusCode::OK,
        service.reopen_case(case_type, ProcessId(application_id)),
    )
}

pub(crate) async fn revoke_handler<R, C>(
    State(service): CaseState<R, C>,
    Path((case_type, application_id)): Path<(String, u64)>,
    axum::Json(input): axum::Json<RevokeInput>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let case_type = case_type_or_404!(case_type);
    respond(
        StatusCode::OK,
        service.revoke_licence(case_type, ProcessId(application_id), input),
    )
}

pub(crate) async fn request_variation_handler<R, C>(
    State(service): CaseState<R, C>,
    Path((case_type, application_id)): Path<(String, u64)>,
    axum::Json(input): axum::Json<VariationInput>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let case_type = case_type_or_404!(case_type);
    respond(
        StatusCode::OK,
        service.request_variation(
            case_type,
            ProcessId(application_id),
            &input.user,
            input.what_varied,
        ),
    )
}

pub(crate) async fn add_fir_handler<R, C>(
    State(service): CaseState<R, C>,
    Path((case_type, application_id)): Path<(String, u64)>,
    axum::Json(input): axum::Json<RequestInput>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let case_type = case_type_or_404!(case_type);
    respond(
        StatusCode::CREATED,
        service.add_further_information_request(
            case_type,
            ProcessId(application_id),
            input.request_subject,
        ),
    )
}

pub(crate) async fn respond_fir_handler<R, C>(
    State(service): CaseState<R, C>,
    Path((case_type, application_id, entry_id)): Path<(String, u64, u64)>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let case_type = case_type_or_404!(case_type);
    respond(
        StatusCode::OK,
        service.respond_further_information_request(
            case_type,
            ProcessId(application_id),
            entry_id,
        ),
    )
}

pub(crate) async fn close_fir_handler<R, C>(
    State(service): CaseState<R, C>,
    Path((case_type, application_id, entry_id)): Path<(String, u64, u64)>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let case_type = case_type_or_404!(case_type);
    respond(
        StatusCode::OK,
        service.close_further_information_request(case_type, ProcessId(application_id), entry_id),
    )
}

pub(crate) async fn add_update_request_handler<R, C>(
    State(service): CaseState<R, C>,
    Path((case_type, application_id)): Path<(String, u64)>,
    axum::Json(input): axum::Json<RequestInput>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let case_type = case_type_or_404!(case_type);
    respond(
        StatusCode::CREATED,
        service.add_update_request(case_type, ProcessId(application_id), input.request_subject),
    )
}

pub(crate) async fn start_update_request_handler<R, C>(
    State(service): CaseState<R, C>,
    Path((case_type, application_id, entry_id)): Path<(String, u64, u64)>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let case_type = case_type_or_404!(case_type);
    respond(
        StatusCode::OK,
        service.start_update_request(case_type, ProcessId(application_id), entry_id),
    )
}

pub(crate) async fn close_update_request_handler<R, C>(
    State(service): CaseState<R, C>,
    Path((case_type, application_id, entry_id)): Path<(String, u64, u64)>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let case_type = case_type_or_404!(case_type);
    respond(
        StatusCode::OK,
        service.close_update_request(case_type, ProcessId(application_id), entry_id),
    )
}

pub(crate) async fn add_case_email_handler<R, C>(
    State(service): CaseState<R, C>,
    Path((case_type, application_id)): Path<(String, u64)>,
    axum::Json(input): axum::Json<CaseEmailInput>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let case_type = case_type_or_404!(case_type);
    respond(
        StatusCode::CREATED,
        service.add_case_email(case_type, ProcessId(application_id), input.to),
    )
}

pub(crate) async fn close_case_email_handler<R, C>(
    State(service): CaseState<R, C>,
    Path((case_type, application_id, entry_id)): Path<(String, u64, u64)>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let case_type = case_type_or_404!(case_type);
    respond(
        StatusCode::OK,
        service.close_case_email(case_type, ProcessId(application_id), entry_id),
    )
}

pub(crate) async fn reassign_handler<R, C>(
    State(service): CaseState<R, C>,
    Path(case_type): Path<String>,
    axum::Json(input): axum::Json<ReassignInput>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let case_type = case_type_or_404!(case_type);
    respond(
        StatusCode::OK,
        service
            .reassign_case_owner(case_type, &input.applications, &input.new_owner)
            .map(|reassigned| ReassignView { reassigned }),
    )
}

pub(crate) async fn search_handler<R, C>(
    State(service): CaseState<R, C>,
    Path(case_type): Path<String>,
    axum::Json(request): axum::Json<SearchRequest>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let case_type = case_type_or_404!(case_type);
    if request.terms.case_type != case_type {
        return mismatched_terms(case_type);
    }

    respond(
        StatusCode::OK,
        service.search(&request.terms, request.user.as_ref(), request.limit),
    )
}

pub(crate) async fn search_download_handler<R, C>(
    State(service): CaseState<R, C>,
    Path(case_type): Path<String>,
    axum::Json(request): axum::Json<SearchRequest>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let case_type = case_type_or_404!(case_type);
    if request.terms.case_type != case_type {
        return mismatched_terms(case_type);
    }

    match service.search_spreadsheet(&request.terms, request.user.as_ref()) {
        Ok(bytes) => {
            let filename = format!(
                "attachment; filename=\"{}-search-results.csv\"",
                case_type.code()
            );
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime::TEXT_CSV_UTF_8.to_string()),
                    (header::CONTENT_DISPOSITION, filename),
                ],
                bytes,
            )
                .into_response()
        }
        Err(err) => case_error_response(err),
    }
}

pub(crate) async fn chief_approve_handler<R, C>(
    State(service): CaseState<R, C>,
    Path(application_id): Path<u64>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    match service.chief_approve(ProcessId(application_id)) {
        Ok(()) => {
            let payload = json!({ "application_id": application_id, "result": "approved" });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => case_error_response(err),
    }
}

pub(crate) async fn chief_reject_handler<R, C>(
    State(service): CaseState<R, C>,
    Path(application_id): Path<u64>,
    axum::Json(input): axum::Json<ChiefRejectInput>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    match service.chief_reject(ProcessId(application_id), input.errors) {
        Ok(()) => {
            let payload = json!({ "application_id": application_id, "result": "rejected" });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => case_error_response(err),
    }
}

pub(crate) async fn chief_resend_handler<R, C>(
    State(service): CaseState<R, C>,
    Path(application_id): Path<u64>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    match service.resend_licence_to_chief(ProcessId(application_id)) {
        Ok(task_type) => {
            let payload = json!({ "application_id": application_id, "task": task_type });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => case_error_response(err),
    }
}

pub(crate) async fn chief_revert_handler<R, C>(
    State(service): CaseState<R, C>,
    Path(application_id): Path<u64>,
) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    match service.revert_licence_to_processing(ProcessId(application_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => case_error_response(err),
    }
}

pub(crate) async fn chief_pending_handler<R, C>(State(service): CaseState<R, C>) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    respond(StatusCode::OK, service.pending_chief_licences())
}

pub(crate) async fn chief_failed_handler<R, C>(State(service): CaseState<R, C>) -> Response
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    respond(StatusCode::OK, service.failed_chief_licences())
}
