use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::case::router::{self, case_router, ActorInput, CreateInput};
use crate::case::service::CaseService;
use crate::config::IcmsConfig;
use crate::flow::CaseType;

fn post_json(path: &str, body: &Value) -> Request<Body> {
    Request::post(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn create_route_returns_the_new_draft() {
    let (service, _, _) = build_service();
    let app = case_router(service);

    let body = json!({ "user": applicant(), "application": wood_application() });
    let response = app
        .oneshot(post_json("/api/v1/case/import/applications", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], "IN_PROGRESS");
    assert_eq!(payload["process_type"], "WoodQuotaApplication");
}

#[tokio::test]
async fn create_handler_rejects_types_from_the_other_case_type() {
    let (service, _, _) = build_service();

    let response = router::create_handler::<_, RecordingChief>(
        State(service),
        Path("export".to_string()),
        axum::Json(CreateInput {
            user: applicant(),
            application: wood_application(),
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_case_type_is_not_found() {
    let (service, _, _) = build_service();
    let application = submitted(&service, wood_application());
    let app = case_router(service);

    let response = app
        .oneshot(
            Request::get(format!("/api/v1/case/transit/{}", application.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn view_route_returns_the_case_with_its_tasks() {
    let (service, _, _) = build_service();
    let application = submitted(&service, wood_application());
    let app = case_router(service);

    let response = app
        .oneshot(
            Request::get(format!("/api/v1/case/import/{}", application.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status_label"], "Submitted");
    assert_eq!(payload["active_tasks"], json!(["PROCESS"]));
}

#[tokio::test]
async fn out_of_date_action_is_forbidden() {
    let (service, _, _) = build_service();
    let created = service
        .create_application(&applicant(), wood_application())
        .expect("created");

    let response = router::take_ownership_handler::<_, RecordingChief>(
        State(service),
        Path(("import".to_string(), created.id.0)),
        axum::Json(ActorInput { user: caseworker() }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], crate::error::PAGE_UNAVAILABLE);
}

#[tokio::test]
async fn incomplete_submission_is_unprocessable() {
    let (service, _, _) = build_service();
    let mut draft = wood_application();
    draft.detail = None;
    let created = service
        .create_application(&applicant(), draft)
        .expect("created");
    let app = case_router(service);

    let response = app
        .oneshot(post_json(
            &format!("/api/v1/case/import/{}/submit", created.id),
            &json!({ "user": applicant() }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert!(payload["fields"]["commodity_code"].is_array());
}

#[tokio::test]
async fn unavailable_store_is_a_server_error() {
    let service = Arc::new(CaseService::new(
        Arc::new(UnavailableRepository),
        Arc::new(RecordingChief::default()),
        IcmsConfig::default(),
    ));

    let response = router::view_handler(State(service), Path(("import".to_string(), 1))).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn search_route_returns_rows_newest_first() {
    let (service, _, _) = build_service();
    let first = submitted(&service, wood_application());
    let second = submitted(&service, wood_application());
    let app = case_router(service);

    let response = app
        .oneshot(post_json(
            "/api/v1/case/import/search",
            &json!({ "terms": { "case_type": "import" } }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["total_rows"], 2);
    let ids: Vec<u64> = payload["records"]
        .as_array()
        .expect("records")
        .iter()
        .map(|row| row["app_pk"].as_u64().expect("pk"))
        .collect();
    assert_eq!(ids, vec![second.id.0, first.id.0]);
}

#[tokio::test]
async fn search_download_returns_csv() {
    let (service, _, _) = build_service();
    submitted(&service, cfs_application());
    let app = case_router(service);

    let response = app
        .oneshot(post_json(
            "/api/v1/case/export/search/download",
            &json!({ "terms": { "case_type": "export" } }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        mime::TEXT_CSV_UTF_8.as_ref()
    );
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert_eq!(text.lines().count(), 2);
    assert!(text.starts_with("Case Reference"));
}

#[tokio::test]
async fn search_terms_must_match_the_path() {
    let (service, _, _) = build_service();
    let app = case_router(service);

    let response = app
        .oneshot(post_json(
            "/api/v1/case/import/search",
            &json!({ "terms": { "case_type": "export" } }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "search terms must be for import cases");
}

#[tokio::test]
async fn unavailable_licence_format_is_unprocessable() {
    let (service, _, _) = build_service();
    let application = submitted(&service, wood_application());
    service
        .take_ownership(CaseType::Import, application.id, &caseworker())
        .expect("owned");
    let app = case_router(service);

    let response = app
        .oneshot(post_json(
            &format!("/api/v1/case/import/{}/licence", application.id),
            &json!({ "issue_paper_licence_only": false }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert!(payload["fields"]["issue_paper_licence_only"].is_array());
}

#[tokio::test]
async fn reassign_route_checks_the_case_type() {
    let (service, _, _) = build_service();
    let export = submitted(&service, cfs_application());
    service
        .take_ownership(CaseType::Export, export.id, &caseworker())
        .expect("owned");
    let body = json!({ "applications": [export.id], "new_owner": second_caseworker() });

    let wrong_type = case_router(service.clone())
        .oneshot(post_json("/api/v1/case/import/reassign", &body))
        .await
        .unwrap();
    assert_eq!(wrong_type.status(), StatusCode::NOT_FOUND);

    let response = case_router(service)
        .oneshot(post_json("/api/v1/case/export/reassign", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["reassigned"], json!([export.id]));
}

#[tokio::test]
async fn further_information_request_routes_open_and_close() {
    let (service, _, _) = build_service();
    let application = submitted(&service, wood_application());
    service
        .take_ownership(CaseType::Import, application.id, &caseworker())
        .expect("owned");
    let base = format!("/api/v1/case/import/{}/further-information-requests", application.id);

    let created = case_router(service.clone())
        .oneshot(post_json(&base, &json!({ "request_subject": "Proof of origin" })))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let fir = read_json_body(created).await;
    assert_eq!(fir["status"], "OPEN");

    let closed = case_router(service.clone())
        .oneshot(post_json(&format!("{base}/{}/close", fir["id"]), &json!({})))
        .await
        .unwrap();
    assert_eq!(closed.status(), StatusCode::OK);
    assert_eq!(read_json_body(closed).await["status"], "CLOSED");

    let stored = service
        .get_application(CaseType::Import, application.id)
        .expect("stored");
    assert!(!stored.has_open_firs());
}

#[tokio::test]
async fn chief_callbacks_complete_the_licence() {
    let (service, _, _) = build_service();
    let waiting = signed(&service, oil_application());
    let app = case_router(service.clone());

    let pending = app
        .clone()
        .oneshot(
            Request::get("/api/v1/chief/pending")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let payload = read_json_body(pending).await;
    assert_eq!(payload.as_array().map(Vec::len), Some(1));

    let response = app
        .oneshot(post_json(
            &format!("/api/v1/chief/{}/approve", waiting.id),
            &json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let completed = service
        .get_application(CaseType::Import, waiting.id)
        .expect("stored");
    assert_eq!(completed.status, crate::case::ApplicationStatus::Completed);
}

#[tokio::test]
async fn chief_reject_records_errors() {
    let (service, _, _) = build_service();
    let waiting = signed(&service, oil_application());
    let app = case_router(service.clone());

    let response = app
        .oneshot(post_json(
            &format!("/api/v1/chief/{}/reject", waiting.id),
            &json!({ "errors": [{ "error_code": "E1", "error_msg": "Unknown trader" }] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(service.failed_chief_licences().expect("failed").len(), 1);
}
