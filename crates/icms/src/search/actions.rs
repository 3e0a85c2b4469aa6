use chrono::Utc;

use crate::case::domain::{ApplicationStatus as ST, Decision};
use crate::flow::CaseType;

use super::app_data::SearchRecord;
use super::types::SearchAction;

/// Actions offered next to an import result.
pub fn get_import_record_actions(record: &SearchRecord<'_>) -> Vec<SearchAction> {
    let application = record.application;
    let mut actions = Vec::new();

    match application.status {
        ST::Completed => {
            actions.push(SearchAction {
                url: case_url(CaseType::Import, record, "request-variation"),
                name: "request-variation",
                label: "Request Variation",
                icon: "icon-redo2",
                is_post: false,
            });

            if application.decision == Some(Decision::Refuse) {
                actions.push(placeholder("manage-appeals", "Manage Appeals", "icon-warning"));
            }

            let today = Utc::now().date_naive();
            let licence_end = record.pack.and_then(|pack| pack.licence_end_date);
            if licence_end.is_some_and(|end| end > today) {
                actions.push(SearchAction {
                    url: case_url(CaseType::Import, record, "revoke"),
                    name: "revoke-licence",
                    label: "Revoke Licence",
                    icon: "icon-undo2",
                    is_post: true,
                });
            }
        }
        ST::Stopped | ST::Withdrawn => actions.push(reopen(CaseType::Import, record)),
        _ => {}
    }

    actions
}

/// Actions offered next to an export result.
pub fn get_export_record_actions(record: &SearchRecord<'_>) -> Vec<SearchAction> {
    let status = record.application.status;
    let mut actions = Vec::new();

    if status == ST::Completed {
        actions.push(placeholder("open-variation", "Open Variation", "icon-redo2"));
        actions.push(SearchAction {
            url: case_url(CaseType::Export, record, "revoke"),
            name: "revoke-certificates",
            label: "Revoke Certificates",
            icon: "icon-undo2",
            is_post: true,
        });
    }

    if matches!(status, ST::Stopped | ST::Withdrawn) {
        actions.push(reopen(CaseType::Export, record));
    } else {
        actions.push(placeholder("copy-application", "Copy Application", "icon-copy"));
        actions.push(placeholder("create-template", "Create Template", "icon-magic-wand"));
    }

    actions
}

fn reopen(case_type: CaseType, record: &SearchRecord<'_>) -> SearchAction {
    SearchAction {
        url: case_url(case_type, record, "reopen"),
        name: "reopen-case",
        label: "Reopen Case",
        icon: "icon-redo2",
        is_post: true,
    }
}

// Actions whose screens live outside this service.
fn placeholder(name: &'static str, label: &'static str, icon: &'static str) -> SearchAction {
    SearchAction {
        url: "#".to_string(),
        name,
        label,
        icon,
        is_post: true,
    }
}

fn case_url(case_type: CaseType, record: &SearchRecord<'_>, action: &str) -> String {
    format!(
        "/api/v1/case/{}/{}/{action}",
        case_type.code(),
        record.application.id
    )
}
