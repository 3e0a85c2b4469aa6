use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use crate::case::document_pack::{doc_ref_documents_all, pack_latest_get, DocumentType};
use crate::case::domain::{
    Application, ApplicationDetail, ApplicationStatus as ST, FirearmCommodity, User,
};
use crate::case::repository::CaseTables;
use crate::flow::{CaseType, ProcessId, ProcessType, TaskType};

use super::actions::{get_export_record_actions, get_import_record_actions};
use super::app_data::{get_commodity_details, loader_for, SearchRecord};
use super::types::{
    ApplicantDetails, AssigneeDetails, CaseStatus, ExportResultRow, ImportResultRow,
    LicenceTypeFilter, ProcessTypeAndPk, ResultRow, SearchResults, SearchTerms,
};
use super::wildcard::{get_wildcard_filter, WildcardFilter};
use super::SearchError;

const SUBMITTED_FORMAT: &str = "%d %b %Y %H:%M:%S";
const LICENCE_DATE_FORMAT: &str = "%d %b %Y";
const OWNERSHIP_FORMAT: &str = "%d-%b-%Y %H:%M";

/// Finds the applications matching `terms`, newest first.
///
/// `total_rows` counts every match; only the first `limit` are loaded into rows.
pub fn search_applications(
    tables: &CaseTables,
    terms: &SearchTerms,
    user: Option<&User>,
    limit: usize,
) -> Result<SearchResults, SearchError> {
    let matches = get_search_ids_and_types(tables, terms)?;
    let total_rows = matches.len();

    let mut grouped: BTreeMap<ProcessType, Vec<ProcessId>> = BTreeMap::new();
    for found in matches.iter().take(limit) {
        grouped.entry(found.process_type).or_default().push(found.pk);
    }

    let mut records: Vec<ResultRow> = grouped
        .into_iter()
        .flat_map(|(process_type, ids)| loader_for(process_type)(tables, &ids))
        .map(|record| match terms.case_type {
            CaseType::Import => ResultRow::Import(get_result_row(tables, &record)),
            CaseType::Export => ResultRow::Export(get_export_result_row(tables, &record)),
        })
        .collect();

    records.sort_by(|a, b| {
        (b.order_by_datetime(), b.app_pk()).cmp(&(a.order_by_datetime(), a.app_pk()))
    });

    debug!(
        user = user.map(|user| user.email.as_str()).unwrap_or("anonymous"),
        case_type = terms.case_type.code(),
        total_rows,
        returned = records.len(),
        "application search"
    );

    Ok(SearchResults {
        total_rows,
        records,
    })
}

pub fn get_import_status_choices() -> Vec<(&'static str, &'static str)> {
    vec![
        (ST::Completed.code(), ST::Completed.label()),
        (ST::Processing.code(), ST::Processing.label()),
        ("FIR_REQUESTED", "Processing (FIR)"),
        ("UPDATE_REQUESTED", "Processing (Update)"),
        (ST::Revoked.code(), ST::Revoked.label()),
        (ST::Stopped.code(), ST::Stopped.label()),
        (ST::Submitted.code(), ST::Submitted.label()),
        (ST::VariationRequested.code(), ST::VariationRequested.label()),
        (ST::Withdrawn.code(), ST::Withdrawn.label()),
    ]
}

pub fn get_export_status_choices() -> Vec<(&'static str, &'static str)> {
    vec![
        (ST::Completed.code(), ST::Completed.label()),
        (ST::InProgress.code(), ST::InProgress.label()),
        (ST::Processing.code(), ST::Processing.label()),
        ("BEIS", "Processing (BEIS)"),
        ("FIR_REQUESTED", "Processing (FIR)"),
        ("HSE", "Processing (HSE)"),
        ("UPDATE_REQUESTED", "Processing (Update)"),
        (ST::Revoked.code(), ST::Revoked.label()),
        (ST::Stopped.code(), ST::Stopped.label()),
        (ST::Submitted.code(), ST::Submitted.label()),
        (ST::VariationRequested.code(), ST::VariationRequested.label()),
        (ST::Withdrawn.code(), ST::Withdrawn.label()),
    ]
}

/// Matching applications as `(pk, process_type, order_by_datetime)`, newest first.
pub fn get_search_ids_and_types(
    tables: &CaseTables,
    terms: &SearchTerms,
) -> Result<Vec<ProcessTypeAndPk>, SearchError> {
    let filters = CompiledTerms::compile(terms)?;

    let mut found: Vec<ProcessTypeAndPk> = tables
        .applications()
        .filter(|app| app.case_type() == terms.case_type)
        .filter(|app| filters.matches(tables, terms, app))
        .map(|app| ProcessTypeAndPk {
            process_type: app.process_type,
            pk: app.id,
            order_by_datetime: order_by_datetime(app),
        })
        .collect();

    found.sort_by(|a, b| (b.order_by_datetime, b.pk).cmp(&(a.order_by_datetime, a.pk)));
    Ok(found)
}

const FIREARMS_TYPE_CODE: &str = "FA";

/// Submitted date for submitted applications, created date otherwise.
pub fn order_by_datetime(application: &Application) -> DateTime<Utc> {
    application.submit_datetime.unwrap_or(application.created)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusFilter {
    Status(ST),
    FirRequested,
    UpdateRequested,
    Beis,
    Hse,
}

impl StatusFilter {
    fn parse(case_type: CaseType, value: &str) -> Result<Self, SearchError> {
        let choices = match case_type {
            CaseType::Import => get_import_status_choices(),
            CaseType::Export => get_export_status_choices(),
        };
        if !choices.iter().any(|(code, _)| *code == value) {
            return Err(SearchError::UnsupportedCaseStatus(value.to_string()));
        }

        let filter = match value {
            "FIR_REQUESTED" => Self::FirRequested,
            "UPDATE_REQUESTED" => Self::UpdateRequested,
            "BEIS" => Self::Beis,
            "HSE" => Self::Hse,
            other => ST::from_code(other)
                .map(Self::Status)
                .ok_or_else(|| SearchError::UnsupportedCaseStatus(other.to_string()))?,
        };
        Ok(filter)
    }

    fn matches(self, app: &Application) -> bool {
        match self {
            Self::Status(status) => app.status == status,
            Self::FirRequested => app.has_open_firs(),
            Self::UpdateRequested => app.has_open_update_requests(),
            Self::Beis => app.process_type == ProcessType::Gmp && app.has_open_case_emails(),
            Self::Hse => app.process_type == ProcessType::Cfs && app.has_open_case_emails(),
        }
    }
}

/// Search terms with their patterns compiled once per search.
struct CompiledTerms {
    case_status: Option<StatusFilter>,
    case_ref: Option<WildcardFilter>,
    licence_ref: Option<WildcardFilter>,
    application_contact: Option<WildcardFilter>,
    applicant_ref: Option<WildcardFilter>,
    importer_agent_name: Option<WildcardFilter>,
    commodity_code: Option<WildcardFilter>,
    exporter_agent_name: Option<WildcardFilter>,
}

impl CompiledTerms {
    fn compile(terms: &SearchTerms) -> Result<Self, SearchError> {
        let wildcard = |value: &Option<String>| -> Result<Option<WildcardFilter>, SearchError> {
            match value.as_deref().filter(|value| !value.is_empty()) {
                Some(pattern) => Ok(Some(get_wildcard_filter(pattern)?)),
                None => Ok(None),
            }
        };

        Ok(Self {
            case_status: terms
                .case_status
                .as_deref()
                .filter(|value| !value.is_empty())
                .map(|value| StatusFilter::parse(terms.case_type, value))
                .transpose()?,
            case_ref: wildcard(&terms.case_ref)?,
            licence_ref: wildcard(&terms.licence_ref)?,
            application_contact: wildcard(&terms.application_contact)?,
            applicant_ref: wildcard(&terms.applicant_ref)?,
            importer_agent_name: wildcard(&terms.importer_agent_name)?,
            commodity_code: wildcard(&terms.commodity_code)?,
            exporter_agent_name: wildcard(&terms.exporter_agent_name)?,
        })
    }

    fn matches(&self, tables: &CaseTables, terms: &SearchTerms, app: &Application) -> bool {
        let common = self.matches_common(tables, terms, app);
        common
            && match terms.case_type {
                CaseType::Import => self.matches_import(tables, terms, app),
                CaseType::Export => self.matches_export(tables, terms, app),
            }
    }

    fn matches_common(&self, tables: &CaseTables, terms: &SearchTerms, app: &Application) -> bool {
        if terms.reassignment_search {
            let reassignable = app.case_owner.is_some()
                && matches!(app.status, ST::Processing | ST::VariationRequested);
            if !reassignable {
                return false;
            }
            if let Some(user_id) = terms.reassignment_user {
                if app.case_owner.as_ref().map(|owner| owner.id) != Some(user_id) {
                    return false;
                }
            }
        }

        if let Some(app_type) = terms.app_type.as_deref().filter(|value| !value.is_empty()) {
            let application_type = app.application_type();
            if application_type.type_code != app_type {
                return false;
            }
            if let Some(sub_type) = terms.app_sub_type.as_deref().filter(|value| !value.is_empty()) {
                if application_type.sub_type != Some(sub_type) {
                    return false;
                }
            }
        }

        if let Some(filter) = &self.case_ref {
            if !filter.matches_optional(app.reference.as_deref()) {
                return false;
            }
        }

        if let Some(filter) = &self.licence_ref {
            let matched = tables
                .packs_for(app.id)
                .filter(|pack| pack.status.is_visible())
                .flat_map(|pack| doc_ref_documents_all(tables, pack.id))
                .filter(|document| {
                    matches!(
                        document.document_type,
                        DocumentType::Licence | DocumentType::Certificate
                    )
                })
                .any(|document| filter.matches_optional(document.reference.as_deref()));
            if !matched {
                return false;
            }
        }

        if let Some(status) = self.case_status {
            if !status.matches(app) {
                return false;
            }
        }

        if let Some(decision) = terms.response_decision {
            if app.decision != Some(decision) {
                return false;
            }
        }

        let submitted = app.submit_datetime.map(|submitted| submitted.date_naive());
        if !in_date_range(submitted, terms.submitted_date_start, terms.submitted_date_end) {
            return false;
        }

        if let Some(filter) = &self.application_contact {
            if !(filter.matches(&app.contact.first_name) || filter.matches(&app.contact.last_name)) {
                return false;
            }
        }

        if terms.pending_firs && !app.has_open_firs() {
            return false;
        }

        if terms.pending_update_reqs && !app.has_open_update_requests() {
            return false;
        }

        true
    }

    fn matches_import(&self, tables: &CaseTables, terms: &SearchTerms, app: &Application) -> bool {
        // Import searches only ever show submitted applications.
        if app.submit_datetime.is_none() {
            return false;
        }

        if let Some(filter) = &self.applicant_ref {
            if !filter.matches_optional(app.applicant_reference.as_deref()) {
                return false;
            }
        }

        if let Some(filter) = &self.importer_agent_name {
            if !(filter.matches(&app.organisation_name)
                || filter.matches_optional(app.agent_name.as_deref()))
            {
                return false;
            }
        }

        let pack = pack_latest_get(tables, app.id);

        if let Some(licence_type) = terms.licence_type {
            let paper_only = pack
                .and_then(|pack| pack.issue_paper_licence_only)
                .unwrap_or(false);
            if paper_only != (licence_type == LicenceTypeFilter::Paper) {
                return false;
            }
        }

        if let Some(usage) = terms.chief_usage_status {
            if app.chief_usage_status != Some(usage) {
                return false;
            }
        }

        if !terms.origin_country.is_empty()
            && !country_in(origin_country(&app.detail), &terms.origin_country)
        {
            return false;
        }

        if !terms.consignment_country.is_empty()
            && !country_in(consignment_country(&app.detail), &terms.consignment_country)
        {
            return false;
        }

        if let Some(year) = terms.shipping_year {
            if shipping_year(&app.detail) != Some(year) {
                return false;
            }
        }

        if let Some(category) = terms.goods_category.as_deref().filter(|value| !value.is_empty()) {
            if !matches_goods_category(&app.detail, category) {
                return false;
            }
        }

        // Firearms carry no commodity codes, so a firearms search ignores the code.
        let firearms_search = terms.app_type.as_deref() == Some(FIREARMS_TYPE_CODE);
        if let Some(filter) = self.commodity_code.as_ref().filter(|_| !firearms_search) {
            if !matches!(filter, WildcardFilter::Any)
                && !commodity_codes(&app.detail)
                    .into_iter()
                    .any(|code| filter.matches(code))
            {
                return false;
            }
        }

        if terms.licence_date_start.is_some() || terms.licence_date_end.is_some() {
            let start = pack.and_then(|pack| pack.licence_start_date);
            let end = pack.and_then(|pack| pack.licence_end_date);
            if !in_date_range(start, terms.licence_date_start, None)
                || !in_date_range(end, None, terms.licence_date_end)
            {
                return false;
            }
        }

        let issued = pack
            .and_then(|pack| pack.case_completion_datetime)
            .map(|issued| issued.date_naive());
        in_date_range(issued, terms.issue_date_start, terms.issue_date_end)
    }

    fn matches_export(&self, tables: &CaseTables, terms: &SearchTerms, app: &Application) -> bool {
        if let Some(filter) = &self.exporter_agent_name {
            if !(filter.matches(&app.organisation_name)
                || filter.matches_optional(app.agent_name.as_deref()))
            {
                return false;
            }
        }

        let closed = pack_latest_get(tables, app.id)
            .and_then(|pack| pack.case_completion_datetime)
            .map(|closed| closed.date_naive());
        if !in_date_range(closed, terms.closed_date_start, terms.closed_date_end) {
            return false;
        }

        let (countries, manufacturer_countries) = match &app.detail {
            ApplicationDetail::Export {
                countries,
                manufacturer_countries,
                ..
            } => (countries.as_slice(), manufacturer_countries.as_slice()),
            _ => (&[][..], &[][..]),
        };

        if !terms.certificate_country.is_empty()
            && !countries
                .iter()
                .any(|country| terms.certificate_country.contains(country))
        {
            return false;
        }

        // Only free sale certificates name a country of manufacture.
        if !terms.manufacture_country.is_empty()
            && !(app.process_type == ProcessType::Cfs
                && manufacturer_countries
                    .iter()
                    .any(|country| terms.manufacture_country.contains(country)))
        {
            return false;
        }

        true
    }
}

fn in_date_range(value: Option<NaiveDate>, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    if start.is_none() && end.is_none() {
        return true;
    }
    let Some(value) = value else {
        return false;
    };
    start.map_or(true, |start| value >= start) && end.map_or(true, |end| value <= end)
}

fn country_in(country: Option<&str>, wanted: &[String]) -> bool {
    country.is_some_and(|country| wanted.iter().any(|wanted| wanted == country))
}

fn origin_country(detail: &ApplicationDetail) -> Option<&str> {
    match detail {
        ApplicationDetail::Derogations { origin_country, .. }
        | ApplicationDetail::Firearms { origin_country, .. }
        | ApplicationDetail::IronSteel { origin_country, .. }
        | ApplicationDetail::Sanctions { origin_country, .. }
        | ApplicationDetail::Sps { origin_country, .. }
        | ApplicationDetail::Textiles { origin_country, .. } => origin_country.as_deref(),
        ApplicationDetail::Opt { .. }
        | ApplicationDetail::Wood { .. }
        | ApplicationDetail::Export { .. } => None,
    }
}

fn consignment_country(detail: &ApplicationDetail) -> Option<&str> {
    match detail {
        ApplicationDetail::Derogations {
            consignment_country,
            ..
        }
        | ApplicationDetail::Firearms {
            consignment_country,
            ..
        }
        | ApplicationDetail::IronSteel {
            consignment_country,
            ..
        }
        | ApplicationDetail::Sanctions {
            consignment_country,
            ..
        }
        | ApplicationDetail::Sps {
            consignment_country,
            ..
        }
        | ApplicationDetail::Textiles {
            consignment_country,
            ..
        } => consignment_country.as_deref(),
        ApplicationDetail::Opt { .. }
        | ApplicationDetail::Wood { .. }
        | ApplicationDetail::Export { .. } => None,
    }
}

fn shipping_year(detail: &ApplicationDetail) -> Option<i32> {
    match detail {
        ApplicationDetail::IronSteel { shipping_year, .. }
        | ApplicationDetail::Textiles { shipping_year, .. }
        | ApplicationDetail::Wood { shipping_year, .. } => *shipping_year,
        _ => None,
    }
}

fn matches_goods_category(detail: &ApplicationDetail, category: &str) -> bool {
    if let Some(commodity) = FirearmCommodity::from_code(category) {
        return matches!(
            detail,
            ApplicationDetail::Firearms { commodity: Some(found), .. } if *found == commodity
        );
    }

    match detail {
        ApplicationDetail::IronSteel {
            category_commodity_group,
            ..
        }
        | ApplicationDetail::Textiles {
            category_commodity_group,
            ..
        } => category_commodity_group
            .as_ref()
            .is_some_and(|group| group.group_code == category),
        ApplicationDetail::Opt { cp_category, .. } => cp_category.as_deref() == Some(category),
        _ => false,
    }
}

fn commodity_codes(detail: &ApplicationDetail) -> Vec<&str> {
    match detail {
        ApplicationDetail::Derogations { commodity_code, .. }
        | ApplicationDetail::IronSteel { commodity_code, .. }
        | ApplicationDetail::Sps { commodity_code, .. }
        | ApplicationDetail::Textiles { commodity_code, .. }
        | ApplicationDetail::Wood { commodity_code, .. } => {
            commodity_code.as_deref().into_iter().collect()
        }
        ApplicationDetail::Opt {
            cp_commodity_codes,
            teg_commodity_codes,
            ..
        } => cp_commodity_codes
            .iter()
            .chain(teg_commodity_codes)
            .map(String::as_str)
            .collect(),
        ApplicationDetail::Sanctions { goods, .. } => {
            goods.iter().map(|good| good.commodity_code.as_str()).collect()
        }
        // Firearms applications carry no commodity codes.
        ApplicationDetail::Firearms { .. } | ApplicationDetail::Export { .. } => Vec::new(),
    }
}

fn get_result_row(tables: &CaseTables, record: &SearchRecord<'_>) -> ImportResultRow {
    let app = record.application;
    let application_type = app.application_type();

    let start_date = record
        .pack
        .and_then(|pack| pack.licence_start_date)
        .map(|date| date.format(LICENCE_DATE_FORMAT).to_string());
    let end_date = record
        .pack
        .and_then(|pack| pack.licence_end_date)
        .map(|date| date.format(LICENCE_DATE_FORMAT).to_string());
    let licence_validity = [start_date.as_deref(), end_date.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" - ");

    let paper_only = record
        .pack
        .and_then(|pack| pack.issue_paper_licence_only)
        .unwrap_or(false);

    let application_sub_type = if app.process_type.is_firearms() {
        application_type.sub_type_label.unwrap_or_default().to_string()
    } else {
        String::new()
    };

    ImportResultRow {
        app_pk: app.id,
        actions: get_import_record_actions(record),
        submitted_at: format_submitted(app),
        case_status: CaseStatus {
            case_reference: app.get_reference().to_string(),
            application_type: application_type.type_label.to_string(),
            application_sub_type,
            status: app.status.label().to_string(),
            licence_type: if paper_only { "Paper" } else { "Electronic" }.to_string(),
            licence_start_date: start_date,
            licence_end_date: end_date,
            chief_usage_status: app.chief_usage_status.map(|usage| usage.label().to_string()),
            applicant_reference: app.applicant_reference.clone(),
            licence_reference: record.licence_reference().map(str::to_string),
            licence_validity: Some(licence_validity).filter(|validity| !validity.is_empty()),
        },
        applicant_details: ApplicantDetails {
            organisation_name: app.organisation_name.clone(),
            application_contact: app.contact.full_name(),
            agent_name: app.agent_name.clone(),
        },
        commodity_details: get_commodity_details(app),
        assignee_details: get_assignee_details(tables, app),
        order_by_datetime: order_by_datetime(app),
    }
}

fn get_export_result_row(tables: &CaseTables, record: &SearchRecord<'_>) -> ExportResultRow {
    let app = record.application;

    let (origin_countries, manufacturer_countries) = match &app.detail {
        ApplicationDetail::Export {
            countries,
            manufacturer_countries,
            ..
        } => {
            let manufacturer_countries = if app.process_type == ProcessType::Cfs {
                manufacturer_countries.clone()
            } else {
                Vec::new()
            };
            (countries.clone(), manufacturer_countries)
        }
        _ => (Vec::new(), Vec::new()),
    };

    ExportResultRow {
        app_pk: app.id,
        actions: get_export_record_actions(record),
        case_reference: app.get_reference().to_string(),
        application_type: app.process_type.label().to_string(),
        status: app.status.label().to_string(),
        certificates: record.certificate_references(),
        submitted_at: format_submitted(app),
        order_by_datetime: order_by_datetime(app),
        origin_countries,
        organisation_name: app.organisation_name.clone(),
        application_contact: app.contact.full_name(),
        manufacturer_countries,
        assignee_details: get_assignee_details(tables, app),
        agent_name: app.agent_name.clone(),
    }
}

fn format_submitted(app: &Application) -> String {
    app.submit_datetime
        .map(|submitted| submitted.format(SUBMITTED_FORMAT).to_string())
        .unwrap_or_default()
}

/// Describes who is working the case and at which workflow step.
fn get_assignee_details(tables: &CaseTables, app: &Application) -> AssigneeDetails {
    let task = tables
        .tasks()
        .active_for(app.id)
        .max_by_key(|task| (task.created, task.id));

    let title = match task.map(|task| task.task_type) {
        Some(TaskType::Authorise) => "Authorise Documents / Authoriser",
        Some(TaskType::Prepare) => "Prepare Application / Applicant",
        Some(TaskType::ChiefWait | TaskType::ChiefRevokeWait) => {
            "Awaiting CHIEF Response"
        }
        Some(TaskType::ChiefError | TaskType::DocumentError) => {
            "Error Resolution / Case Officer"
        }
        Some(_) => "Application Processing / Case Officer",
        None => "",
    };

    let assignee_name = app
        .case_owner
        .as_ref()
        .map(|owner| format!("{} ({})", owner.full_name(), owner.email))
        .unwrap_or_default();

    AssigneeDetails {
        title: title.to_string(),
        ownership_date: task
            .map(|task| task.created.format(OWNERSHIP_FORMAT).to_string())
            .unwrap_or_default(),
        assignee_name,
        reassignment_date: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_filter_accepts_only_listed_choices() {
        assert_eq!(
            StatusFilter::parse(CaseType::Import, "FIR_REQUESTED").ok(),
            Some(StatusFilter::FirRequested)
        );
        assert_eq!(
            StatusFilter::parse(CaseType::Export, "HSE").ok(),
            Some(StatusFilter::Hse)
        );
        assert!(matches!(
            StatusFilter::parse(CaseType::Import, "BEIS"),
            Err(SearchError::UnsupportedCaseStatus(value)) if value == "BEIS"
        ));
        assert!(matches!(
            StatusFilter::parse(CaseType::Import, "IN_PROGRESS"),
            Err(SearchError::UnsupportedCaseStatus(_))
        ));
    }

    #[test]
    fn date_range_without_bounds_accepts_missing_values() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 1);
        assert!(in_date_range(None, None, None));
        assert!(!in_date_range(None, day, None));
        assert!(in_date_range(day, day, day));
        assert!(!in_date_range(day, NaiveDate::from_ymd_opt(2024, 3, 2), None));
    }

    #[test]
    fn status_choice_lists_differ_by_case_type() {
        assert_eq!(get_import_status_choices().len(), 9);
        assert_eq!(get_export_status_choices().len(), 12);
        assert!(get_export_status_choices().contains(&("BEIS", "Processing (BEIS)")));
    }
}
