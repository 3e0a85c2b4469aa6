use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::case::domain::{ChiefUsageStatus, Decision};
use crate::flow::{CaseType, ProcessId, ProcessType, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenceTypeFilter {
    Paper,
    Electronic,
}

/// Search form values. Fields left at their default do not filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTerms {
    pub case_type: CaseType,

    #[serde(default)]
    pub app_type: Option<String>,
    #[serde(default)]
    pub case_status: Option<String>,
    #[serde(default)]
    pub case_ref: Option<String>,
    #[serde(default)]
    pub licence_ref: Option<String>,
    #[serde(default)]
    pub response_decision: Option<Decision>,
    #[serde(default)]
    pub submitted_date_start: Option<NaiveDate>,
    #[serde(default)]
    pub submitted_date_end: Option<NaiveDate>,
    #[serde(default)]
    pub reassignment_search: bool,
    #[serde(default)]
    pub reassignment_user: Option<UserId>,
    #[serde(default)]
    pub application_contact: Option<String>,
    #[serde(default)]
    pub pending_firs: bool,
    #[serde(default)]
    pub pending_update_reqs: bool,

    // Import only
    #[serde(default)]
    pub app_sub_type: Option<String>,
    #[serde(default)]
    pub applicant_ref: Option<String>,
    #[serde(default)]
    pub importer_agent_name: Option<String>,
    #[serde(default)]
    pub licence_type: Option<LicenceTypeFilter>,
    #[serde(default)]
    pub chief_usage_status: Option<ChiefUsageStatus>,
    #[serde(default)]
    pub origin_country: Vec<String>,
    #[serde(default)]
    pub consignment_country: Vec<String>,
    #[serde(default)]
    pub shipping_year: Option<i32>,
    #[serde(default)]
    pub goods_category: Option<String>,
    #[serde(default)]
    pub commodity_code: Option<String>,
    #[serde(default)]
    pub under_appeal: Option<bool>,
    #[serde(default)]
    pub licence_date_start: Option<NaiveDate>,
    #[serde(default)]
    pub licence_date_end: Option<NaiveDate>,
    #[serde(default)]
    pub issue_date_start: Option<NaiveDate>,
    #[serde(default)]
    pub issue_date_end: Option<NaiveDate>,

    // Export only
    #[serde(default)]
    pub exporter_agent_name: Option<String>,
    #[serde(default)]
    pub closed_date_start: Option<NaiveDate>,
    #[serde(default)]
    pub closed_date_end: Option<NaiveDate>,
    #[serde(default)]
    pub certificate_country: Vec<String>,
    #[serde(default)]
    pub manufacture_country: Vec<String>,
}

impl SearchTerms {
    pub fn new(case_type: CaseType) -> Self {
        Self {
            case_type,
            app_type: None,
            case_status: None,
            case_ref: None,
            licence_ref: None,
            response_decision: None,
            submitted_date_start: None,
            submitted_date_end: None,
            reassignment_search: false,
            reassignment_user: None,
            application_contact: None,
            pending_firs: false,
            pending_update_reqs: false,
            app_sub_type: None,
            applicant_ref: None,
            importer_agent_name: None,
            licence_type: None,
            chief_usage_status: None,
            origin_country: Vec::new(),
            consignment_country: Vec::new(),
            shipping_year: None,
            goods_category: None,
            commodity_code: None,
            under_appeal: None,
            licence_date_start: None,
            licence_date_end: None,
            issue_date_start: None,
            issue_date_end: None,
            exporter_agent_name: None,
            closed_date_start: None,
            closed_date_end: None,
            certificate_country: Vec::new(),
            manufacture_country: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessTypeAndPk {
    pub process_type: ProcessType,
    pub pk: ProcessId,
    pub order_by_datetime: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseStatus {
    pub case_reference: String,
    pub application_type: String,
    pub application_sub_type: String,
    pub status: String,
    pub licence_type: String,
    pub licence_start_date: Option<String>,
    pub licence_end_date: Option<String>,
    pub chief_usage_status: Option<String>,
    pub applicant_reference: Option<String>,
    pub licence_reference: Option<String>,
    pub licence_validity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicantDetails {
    pub organisation_name: String,
    pub application_contact: String,
    pub agent_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommodityDetails {
    pub origin_country: String,
    pub consignment_country: Option<String>,
    pub goods_category: Option<String>,
    pub shipping_year: Option<i32>,
    pub commodity_codes: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssigneeDetails {
    pub title: String,
    pub ownership_date: String,
    pub assignee_name: String,
    pub reassignment_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchAction {
    pub url: String,
    pub name: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
    pub is_post: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportResultRow {
    pub app_pk: ProcessId,
    pub actions: Vec<SearchAction>,
    pub submitted_at: String,
    pub case_status: CaseStatus,
    pub applicant_details: ApplicantDetails,
    pub commodity_details: CommodityDetails,
    pub assignee_details: AssigneeDetails,
    pub order_by_datetime: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportResultRow {
    pub app_pk: ProcessId,
    pub actions: Vec<SearchAction>,
    pub case_reference: String,
    pub application_type: String,
    pub status: String,
    pub certificates: Vec<String>,
    pub submitted_at: String,
    pub order_by_datetime: DateTime<Utc>,
    pub origin_countries: Vec<String>,
    pub organisation_name: String,
    pub application_contact: String,
    pub manufacturer_countries: Vec<String>,
    pub assignee_details: AssigneeDetails,
    pub agent_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResultRow {
    Import(ImportResultRow),
    Export(ExportResultRow),
}

impl ResultRow {
    pub fn app_pk(&self) -> ProcessId {
        match self {
            Self::Import(row) => row.app_pk,
            Self::Export(row) => row.app_pk,
        }
    }

    pub fn order_by_datetime(&self) -> DateTime<Utc> {
        match self {
            Self::Import(row) => row.order_by_datetime,
            Self::Export(row) => row.order_by_datetime,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResults {
    pub total_rows: usize,
    pub records: Vec<ResultRow>,
}

/// One line of the import results spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpreadsheetRow {
    pub case_reference: String,
    pub applicant_reference: Option<String>,
    pub licence_reference: Option<String>,
    pub licence_type: String,
    pub licence_start_date: Option<String>,
    pub licence_end_date: Option<String>,
    pub application_type: String,
    pub application_sub_type: String,
    pub case_status: String,
    pub chief_usage_status: Option<String>,
    pub submitted_date: String,
    pub organisation_name: String,
    pub agent: Option<String>,
    pub application_contact: String,
    pub origin_country: String,
    pub country_of_consignment: Option<String>,
    pub shipping_year: Option<i32>,
    pub goods_category: Option<String>,
    pub commodity_codes: Option<String>,
}

/// One line of the export results spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportSpreadsheetRow {
    pub case_reference: String,
    pub certificates: String,
    pub application_type: String,
    pub case_status: String,
    pub submitted_date: String,
    pub certificate_countries: String,
    pub manufacturer_countries: String,
    pub exporter: String,
    pub agent: String,
    pub application_contact: String,
}
