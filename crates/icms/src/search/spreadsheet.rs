use crate::flow::CaseType;

use super::types::{
    ExportResultRow, ExportSpreadsheetRow, ImportResultRow, ResultRow, SearchResults,
    SpreadsheetRow,
};
use super::SearchError;

pub const IMPORT_HEADERS: [&str; 19] = [
    "Case Reference",
    "Applicant's Reference",
    "Licence Reference",
    "Licence Type",
    "Licence Start Date",
    "Licence End Date",
    "Application Type",
    "Application Sub-Type",
    "Case Status",
    "Chief Usage Status",
    "Submitted Date",
    "Importer",
    "Agent",
    "Application Contact",
    "Country of Origin",
    "Country of Consignment",
    "Shipping Year",
    "Goods Category",
    "Commodity Code(s)",
];

pub const EXPORT_HEADERS: [&str; 10] = [
    "Case Reference",
    "Certificates",
    "Application Type",
    "Status",
    "Submitted Date",
    "Certificate Countries",
    "Countries of Manufacture",
    "Exporter",
    "Agent",
    "Application Contact",
];

/// Writes the search results as a spreadsheet with a header row.
pub fn get_search_results_spreadsheet(
    case_type: CaseType,
    results: &SearchResults,
) -> Result<Vec<u8>, SearchError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    match case_type {
        CaseType::Import => {
            writer.write_record(IMPORT_HEADERS)?;
            for row in results.records.iter().filter_map(|row| match row {
                ResultRow::Import(row) => Some(row),
                ResultRow::Export(_) => None,
            }) {
                writer.serialize(import_spreadsheet_row(row))?;
            }
        }
        CaseType::Export => {
            writer.write_record(EXPORT_HEADERS)?;
            for row in results.records.iter().filter_map(|row| match row {
                ResultRow::Export(row) => Some(row),
                ResultRow::Import(_) => None,
            }) {
                writer.serialize(export_spreadsheet_row(row))?;
            }
        }
    }

    writer
        .into_inner()
        .map_err(|err| SearchError::Io(err.into_error()))
}

pub fn import_spreadsheet_row(row: &ImportResultRow) -> SpreadsheetRow {
    let status = &row.case_status;
    let applicant = &row.applicant_details;
    let commodity = &row.commodity_details;

    SpreadsheetRow {
        case_reference: status.case_reference.clone(),
        applicant_reference: status.applicant_reference.clone(),
        licence_reference: status.licence_reference.clone(),
        licence_type: status.licence_type.clone(),
        licence_start_date: status.licence_start_date.clone(),
        licence_end_date: status.licence_end_date.clone(),
        application_type: status.application_type.clone(),
        application_sub_type: status.application_sub_type.clone(),
        case_status: status.status.clone(),
        chief_usage_status: status.chief_usage_status.clone(),
        submitted_date: row.submitted_at.clone(),
        organisation_name: applicant.organisation_name.clone(),
        agent: applicant.agent_name.clone(),
        application_contact: applicant.application_contact.clone(),
        origin_country: commodity.origin_country.clone(),
        country_of_consignment: commodity.consignment_country.clone(),
        shipping_year: commodity.shipping_year,
        goods_category: commodity.goods_category.clone(),
        commodity_codes: commodity
            .commodity_codes
            .as_ref()
            .filter(|codes| !codes.is_empty())
            .map(|codes| codes.join(", ")),
    }
}

pub fn export_spreadsheet_row(row: &ExportResultRow) -> ExportSpreadsheetRow {
    ExportSpreadsheetRow {
        case_reference: row.case_reference.clone(),
        certificates: row.certificates.join(", "),
        application_type: row.application_type.clone(),
        case_status: row.status.clone(),
        submitted_date: row.submitted_at.clone(),
        certificate_countries: row.origin_countries.join(", "),
        manufacturer_countries: row.manufacturer_countries.join(", "),
        exporter: row.organisation_name.clone(),
        agent: row.agent_name.clone().unwrap_or_default(),
        application_contact: row.application_contact.clone(),
    }
}
