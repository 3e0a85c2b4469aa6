//! Cross-application search, result rows, and the spreadsheet download.

pub mod actions;
mod api;
pub mod app_data;
mod spreadsheet;
pub mod types;
mod wildcard;

pub use api::{
    get_export_status_choices, get_import_status_choices, get_search_ids_and_types,
    order_by_datetime, search_applications,
};
pub use spreadsheet::{
    export_spreadsheet_row, get_search_results_spreadsheet, import_spreadsheet_row,
    EXPORT_HEADERS, IMPORT_HEADERS,
};
pub use types::{
    ApplicantDetails, AssigneeDetails, CaseStatus, CommodityDetails, ExportResultRow,
    ExportSpreadsheetRow, ImportResultRow, LicenceTypeFilter, ProcessTypeAndPk, ResultRow,
    SearchAction, SearchResults, SearchTerms, SpreadsheetRow,
};
pub use wildcard::{get_wildcard_filter, WildcardFilter};

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("filter ({0}) for case status not supported")]
    UnsupportedCaseStatus(String),
    #[error("invalid search pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("failed to write spreadsheet: {0}")]
    Spreadsheet(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
