//! Case, licence and certificate reference numbers.

use chrono::{Datelike, Utc};

use crate::flow::{CaseType, ProcessType};

use super::domain::{Application, VariationRequestStatus};
use super::repository::CaseTables;

const IMPORT_APP: &str = "IMA";
const EXPORT_APP_GA: &str = "GA";
const EXPORT_APP_CA: &str = "CA";
const IMPORT_LICENCE_DOCUMENT: &str = "ILD";
const CHECK_DIGITS: &[u8; 13] = b"ABCDEFGHXJKLM";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    #[error("application has not been assigned a case reference")]
    NotAssigned,
    #[error("no {kind} reference format for {process_type:?}")]
    Unsupported {
        kind: &'static str,
        process_type: ProcessType,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenceKind {
    Paper,
    Electronic,
}

/// `IMA/<year>/<NNNNN>` for imports, `GA/...` for GMP and `CA/...` for other exports.
pub fn get_application_case_reference(tables: &mut CaseTables, application: &Application) -> String {
    let prefix = match (application.case_type(), application.process_type) {
        (CaseType::Import, _) => IMPORT_APP,
        (CaseType::Export, ProcessType::Gmp) => EXPORT_APP_GA,
        (CaseType::Export, _) => EXPORT_APP_CA,
    };

    next_year_reference(tables, prefix)
}

/// The case reference with the number of variations appended, e.g. `IMA/2024/00001/2`.
pub fn get_variation_request_case_reference(
    application: &Application,
) -> Result<String, ReferenceError> {
    let reference = application
        .reference
        .as_deref()
        .ok_or(ReferenceError::NotAssigned)?;

    let variation_count = application
        .variation_requests
        .iter()
        .filter(|vr| {
            application.is_import_application()
                || matches!(
                    vr.status,
                    VariationRequestStatus::Open | VariationRequestStatus::Closed
                )
        })
        .count();

    let mut sections: Vec<String> = reference.split('/').take(3).map(str::to_string).collect();
    if variation_count > 0 {
        sections.push(variation_count.to_string());
    }

    Ok(sections.join("/"))
}

/// Licence reference for the draft licence, allocating the licence sequence number once.
pub fn get_import_licence_reference(
    tables: &mut CaseTables,
    application: &mut Application,
    issue_paper_licence_only: Option<bool>,
) -> Result<String, ReferenceError> {
    let sequence = match application.licence_reference {
        Some(sequence) => sequence,
        None => {
            let sequence = tables.next_unique_reference(IMPORT_LICENCE_DOCUMENT, None);
            application.licence_reference = Some(sequence);
            sequence
        }
    };

    let kind = if issue_paper_licence_only.unwrap_or(false) {
        LicenceKind::Paper
    } else {
        LicenceKind::Electronic
    };

    licence_reference(kind, application.process_type, sequence)
}

/// `CFS|COM|GMP/<year>/<NNNNN>`.
pub fn get_export_certificate_reference(
    tables: &mut CaseTables,
    application: &Application,
) -> Result<String, ReferenceError> {
    let prefix = match application.process_type {
        ProcessType::Cfs => "CFS",
        ProcessType::Com => "COM",
        ProcessType::Gmp => "GMP",
        process_type => {
            return Err(ReferenceError::Unsupported {
                kind: "certificate",
                process_type,
            })
        }
    };

    Ok(next_year_reference(tables, prefix))
}

/// Electronic: `GB<xxx><NNNNNNN><check>`. Paper: `<NNNNNNN><check>`.
pub fn licence_reference(
    kind: LicenceKind,
    process_type: ProcessType,
    sequence: u32,
) -> Result<String, ReferenceError> {
    let sequence_and_check = format!("{sequence:07}{}", check_digit(sequence));

    match kind {
        LicenceKind::Paper => Ok(sequence_and_check),
        LicenceKind::Electronic => {
            let category = match process_type {
                ProcessType::FaDfl | ProcessType::FaSil => "SIL",
                ProcessType::FaOil => "OIL",
                ProcessType::Sanctions => "SAN",
                ProcessType::Sps => "AOG",
                ProcessType::Textiles => "TEX",
                process_type => {
                    return Err(ReferenceError::Unsupported {
                        kind: "electronic licence",
                        process_type,
                    })
                }
            };
            Ok(format!("GB{category}{sequence_and_check}"))
        }
    }
}

pub fn check_digit(sequence: u32) -> char {
    char::from(CHECK_DIGITS[(sequence % 13) as usize])
}

fn next_year_reference(tables: &mut CaseTables, prefix: &str) -> String {
    let year = Utc::now().year();
    let sequence = tables.next_unique_reference(prefix, Some(year));
    format!("{prefix}/{year}/{sequence:05}")
}
