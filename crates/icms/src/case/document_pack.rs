//! Versioned licence/certificate packs and the document references they carry.
//!
//! An application has at most one draft pack and at most one active pack. Issuing moves the
//! draft to active and archives the previous active pack. Revoking marks the active pack revoked.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::flow::{CaseType, ProcessId, ProcessType};

use super::domain::{Application, ApplicationDetail};
use super::reference::{self, ReferenceError};
use super::repository::CaseTables;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PackId(pub u64);

impl fmt::Display for PackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentReferenceId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackStatus {
    Draft,
    Active,
    Archived,
    Revoked,
}

impl PackStatus {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Draft => "DR",
            Self::Active => "AC",
            Self::Archived => "AR",
            Self::Revoked => "RE",
        }
    }

    /// Statuses whose documents are shown in search results.
    pub const fn is_visible(self) -> bool {
        matches!(self, Self::Draft | Self::Active | Self::Revoked)
    }
}

/// One version of the licence (imports) or certificates (exports) issued for an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPack {
    pub id: PackId,
    pub process_id: ProcessId,
    pub status: PackStatus,
    pub created_at: DateTime<Utc>,
    pub case_reference: Option<String>,
    pub case_completion_datetime: Option<DateTime<Utc>>,
    pub issue_paper_licence_only: Option<bool>,
    pub licence_start_date: Option<NaiveDate>,
    pub licence_end_date: Option<NaiveDate>,
    pub revoke_reason: Option<String>,
    pub revoke_email_sent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    Licence,
    Certificate,
    CoverLetter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseDocumentReference {
    pub id: DocumentReferenceId,
    pub pack_id: PackId,
    pub document_type: DocumentType,
    pub reference: Option<String>,
    pub check_code: Option<String>,
    pub country: Option<String>,
    pub brand: Option<String>,
}

/// Caseworker edits to the draft licence. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenceUpdate {
    #[serde(default)]
    pub licence_start_date: Option<NaiveDate>,
    #[serde(default)]
    pub licence_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub issue_paper_licence_only: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentPackError {
    #[error("no {status:?} document pack for application {process_id}")]
    NotFound {
        process_id: ProcessId,
        status: PackStatus,
    },
    #[error("{found} {status:?} document packs for application {process_id}")]
    Multiple {
        process_id: ProcessId,
        status: PackStatus,
        found: usize,
    },
    #[error(transparent)]
    Reference(#[from] ReferenceError),
}

/// Creates the draft pack. A variation draft copies the licence details of the active pack.
pub fn pack_draft_create(
    tables: &mut CaseTables,
    application: &Application,
    variation_request: bool,
) -> Result<PackId, DocumentPackError> {
    let (issue_paper_licence_only, licence_start_date, licence_end_date) =
        if application.is_import_application() {
            if variation_request {
                let active = pack_active_get(tables, application.id)?;
                (
                    active.issue_paper_licence_only,
                    active.licence_start_date,
                    active.licence_end_date,
                )
            } else {
                (
                    application.application_type().initial_paper_licence_only(),
                    None,
                    None,
                )
            }
        } else {
            (None, None, None)
        };

    let id = tables.next_pack_id();
    tables.insert_pack(DocumentPack {
        id,
        process_id: application.id,
        status: PackStatus::Draft,
        created_at: Utc::now(),
        case_reference: None,
        case_completion_datetime: None,
        issue_paper_licence_only,
        licence_start_date,
        licence_end_date,
        revoke_reason: None,
        revoke_email_sent: false,
    });

    Ok(id)
}

pub fn pack_draft_get(
    tables: &CaseTables,
    process_id: ProcessId,
) -> Result<&DocumentPack, DocumentPackError> {
    single_pack(tables, process_id, PackStatus::Draft)
}

/// Issues the draft: the previous active pack is archived and the draft becomes active.
pub fn pack_draft_set_active(
    tables: &mut CaseTables,
    application: &Application,
) -> Result<PackId, DocumentPackError> {
    let draft_id = pack_draft_get(tables, application.id)?.id;
    let previous = pack_active_get_optional(tables, application.id)?.map(|pack| pack.id);

    if let Some(previous) = previous {
        set_status(tables, previous, PackStatus::Archived);
    }

    if let Some(draft) = tables.pack_mut(draft_id) {
        draft.status = PackStatus::Active;
        draft.case_reference = application.reference.clone();
        draft.case_completion_datetime = Some(Utc::now());
    }

    Ok(draft_id)
}

pub fn pack_draft_archive(
    tables: &mut CaseTables,
    process_id: ProcessId,
) -> Result<(), DocumentPackError> {
    let draft_id = pack_draft_get(tables, process_id)?.id;
    set_status(tables, draft_id, PackStatus::Archived);
    Ok(())
}

pub fn pack_active_get(
    tables: &CaseTables,
    process_id: ProcessId,
) -> Result<&DocumentPack, DocumentPackError> {
    single_pack(tables, process_id, PackStatus::Active)
}

pub fn pack_active_get_optional(
    tables: &CaseTables,
    process_id: ProcessId,
) -> Result<Option<&DocumentPack>, DocumentPackError> {
    match single_pack(tables, process_id, PackStatus::Active) {
        Ok(pack) => Ok(Some(pack)),
        Err(DocumentPackError::NotFound { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}

pub fn pack_active_revoke(
    tables: &mut CaseTables,
    process_id: ProcessId,
    reason: Option<String>,
    revoke_email_sent: bool,
) -> Result<PackId, DocumentPackError> {
    let active_id = pack_active_get(tables, process_id)?.id;
    if let Some(pack) = tables.pack_mut(active_id) {
        pack.status = PackStatus::Revoked;
        pack.revoke_reason = reason;
        pack.revoke_email_sent = revoke_email_sent;
    }
    Ok(active_id)
}

pub fn pack_revoked_get(
    tables: &CaseTables,
    process_id: ProcessId,
) -> Result<&DocumentPack, DocumentPackError> {
    single_pack(tables, process_id, PackStatus::Revoked)
}

/// Most recently created draft, active or revoked pack.
pub fn pack_latest_get(tables: &CaseTables, process_id: ProcessId) -> Option<&DocumentPack> {
    tables
        .packs_for(process_id)
        .filter(|pack| pack.status.is_visible())
        .max_by_key(|pack| (pack.created_at, pack.id))
}

/// Every pack that has been issued, newest first.
pub fn pack_issued_get_all(tables: &CaseTables, process_id: ProcessId) -> Vec<&DocumentPack> {
    let mut issued: Vec<&DocumentPack> = tables
        .packs_for(process_id)
        .filter(|pack| pack.status != PackStatus::Draft && pack.case_completion_datetime.is_some())
        .collect();
    issued.sort_by(|a, b| b.case_completion_datetime.cmp(&a.case_completion_datetime));
    issued
}

pub fn pack_licence_update(
    tables: &mut CaseTables,
    process_id: ProcessId,
    update: LicenceUpdate,
) -> Result<(), DocumentPackError> {
    let draft_id = pack_draft_get(tables, process_id)?.id;
    if let Some(draft) = tables.pack_mut(draft_id) {
        if update.licence_start_date.is_some() {
            draft.licence_start_date = update.licence_start_date;
        }
        if update.licence_end_date.is_some() {
            draft.licence_end_date = update.licence_end_date;
        }
        if update.issue_paper_licence_only.is_some() {
            draft.issue_paper_licence_only = update.issue_paper_licence_only;
        }
    }
    Ok(())
}

/// Creates the document references for the draft pack, replacing any earlier ones.
///
/// Imports get a cover letter and a licence. Exports get one certificate per country, or one
/// per country and brand for GMP, ordered by name.
pub fn doc_ref_documents_create(
    tables: &mut CaseTables,
    application: &mut Application,
) -> Result<(), DocumentPackError> {
    let draft = pack_draft_get(tables, application.id)?;
    let draft_id = draft.id;
    let issue_paper_licence_only = draft.issue_paper_licence_only;

    tables.remove_document_references(draft_id);

    match application.case_type() {
        CaseType::Import => {
            insert_reference(tables, draft_id, DocumentType::CoverLetter, None, None, None);
            let licence =
                reference::get_import_licence_reference(tables, application, issue_paper_licence_only)?;
            doc_ref_licence_create(tables, draft_id, licence);
        }
        CaseType::Export => {
            let (countries, brands) = match &application.detail {
                ApplicationDetail::Export {
                    countries, brands, ..
                } => (sorted(countries), sorted(brands)),
                _ => (Vec::new(), Vec::new()),
            };

            for country in countries {
                if application.process_type == ProcessType::Gmp {
                    for brand in &brands {
                        let certificate =
                            reference::get_export_certificate_reference(tables, application)?;
                        doc_ref_certificate_create(
                            tables,
                            draft_id,
                            certificate,
                            country.clone(),
                            Some(brand.clone()),
                        );
                    }
                } else {
                    let certificate = reference::get_export_certificate_reference(tables, application)?;
                    doc_ref_certificate_create(tables, draft_id, certificate, country, None);
                }
            }
        }
    }

    Ok(())
}

pub fn doc_ref_licence_create(
    tables: &mut CaseTables,
    pack_id: PackId,
    licence_reference: String,
) -> DocumentReferenceId {
    insert_reference(
        tables,
        pack_id,
        DocumentType::Licence,
        Some(licence_reference),
        None,
        None,
    )
}

pub fn doc_ref_licence_get_optional(
    tables: &CaseTables,
    pack_id: PackId,
) -> Option<&CaseDocumentReference> {
    tables
        .document_references_for(pack_id)
        .find(|reference| reference.document_type == DocumentType::Licence)
}

pub fn doc_ref_certificate_create(
    tables: &mut CaseTables,
    pack_id: PackId,
    certificate_reference: String,
    country: String,
    brand: Option<String>,
) -> DocumentReferenceId {
    insert_reference(
        tables,
        pack_id,
        DocumentType::Certificate,
        Some(certificate_reference),
        Some(country),
        brand,
    )
}

pub fn doc_ref_documents_all(tables: &CaseTables, pack_id: PackId) -> Vec<&CaseDocumentReference> {
    tables.document_references_for(pack_id).collect()
}

/// Eight digit code printed on a document so it can be verified against the pack.
pub fn check_code(pack_id: PackId, reference: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(pack_id.0.to_be_bytes());
    hasher.update(reference.as_bytes());
    let digest = hasher.finalize();

    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    format!("{:08}", u64::from_be_bytes(prefix) % 100_000_000)
}

fn insert_reference(
    tables: &mut CaseTables,
    pack_id: PackId,
    document_type: DocumentType,
    reference: Option<String>,
    country: Option<String>,
    brand: Option<String>,
) -> DocumentReferenceId {
    let id = tables.next_document_reference_id();
    let check_code = reference
        .as_deref()
        .map(|reference| check_code(pack_id, reference));

    tables.insert_document_reference(CaseDocumentReference {
        id,
        pack_id,
        document_type,
        reference,
        check_code,
        country,
        brand,
    });
    id
}

fn single_pack(
    tables: &CaseTables,
    process_id: ProcessId,
    status: PackStatus,
) -> Result<&DocumentPack, DocumentPackError> {
    let matching: Vec<&DocumentPack> = tables
        .packs_for(process_id)
        .filter(|pack| pack.status == status)
        .collect();

    match matching.as_slice() {
        [pack] => Ok(*pack),
        [] => Err(DocumentPackError::NotFound { process_id, status }),
        others => Err(DocumentPackError::Multiple {
            process_id,
            status,
            found: others.len(),
        }),
    }
}

fn set_status(tables: &mut CaseTables, pack_id: PackId, status: PackStatus) {
    if let Some(pack) = tables.pack_mut(pack_id) {
        pack.status = status;
    }
}

fn sorted(values: &[String]) -> Vec<String> {
    let mut values = values.to_vec();
    values.sort();
    values
}
